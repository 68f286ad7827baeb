//! Long-lived worker threads and the generation barrier that drives them
//!
//! Each worker is permanently bound to one tile of the grid. Workers and the
//! coordinating thread share a small mutex-guarded state: one "finished" flag
//! per worker and a global "running" flag.
//!
//! - A worker waits until its flag is cleared, computes its tile for the
//!   current generation, then raises its flag again.
//! - The coordinator waits until every flag is raised, swaps the current and
//!   next concentration buffers, counts the generation, and clears all flags
//!   to start the next generation.
//!
//! The concentration and sample buffers are not guarded by the mutex. Workers
//! only read the current buffers and only write inside of their own tile of
//! the next buffers, and the coordinator only swaps buffers while every worker
//! is parked, which is enough to keep everyone out of each other's way.

use crate::{
    partition::{Partition, Tile},
    Error,
};
use compute::{reaction::step_region, Publisher, Region};
use data::{
    concentration::Species,
    frame::{Frame, Sample},
    parameters::{Config, Parameters},
    Precision,
};
use log::{debug, error, info};
use ndarray::{s, Array2, ArrayView2, ArrayViewMut2, RawArrayViewMut};
use std::{
    io,
    sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError},
    thread::{self, JoinHandle},
};

/// Hook into the processing of tiles by workers
///
/// Callbacks are invoked from worker threads, outside of the shared lock.
pub trait TileObserver: Send + Sync {
    /// Worker `worker` is about to compute its tile for `generation`
    fn tile_started(&self, worker: usize, generation: u64) {
        let _ = (worker, generation);
    }

    /// Worker `worker` is done computing its tile for `generation`
    fn tile_finished(&self, worker: usize, generation: u64) {
        let _ = (worker, generation);
    }
}

/// Worker pool that runs the simulation one generation at a time
pub struct WorkerPool {
    /// State shared with the workers
    shared: Arc<Shared>,

    /// Worker threads, indexed like the tiles they process
    workers: Vec<JoinHandle<()>>,

    /// Chemical species concentrations
    species: Species,

    /// Samples of the generation being computed
    samples: Array2<Sample>,

    /// Generation counter and committed frame
    publisher: Publisher,

    /// Truth that workers were released and their generation is not committed yet
    in_flight: bool,
}
//
impl WorkerPool {
    /// Seed the grid and start one worker per tile of `partition`
    ///
    /// Workers start parked, waiting for the first generation.
    pub fn start(
        config: &Config,
        partition: &Partition,
        observer: Option<Arc<dyn TileObserver>>,
    ) -> io::Result<Self> {
        let species = Species::new(config);
        let publisher = Publisher::new(config, &species);
        let mut pool = Self {
            shared: Arc::new(Shared::new(partition.len())),
            workers: Vec::with_capacity(partition.len()),
            samples: publisher.frame().samples().to_owned(),
            species,
            publisher,
            in_flight: false,
        };

        // If spawning fails midway, dropping the pool stops the workers that
        // were already started
        for tile in partition.tiles() {
            let worker = Worker {
                tile: tile.clone(),
                params: config.params,
                shared: pool.shared.clone(),
                observer: observer.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("gray-scott-worker-{}", tile.index))
                .spawn(move || worker.run())?;
            pool.workers.push(handle);
        }
        debug!("Started {} workers", pool.workers.len());
        Ok(pool)
    }

    /// Number of worker threads
    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Current concentrations of the chemical species
    ///
    /// If a generation is in flight, this waits for the workers to be done
    /// with the buffers, without committing that generation: it will still be
    /// reported by the next call to [`advance()`] or [`try_advance()`].
    ///
    /// [`advance()`]: Self::advance
    /// [`try_advance()`]: Self::try_advance
    pub fn species(&mut self) -> &Species {
        if self.in_flight {
            drop(self.wait_idle());
        }
        &self.species
    }

    /// Last committed frame
    pub fn frame(&self) -> &Frame {
        self.publisher.frame()
    }

    /// Number of completed generations
    pub fn generation(&self) -> u64 {
        self.publisher.generation()
    }

    /// Run one full generation, waiting for every worker to be done
    ///
    /// If a generation is already in flight (see [`try_advance()`]), this
    /// waits for it to complete instead of starting a new one. Workers are
    /// left parked on return.
    ///
    /// Returns the number of the generation that was completed.
    ///
    /// [`try_advance()`]: Self::try_advance
    pub fn advance(&mut self) -> Result<u64, Error> {
        if !self.in_flight {
            self.release();
        }
        self.wait_idle().check_panicked()?;
        Ok(self.finish())
    }

    /// Poll the generation that is currently in flight without blocking
    ///
    /// If no generation is in flight, one is started. If the generation in
    /// flight is complete, it is committed and the next one is started right
    /// away, so that workers keep busy while the caller handles other events.
    ///
    /// Returns the number of the generation that was completed, if any.
    pub fn try_advance(&mut self) -> Result<Option<u64>, Error> {
        if !self.in_flight {
            self.release();
            return Ok(None);
        }
        {
            let state = self.shared.lock();
            state.check_panicked()?;
            if !state.all_finished() {
                return Ok(None);
            }
        }
        let generation = self.finish();
        self.release();
        Ok(Some(generation))
    }

    /// Stop and join all workers
    ///
    /// Workers that are computing a tile finish it before they stop. This is
    /// also done automatically when the pool is dropped.
    pub fn shutdown(mut self) {
        self.stop();
    }

    /// Hand the buffers of the next generation over to the workers
    fn release(&mut self) {
        debug_assert!(!self.in_flight);
        let shape = self.species.shape();
        let job = {
            let (in_a, out_a) = self.species.a.in_out();
            let (in_b, out_b) = self.species.b.in_out();
            for array in [in_a, &*out_a, in_b, &*out_b] {
                debug_assert!(array.is_standard_layout());
            }
            debug_assert!(self.samples.is_standard_layout());
            Job {
                generation: self.publisher.generation() + 1,
                shape,
                in_a: in_a.as_ptr(),
                in_b: in_b.as_ptr(),
                out_a: out_a.as_mut_ptr(),
                out_b: out_b.as_mut_ptr(),
                samples: self.samples.as_mut_ptr(),
            }
        };
        {
            let mut state = self.shared.lock();
            state.job = Some(job);
            state.finished.fill(false);
        }
        self.shared.start.notify_all();
        self.in_flight = true;
    }

    /// Wait until no worker is processing a tile anymore
    ///
    /// Workers that panicked count as done.
    fn wait_idle(&self) -> MutexGuard<'_, BarrierState> {
        let state = self.shared.lock();
        self.shared
            .done
            .wait_while(state, |state| !state.all_finished())
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Swap buffers and count the generation once every worker is done
    fn finish(&mut self) -> u64 {
        self.in_flight = false;
        self.species.flip();
        self.publisher.generation_done(self.samples.view())
    }

    /// Clear the running flag and join all workers
    fn stop(&mut self) {
        if self.workers.is_empty() {
            return;
        }
        self.shared.lock().running = false;
        self.shared.start.notify_all();
        for (idx, worker) in self.workers.drain(..).enumerate() {
            if worker.join().is_err() {
                error!("Worker #{idx} panicked");
            }
        }
        info!("Worker pool shut down");
    }
}
//
impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.stop();
    }
}

/// State shared between the coordinator and the workers
struct Shared {
    /// Flags guarded by the barrier lock
    state: Mutex<BarrierState>,

    /// Signaled by the coordinator when flags are cleared or running stops
    start: Condvar,

    /// Signaled by the last worker to complete a generation
    done: Condvar,
}
//
impl Shared {
    /// Set up shared state for `num_workers` parked workers
    fn new(num_workers: usize) -> Self {
        Self {
            state: Mutex::new(BarrierState {
                finished: vec![true; num_workers],
                running: true,
                panicked: None,
                job: None,
            }),
            start: Condvar::new(),
            done: Condvar::new(),
        }
    }

    /// Acquire the barrier lock
    ///
    /// The flags are only ever flipped as a whole, so they are still
    /// consistent if a thread panicked while holding the lock.
    fn lock(&self) -> MutexGuard<'_, BarrierState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Mutex-guarded part of the shared state
struct BarrierState {
    /// Per-worker truth that the tile is done for the current generation,
    /// or that the worker panicked
    finished: Vec<bool>,

    /// Truth that workers should keep going
    running: bool,

    /// Index of a worker that panicked, if any
    panicked: Option<usize>,

    /// Buffers of the generation in flight
    job: Option<Job>,
}
//
impl BarrierState {
    /// Truth that every worker is done with the current generation
    fn all_finished(&self) -> bool {
        self.finished.iter().all(|&finished| finished)
    }

    /// Report worker panics
    fn check_panicked(&self) -> Result<(), Error> {
        match self.panicked {
            Some(worker) => Err(Error::WorkerPanicked { worker }),
            None => Ok(()),
        }
    }
}

/// Location of the buffers that workers operate on during one generation
#[derive(Copy, Clone, Debug)]
struct Job {
    /// Number of the generation being computed
    generation: u64,

    /// Shape of all buffers, in `[rows, cols]` order
    shape: [usize; 2],

    /// Current concentrations of species A
    in_a: *const Precision,

    /// Current concentrations of species B
    in_b: *const Precision,

    /// Next concentrations of species A
    out_a: *mut Precision,

    /// Next concentrations of species B
    out_b: *mut Precision,

    /// Samples of the next generation
    samples: *mut Sample,
}
//
// SAFETY: The pointers target buffers owned by the WorkerPool, which only
//         hands them out while the corresponding generation is in flight and
//         does not touch them again until every worker is done.
unsafe impl Send for Job {}
//
impl Job {
    /// Compute one tile of this job
    ///
    /// # Safety
    ///
    /// The job's buffers must be alive and left alone by the coordinator, and
    /// no other thread may be processing an overlapping region.
    unsafe fn process(&self, params: &Parameters, region: &Region) {
        if region.is_empty() {
            return;
        }
        let inputs = [
            ArrayView2::from_shape_ptr(self.shape, self.in_a),
            ArrayView2::from_shape_ptr(self.shape, self.in_b),
        ];
        let outputs = [
            tile_view_mut(self.out_a, self.shape, region),
            tile_view_mut(self.out_b, self.shape, region),
        ];
        let samples = tile_view_mut(self.samples, self.shape, region);
        step_region(params, inputs, region, outputs, samples);
    }
}

/// Mutable view of one region of a buffer
///
/// # Safety
///
/// `ptr` must point to a live standard-layout buffer of shape `shape`, and
/// nothing else may access `region` of that buffer while the view is alive.
unsafe fn tile_view_mut<'a, T>(
    ptr: *mut T,
    shape: [usize; 2],
    region: &Region,
) -> ArrayViewMut2<'a, T> {
    RawArrayViewMut::from_shape_ptr(shape, ptr)
        .slice_move(s![region.y.clone(), region.x.clone()])
        .deref_into_view_mut()
}

/// Worker thread state
struct Worker {
    /// Tile that this worker is bound to
    tile: Tile,

    /// Reaction-diffusion constants
    params: Parameters,

    /// State shared with the coordinator
    shared: Arc<Shared>,

    /// Instrumentation hook
    observer: Option<Arc<dyn TileObserver>>,
}
//
impl Worker {
    /// Process the tile once per generation until the pool stops
    fn run(self) {
        let idx = self.tile.index;
        let _panic_guard = PanicGuard {
            shared: &self.shared,
            idx,
        };
        debug!("Worker #{idx} will process {:?}", self.tile.region);

        let mut state = self.shared.lock();
        loop {
            // Wait for our flag to be cleared or for the pool to stop
            state = self
                .shared
                .start
                .wait_while(state, |state| state.running && state.finished[idx])
                .unwrap_or_else(PoisonError::into_inner);
            if !state.running {
                break;
            }
            state.finished[idx] = false;
            let Some(job) = state.job else {
                unreachable!("workers are only released along with a job")
            };
            drop(state);

            if let Some(observer) = &self.observer {
                observer.tile_started(idx, job.generation);
            }
            // SAFETY: Our flag is cleared, so the coordinator keeps away from
            //         the job's buffers, and tiles do not overlap.
            unsafe { job.process(&self.params, &self.tile.region) };
            if let Some(observer) = &self.observer {
                observer.tile_finished(idx, job.generation);
            }

            state = self.shared.lock();
            state.finished[idx] = true;
            if state.all_finished() {
                self.shared.done.notify_all();
            }
        }
        debug!("Worker #{idx} is exiting");
    }
}

/// Lets the coordinator know if a worker panics, instead of waiting forever
struct PanicGuard<'shared> {
    /// State shared with the coordinator
    shared: &'shared Shared,

    /// Index of the worker
    idx: usize,
}
//
impl Drop for PanicGuard<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            let mut state = self.shared.lock();
            state.finished[self.idx] = true;
            state.panicked.get_or_insert(self.idx);
            drop(state);
            self.shared.done.notify_all();
        }
    }
}
