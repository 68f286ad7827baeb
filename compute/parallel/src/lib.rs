//! Multi-threaded implementation of Gray-Scott simulation
//!
//! The grid interior is split into near-square tiles, and each tile is bound
//! to one long-lived worker thread. Generations are separated by a barrier:
//! no worker starts generation N+1 before every worker is done with
//! generation N and the concentration buffers have been swapped.

mod args;
pub mod partition;
pub mod pool;

pub use crate::args::ParallelArgs;
use crate::{
    partition::Partition,
    pool::{TileObserver, WorkerPool},
};
use compute::{Simulate, SimulateBase, SimulateCreate};
use data::{
    concentration::Species,
    frame::Frame,
    parameters::{Config, ConfigError},
};
use log::warn;
use std::{io, num::NonZeroUsize, sync::Arc, thread};
use thiserror::Error;

/// Errors that can occur while setting up or running the simulation
#[derive(Debug, Error)]
pub enum Error {
    /// The configuration was rejected
    #[error("invalid simulation configuration")]
    Config(#[from] ConfigError),

    /// A worker thread could not be started
    #[error("failed to spawn a worker thread")]
    SpawnWorker(#[source] io::Error),

    /// A worker thread panicked, so the generation can't be completed
    #[error("worker #{worker} panicked")]
    WorkerPanicked { worker: usize },
}

/// Gray-Scott reaction simulation
pub struct Simulation {
    /// Worker threads and the state they operate on
    pool: WorkerPool,
}
//
impl Simulation {
    /// Like [`SimulateCreate::new()`], but with an instrumentation hook that
    /// gets notified as tiles are processed
    pub fn with_observer(
        config: Config,
        args: ParallelArgs,
        observer: Option<Arc<dyn TileObserver>>,
    ) -> Result<Self, Error> {
        config.validate()?;
        let cores = match args.num_threads {
            Some(num_threads) => num_threads.get(),
            None => thread::available_parallelism()
                .unwrap_or_else(|e| {
                    warn!("Failed to query available parallelism ({e}), will use a single worker");
                    NonZeroUsize::MIN
                })
                .get(),
        };
        let partition = Partition::plan(cores, [config.width, config.height], args.remainder)?;
        let pool = WorkerPool::start(&config, &partition, observer).map_err(Error::SpawnWorker)?;
        Ok(Self { pool })
    }

    /// Number of worker threads
    pub fn num_workers(&self) -> usize {
        self.pool.num_workers()
    }

    /// Poll the simulation without blocking, see [`WorkerPool::try_advance()`]
    pub fn try_advance(&mut self) -> Result<Option<u64>, Error> {
        self.pool.try_advance()
    }

    /// Stop and join the worker threads
    pub fn shutdown(self) {
        self.pool.shutdown()
    }
}
//
impl SimulateBase for Simulation {
    type CliArgs = ParallelArgs;

    type Error = Error;

    fn species(&mut self) -> &Species {
        self.pool.species()
    }

    fn frame(&self) -> &Frame {
        self.pool.frame()
    }

    fn generation(&self) -> u64 {
        self.pool.generation()
    }
}
//
impl SimulateCreate for Simulation {
    fn new(config: Config, args: ParallelArgs) -> Result<Self, Error> {
        Self::with_observer(config, args, None)
    }
}
//
impl Simulate for Simulation {
    fn perform_steps(&mut self, steps: usize) -> Result<(), Error> {
        for _ in 0..steps {
            self.pool.advance()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::RemainderPolicy;
    use compute::NoArgs;
    use data::parameters::Seed;
    use std::sync::{Mutex, Once};

    fn init_logger() {
        static INIT_LOGGER: Once = Once::new();
        INIT_LOGGER.call_once(|| env_logger::builder().is_test(true).init());
    }

    fn config() -> Config {
        Config {
            width: 38,
            height: 27,
            seed: Seed {
                x: 19,
                y: 13,
                half_width: 6,
            },
            commit_every: NonZeroUsize::MIN,
            ..Config::default()
        }
    }

    fn args(num_threads: usize, remainder: RemainderPolicy) -> ParallelArgs {
        ParallelArgs {
            num_threads: NonZeroUsize::new(num_threads),
            remainder,
        }
    }

    #[test]
    fn single_worker_is_deterministic() {
        init_logger();
        let run = || {
            let mut sim = Simulation::new(config(), args(1, RemainderPolicy::Static)).unwrap();
            assert_eq!(sim.num_workers(), 1);
            sim.perform_steps(30).unwrap();
            sim.species().clone()
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn full_coverage_matches_naive() {
        init_logger();
        for num_threads in [1, 2, 4, 7, 9] {
            let mut parallel =
                Simulation::new(config(), args(num_threads, RemainderPolicy::Absorb)).unwrap();
            let mut naive = compute_naive::Simulation::new(config(), NoArgs {}).unwrap();
            for _ in 0..10 {
                parallel.perform_steps(3).unwrap();
                naive.perform_steps(3).unwrap();
                assert_eq!(parallel.species(), naive.species(), "{num_threads} threads");
                assert_eq!(parallel.frame(), naive.frame(), "{num_threads} threads");
            }
        }
    }

    #[test]
    fn uncovered_cells_keep_seed_value() {
        init_logger();
        // 4 rows of tiles, 6 cells high, stop short of rows 24 and 25
        let config = Config {
            seed: Seed {
                x: 34,
                y: 22,
                half_width: 6,
            },
            ..config()
        };
        let partition =
            Partition::plan(8, [config.width, config.height], RemainderPolicy::Static).unwrap();
        let uncovered = partition.uncovered_cells();
        assert!(!uncovered.is_empty());

        let mut sim = Simulation::new(config, args(8, RemainderPolicy::Static)).unwrap();
        let seed = sim.species().clone();
        for _ in 0..5 {
            sim.perform_steps(1).unwrap();
            for &(x, y) in &uncovered {
                assert_eq!(sim.species().cell(x, y), seed.cell(x, y), "({x}, {y})");
            }
        }
        assert_ne!(sim.species(), &seed);
    }

    /// Records tile processing events in the order they occur
    #[derive(Default)]
    struct Recorder(Mutex<Vec<(bool, usize, u64)>>);
    //
    impl TileObserver for Recorder {
        fn tile_started(&self, worker: usize, generation: u64) {
            self.0.lock().unwrap().push((true, worker, generation));
        }

        fn tile_finished(&self, worker: usize, generation: u64) {
            self.0.lock().unwrap().push((false, worker, generation));
        }
    }

    #[test]
    fn generations_are_separated_by_barrier() {
        init_logger();
        let recorder = Arc::new(Recorder::default());
        let mut sim = Simulation::with_observer(
            config(),
            args(4, RemainderPolicy::Static),
            Some(recorder.clone() as Arc<dyn TileObserver>),
        )
        .unwrap();
        let num_workers = sim.num_workers();
        sim.perform_steps(20).unwrap();
        sim.shutdown();

        let events = recorder.0.lock().unwrap();
        assert_eq!(events.len(), 2 * 20 * num_workers);
        for (pos, &(started, _, generation)) in events.iter().enumerate() {
            if started {
                let previous_finishes = events[..pos]
                    .iter()
                    .filter(|&&(started, _, g)| !started && g == generation - 1)
                    .count();
                let expected = if generation == 1 { 0 } else { num_workers };
                assert_eq!(previous_finishes, expected, "start of generation {generation}");
            }
        }
        for worker in 0..num_workers {
            let generations = events
                .iter()
                .filter(|&&(started, w, _)| started && w == worker)
                .map(|&(_, _, generation)| generation)
                .collect::<Vec<_>>();
            assert_eq!(generations, (1..=20).collect::<Vec<_>>());
        }
    }

    #[test]
    fn polling_makes_progress() {
        init_logger();
        let mut sim = Simulation::new(config(), args(4, RemainderPolicy::Absorb)).unwrap();
        let mut last = 0;
        while last < 5 {
            if let Some(generation) = sim.try_advance().unwrap() {
                assert_eq!(generation, last + 1);
                last = generation;
            } else {
                thread::yield_now();
            }
        }
        assert_eq!(sim.generation(), 5);
        drop(sim);
    }

    #[test]
    fn invalid_configurations() {
        init_logger();
        let too_small = Config {
            height: 2,
            ..config()
        };
        assert!(matches!(
            Simulation::new(too_small, args(2, RemainderPolicy::Static)),
            Err(Error::Config(ConfigError::GridTooSmall { .. }))
        ));

        let off_grid = Config {
            seed: Seed {
                x: 38,
                y: 0,
                half_width: 1,
            },
            ..config()
        };
        assert!(matches!(
            Simulation::new(off_grid, args(2, RemainderPolicy::Static)),
            Err(Error::Config(ConfigError::SeedOutOfBounds { .. }))
        ));

        assert!(matches!(
            Simulation::new(config(), args(usize::MAX, RemainderPolicy::Static)),
            Err(Error::Config(ConfigError::TooManyWorkers { .. }))
        ));
    }

    #[test]
    fn frames_follow_commit_cadence() {
        init_logger();
        let config = Config {
            commit_every: NonZeroUsize::new(4).unwrap(),
            ..config()
        };
        let mut sim = Simulation::new(config, args(3, RemainderPolicy::Absorb)).unwrap();
        assert_eq!(sim.frame().generation(), 0);
        sim.perform_steps(3).unwrap();
        assert_eq!(sim.frame().generation(), 0);
        sim.perform_steps(1).unwrap();
        assert_eq!(sim.frame().generation(), 4);
        let expected = Frame::new(sim.species());
        assert_eq!(sim.frame().samples(), expected.samples());
    }
}
