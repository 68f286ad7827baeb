//! Common facilities shared by all compute backends

#[cfg(feature = "criterion")]
#[doc(hidden)]
pub mod benchmark;
pub mod reaction;
pub mod stencil;

use clap::Args;
use data::{
    concentration::Species,
    frame::{Frame, Sample},
    parameters::{stencil_offset, Config},
};
use log::debug;
use ndarray::ArrayView2;
use std::{error::Error, num::NonZeroUsize, ops::Range, time::Instant};

/// Commonalities between all ways to run a simulation
pub trait SimulateBase: Sized {
    /// Supplementary CLI arguments allowing fine-tuning of this backend
    ///
    /// To honor the principle of least surprise and make criterion
    /// microbenchmarks work smoothly, any argument you add must have a default
    /// value and should also be configurable through environment variables.
    type CliArgs: Args;

    /// Errors that can occur during initialization and execution
    type Error: Error + Send + Sync + 'static;

    /// Current concentrations of the chemical species
    ///
    /// Backends that compute in the background wait until no computation is
    /// touching the concentrations anymore, hence the `&mut self`.
    fn species(&mut self) -> &Species;

    /// Last frame that was committed for the output sink
    fn frame(&self) -> &Frame;

    /// Number of generations that were completed so far
    fn generation(&self) -> u64;
}

/// Simulation set-up
pub trait SimulateCreate: SimulateBase {
    /// Validate the configuration and set up the simulation
    ///
    /// No state is created (and no thread is started) if the configuration is
    /// invalid.
    fn new(config: Config, args: Self::CliArgs) -> Result<Self, Self::Error>;
}

/// Simulation execution
pub trait Simulate: SimulateBase {
    /// Perform `steps` generations
    ///
    /// Every `commit_every` generations, the output frame is refreshed.
    fn perform_steps(&mut self, steps: usize) -> Result<(), Self::Error>;
}

/// Simplified version of Simulate that simulates a single generation at a time
///
/// If you implement this, then a [`Simulate`] implementation that loops over
/// generations will be automatically provided.
pub trait SimulateStep: SimulateBase {
    /// Perform a single generation, including the buffer swap
    fn perform_step(&mut self) -> Result<(), Self::Error>;
}
//
impl<T: SimulateStep> Simulate for T {
    fn perform_steps(&mut self, steps: usize) -> Result<(), Self::Error> {
        for _ in 0..steps {
            self.perform_step()?;
        }
        Ok(())
    }
}

/// Placeholder for backends that have no CLI arguments
#[derive(Args, Copy, Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct NoArgs {}

/// Rectangular set of grid positions
///
/// `x` spans columns and `y` spans rows.
#[derive(Clone, Debug, Default, Eq, Hash, PartialEq)]
pub struct Region {
    /// Columns of the region
    pub x: Range<usize>,

    /// Rows of the region
    pub y: Range<usize>,
}
//
impl Region {
    /// Cells of a `[rows, cols]` grid that have a full stencil neighborhood
    pub fn interior([rows, cols]: [usize; 2]) -> Self {
        let [offset_y, offset_x] = stencil_offset();
        Self {
            x: offset_x..cols.saturating_sub(offset_x).max(offset_x),
            y: offset_y..rows.saturating_sub(offset_y).max(offset_y),
        }
    }

    /// Restrict this region to the interior of a `[rows, cols]` grid
    pub fn clamp_to_interior(&self, shape: [usize; 2]) -> Self {
        let interior = Self::interior(shape);
        let clamp = |range: &Range<usize>, within: &Range<usize>| {
            let start = range.start.clamp(within.start, within.end);
            let end = range.end.clamp(start, within.end);
            start..end
        };
        Self {
            x: clamp(&self.x, &interior.x),
            y: clamp(&self.y, &interior.y),
        }
    }

    /// Dimensions in `[rows, cols]` order
    pub fn shape(&self) -> [usize; 2] {
        [self.y.len(), self.x.len()]
    }

    /// Number of cells
    pub fn len(&self) -> usize {
        self.x.len() * self.y.len()
    }

    /// Truth that the region contains no cell
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Truth that a grid position belongs to the region
    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.x.contains(&x) && self.y.contains(&y)
    }
}

/// Generation counting and output frame publication
///
/// Every backend owns one of these, and reports each completed generation to
/// it after swapping the concentration buffers.
#[derive(Debug)]
pub struct Publisher {
    /// Number of completed generations
    generation: u64,

    /// Number of generations between two frame commits
    commit_every: NonZeroUsize,

    /// Last committed frame
    frame: Frame,

    /// Time of the last commit
    last_commit: Instant,
}
//
impl Publisher {
    /// Start from the seed, which is published as generation 0
    pub fn new(config: &Config, species: &Species) -> Self {
        Self {
            generation: 0,
            commit_every: config.commit_every,
            frame: Frame::new(species),
            last_commit: Instant::now(),
        }
    }

    /// Record that a generation was completed, and commit its samples if the
    /// cadence says so
    ///
    /// Returns the number of the generation that was just completed.
    pub fn generation_done(&mut self, samples: ArrayView2<'_, Sample>) -> u64 {
        self.generation += 1;
        if self.generation % self.commit_every.get() as u64 == 0 {
            self.frame.commit(samples, self.generation);
            let now = Instant::now();
            debug!(
                "Committed generation {} ({:.3} ms since last commit)",
                self.generation,
                (now - self.last_commit).as_secs_f64() * 1000.0
            );
            self.last_commit = now;
        }
        self.generation
    }

    /// Number of completed generations
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Last committed frame
    pub fn frame(&self) -> &Frame {
        &self.frame
    }
}

/// Macro that generates a complete criterion benchmark harness for you
#[macro_export]
#[cfg(feature = "criterion")]
macro_rules! criterion_benchmark {
    ($backend:ident) => {
        fn criterion_benchmark(c: &mut $crate::benchmark::criterion::Criterion) {
            $crate::benchmark::criterion_benchmark::<$backend::Simulation>(
                c,
                stringify!($backend),
            )
        }
        $crate::benchmark::criterion::criterion_group!(benches, criterion_benchmark);
        $crate::benchmark::criterion::criterion_main!(benches);
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use data::parameters::Seed;

    #[test]
    fn interior_region() {
        let interior = Region::interior([4, 6]);
        assert_eq!(interior.x, 1..5);
        assert_eq!(interior.y, 1..3);
        assert_eq!(interior.shape(), [2, 4]);
        assert_eq!(interior.len(), 8);
        assert!(interior.contains(1, 1) && interior.contains(4, 2));
        assert!(!interior.contains(0, 1) && !interior.contains(5, 1) && !interior.contains(1, 3));
    }

    #[test]
    fn degenerate_interior_is_empty() {
        assert!(Region::interior([2, 2]).is_empty());
        assert!(Region::interior([0, 0]).is_empty());
    }

    #[test]
    fn clamping_to_interior() {
        let region = Region { x: 0..4, y: 2..10 };
        let clamped = region.clamp_to_interior([6, 8]);
        assert_eq!(clamped, Region { x: 1..4, y: 2..5 });

        let outside = Region { x: 7..9, y: 0..1 };
        assert!(outside.clamp_to_interior([6, 8]).is_empty());
    }

    #[test]
    fn commit_cadence() {
        let config = Config {
            width: 4,
            height: 4,
            seed: Seed {
                x: 2,
                y: 2,
                half_width: 1,
            },
            commit_every: NonZeroUsize::new(3).unwrap(),
            ..Config::default()
        };
        let species = Species::new(&config);
        let mut publisher = Publisher::new(&config, &species);
        let seed_frame = publisher.frame().clone();
        assert_eq!(seed_frame.generation(), 0);

        let samples = ndarray::Array2::from_elem((4, 4), 7);
        for expected in 1..=2 {
            assert_eq!(publisher.generation_done(samples.view()), expected);
            assert_eq!(publisher.frame(), &seed_frame);
        }
        assert_eq!(publisher.generation_done(samples.view()), 3);
        assert_eq!(publisher.frame().generation(), 3);
        assert_eq!(publisher.frame().samples(), samples);
        assert_eq!(publisher.generation(), 3);
    }
}
