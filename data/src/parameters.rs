//! Computation parameters and run configuration

use crate::Precision;
use std::num::NonZeroUsize;
use thiserror::Error;

/// Reaction-diffusion constants
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Parameters {
    /// Diffusion rate of species A
    pub diffusion_rate_a: Precision,

    /// Diffusion rate of species B
    pub diffusion_rate_b: Precision,

    /// Rate at which species A is replenished
    pub feed_rate: Precision,

    /// Rate at which species B is removed
    pub kill_rate: Precision,
}
//
impl Default for Parameters {
    fn default() -> Self {
        Self {
            diffusion_rate_a: 1.0,
            diffusion_rate_b: 0.5,
            feed_rate: 0.055,
            kill_rate: 0.062,
        }
    }
}
//
impl Parameters {
    /// Check that every rate is a finite, non-negative number
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("diffusion rate of A", self.diffusion_rate_a),
            ("diffusion rate of B", self.diffusion_rate_b),
            ("feed rate", self.feed_rate),
            ("kill rate", self.kill_rate),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidRate { name, value });
            }
        }
        Ok(())
    }
}

/// Computation stencil
pub type Stencil = [[Precision; 3]; 3];

/// Weights of the 9-points discrete Laplacian
///
/// Axial neighbors weigh 0.2, diagonal neighbors 0.05 and the center -1. The
/// weights sum to zero, so a uniform field has a null Laplacian.
pub const STENCIL: Stencil = [[0.05, 0.2, 0.05], [0.2, -1.0, 0.2], [0.05, 0.2, 0.05]];

/// Shape of the stencil
pub const STENCIL_SHAPE: [usize; 2] = [STENCIL.len(), STENCIL[0].len()];

/// Offset from the top-left corner of the stencil to its center
pub const fn stencil_offset() -> [usize; 2] {
    [STENCIL_SHAPE[0] / 2, STENCIL_SHAPE[1] / 2]
}

/// Initial perturbation: a square where B is seeded to 1 and A to 0
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct Seed {
    /// Horizontal coordinate of the square's center
    pub x: usize,

    /// Vertical coordinate of the square's center
    pub y: usize,

    /// Half-width of the square
    ///
    /// The square spans `[x - half_width, x + half_width)` horizontally and
    /// likewise vertically, clipped to the grid.
    pub half_width: usize,
}

/// Everything needed to set up a simulation run
///
/// Consumed once at startup and never mutated afterwards.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Config {
    /// Number of grid columns
    pub width: usize,

    /// Number of grid rows
    pub height: usize,

    /// Initial perturbation region
    pub seed: Seed,

    /// Reaction-diffusion constants
    pub params: Parameters,

    /// Number of generations between two publications of the output frame
    pub commit_every: NonZeroUsize,

    /// Truth that detailed diagnostics were requested
    pub verbose: bool,
}
//
impl Default for Config {
    fn default() -> Self {
        let (width, height) = (1920, 1080);
        Self {
            width,
            height,
            seed: Seed {
                x: width / 2,
                y: height / 2,
                half_width: 25,
            },
            params: Parameters::default(),
            commit_every: NonZeroUsize::MIN.saturating_add(1),
            verbose: false,
        }
    }
}
//
impl Config {
    /// Shape of the concentration matrices, in `[rows, cols]` order
    pub fn shape(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    /// Check the configuration before anything gets allocated
    pub fn validate(&self) -> Result<(), ConfigError> {
        // The stencil needs a full neighborhood, so there must be at least
        // one cell that is not on the border
        let min_len = 2 * stencil_offset()[0] + 1;
        if self.width < min_len || self.height < min_len {
            return Err(ConfigError::GridTooSmall {
                width: self.width,
                height: self.height,
            });
        }

        if self.seed.x >= self.width || self.seed.y >= self.height {
            return Err(ConfigError::SeedOutOfBounds {
                x: self.seed.x,
                y: self.seed.y,
                width: self.width,
                height: self.height,
            });
        }

        self.params.validate()
    }
}

/// Things that can be wrong with a simulation configuration
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ConfigError {
    /// Grid is too small to have any interior cell
    #[error("a {width}x{height} grid has no interior cell, both dimensions must be at least 3")]
    GridTooSmall { width: usize, height: usize },

    /// Perturbation center lies outside of the grid
    #[error("seed center ({x}, {y}) lies outside of the {width}x{height} grid")]
    SeedOutOfBounds {
        x: usize,
        y: usize,
        width: usize,
        height: usize,
    },

    /// A reaction-diffusion rate is negative or not a number
    #[error("{name} must be a finite non-negative number, got {value}")]
    InvalidRate {
        name: &'static str,
        value: Precision,
    },

    /// Asked for zero workers
    #[error("at least one worker thread is needed")]
    NoWorkers,

    /// Asked for more workers than there are grid cells
    #[error("{workers} worker threads requested, but the grid only has {cells} cells")]
    TooManyWorkers { workers: usize, cells: usize },
}
