//! Grayscale rendition of the simulation, as handed to the output sink

use crate::{concentration::Species, Precision};
use ndarray::{Array2, ArrayView2, Zip};

/// Brightness of one pixel
pub type Sample = u8;

/// Derive the brightness of a pixel from the concentrations at that point
///
/// Computes `floor((a - b) * 255)`, saturated to the `[0, 255]` range.
#[inline]
pub fn grayscale(a: Precision, b: Precision) -> Sample {
    ((a - b) * 255.0).floor().clamp(0.0, 255.0) as Sample
}

/// Grayscale samples of a committed generation
///
/// The samples are stored in `[rows, cols]` order, like the concentrations.
#[derive(Clone, Debug, PartialEq)]
pub struct Frame {
    /// Brightness of each grid point
    samples: Array2<Sample>,

    /// Generation at which the samples were committed
    generation: u64,
}
//
impl Frame {
    /// Render the current concentrations of the species
    pub fn new(species: &Species) -> Self {
        let samples = Zip::from(species.a.input())
            .and(species.b.input())
            .map_collect(|&a, &b| grayscale(a, b));
        Self {
            samples,
            generation: 0,
        }
    }

    /// Replace the samples wholesale with those of a newer generation
    pub fn commit(&mut self, samples: ArrayView2<'_, Sample>, generation: u64) {
        self.samples.assign(&samples);
        self.generation = generation;
    }

    /// Access the samples
    pub fn samples(&self) -> ArrayView2<'_, Sample> {
        self.samples.view()
    }

    /// Generation at which the samples were committed, 0 being the seed
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of pixel columns
    pub fn width(&self) -> usize {
        self.samples.ncols()
    }

    /// Number of pixel rows
    pub fn height(&self) -> usize {
        self.samples.nrows()
    }

    /// Expand into opaque RGBA pixels, with the sample in every color channel
    pub fn to_rgba(&self) -> Vec<u8> {
        self.samples
            .iter()
            .flat_map(|&sample| [sample, sample, sample, u8::MAX])
            .collect()
    }
}
