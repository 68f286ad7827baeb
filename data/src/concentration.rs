//! Concentration of chemical species

use crate::{array2, parameters::Config, Precision};
use ndarray::{s, Array2, ArrayView2};

/// Concentrations of species A and B at one point of the grid
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Cell {
    /// Concentration of species A
    pub a: Precision,

    /// Concentration of species B
    pub b: Precision,
}

/// Concentration of all species involved
#[derive(Clone, Debug, PartialEq)]
pub struct Species {
    /// Concentration of species A
    pub a: Evolving,

    /// Concentration of species B
    pub b: Evolving,
}
//
impl Species {
    /// Set up species concentration storage according to a configuration
    ///
    /// A is 1 and B is 0 everywhere, except for the seed square where it is
    /// the other way around. Both the input and output buffers are seeded, so
    /// that cells which are never recomputed keep their seed value no matter
    /// which buffer is current.
    pub fn new(config: &Config) -> Self {
        let shape = config.shape();
        let seeded = |outside: Precision, inside: Precision| {
            let mut values = Array2::from_elem(shape, outside);
            let seed = &config.seed;
            let center = [seed.y, seed.x];
            let [rows, cols] = array2(|i| {
                let start = center[i].saturating_sub(seed.half_width).min(shape[i]);
                let end = center[i].saturating_add(seed.half_width).min(shape[i]);
                start..end
            });
            values.slice_mut(s![rows, cols]).fill(inside);
            Evolving([values.clone(), values])
        };
        Self {
            a: seeded(1.0, 0.0),
            b: seeded(0.0, 1.0),
        }
    }

    /// Check out the shape of the concentration matrices, in `[rows, cols]` order
    pub fn shape(&self) -> [usize; 2] {
        self.a.shape()
    }

    /// Read the current concentrations at some grid position
    pub fn cell(&self, x: usize, y: usize) -> Cell {
        Cell {
            a: self.a.input()[[y, x]],
            b: self.b.input()[[y, x]],
        }
    }

    /// Make the output concentrations become the input ones
    pub fn flip(&mut self) {
        self.a.flip();
        self.b.flip();
    }
}

/// Pair of concentration matrices where one acts as an input and the other as
/// an output
#[derive(Clone, Debug, PartialEq)]
pub struct Evolving([Array2<Precision>; 2]);
//
impl Evolving {
    /// Access the input concentration
    pub fn input(&self) -> ArrayView2<'_, Precision> {
        self.0[0].view()
    }

    /// Access the input and output concentration
    pub fn in_out(&mut self) -> (&Array2<Precision>, &mut Array2<Precision>) {
        let [input, output] = &mut self.0;
        (input, output)
    }

    /// Check the shape of the concentration matrices
    fn shape(&self) -> [usize; 2] {
        let [rows, cols] = self.0[0].shape() else {
            unreachable!("concentration matrices are 2D")
        };
        [*rows, *cols]
    }

    /// Make the output concentration become the input one
    fn flip(&mut self) {
        let [input, output] = &mut self.0;
        std::mem::swap(input, output);
    }
}
