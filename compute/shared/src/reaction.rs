//! Gray-Scott update rule

use crate::{stencil::laplacian, Region};
use data::{
    concentration::Cell,
    frame::{grayscale, Sample},
    parameters::Parameters,
    Precision,
};
use ndarray::{ArrayView2, ArrayViewMut2};

/// Compute the next concentrations at interior grid position `(x, y)`
///
/// Results are clamped to `[0, 1]`, which keeps the explicit integration
/// scheme from blowing up. Out-of-range values are silently absorbed.
#[inline]
pub fn react(
    params: &Parameters,
    [in_a, in_b]: [ArrayView2<'_, Precision>; 2],
    x: usize,
    y: usize,
) -> Cell {
    let a = in_a[[y, x]];
    let b = in_b[[y, x]];
    let abb = a * b * b;
    let next_a = a + params.diffusion_rate_a * laplacian(in_a, x, y) - abb
        + params.feed_rate * (1.0 - a);
    let next_b = b + params.diffusion_rate_b * laplacian(in_b, x, y) + abb
        - (params.kill_rate + params.feed_rate) * b;
    Cell {
        a: next_a.clamp(0.0, 1.0),
        b: next_b.clamp(0.0, 1.0),
    }
}

/// Perform one generation over a region of the grid
///
/// - `in_a_b` are the full input concentration matrices.
/// - `out_a_b` and `out_samples` cover exactly `region` of the output
///   concentration matrices and of the output frame.
///
/// The grayscale sample of each cell is derived as soon as its concentrations
/// are known, which saves a second traversal of the grid.
pub fn step_region(
    params: &Parameters,
    in_a_b: [ArrayView2<'_, Precision>; 2],
    region: &Region,
    [out_a, out_b]: [ArrayViewMut2<'_, Precision>; 2],
    out_samples: ArrayViewMut2<'_, Sample>,
) {
    debug_assert_eq!(out_a.shape(), &region.shape()[..]);
    debug_assert_eq!(out_b.shape(), &region.shape()[..]);
    debug_assert_eq!(out_samples.shape(), &region.shape()[..]);

    ndarray::azip!((index (row, col), out_a in out_a, out_b in out_b, sample in out_samples) {
        let (x, y) = (region.x.start + col, region.y.start + row);
        let Cell { a, b } = react(params, in_a_b, x, y);
        *out_a = a;
        *out_b = b;
        *sample = grayscale(a, b);
    });
}
