//! Discrete Laplacian of a concentration field

use data::{
    parameters::{stencil_offset, STENCIL},
    Precision,
};
use ndarray::ArrayView2;

/// Weighted 9-points discrete Laplacian of `field` at grid position `(x, y)`
///
/// Only interior positions (`1 <= x <= width - 2`, `1 <= y <= height - 2`)
/// have the full neighborhood that this needs. Callers must not ask for
/// anything else.
///
/// The weights are applied to differences from the center value. Since the
/// weights sum to zero, this is the same as applying them to the raw values,
/// but a uniform field then yields exactly zero instead of rounding noise.
#[inline]
pub fn laplacian(field: ArrayView2<'_, Precision>, x: usize, y: usize) -> Precision {
    let [offset_y, offset_x] = stencil_offset();
    debug_assert!(
        x >= offset_x && x + offset_x < field.ncols(),
        "column {x} is not in the interior"
    );
    debug_assert!(
        y >= offset_y && y + offset_y < field.nrows(),
        "row {y} is not in the interior"
    );

    let center = field[[y, x]];
    STENCIL
        .iter()
        .enumerate()
        .flat_map(|(dy, row)| row.iter().enumerate().map(move |(dx, &w)| (dy, dx, w)))
        .fold(0.0, |acc, (dy, dx, weight)| {
            let neighbor = field[[y + dy - offset_y, x + dx - offset_x]];
            acc + weight * (neighbor - center)
        })
}
