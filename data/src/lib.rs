//! Data format used by the Gray-Scott reaction simulation

pub mod concentration;
pub mod frame;
pub mod parameters;

/// Computation precision
pub type Precision = f64;

/// Build a 2D array (typically a `[rows, cols]` or `[x, y]` pair) by
/// evaluating a function once per axis
pub fn array2<T>(f: impl FnMut(usize) -> T) -> [T; 2] {
    std::array::from_fn(f)
}
