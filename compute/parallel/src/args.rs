//! CLI arguments

use crate::partition::RemainderPolicy;
use clap::Args;
use std::num::NonZeroUsize;

/// CLI parameters for the multithreaded implementation
#[derive(Args, Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub struct ParallelArgs {
    /// Number of processing threads
    ///
    /// The grid is cut into a near-square layout of tiles, which may use a few
    /// threads less than this. By default, all available hardware threads are
    /// used.
    #[arg(short = 'j', long, env)]
    pub num_threads: Option<NonZeroUsize>,

    /// Handling of the interior cells that the tile layout leaves out
    ///
    /// When the grid dimensions are not multiples of the tile layout, the
    /// rightmost columns and bottom rows of the interior may not belong to any
    /// tile. They can either be left static, or be handed over to the last
    /// tiles of each row and column.
    #[arg(long, env, value_enum, default_value_t = RemainderPolicy::Static)]
    pub remainder: RemainderPolicy,
}
