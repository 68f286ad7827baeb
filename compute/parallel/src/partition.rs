//! Static assignment of grid tiles to worker threads

use clap::ValueEnum;
use compute::Region;
use data::parameters::ConfigError;
use log::{debug, info};

/// What to do with the interior cells that integer division leaves out
///
/// Tile sizes are rounded down, so when the grid dimensions are not multiples
/// of the tile layout, a strip of interior cells on the right and bottom edges
/// may belong to no tile.
#[derive(Copy, Clone, Debug, Default, Eq, Hash, PartialEq, ValueEnum)]
pub enum RemainderPolicy {
    /// Leave those cells alone, they keep their seed value forever
    #[default]
    Static,

    /// Grow the last column and row of tiles up to the edge of the interior
    Absorb,
}

/// Rectangle of interior cells permanently bound to one worker
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Tile {
    /// Index of the worker that processes this tile
    pub index: usize,

    /// Cells that the worker recomputes
    pub region: Region,
}

/// Near-square tiling of the grid interior
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Partition {
    /// Grid dimensions in `[width, height]` order
    grid: [usize; 2],

    /// Number of tiles along the x and y axes
    layout: [usize; 2],

    /// Nominal tile dimensions in `[width, height]` order
    tile_size: [usize; 2],

    /// Tiles, sorted by worker index
    tiles: Vec<Tile>,
}
//
impl Partition {
    /// Split a `width x height` grid between `cores` workers
    ///
    /// There are `floor(sqrt(cores))` tiles along the x axis and
    /// `floor(cores / floor(sqrt(cores)))` along the y axis, which may add up
    /// to fewer tiles than `cores`. Tile `(i, j)` spans columns
    /// `[i * tile_width, (i + 1) * tile_width)` and rows
    /// `[j * tile_height, (j + 1) * tile_height)` of the interior, and is
    /// processed by worker `i * y_tiles + j`.
    ///
    /// Asking for more workers than there are grid cells is an error, since
    /// most of them would have nothing to do.
    pub fn plan(
        cores: usize,
        [width, height]: [usize; 2],
        remainder: RemainderPolicy,
    ) -> Result<Self, ConfigError> {
        if cores == 0 {
            return Err(ConfigError::NoWorkers);
        }
        let cells = width.saturating_mul(height);
        if cores > cells {
            return Err(ConfigError::TooManyWorkers {
                workers: cores,
                cells,
            });
        }
        let x_tiles = integer_sqrt(cores);
        let y_tiles = cores / x_tiles;
        let tile_size = [width / x_tiles, height / y_tiles];
        info!(
            "Splitting the {width}x{height} grid between {cores} cores: \
            {x_tiles}x{y_tiles} tiles of {}x{} cells",
            tile_size[0], tile_size[1]
        );

        let shape = [height, width];
        let span = |pos: usize, count: usize, size: usize, len: usize| {
            let start = pos * size;
            let end = if remainder == RemainderPolicy::Absorb && pos == count - 1 {
                len
            } else {
                start + size
            };
            start..end
        };
        let tiles = (0..x_tiles)
            .flat_map(|i| (0..y_tiles).map(move |j| (i, j)))
            .map(|(i, j)| {
                let index = i * y_tiles + j;
                let region = Region {
                    x: span(i, x_tiles, tile_size[0], width),
                    y: span(j, y_tiles, tile_size[1], height),
                }
                .clamp_to_interior(shape);
                debug!(
                    "Tile #{index}: x in {:?}, y in {:?}",
                    region.x, region.y
                );
                Tile { index, region }
            })
            .collect::<Vec<_>>();
        debug_assert!(tiles.iter().enumerate().all(|(idx, tile)| idx == tile.index));

        Ok(Self {
            grid: [width, height],
            layout: [x_tiles, y_tiles],
            tile_size,
            tiles,
        })
    }

    /// Tiles, indexed by worker
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Number of tiles (and thus of workers)
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    /// Truth that there is no tile, which never happens
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Number of tiles along the x and y axes
    pub fn layout(&self) -> [usize; 2] {
        self.layout
    }

    /// Nominal tile dimensions in `[width, height]` order
    pub fn tile_size(&self) -> [usize; 2] {
        self.tile_size
    }

    /// Interior cells that no tile covers, as `(x, y)` positions
    pub fn uncovered_cells(&self) -> Vec<(usize, usize)> {
        let [width, height] = self.grid;
        let interior = Region::interior([height, width]);
        interior
            .y
            .clone()
            .flat_map(|y| interior.x.clone().map(move |x| (x, y)))
            .filter(|&(x, y)| !self.tiles.iter().any(|tile| tile.region.contains(x, y)))
            .collect()
    }
}

/// Largest integer whose square does not exceed `n`
fn integer_sqrt(n: usize) -> usize {
    let square_exceeds_n = |root: usize| root.checked_mul(root).map_or(true, |square| square > n);
    let mut root = (n as f64).sqrt() as usize;
    while square_exceeds_n(root) {
        root -= 1;
    }
    while !square_exceeds_n(root + 1) {
        root += 1;
    }
    root
}
