//! The 16³ tiled voxel layout used by volume primitives.
//!
//! A volume of resolution `(rx, ry, rz)` is cut into tiles of edge
//! [`TILE_SIZE`]; tiles on the upper boundary of an axis hold only what is
//! left of it. Tiles are stored z slowest, then y, then x, and the voxels of
//! each tile are stored x fastest.

use std::borrow::Cow;

use crate::error::{Result, SchemaError};

/// Edge length of a full tile.
pub const TILE_SIZE: usize = 16;

/// One tile of a [`TileGrid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tile {
    /// Position in storage order.
    pub index: usize,
    /// First voxel covered by the tile.
    pub origin: [usize; 3],
    /// Voxels covered along each axis, at most [`TILE_SIZE`].
    pub extent: [usize; 3],
}

impl Tile {
    /// Voxels held by the tile.
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.extent.iter().product()
    }
}

/// Payload of one stored tile.
#[derive(Debug, Clone, PartialEq)]
pub enum TileData<'a> {
    /// Every voxel, x fastest. Both `raw` and `rawfull` tiles decode to this.
    Dense(Cow<'a, [f32]>),
    /// One value for the whole tile.
    Constant(f32),
    /// A tile without data; its voxels stay zero.
    Empty,
}

/// The tile partition of a voxel resolution.
///
/// ```
/// use houio::voxel::TileGrid;
///
/// let grid = TileGrid::new([20, 20, 20]);
/// assert_eq!(grid.tile_count(), Some(8));
/// let last = grid.tiles().last().unwrap();
/// assert_eq!(last.origin, [16, 16, 16]);
/// assert_eq!(last.extent, [4, 4, 4]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    resolution: [usize; 3],
}

impl TileGrid {
    /// The grid for a volume of the given resolution.
    #[must_use]
    pub fn new(resolution: [usize; 3]) -> Self {
        Self { resolution }
    }

    /// The volume resolution.
    #[must_use]
    pub fn resolution(&self) -> [usize; 3] {
        self.resolution
    }

    /// Tiles along each axis.
    #[must_use]
    pub fn tiles_per_axis(&self) -> [usize; 3] {
        self.resolution.map(|r| r.div_ceil(TILE_SIZE))
    }

    /// Total number of tiles, or `None` if it overflows.
    #[must_use]
    pub fn tile_count(&self) -> Option<usize> {
        self.tiles_per_axis()
            .iter()
            .try_fold(1_usize, |acc, &n| acc.checked_mul(n))
    }

    /// Total number of voxels, or `None` if it overflows.
    #[must_use]
    pub fn voxel_count(&self) -> Option<usize> {
        self.resolution
            .iter()
            .try_fold(1_usize, |acc, &r| acc.checked_mul(r))
    }

    /// Every tile in storage order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + use<> {
        let [tx, ty, tz] = self.tiles_per_axis();
        let resolution = self.resolution;
        (0..tz)
            .flat_map(move |k| (0..ty).flat_map(move |j| (0..tx).map(move |i| [i, j, k])))
            .enumerate()
            .map(move |(index, tile)| {
                let origin = tile.map(|t| t * TILE_SIZE);
                let extent = [0, 1, 2].map(|axis| (resolution[axis] - origin[axis]).min(TILE_SIZE));
                Tile { index, origin, extent }
            })
    }

    /// Calls `f(tile_offset, voxel_offset)` for every voxel of `tile`, in the
    /// tile's storage order.
    fn for_each_voxel(&self, tile: &Tile, mut f: impl FnMut(usize, usize)) {
        let [rx, ry, _] = self.resolution;
        let [nx, ny, nz] = tile.extent;
        let [ox, oy, oz] = tile.origin;
        let mut local = 0;
        for k in 0..nz {
            for j in 0..ny {
                let row = (oz + k) * rx * ry + (oy + j) * rx + ox;
                for i in 0..nx {
                    f(local, row + i);
                    local += 1;
                }
            }
        }
    }

    /// Assemble the dense voxel buffer from per-tile payloads.
    ///
    /// The tile count and every dense tile's length are checked before any
    /// voxel is written.
    pub fn decode(&self, tiles: &[TileData<'_>]) -> Result<Vec<f32>> {
        let expected = self.tile_count();
        if expected != Some(tiles.len()) {
            return Err(SchemaError::TileCount {
                resolution: self.resolution,
                expected: expected.unwrap_or(usize::MAX),
                found: tiles.len(),
            }
            .into());
        }
        for (tile, data) in self.tiles().zip(tiles) {
            if let TileData::Dense(values) = data {
                if values.len() != tile.voxel_count() {
                    return Err(SchemaError::TileLength {
                        tile: tile.index,
                        expected: tile.voxel_count(),
                        found: values.len(),
                    }
                    .into());
                }
            }
        }
        let total = self.voxel_count().ok_or(SchemaError::VoxelCount {
            expected: usize::MAX,
            found: 0,
        })?;
        let mut voxels = vec![0.0; total];
        for (tile, data) in self.tiles().zip(tiles) {
            match data {
                TileData::Dense(values) => {
                    self.for_each_voxel(&tile, |local, global| voxels[global] = values[local]);
                }
                TileData::Constant(value) => {
                    self.for_each_voxel(&tile, |_, global| voxels[global] = *value);
                }
                TileData::Empty => {}
            }
        }
        Ok(voxels)
    }

    /// Split a dense voxel buffer into per-tile dense payloads.
    pub fn encode(&self, voxels: &[f32]) -> Result<Vec<Vec<f32>>> {
        match self.voxel_count() {
            Some(n) if n == voxels.len() => {}
            expected => {
                return Err(SchemaError::VoxelCount {
                    expected: expected.unwrap_or(usize::MAX),
                    found: voxels.len(),
                }
                .into());
            }
        }
        Ok(self
            .tiles()
            .map(|tile| {
                let mut values = vec![0.0; tile.voxel_count()];
                self.for_each_voxel(&tile, |local, global| values[local] = voxels[global]);
                values
            })
            .collect())
    }
}
