//! Capability contract every packing strategy implements.

use crate::{
    PackingError, RegionWisePacking, StreamLayout, TileArrangement, TileDef,
    TilesMergeDirectionInCol,
};

/// Inputs handed to a strategy once, before any tile-set is packed.
#[derive(Debug, Clone, Copy)]
pub struct PackingContext<'a> {
    /// Video streams ranked by bitrate, highest first.
    pub streams: &'a [StreamLayout],
    /// Tile count selected for the initial viewport.
    pub selected_count: usize,
    /// Largest tile count of any tile-set that will be packed.
    pub max_selected_count: usize,
}

/// Trait for region-wise packing strategies.
///
/// A strategy decides where each selected tile lands in the merged picture.
/// Every `generate_*` call takes the tile-set being packed. Tile `idx` values
/// are tile indices in the highest resolution stream. Tiles are listed row by
/// row, as the geometry library enumerates them.
///
/// # Example
///
/// ```ignore
/// use omaf_packing::{PackingContext, StrategyRegistry};
///
/// let mut strategy = StrategyRegistry::with_builtin().create("HighResPlusFullLowResPacking")?;
/// strategy.initialize(&PackingContext { streams: &layouts, selected_count: 4, max_selected_count: 8 })?;
///
/// let rwpk = strategy.generate_dst_rwpk(&tiles)?;
/// assert_eq!(rwpk.packed_pic_width, strategy.packed_pic_width());
/// ```
pub trait PackingStrategy: Send {
    /// Registered name of this strategy.
    fn name(&self) -> &'static str;

    /// Prepare the strategy for the given streams.
    ///
    /// Also computes the merged tile arrangement for the initial selection so
    /// [`merged_tiles_arrange`](Self::merged_tiles_arrange) is usable right away.
    fn initialize(&mut self, ctx: &PackingContext<'_>) -> Result<(), PackingError>;

    /// Region-wise packing of the merged picture for one tile-set.
    ///
    /// Records the packed picture size as a side effect.
    fn generate_dst_rwpk(&mut self, tiles: &[TileDef]) -> Result<RegionWisePacking, PackingError>;

    /// Column-major placement of every tile of the merged picture.
    fn generate_tiles_merge_direction(
        &mut self,
        tiles: &[TileDef],
    ) -> Result<TilesMergeDirectionInCol, PackingError>;

    /// Tile grid of the merged picture, for PPS generation.
    fn generate_merged_tiles_arrange(
        &mut self,
        tiles: &[TileDef],
    ) -> Result<TileArrangement, PackingError>;

    /// Width of the last packed picture.
    fn packed_pic_width(&self) -> u32;

    /// Height of the last packed picture.
    fn packed_pic_height(&self) -> u32;

    /// Tile arrangement of the last packed picture, if any was computed.
    fn merged_tiles_arrange(&self) -> Option<&TileArrangement>;
}
