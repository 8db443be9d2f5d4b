//! High-resolution viewport tiles plus the full low-resolution picture.
//!
//! The selected high-resolution tiles are packed into a near-square block on
//! the left. Every low-resolution tile is packed in columns to its right, so the
//! client can always fall back to the low-resolution content when the viewport
//! moves faster than the next segment. The low-resolution block has the same
//! height as the high-resolution block. Its last column is completed with
//! duplicate tiles when needed.
//!
//! ```text
//! +-----+-----+-----+----+
//! | H0  | H2  | H4  | L0 |
//! +-----+-----+-----+----+
//! | H1  | H3  | H5  | L1 |
//! +-----+-----+-----+----+
//! ```

use tracing::debug;

use super::{check_selection, hi_region_count, near_square_grid, row_major_pick, tile_size};
use crate::{
    PackingContext, PackingError, PackingStrategy, RectRegionPacking, RegionWisePacking,
    SingleTile, StreamLayout, TileArrangement, TileDef, TilesMergeDirectionInCol, CTU_SIZE,
};

/// Layout of one merged picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MergedLayout {
    hr_tiles_in_col: usize,
    hr_tiles_in_row: usize,
    lr_tiles_in_col: usize,
    lr_tiles_in_row: usize,
    /// Duplicate low-resolution tiles completing the last column.
    supplementary: usize,
    packed_width: u32,
    packed_height: u32,
}

/// Packs high-resolution viewport tiles next to the whole low-resolution picture.
#[derive(Debug, Default)]
pub struct HighResPlusFullLowResPacking {
    high: Option<StreamLayout>,
    low: Option<StreamLayout>,
    high_tile: (u32, u32),
    low_tile: (u32, u32),
    max_selected: usize,
    packed_width: u32,
    packed_height: u32,
    merged_arrange: Option<TileArrangement>,
}

impl HighResPlusFullLowResPacking {
    /// Registered strategy name.
    pub const NAME: &'static str = "HighResPlusFullLowResPacking";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn streams(&self) -> Result<(&StreamLayout, &StreamLayout), PackingError> {
        match (&self.high, &self.low) {
            (Some(high), Some(low)) => Ok((high, low)),
            _ => Err(PackingError::null_pointer("initialized packing strategy")),
        }
    }

    fn layout(&self, tile_count: usize) -> Result<MergedLayout, PackingError> {
        let (_, low) = self.streams()?;
        let (high_w, high_h) = self.high_tile;
        let (low_w, low_h) = self.low_tile;

        let (hr_tiles_in_col, hr_tiles_in_row) = near_square_grid(tile_count);
        let packed_height = high_h * hr_tiles_in_col as u32;
        if packed_height % low_h != 0 {
            return Err(PackingError::invalid_data(format!(
                "packed height {} is not a multiple of the low resolution tile height {}",
                packed_height, low_h
            )));
        }

        let lr_tiles_in_col = (packed_height / low_h) as usize;
        let low_num = low.tile_count();
        if low_num == 0 {
            return Err(PackingError::invalid_data(format!(
                "low resolution stream {} has no tiles",
                low.stream_idx_in_media
            )));
        }
        let (lr_tiles_in_row, supplementary) = if lr_tiles_in_col <= low_num {
            match low_num % lr_tiles_in_col {
                0 => (low_num / lr_tiles_in_col, 0),
                rem => (low_num / lr_tiles_in_col + 1, lr_tiles_in_col - rem),
            }
        } else {
            (1, lr_tiles_in_col - low_num)
        };

        let packed_width =
            high_w * hr_tiles_in_row as u32 + low_w * lr_tiles_in_row as u32;

        Ok(MergedLayout {
            hr_tiles_in_col,
            hr_tiles_in_row,
            lr_tiles_in_col,
            lr_tiles_in_row,
            supplementary,
            packed_width,
            packed_height,
        })
    }

    fn arrange(&self, layout: &MergedLayout) -> TileArrangement {
        let (high_w, _) = self.high_tile;
        let (low_w, _) = self.low_tile;
        let mut tile_col_widths = vec![high_w / CTU_SIZE; layout.hr_tiles_in_row];
        tile_col_widths.extend(std::iter::repeat(low_w / CTU_SIZE).take(layout.lr_tiles_in_row));
        TileArrangement {
            tile_row_heights: vec![layout.packed_height],
            tile_col_widths,
        }
    }
}

impl PackingStrategy for HighResPlusFullLowResPacking {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, ctx: &PackingContext<'_>) -> Result<(), PackingError> {
        let [high, low] = ctx.streams else {
            return Err(PackingError::VideoNumMismatch {
                declared: 2,
                actual: ctx.streams.len() as u8,
            });
        };
        if ctx.selected_count == 0 || ctx.selected_count > ctx.max_selected_count {
            return Err(PackingError::incorrect_selection(format!(
                "initial selection of {} tiles with a maximum of {}",
                ctx.selected_count, ctx.max_selected_count
            )));
        }

        self.high_tile = tile_size(high)?;
        self.low_tile = tile_size(low)?;
        self.high = Some(high.clone());
        self.low = Some(low.clone());
        self.max_selected = ctx.max_selected_count;

        let layout = self.layout(ctx.selected_count)?;
        self.merged_arrange = Some(self.arrange(&layout));
        debug!(
            high = ?self.high_tile,
            low = ?self.low_tile,
            max_selected = self.max_selected,
            "two resolution packing initialized"
        );
        Ok(())
    }

    fn generate_dst_rwpk(&mut self, tiles: &[TileDef]) -> Result<RegionWisePacking, PackingError> {
        check_selection(tiles, self.max_selected)?;
        let layout = self.layout(tiles.len())?;
        let (high, low) = self.streams()?;
        let (high_w, high_h) = self.high_tile;
        let (low_w, low_h) = self.low_tile;
        let low_num = low.tile_count();

        let mut regions = Vec::with_capacity(
            tiles.len() + layout.lr_tiles_in_col * layout.lr_tiles_in_row,
        );

        for pos in 0..tiles.len() {
            let tile = &tiles[row_major_pick(pos, layout.hr_tiles_in_col, layout.hr_tiles_in_row)];
            let src = high
                .src_rwpk
                .regions
                .get(usize::from(tile.idx))
                .ok_or_else(|| {
                    PackingError::invalid_data(format!("tile {} outside the source picture", tile.idx))
                })?;
            regions.push(RectRegionPacking {
                packed_reg_width: high_w,
                packed_reg_height: high_h,
                packed_reg_top: (pos % layout.hr_tiles_in_col) as u32 * high_h,
                packed_reg_left: (pos / layout.hr_tiles_in_col) as u32 * high_w,
                ..RectRegionPacking::identity(
                    src.proj_reg_left,
                    src.proj_reg_top,
                    src.proj_reg_width,
                    src.proj_reg_height,
                )
            });
        }

        let low_left = high_w * layout.hr_tiles_in_row as u32;
        for slot in 0..layout.lr_tiles_in_col * layout.lr_tiles_in_row {
            let src = low
                .src_rwpk
                .regions
                .get(slot % low_num)
                .ok_or_else(|| {
                    PackingError::invalid_data(format!(
                        "low resolution tile {} outside the source picture",
                        slot % low_num
                    ))
                })?;
            regions.push(RectRegionPacking {
                proj_reg_width: src.proj_reg_width * high.width / low.width,
                proj_reg_height: src.proj_reg_height * high.height / low.height,
                proj_reg_top: src.proj_reg_top * high.height / low.height,
                proj_reg_left: src.proj_reg_left * high.width / low.width,
                packed_reg_width: src.proj_reg_width,
                packed_reg_height: src.proj_reg_height,
                packed_reg_top: (slot % layout.lr_tiles_in_col) as u32 * low_h,
                packed_reg_left: low_left + (slot / layout.lr_tiles_in_col) as u32 * low_w,
                gb_not_used_for_pred_flag: true,
                ..Default::default()
            });
        }

        let rwpk = RegionWisePacking {
            constituent_pic_matching: false,
            proj_pic_width: high.width,
            proj_pic_height: high.height,
            packed_pic_width: layout.packed_width,
            packed_pic_height: layout.packed_height,
            regions,
            num_hi_regions: hi_region_count(tiles)?,
            low_res_pic_width: low.width,
            low_res_pic_height: low.height,
        };

        self.packed_width = layout.packed_width;
        self.packed_height = layout.packed_height;
        debug!(
            tiles = tiles.len(),
            supplementary = layout.supplementary,
            width = layout.packed_width,
            height = layout.packed_height,
            "packed two resolution picture"
        );
        Ok(rwpk)
    }

    fn generate_tiles_merge_direction(
        &mut self,
        tiles: &[TileDef],
    ) -> Result<TilesMergeDirectionInCol, PackingError> {
        check_selection(tiles, self.max_selected)?;
        let layout = self.layout(tiles.len())?;
        let (high, low) = self.streams()?;
        let (high_w, high_h) = self.high_tile;
        let (low_w, low_h) = self.low_tile;
        let packed_ctu_width = layout.packed_width / CTU_SIZE;
        let low_num = low.tile_count();

        let mut columns = Vec::with_capacity(layout.hr_tiles_in_row + layout.lr_tiles_in_row);
        for col in 0..layout.hr_tiles_in_row {
            let column = (0..layout.hr_tiles_in_col)
                .map(|row| {
                    let pos = col * layout.hr_tiles_in_col + row;
                    let tile =
                        &tiles[row_major_pick(pos, layout.hr_tiles_in_col, layout.hr_tiles_in_row)];
                    SingleTile {
                        stream_idx_in_media: high.stream_idx_in_media,
                        orig_tile_idx: tile.idx,
                        dst_ctu_index: (pos % layout.hr_tiles_in_col) as u32
                            * (high_h / CTU_SIZE)
                            * packed_ctu_width
                            + (pos / layout.hr_tiles_in_col) as u32 * (high_w / CTU_SIZE),
                    }
                })
                .collect();
            columns.push(column);
        }

        let low_offset = layout.hr_tiles_in_row as u32 * (high_w / CTU_SIZE);
        for col in 0..layout.lr_tiles_in_row {
            let column = (0..layout.lr_tiles_in_col)
                .map(|row| {
                    let slot = col * layout.lr_tiles_in_col + row;
                    SingleTile {
                        stream_idx_in_media: low.stream_idx_in_media,
                        orig_tile_idx: (slot % low_num) as u16,
                        dst_ctu_index: (slot % layout.lr_tiles_in_col) as u32
                            * (low_h / CTU_SIZE)
                            * packed_ctu_width
                            + (slot / layout.lr_tiles_in_col) as u32 * (low_w / CTU_SIZE)
                            + low_offset,
                    }
                })
                .collect();
            columns.push(column);
        }

        Ok(TilesMergeDirectionInCol { columns })
    }

    fn generate_merged_tiles_arrange(
        &mut self,
        tiles: &[TileDef],
    ) -> Result<TileArrangement, PackingError> {
        check_selection(tiles, self.max_selected)?;
        let layout = self.layout(tiles.len())?;
        let arrange = self.arrange(&layout);
        self.merged_arrange = Some(arrange.clone());
        Ok(arrange)
    }

    fn packed_pic_width(&self) -> u32 {
        self.packed_width
    }

    fn packed_pic_height(&self) -> u32 {
        self.packed_height
    }

    fn merged_tiles_arrange(&self) -> Option<&TileArrangement> {
        self.merged_arrange.as_ref()
    }
}
