//! Viewport tiles of a single video, packed without any fallback content.

use super::{check_selection, hi_region_count, near_square_grid, row_major_pick, tile_size};
use crate::{
    PackingContext, PackingError, PackingStrategy, RectRegionPacking, RegionWisePacking,
    SingleTile, StreamLayout, TileArrangement, TileDef, TilesMergeDirectionInCol, CTU_SIZE,
};

/// Packs the selected tiles of one video into a near-square picture.
#[derive(Debug, Default)]
pub struct SingleVideoPacking {
    stream: Option<StreamLayout>,
    tile: (u32, u32),
    max_selected: usize,
    packed_width: u32,
    packed_height: u32,
    merged_arrange: Option<TileArrangement>,
}

impl SingleVideoPacking {
    /// Registered strategy name.
    pub const NAME: &'static str = "SingleVideoPacking";

    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn stream(&self) -> Result<&StreamLayout, PackingError> {
        self.stream
            .as_ref()
            .ok_or_else(|| PackingError::null_pointer("initialized packing strategy"))
    }

    fn arrange(&self, tile_count: usize) -> TileArrangement {
        let (tile_w, tile_h) = self.tile;
        let (in_col, in_row) = near_square_grid(tile_count);
        TileArrangement {
            tile_row_heights: vec![tile_h * in_col as u32],
            tile_col_widths: vec![tile_w / CTU_SIZE; in_row],
        }
    }
}

impl PackingStrategy for SingleVideoPacking {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn initialize(&mut self, ctx: &PackingContext<'_>) -> Result<(), PackingError> {
        let [stream] = ctx.streams else {
            return Err(PackingError::VideoNumMismatch {
                declared: 1,
                actual: ctx.streams.len() as u8,
            });
        };
        if ctx.selected_count == 0 || ctx.selected_count > ctx.max_selected_count {
            return Err(PackingError::incorrect_selection(format!(
                "initial selection of {} tiles with a maximum of {}",
                ctx.selected_count, ctx.max_selected_count
            )));
        }
        self.tile = tile_size(stream)?;
        self.stream = Some(stream.clone());
        self.max_selected = ctx.max_selected_count;
        self.merged_arrange = Some(self.arrange(ctx.selected_count));
        Ok(())
    }

    fn generate_dst_rwpk(&mut self, tiles: &[TileDef]) -> Result<RegionWisePacking, PackingError> {
        check_selection(tiles, self.max_selected)?;
        let stream = self.stream()?;
        let (tile_w, tile_h) = self.tile;
        let (in_col, in_row) = near_square_grid(tiles.len());

        let regions = (0..tiles.len())
            .map(|pos| -> Result<RectRegionPacking, PackingError> {
                let tile = &tiles[row_major_pick(pos, in_col, in_row)];
                let src = stream
                    .src_rwpk
                    .regions
                    .get(usize::from(tile.idx))
                    .ok_or_else(|| {
                        PackingError::invalid_data(format!(
                            "tile {} outside the source picture",
                            tile.idx
                        ))
                    })?;
                Ok(RectRegionPacking {
                    packed_reg_width: tile_w,
                    packed_reg_height: tile_h,
                    packed_reg_top: (pos % in_col) as u32 * tile_h,
                    packed_reg_left: (pos / in_col) as u32 * tile_w,
                    ..RectRegionPacking::identity(
                        src.proj_reg_left,
                        src.proj_reg_top,
                        src.proj_reg_width,
                        src.proj_reg_height,
                    )
                })
            })
            .collect::<Result<Vec<_>, PackingError>>()?;

        let rwpk = RegionWisePacking {
            constituent_pic_matching: false,
            proj_pic_width: stream.width,
            proj_pic_height: stream.height,
            packed_pic_width: tile_w * in_row as u32,
            packed_pic_height: tile_h * in_col as u32,
            regions,
            num_hi_regions: hi_region_count(tiles)?,
            low_res_pic_width: 0,
            low_res_pic_height: 0,
        };
        self.packed_width = rwpk.packed_pic_width;
        self.packed_height = rwpk.packed_pic_height;
        Ok(rwpk)
    }

    fn generate_tiles_merge_direction(
        &mut self,
        tiles: &[TileDef],
    ) -> Result<TilesMergeDirectionInCol, PackingError> {
        check_selection(tiles, self.max_selected)?;
        let stream = self.stream()?;
        let (tile_w, tile_h) = self.tile;
        let (in_col, in_row) = near_square_grid(tiles.len());
        let packed_ctu_width = tile_w * in_row as u32 / CTU_SIZE;

        let columns = (0..in_row)
            .map(|col| {
                (0..in_col)
                    .map(|row| {
                        let pos = col * in_col + row;
                        SingleTile {
                            stream_idx_in_media: stream.stream_idx_in_media,
                            orig_tile_idx: tiles[row_major_pick(pos, in_col, in_row)].idx,
                            dst_ctu_index: row as u32 * (tile_h / CTU_SIZE) * packed_ctu_width
                                + col as u32 * (tile_w / CTU_SIZE),
                        }
                    })
                    .collect()
            })
            .collect();

        Ok(TilesMergeDirectionInCol { columns })
    }

    fn generate_merged_tiles_arrange(
        &mut self,
        tiles: &[TileDef],
    ) -> Result<TileArrangement, PackingError> {
        check_selection(tiles, self.max_selected)?;
        self.stream()?;
        let arrange = self.arrange(tiles.len());
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
