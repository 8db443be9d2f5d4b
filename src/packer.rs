//! Composite packing of one tile-set through a registered strategy.

use omaf_packing::{
    PackingContext, PackingStrategy, PicResolution, RegionWisePacking, StrategyRegistry,
    StreamLayout, TileArrangement, TileDef, TilesMergeDirectionInCol,
};
use tracing::info;

use crate::PackingError;

/// Merged-picture layout generator backed by one packing strategy.
///
/// Created once per track generation run, initialized with the ranked video
/// streams, then queried for every surviving tile-set.
pub struct CompositePacker {
    strategy: Box<dyn PackingStrategy>,
    max_selected: usize,
}

impl std::fmt::Debug for CompositePacker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositePacker")
            .field("strategy", &self.strategy.name())
            .field("max_selected", &self.max_selected)
            .finish()
    }
}

impl CompositePacker {
    /// Instantiate the strategy registered under `name`.
    ///
    /// A missing or empty name means no strategy was configured.
    pub fn new(registry: &StrategyRegistry, name: Option<&str>) -> Result<Self, PackingError> {
        let name = match name {
            Some(name) if !name.is_empty() => name,
            _ => return Err(PackingError::NullGenerator),
        };
        let strategy = registry.create(name)?;
        info!(strategy = name, "packing strategy selected");
        Ok(Self {
            strategy,
            max_selected: 0,
        })
    }

    /// Prepare the strategy.
    ///
    /// `streams` are ranked by bitrate, highest first. `selected_count` is the
    /// tile count of the initial viewport and `max_selected_count` the largest
    /// tile-set that will be packed.
    pub fn initialize(
        &mut self,
        streams: &[StreamLayout],
        selected_count: usize,
        max_selected_count: usize,
    ) -> Result<(), PackingError> {
        self.strategy.initialize(&PackingContext {
            streams,
            selected_count,
            max_selected_count,
        })?;
        self.max_selected = max_selected_count;
        Ok(())
    }

    fn check(&self, tiles: &[TileDef]) -> Result<(), PackingError> {
        if tiles.is_empty() || tiles.len() > self.max_selected {
            return Err(PackingError::incorrect_selection(format!(
                "tile-set of {} tiles, at most {} can be packed",
                tiles.len(),
                self.max_selected
            )));
        }
        Ok(())
    }

    /// Merged tile grid for `tiles`.
    pub fn generate_merged_tiles_arrange(
        &mut self,
        tiles: &[TileDef],
    ) -> Result<TileArrangement, PackingError> {
        self.check(tiles)?;
        self.strategy.generate_merged_tiles_arrange(tiles)
    }

    /// Region-wise packing for `tiles`, projected onto a `proj_pic`-sized picture.
    pub fn generate_dst_rwpk(
        &mut self,
        tiles: &[TileDef],
        proj_pic: PicResolution,
    ) -> Result<RegionWisePacking, PackingError> {
        self.check(tiles)?;
        let mut rwpk = self.strategy.generate_dst_rwpk(tiles)?;
        rwpk.proj_pic_width = proj_pic.width;
        rwpk.proj_pic_height = proj_pic.height;
        if rwpk.packed_pic_width == 0 || rwpk.packed_pic_height == 0 {
            return Err(PackingError::invalid_data(format!(
                "{} packed a {}x{} picture",
                self.strategy.name(),
                rwpk.packed_pic_width,
                rwpk.packed_pic_height
            )));
        }
        Ok(rwpk)
    }

    /// Column-major tile placement for `tiles`.
    pub fn generate_tiles_merge_direction(
        &mut self,
        tiles: &[TileDef],
    ) -> Result<TilesMergeDirectionInCol, PackingError> {
        self.check(tiles)?;
        self.strategy.generate_tiles_merge_direction(tiles)
    }

    /// Size of the last packed picture.
    pub fn packed_pic_size(&self) -> PicResolution {
        PicResolution {
            width: self.strategy.packed_pic_width(),
            height: self.strategy.packed_pic_height(),
        }
    }

    pub fn merged_tiles_arrange(&self) -> Option<&TileArrangement> {
        self.strategy.merged_tiles_arrange()
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    pub fn max_selected(&self) -> usize {
        self.max_selected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::video_stream;
    use crate::testing::{stream_map, tile_defs};
    use omaf_packing::HighResPlusFullLowResPacking;

    fn layouts() -> Vec<StreamLayout> {
        let streams = stream_map();
        let high = video_stream(&streams, 1).unwrap();
        let low = video_stream(&streams, 0).unwrap();
        vec![high.layout(1), low.layout(0)]
    }

    fn resolved(idx: &[u16]) -> Vec<TileDef> {
        let mut tiles = tile_defs(idx);
        for (tile, &i) in tiles.iter_mut().zip(idx) {
            tile.idx = i;
        }
        tiles
    }

    fn packer() -> CompositePacker {
        let mut packer = CompositePacker::new(
            &StrategyRegistry::with_builtin(),
            Some(HighResPlusFullLowResPacking::NAME),
        )
        .unwrap();
        packer.initialize(&layouts(), 4, 8).unwrap();
        packer
    }

    #[test]
    fn test_missing_strategy() {
        let registry = StrategyRegistry::with_builtin();
        assert!(matches!(
            CompositePacker::new(&registry, None),
            Err(PackingError::NullGenerator)
        ));
        assert!(matches!(
            CompositePacker::new(&registry, Some("")),
            Err(PackingError::NullGenerator)
        ));
        assert!(matches!(
            CompositePacker::new(&registry, Some("Mosaic")),
            Err(PackingError::UnknownStrategy(_))
        ));
    }

    #[test]
    fn test_initial_arrangement_available() {
        let packer = packer();
        let arrange = packer.merged_tiles_arrange().unwrap();
        assert_eq!(arrange.cols(), 3);
        assert_eq!(arrange.rows(), 1);
        assert_eq!(packer.strategy_name(), HighResPlusFullLowResPacking::NAME);
    }

    #[test]
    fn test_rwpk_uses_main_projected_size() {
        let mut packer = packer();
        let tiles = resolved(&[1, 2, 5, 6]);
        let rwpk = packer
            .generate_dst_rwpk(&tiles, PicResolution { width: 3840, height: 1920 })
            .unwrap();
        assert_eq!((rwpk.proj_pic_width, rwpk.proj_pic_height), (3840, 1920));
        assert_eq!(packer.packed_pic_size(), PicResolution { width: 2880, height: 1920 });

        let dir = packer.generate_tiles_merge_direction(&tiles).unwrap();
        assert_eq!(dir.tile_count(), 6);
        let first = dir.iter().next().unwrap();
        assert_eq!((first.stream_idx_in_media, first.orig_tile_idx), (1, 1));
    }

    #[test]
    fn test_oversized_tile_set_rejected() {
        let mut packer = packer();
        let tiles = resolved(&[0, 1, 2, 3, 4, 5, 6, 7, 0]);
        assert!(matches!(
            packer.generate_merged_tiles_arrange(&tiles),
            Err(PackingError::SelectionIncorrectResult(_))
        ));
        assert!(matches!(
            packer.generate_merged_tiles_arrange(&[]),
            Err(PackingError::SelectionIncorrectResult(_))
        ));
    }
}
