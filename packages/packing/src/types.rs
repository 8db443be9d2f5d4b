//! OMAF packing metadata shared by the strategies and the extractor pipeline.

/// Size of an HEVC coding tree unit in luma samples.
pub const CTU_SIZE: u32 = 64;

/// Projection format of a source video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectionFormat {
    /// Equirectangular projection.
    Erp,
    /// Cubemap projection (3x2 face layout).
    Cubemap,
    /// Planar (non-spherical) video.
    Planar,
}

impl Default for ProjectionFormat {
    fn default() -> Self {
        Self::Erp
    }
}

/// A tile as addressed by the geometry library.
///
/// `idx` is whatever the geometry library reported until the sampler resolves
/// it to the tile's index in the projected picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TileDef {
    pub x: i32,
    pub y: i32,
    pub face_id: i32,
    pub idx: u16,
}

impl TileDef {
    #[must_use]
    pub fn new(x: i32, y: i32, face_id: i32, idx: u16) -> Self {
        Self { x, y, face_id, idx }
    }
}

/// Width and height of one picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct PicResolution {
    pub width: u32,
    pub height: u32,
}

/// Placement of one rectangular region from the projected into the packed picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RectRegionPacking {
    pub transform_type: u8,
    pub guard_band_flag: bool,
    pub proj_reg_width: u32,
    pub proj_reg_height: u32,
    pub proj_reg_top: u32,
    pub proj_reg_left: u32,
    pub packed_reg_width: u32,
    pub packed_reg_height: u32,
    pub packed_reg_top: u32,
    pub packed_reg_left: u32,
    // Only meaningful when `guard_band_flag` is set.
    pub left_gb_width: u8,
    pub right_gb_width: u8,
    pub top_gb_height: u8,
    pub bottom_gb_height: u8,
    pub gb_not_used_for_pred_flag: bool,
    pub gb_type: [u8; 4],
}

impl RectRegionPacking {
    /// Region whose packed rectangle equals its projected rectangle.
    #[must_use]
    pub fn identity(left: u32, top: u32, width: u32, height: u32) -> Self {
        Self {
            proj_reg_width: width,
            proj_reg_height: height,
            proj_reg_top: top,
            proj_reg_left: left,
            packed_reg_width: width,
            packed_reg_height: height,
            packed_reg_top: top,
            packed_reg_left: left,
            gb_not_used_for_pred_flag: true,
            ..Default::default()
        }
    }
}

/// Region-wise packing of a whole picture.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegionWisePacking {
    pub constituent_pic_matching: bool,
    pub proj_pic_width: u32,
    pub proj_pic_height: u32,
    pub packed_pic_width: u32,
    pub packed_pic_height: u32,
    pub regions: Vec<RectRegionPacking>,
    /// Number of leading regions taken from the highest resolution stream.
    pub num_hi_regions: u8,
    pub low_res_pic_width: u32,
    pub low_res_pic_height: u32,
}

impl RegionWisePacking {
    /// Number of packed regions.
    #[must_use]
    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }
}

/// Tile grid of a merged picture, as consumed by PPS generation.
///
/// Row heights are in luma samples, column widths in CTUs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct TileArrangement {
    pub tile_row_heights: Vec<u32>,
    pub tile_col_widths: Vec<u32>,
}

impl TileArrangement {
    #[must_use]
    pub fn rows(&self) -> usize {
        self.tile_row_heights.len()
    }

    #[must_use]
    pub fn cols(&self) -> usize {
        self.tile_col_widths.len()
    }
}

/// One tile's source and destination in the merged picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SingleTile {
    pub stream_idx_in_media: u8,
    pub orig_tile_idx: u16,
    /// Slice segment address of the tile in the merged picture.
    pub dst_ctu_index: u32,
}

/// Tiles of a merged picture, column by column, each column top to bottom.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TilesMergeDirectionInCol {
    pub columns: Vec<Vec<SingleTile>>,
}

impl TilesMergeDirectionInCol {
    /// Total number of tiles across all columns.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.columns.iter().map(Vec::len).sum()
    }

    /// Iterate tiles in column-major merge order.
    pub fn iter(&self) -> impl Iterator<Item = &SingleTile> {
        self.columns.iter().flatten()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tile_count() == 0
    }
}

/// One region on the sphere, angles in units of 2^-16 degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SphereRegion {
    pub view_idc: u8,
    pub centre_azimuth: i32,
    pub centre_elevation: i32,
    pub centre_tilt: i32,
    pub azimuth_range: u32,
    pub elevation_range: u32,
    pub interpolate: bool,
}

/// Sphere coverage of a track's content.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContentCoverage {
    /// 1 for ERP sources, 0 otherwise.
    pub coverage_shape_type: u8,
    pub view_idc_presence_flag: bool,
    pub default_view_idc: u8,
    pub sphere_regions: Vec<SphereRegion>,
}

impl ContentCoverage {
    #[must_use]
    pub fn num_regions(&self) -> usize {
        self.sphere_regions.len()
    }
}

/// What a packing strategy needs to know about one video stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLayout {
    pub stream_idx_in_media: u8,
    pub width: u32,
    pub height: u32,
    pub tile_rows: u16,
    pub tile_cols: u16,
    /// Source packing: one identity region per tile, in tile index order.
    pub src_rwpk: RegionWisePacking,
}

impl StreamLayout {
    #[must_use]
    pub fn tile_count(&self) -> usize {
        usize::from(self.tile_rows) * usize::from(self.tile_cols)
    }
}
