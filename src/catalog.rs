//! Source media streams as seen by the extractor pipeline.
//!
//! A [`VideoStream`] is the tile catalog of one encoded resolution: picture
//! size, tile grid, parameter sets and the per-tile [`TileInfo`] carrying the
//! current frame's slice NAL unit. The stream-processing side fills the
//! NAL units every frame; the extractor pipeline only reads them.

use std::collections::BTreeMap;

use omaf_packing::{
    PicResolution, ProjectionFormat, RectRegionPacking, RegionWisePacking, StreamLayout,
};

use crate::hevc::{nal_unit_type, parse_annex_b, Nalu};
use crate::PackingError;

/// Face numbering used by the geometry library.
pub mod geometry_face {
    pub const PX: i32 = 0;
    pub const NX: i32 = 1;
    pub const PY: i32 = 2;
    pub const NY: i32 = 3;
    pub const PZ: i32 = 4;
    pub const NZ: i32 = 5;
}

/// Static description of one tile plus its current NAL unit.
#[derive(Debug, Clone, Default)]
pub struct TileInfo {
    /// Left edge in the source picture.
    pub horizontal_pos: u32,
    /// Top edge in the source picture.
    pub vertical_pos: u32,
    pub width: u32,
    pub height: u32,
    pub proj_format: ProjectionFormat,
    /// Left edge in the default cube 3x2 layout (equal to `horizontal_pos` for ERP).
    pub default_hor_pos: u32,
    /// Top edge in the default cube 3x2 layout (equal to `vertical_pos` for ERP).
    pub default_ver_pos: u32,
    /// Horizontal position as the geometry library addresses it.
    pub geometry_x: i32,
    /// Vertical position as the geometry library addresses it.
    pub geometry_y: i32,
    /// Face id as the geometry library addresses it.
    pub geometry_face: i32,
    pub tile_idx_in_proj_pic: u16,
    /// Slice NAL unit of the current frame.
    pub nalu: Nalu,
}

/// One encoded video resolution with its tile grid.
#[derive(Debug, Clone)]
pub struct VideoStream {
    width: u32,
    height: u32,
    tile_rows: u16,
    tile_cols: u16,
    bitrate: u64,
    projection: ProjectionFormat,
    vps: Nalu,
    sps: Nalu,
    pps: Nalu,
    tiles: Vec<TileInfo>,
    src_rwpk: RegionWisePacking,
}

impl VideoStream {
    /// Equirectangular video split into a uniform `tile_rows x tile_cols` grid.
    pub fn erp(
        width: u32,
        height: u32,
        tile_rows: u16,
        tile_cols: u16,
        bitrate: u64,
    ) -> Result<Self, PackingError> {
        let (tile_w, tile_h) = uniform_tile_size(width, height, tile_rows, tile_cols)?;
        let tiles = (0..tile_rows)
            .flat_map(|row| (0..tile_cols).map(move |col| (row, col)))
            .enumerate()
            .map(|(idx, (row, col))| {
                let left = u32::from(col) * tile_w;
                let top = u32::from(row) * tile_h;
                TileInfo {
                    horizontal_pos: left,
                    vertical_pos: top,
                    width: tile_w,
                    height: tile_h,
                    proj_format: ProjectionFormat::Erp,
                    default_hor_pos: left,
                    default_ver_pos: top,
                    geometry_x: left as i32,
                    geometry_y: top as i32,
                    geometry_face: 0,
                    tile_idx_in_proj_pic: idx as u16,
                    nalu: Nalu::default(),
                }
            })
            .collect();
        Ok(Self::with_tiles(
            width,
            height,
            tile_rows,
            tile_cols,
            bitrate,
            ProjectionFormat::Erp,
            tiles,
        ))
    }

    /// Cubemap video in the default 3x2 face layout.
    ///
    /// Tiles never straddle faces, so the tile grid must divide into three face
    /// columns and two face rows.
    pub fn cubemap(
        width: u32,
        height: u32,
        tile_rows: u16,
        tile_cols: u16,
        bitrate: u64,
    ) -> Result<Self, PackingError> {
        if tile_cols % 3 != 0 || tile_rows % 2 != 0 {
            return Err(PackingError::invalid_data(format!(
                "{}x{} tile grid does not split into 3x2 cube faces",
                tile_cols, tile_rows
            )));
        }
        let (tile_w, tile_h) = uniform_tile_size(width, height, tile_rows, tile_cols)?;
        let (face_w, face_h) = (width / 3, height / 2);

        let tiles = (0..tile_rows)
            .flat_map(|row| (0..tile_cols).map(move |col| (row, col)))
            .enumerate()
            .map(|(idx, (row, col))| {
                let left = u32::from(col) * tile_w;
                let top = u32::from(row) * tile_h;
                let (geometry_face, geometry_x, geometry_y) =
                    cube_face_position(left, top, face_w, face_h, tile_w, tile_h);
                TileInfo {
                    horizontal_pos: left,
                    vertical_pos: top,
                    width: tile_w,
                    height: tile_h,
                    proj_format: ProjectionFormat::Cubemap,
                    default_hor_pos: left,
                    default_ver_pos: top,
                    geometry_x,
                    geometry_y,
                    geometry_face,
                    tile_idx_in_proj_pic: idx as u16,
                    nalu: Nalu::default(),
                }
            })
            .collect();
        Ok(Self::with_tiles(
            width,
            height,
            tile_rows,
            tile_cols,
            bitrate,
            ProjectionFormat::Cubemap,
            tiles,
        ))
    }

    fn with_tiles(
        width: u32,
        height: u32,
        tile_rows: u16,
        tile_cols: u16,
        bitrate: u64,
        projection: ProjectionFormat,
        tiles: Vec<TileInfo>,
    ) -> Self {
        let regions = tiles
            .iter()
            .map(|t| RectRegionPacking {
                packed_reg_left: t.horizontal_pos,
                packed_reg_top: t.vertical_pos,
                ..RectRegionPacking::identity(t.default_hor_pos, t.default_ver_pos, t.width, t.height)
            })
            .collect();
        let src_rwpk = RegionWisePacking {
            constituent_pic_matching: false,
            proj_pic_width: width,
            proj_pic_height: height,
            packed_pic_width: width,
            packed_pic_height: height,
            regions,
            ..Default::default()
        };
        Self {
            width,
            height,
            tile_rows,
            tile_cols,
            bitrate,
            projection,
            vps: Nalu::default(),
            sps: Nalu::default(),
            pps: Nalu::default(),
            tiles,
            src_rwpk,
        }
    }

    /// Take VPS, SPS and PPS from an Annex B header blob as emitted by an encoder.
    pub fn set_parameter_sets(&mut self, header: &[u8]) -> Result<(), PackingError> {
        for nalu in parse_annex_b(header) {
            match nalu.nalu_type {
                nal_unit_type::VPS => self.vps = nalu,
                nal_unit_type::SPS => self.sps = nalu,
                nal_unit_type::PPS => self.pps = nalu,
                _ => {}
            }
        }
        if self.vps.is_empty() || self.sps.is_empty() || self.pps.is_empty() {
            return Err(PackingError::invalid_data(
                "stream header lacks VPS, SPS or PPS",
            ));
        }
        Ok(())
    }

    /// Replace the current-frame slice NAL unit of one tile.
    pub fn set_tile_nalu(&mut self, tile_idx: u16, nalu: Nalu) -> Result<(), PackingError> {
        let tile = self
            .tiles
            .get_mut(usize::from(tile_idx))
            .ok_or_else(|| PackingError::invalid_data(format!("no tile {}", tile_idx)))?;
        tile.nalu = nalu;
        Ok(())
    }

    /// Index in the projected picture of the tile the geometry library calls `(x, y, face_id)`.
    #[must_use]
    pub fn resolve(&self, x: i32, y: i32, face_id: i32) -> Option<u16> {
        self.tiles
            .iter()
            .find(|t| t.geometry_x == x && t.geometry_y == y && t.geometry_face == face_id)
            .map(|t| t.tile_idx_in_proj_pic)
    }

    /// Packing-side view of this stream.
    #[must_use]
    pub fn layout(&self, stream_idx_in_media: u8) -> StreamLayout {
        StreamLayout {
            stream_idx_in_media,
            width: self.width,
            height: self.height,
            tile_rows: self.tile_rows,
            tile_cols: self.tile_cols,
            src_rwpk: self.src_rwpk.clone(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn resolution(&self) -> PicResolution {
        PicResolution {
            width: self.width,
            height: self.height,
        }
    }

    pub fn tile_rows(&self) -> u16 {
        self.tile_rows
    }

    pub fn tile_cols(&self) -> u16 {
        self.tile_cols
    }

    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    pub fn bitrate(&self) -> u64 {
        self.bitrate
    }

    pub fn projection(&self) -> ProjectionFormat {
        self.projection
    }

    pub fn vps(&self) -> &Nalu {
        &self.vps
    }

    pub fn sps(&self) -> &Nalu {
        &self.sps
    }

    pub fn pps(&self) -> &Nalu {
        &self.pps
    }

    pub fn tiles(&self) -> &[TileInfo] {
        &self.tiles
    }

    pub fn tile(&self, tile_idx: u16) -> Option<&TileInfo> {
        self.tiles.get(usize::from(tile_idx))
    }

    pub fn src_rwpk(&self) -> &RegionWisePacking {
        &self.src_rwpk
    }
}

/// Audio streams only take part in stream counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AudioStream {
    pub bitrate: u64,
}

/// One media stream of the packaged content.
#[derive(Debug, Clone)]
pub enum MediaStream {
    Video(VideoStream),
    Audio(AudioStream),
}

impl MediaStream {
    #[must_use]
    pub fn as_video(&self) -> Option<&VideoStream> {
        match self {
            Self::Video(vs) => Some(vs),
            Self::Audio(_) => None,
        }
    }

    #[must_use]
    pub fn as_video_mut(&mut self) -> Option<&mut VideoStream> {
        match self {
            Self::Video(vs) => Some(vs),
            Self::Audio(_) => None,
        }
    }
}

/// Media streams keyed by their index in the packaged media.
pub type StreamMap = BTreeMap<u8, MediaStream>;

/// Look up a video stream, failing with `StreamNotFound` for unknown or audio indices.
pub fn video_stream(streams: &StreamMap, idx: u8) -> Result<&VideoStream, PackingError> {
    streams
        .get(&idx)
        .and_then(MediaStream::as_video)
        .ok_or(PackingError::StreamNotFound(idx))
}

/// Video stream indices ranked by bitrate, highest first.
///
/// Fails with `VideoNumMismatch` when the map holds a different number of
/// video streams than declared.
pub fn rank_video_streams(streams: &StreamMap, declared: u8) -> Result<Vec<u8>, PackingError> {
    let mut videos: Vec<(u8, u64)> = streams
        .iter()
        .filter_map(|(&idx, s)| s.as_video().map(|vs| (idx, vs.bitrate())))
        .collect();
    if videos.len() != usize::from(declared) {
        return Err(PackingError::VideoNumMismatch {
            declared,
            actual: videos.len() as u8,
        });
    }
    videos.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    Ok(videos.into_iter().map(|(idx, _)| idx).collect())
}

fn uniform_tile_size(
    width: u32,
    height: u32,
    tile_rows: u16,
    tile_cols: u16,
) -> Result<(u32, u32), PackingError> {
    if width == 0 || height == 0 || tile_rows == 0 || tile_cols == 0 {
        return Err(PackingError::invalid_data(format!(
            "{}x{} picture with {}x{} tiles",
            width, height, tile_cols, tile_rows
        )));
    }
    let (rows, cols) = (u32::from(tile_rows), u32::from(tile_cols));
    if width % cols != 0 || height % rows != 0 {
        return Err(PackingError::invalid_data(format!(
            "{}x{} picture does not split into {}x{} equal tiles",
            width, height, cols, rows
        )));
    }
    Ok((width / cols, height / rows))
}

/// Geometry library face and face-local position of a tile in the default 3x2 layout.
///
/// The bottom row faces NZ and PZ are stored rotated, so their local axes swap.
fn cube_face_position(
    left: u32,
    top: u32,
    face_w: u32,
    face_h: u32,
    tile_w: u32,
    tile_h: u32,
) -> (i32, i32, i32) {
    let (face_col, face_row) = (left / face_w, top / face_h);
    let (local_x, local_y) = ((left % face_w) as i32, (top % face_h) as i32);
    match (face_row, face_col) {
        (0, 0) => (geometry_face::PY, local_x, local_y),
        (0, 1) => (geometry_face::PX, local_x, local_y),
        (0, _) => (geometry_face::NY, local_x, local_y),
        (_, 0) => (
            geometry_face::NZ,
            (face_h - tile_h) as i32 - local_y,
            local_x,
        ),
        (_, 1) => (geometry_face::NX, local_x, local_y),
        _ => (
            geometry_face::PZ,
            local_y,
            (face_w - tile_w) as i32 - local_x,
        ),
    }
}
