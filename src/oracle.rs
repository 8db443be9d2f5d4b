//! Contract of the external geometry and codec-math library.
//!
//! The extractor pipeline never computes viewport geometry or writes
//! slice headers, parameter sets or SEIs bit by bit. It drives these two
//! traits and translates their results into track metadata.

use omaf_packing::{PicResolution, ProjectionFormat, RegionWisePacking, TileArrangement, TileDef};
use thiserror::Error;

use crate::config::ViewportInfo;
use crate::coverage::CoverageDef;
use crate::hevc::sei_payload_type;

/// Failure reported by the external library.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (status {status})")]
pub struct ExternalError {
    pub status: i32,
    pub message: String,
}

impl ExternalError {
    pub fn new(status: i32, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }
}

/// Viewport geometry configuration for one source picture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportParams {
    pub viewport: ViewportInfo,
    pub projection: ProjectionFormat,
    /// Source picture width.
    pub in_width: u32,
    /// Source picture height.
    pub in_height: u32,
    pub tile_rows: u16,
    pub tile_cols: u16,
}

/// Viewport-to-tiles geometry.
///
/// Calls follow the library's handle protocol: `configure`, then any number of
/// `set_viewport` + `process` rounds, each followed by `tiles_in_viewport`.
pub trait ViewportOracle: Send {
    /// Set the viewport size, field of view and source geometry.
    fn configure(&mut self, params: &ViewportParams) -> Result<(), ExternalError>;

    /// Move the viewport to a new pose, in degrees.
    fn set_viewport(&mut self, yaw: f32, pitch: f32) -> Result<(), ExternalError>;

    /// Run the viewport derivation for the current pose.
    fn process(&mut self) -> Result<(), ExternalError>;

    /// Tiles covering the processed viewport, in geometry coordinates.
    fn tiles_in_viewport(&mut self) -> Result<Vec<TileDef>, ExternalError>;

    /// Sphere coverage of `tiles` for the processed viewport.
    fn content_coverage(&mut self, tiles: &[TileDef]) -> Result<CoverageDef, ExternalError>;
}

/// Projection SEI flavours the codec library can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    Equirect,
    Cubemap,
}

impl ProjectionKind {
    /// Projection SEI for a source projection, if one exists.
    #[must_use]
    pub fn for_projection(projection: ProjectionFormat) -> Option<Self> {
        match projection {
            ProjectionFormat::Erp => Some(Self::Equirect),
            ProjectionFormat::Cubemap => Some(Self::Cubemap),
            ProjectionFormat::Planar => None,
        }
    }

    #[must_use]
    pub fn sei_payload_type(self) -> u16 {
        match self {
            Self::Equirect => sei_payload_type::EQUIRECT_PROJECTION,
            Self::Cubemap => sei_payload_type::CUBEMAP_PROJECTION,
        }
    }
}

/// Bit-level HEVC header generation.
///
/// Every input and output is an Annex B NAL unit with a 4-byte start code.
/// Implementations hold no per-call state, so one instance serves every track
/// and every segmentation worker.
pub trait CodecMath: Send + Sync {
    /// Slice header of `nalu` re-addressed to `ctu_index` in a `dst`-sized picture.
    ///
    /// Returns the start code, NAL header and new slice header, without slice data.
    fn generate_slice_header(
        &self,
        nalu: &[u8],
        ctu_index: u32,
        dst: PicResolution,
    ) -> Result<Vec<u8>, ExternalError>;

    /// SPS rewritten for a `dst`-sized picture.
    fn generate_sps(&self, sps: &[u8], dst: PicResolution) -> Result<Vec<u8>, ExternalError>;

    /// PPS rewritten for the merged tile grid.
    fn generate_pps(&self, pps: &[u8], arrange: &TileArrangement) -> Result<Vec<u8>, ExternalError>;

    /// Projection SEI.
    fn generate_projection_sei(&self, kind: ProjectionKind) -> Result<Vec<u8>, ExternalError>;

    /// Region-wise packing SEI.
    fn generate_rwpk_sei(&self, rwpk: &RegionWisePacking) -> Result<Vec<u8>, ExternalError>;
}
