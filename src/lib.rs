//! Viewport tile selection and OMAF extractor track construction.
//!
//! A tiled 360° video is encoded at several resolutions. For every distinct
//! set of tiles a viewer can see, this crate builds one extractor track: a
//! virtual HEVC stream whose samples are extractors pointing back at the
//! tile tracks, merged into a single picture by a packing strategy.
//!
//! Track generation runs once:
//!
//! 1. rank the video streams by bitrate,
//! 2. sweep the viewport over the sphere and collect distinct tile-sets,
//! 3. prune the collection when it grows too large,
//! 4. pack each tile-set and rewrite SPS, PPS and SEI for the merged picture.
//!
//! Every frame afterwards, [`ExtractorTrackManager::refresh_frame`] rewrites
//! the slice headers and refreshes the extractors of every track.
//!
//! # Quick Start
//!
//! ```ignore
//! use omaf_extractor::{ErpGridOracle, ExtractorConfig, ExtractorTrackManager};
//!
//! let config = ExtractorConfig::new(2).packing_strategy("HighResPlusFullLowResPacking");
//! let mut manager = ExtractorTrackManager::new(config);
//! manager.initialize(&streams, &mut ErpGridOracle::new(), &codec)?;
//!
//! // per frame, after the tile NAL units of `streams` are updated
//! for failure in manager.refresh_frame(&streams, &codec) {
//!     tracing::warn!(viewport = failure.viewport_id, "{}", failure.error);
//! }
//! for track in manager.all_extractor_tracks_mut().values_mut() {
//!     let mut seg = track.segment_scope();
//!     seg.add_extractors_nalu()?;
//!     let nalus = seg.finish();
//! }
//! ```

mod catalog;
mod config;
mod coverage;
mod generator;
mod grid_oracle;
pub mod hevc;
mod manager;
mod oracle;
mod packer;
mod pool;
mod refiner;
mod rewriter;
mod sampler;
mod tileset;
mod track;

#[cfg(test)]
mod testing;

pub use omaf_packing::{
    near_square_grid, square_factor, ContentCoverage, HighResPlusFullLowResPacking,
    PackingContext, PackingError, PackingStrategy, PicResolution, ProjectionFormat,
    RectRegionPacking, RegionWisePacking, SingleTile, SingleVideoPacking, SphereRegion,
    StrategyFactory, StrategyRegistry, StreamLayout, TileArrangement, TileDef,
    TilesMergeDirectionInCol, CTU_SIZE,
};

pub use catalog::{
    geometry_face, rank_video_streams, video_stream, AudioStream, MediaStream, StreamMap,
    TileInfo, VideoStream,
};
pub use config::{ExtractorConfig, ViewportInfo, DEFAULT_REFINE_THRESHOLD};
pub use coverage::{coverage_from_rect, CoverageDef, ProjRect, DEGREE_UNITS};
pub use generator::{
    ExtractorTrackGenerator, GenerationPlan, ViewportPlan, MAX_INITIAL_SELECTION,
};
pub use grid_oracle::ErpGridOracle;
pub use manager::ExtractorTrackManager;
pub use oracle::{CodecMath, ExternalError, ProjectionKind, ViewportOracle, ViewportParams};
pub use packer::CompositePacker;
pub use pool::{RefreshFailure, SegmentationPool};
pub use refiner::TileSetRefiner;
pub use rewriter::{ParameterSetRewriter, RewrittenSlice};
pub use sampler::{
    is_valid_pose, normalize_tile_set, SweepStats, SweepStep, ViewportSampler,
    MAX_SIDE_DIFFERENCE,
};
pub use tileset::{TileSet, TileSetCollection, ViewportId};
pub use track::{
    Extractor, ExtractorTrack, InlineConstructor, SampleConstructor, SegmentScope, TrackReadiness,
    TrackState, MAX_INLINE_LEN,
};
