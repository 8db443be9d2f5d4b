//! One-shot pipeline turning the source streams into extractor tracks.
//!
//! ```text
//! streams -> rank -> initial selection -> sweep -> refine -> pack -> tracks
//! ```
//!
//! Runs once, single-threaded, while the manager initializes.

use std::collections::{BTreeMap, HashMap};

use omaf_packing::{
    ContentCoverage, PicResolution, ProjectionFormat, RegionWisePacking, StrategyRegistry,
    StreamLayout, TileArrangement, TileDef, TilesMergeDirectionInCol,
};
use tracing::{debug, error, info};

use crate::catalog::{rank_video_streams, video_stream, StreamMap, VideoStream};
use crate::config::ExtractorConfig;
use crate::hevc::Nalu;
use crate::oracle::{CodecMath, ViewportOracle, ViewportParams};
use crate::packer::CompositePacker;
use crate::refiner::TileSetRefiner;
use crate::rewriter::ParameterSetRewriter;
use crate::sampler::{is_valid_pose, ViewportSampler};
use crate::tileset::ViewportId;
use crate::track::ExtractorTrack;
use crate::PackingError;

/// Largest tile count accepted from the initial viewport selection.
pub const MAX_INITIAL_SELECTION: usize = 1024;

/// Packing of one surviving viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewportPlan {
    pub viewport_id: ViewportId,
    /// Normalized tile-set, tile indices resolved.
    pub tiles: Vec<TileDef>,
    pub dst_rwpk: RegionWisePacking,
    pub merge_dir: TilesMergeDirectionInCol,
    pub arrange: TileArrangement,
    pub coverage: ContentCoverage,
}

impl ViewportPlan {
    pub fn packed_pic_size(&self) -> PicResolution {
        PicResolution {
            width: self.dst_rwpk.packed_pic_width,
            height: self.dst_rwpk.packed_pic_height,
        }
    }
}

/// Every packed viewport of a source, before parameter sets are generated.
#[derive(Debug, Clone)]
pub struct GenerationPlan {
    /// Video stream indices, highest bitrate first.
    pub ranked_streams: Vec<u8>,
    /// Resolution of every ranked stream.
    pub pic_res: Vec<PicResolution>,
    pub projection: ProjectionFormat,
    /// Tile count of the initial viewport.
    pub initial_selection: usize,
    pub viewports: Vec<ViewportPlan>,
}

/// Sampler, refiner and packer wired together for one set of streams.
pub struct ExtractorTrackGenerator<'a> {
    config: &'a ExtractorConfig,
    registry: &'a StrategyRegistry,
}

impl<'a> ExtractorTrackGenerator<'a> {
    pub fn new(config: &'a ExtractorConfig, registry: &'a StrategyRegistry) -> Self {
        Self { config, registry }
    }

    /// Select, refine and pack every viewport of `streams`.
    pub fn plan(
        &self,
        streams: &StreamMap,
        oracle: &mut dyn ViewportOracle,
    ) -> Result<GenerationPlan, PackingError> {
        let mut packer =
            CompositePacker::new(self.registry, self.config.packing_strategy.as_deref())?;

        let ranked_streams = rank_video_streams(streams, self.config.declared_video_count)?;
        let ranked: Vec<&VideoStream> = ranked_streams
            .iter()
            .map(|&idx| video_stream(streams, idx))
            .collect::<Result<_, _>>()?;
        let main = *ranked
            .first()
            .ok_or_else(|| PackingError::null_pointer("main video stream"))?;

        let initial_selection = self.initial_selection(main, oracle)?;

        let sets = {
            let mut sampler = ViewportSampler::new(oracle, main, self.config.viewport)?;
            sampler.sweep()?
        };
        let sets = TileSetRefiner::new(self.config.refine_threshold).refine(sets);

        let layouts: Vec<StreamLayout> = ranked_streams
            .iter()
            .zip(&ranked)
            .map(|(&idx, stream)| stream.layout(idx))
            .collect();
        // The unpadded initial viewport may hold more tiles than any swept set.
        packer.initialize(
            &layouts,
            initial_selection,
            initial_selection.max(sets.max_count()),
        )?;

        let proj_pic = main.resolution();
        let viewports = sets
            .iter()
            .map(|set| -> Result<ViewportPlan, PackingError> {
                let arrange = packer.generate_merged_tiles_arrange(&set.tiles)?;
                let dst_rwpk = packer.generate_dst_rwpk(&set.tiles, proj_pic)?;
                let merge_dir = packer.generate_tiles_merge_direction(&set.tiles)?;
                Ok(ViewportPlan {
                    viewport_id: set.viewport_id,
                    tiles: set.tiles.clone(),
                    dst_rwpk,
                    merge_dir,
                    arrange,
                    coverage: set.coverage.to_content_coverage(main.projection()),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        info!(
            strategy = packer.strategy_name(),
            viewports = viewports.len(),
            initial_selection,
            "viewport packing planned"
        );
        Ok(GenerationPlan {
            pic_res: ranked.iter().map(|s| s.resolution()).collect(),
            ranked_streams,
            projection: main.projection(),
            initial_selection,
            viewports,
        })
    }

    /// Build one extractor track per planned viewport.
    ///
    /// Tracks share SPS and PPS bytes whenever their packed size or tile grid match.
    pub fn generate(
        &self,
        streams: &StreamMap,
        oracle: &mut dyn ViewportOracle,
        codec: &dyn CodecMath,
    ) -> Result<BTreeMap<ViewportId, ExtractorTrack>, PackingError> {
        let plan = self.plan(streams, oracle)?;
        let main_idx = plan
            .ranked_streams
            .first()
            .copied()
            .ok_or_else(|| PackingError::null_pointer("main video stream"))?;
        let main = video_stream(streams, main_idx)?;
        let rewriter = ParameterSetRewriter::new(codec);

        let mut sps_cache: HashMap<PicResolution, Nalu> = HashMap::new();
        let mut pps_cache: HashMap<TileArrangement, Nalu> = HashMap::new();
        let mut tracks = BTreeMap::new();
        for viewport in plan.viewports {
            let viewport_id = viewport.viewport_id;
            let packed = viewport.packed_pic_size();
            let sps = match sps_cache.get(&packed) {
                Some(sps) => sps.clone(),
                None => {
                    let sps = rewriter.rewrite_sps(main.sps(), packed).inspect_err(|e| {
                        error!(viewport_id, error = %e, "SPS generation failed")
                    })?;
                    sps_cache.insert(packed, sps.clone());
                    sps
                }
            };
            let pps = match pps_cache.get(&viewport.arrange) {
                Some(pps) => pps.clone(),
                None => {
                    let pps = rewriter
                        .rewrite_pps(main.pps(), &viewport.arrange)
                        .inspect_err(|e| {
                            error!(viewport_id, error = %e, "PPS generation failed")
                        })?;
                    pps_cache.insert(viewport.arrange.clone(), pps.clone());
                    pps
                }
            };

            let mut track = ExtractorTrack::new(viewport_id, plan.projection);
            track.set_parameter_sets(main.vps(), &sps, &pps)?;
            track.set_topology(
                viewport.tiles,
                viewport.dst_rwpk,
                viewport.merge_dir,
                viewport.coverage,
                plan.pic_res.clone(),
            );
            debug!(
                viewport_id,
                width = packed.width,
                height = packed.height,
                regions = track.dst_rwpk().num_regions(),
                "extractor track built"
            );
            tracks.insert(viewport_id, track);
        }

        debug!(
            tracks = tracks.len(),
            sps = sps_cache.len(),
            pps = pps_cache.len(),
            "extractor tracks generated"
        );
        Ok(tracks)
    }

    /// Tile count seen from the configured viewport.
    fn initial_selection(
        &self,
        main: &VideoStream,
        oracle: &mut dyn ViewportOracle,
    ) -> Result<usize, PackingError> {
        let viewport = self.config.viewport;
        if !is_valid_pose(viewport.yaw, viewport.pitch) {
            return Err(PackingError::InvalidViewport {
                yaw: viewport.yaw,
                pitch: viewport.pitch,
            });
        }
        let params = ViewportParams {
            viewport,
            projection: main.projection(),
            in_width: main.width(),
            in_height: main.height(),
            tile_rows: main.tile_rows(),
            tile_cols: main.tile_cols(),
        };
        oracle
            .configure(&params)
            .map_err(|e| PackingError::operation_failed("configure viewport", e))?;
        oracle
            .set_viewport(viewport.yaw, viewport.pitch)
            .map_err(|e| PackingError::operation_failed("set viewport", e))?;
        oracle
            .process()
            .map_err(|e| PackingError::operation_failed("process viewport", e))?;
        let selected = oracle
            .tiles_in_viewport()
            .map_err(|e| PackingError::operation_failed("tiles in viewport", e))?
            .len();
        if selected == 0 || selected > MAX_INITIAL_SELECTION {
            return Err(PackingError::incorrect_selection(format!(
                "{} tiles in the initial viewport",
                selected
            )));
        }
        Ok(selected)
    }
}
