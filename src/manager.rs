//! Owner of every extractor track of one packaged media.

use std::collections::BTreeMap;

use omaf_packing::StrategyRegistry;
use tracing::{error, info};

use crate::catalog::{rank_video_streams, video_stream, StreamMap};
use crate::config::ExtractorConfig;
use crate::generator::ExtractorTrackGenerator;
use crate::oracle::{CodecMath, ViewportOracle};
use crate::pool::{RefreshFailure, SegmentationPool};
use crate::tileset::ViewportId;
use crate::track::ExtractorTrack;
use crate::PackingError;

/// Builds extractor tracks once, then hands them to the segmenter every frame.
///
/// Without a configured packing strategy the manager holds no tracks and
/// media is delivered as plain tile tracks.
#[derive(Debug)]
pub struct ExtractorTrackManager {
    config: ExtractorConfig,
    registry: StrategyRegistry,
    tracks: BTreeMap<ViewportId, ExtractorTrack>,
    tracks_per_seg_thread: usize,
}

impl ExtractorTrackManager {
    /// Manager using the built-in packing strategies.
    pub fn new(config: ExtractorConfig) -> Self {
        Self::with_registry(config, StrategyRegistry::with_builtin())
    }

    pub fn with_registry(config: ExtractorConfig, registry: StrategyRegistry) -> Self {
        Self {
            config,
            registry,
            tracks: BTreeMap::new(),
            tracks_per_seg_thread: 1,
        }
    }

    /// Generate every extractor track of `streams`.
    ///
    /// Any failure leaves the manager without tracks.
    pub fn initialize(
        &mut self,
        streams: &StreamMap,
        oracle: &mut dyn ViewportOracle,
        codec: &dyn CodecMath,
    ) -> Result<(), PackingError> {
        self.tracks.clear();
        let Some(strategy) = self.config.packing_strategy.as_deref() else {
            info!("no packing strategy configured, extractor tracks disabled");
            return Ok(());
        };

        let ranked = rank_video_streams(streams, self.config.declared_video_count)?;
        let main_tiles = match ranked.first() {
            Some(&idx) => video_stream(streams, idx)?.tile_count(),
            None => 0,
        };
        self.tracks_per_seg_thread = self.config.resolve_tracks_per_seg_thread(main_tiles);

        let generator = ExtractorTrackGenerator::new(&self.config, &self.registry);
        match generator.generate(streams, oracle, codec) {
            Ok(tracks) => {
                info!(
                    strategy,
                    tracks = tracks.len(),
                    tracks_per_seg_thread = self.tracks_per_seg_thread,
                    "extractor tracks ready"
                );
                self.tracks = tracks;
                Ok(())
            }
            Err(e) => {
                error!(strategy, error = %e, "extractor track generation failed");
                Err(e)
            }
        }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn all_extractor_tracks(&self) -> &BTreeMap<ViewportId, ExtractorTrack> {
        &self.tracks
    }

    pub fn all_extractor_tracks_mut(&mut self) -> &mut BTreeMap<ViewportId, ExtractorTrack> {
        &mut self.tracks
    }

    pub fn track(&self, viewport_id: ViewportId) -> Option<&ExtractorTrack> {
        self.tracks.get(&viewport_id)
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Tracks refreshed per segmentation worker.
    pub fn tracks_per_seg_thread(&self) -> usize {
        self.tracks_per_seg_thread
    }

    /// Refresh every track for the frame currently held by `streams`.
    pub fn refresh_frame(
        &mut self,
        streams: &StreamMap,
        codec: &dyn CodecMath,
    ) -> Vec<RefreshFailure> {
        SegmentationPool::new(self.tracks_per_seg_thread).refresh_frame(
            &mut self.tracks,
            streams,
            codec,
        )
    }

    /// Consume the manager, keeping its tracks.
    pub fn into_tracks(self) -> BTreeMap<ViewportId, ExtractorTrack> {
        self.tracks
    }
}
