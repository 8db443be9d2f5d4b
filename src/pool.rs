//! Per-frame extractor refresh across worker threads.
//!
//! Tracks never share mutable state, so each worker takes a disjoint chunk
//! of them. A failing track is reported and skipped for that frame; the
//! other tracks still get their extractors.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::catalog::StreamMap;
use crate::oracle::CodecMath;
use crate::tileset::ViewportId;
use crate::track::ExtractorTrack;
use crate::PackingError;

/// A track whose extractors could not be refreshed this frame.
#[derive(Debug)]
pub struct RefreshFailure {
    pub viewport_id: ViewportId,
    pub error: PackingError,
}

/// Refreshes extractor tracks in chunks, one scoped thread per chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentationPool {
    tracks_per_thread: usize,
}

impl SegmentationPool {
    pub fn new(tracks_per_thread: usize) -> Self {
        Self {
            tracks_per_thread: tracks_per_thread.max(1),
        }
    }

    pub fn tracks_per_thread(&self) -> usize {
        self.tracks_per_thread
    }

    /// Number of workers needed for `tracks` tracks.
    pub fn workers_for(&self, tracks: usize) -> usize {
        tracks.div_ceil(self.tracks_per_thread)
    }

    /// Build or update the extractors of every track for the frame held by `streams`.
    pub fn refresh_frame(
        &self,
        tracks: &mut BTreeMap<ViewportId, ExtractorTrack>,
        streams: &StreamMap,
        codec: &dyn CodecMath,
    ) -> Vec<RefreshFailure> {
        let mut batch: Vec<&mut ExtractorTrack> = tracks.values_mut().collect();
        let total = batch.len();

        let failures: Vec<RefreshFailure> = std::thread::scope(|s| {
            let workers: Vec<_> = batch
                .chunks_mut(self.tracks_per_thread)
                .map(|chunk| s.spawn(move || refresh_chunk(chunk, streams, codec)))
                .collect();
            workers
                .into_iter()
                .flat_map(|worker| {
                    worker
                        .join()
                        .unwrap_or_else(|panic| std::panic::resume_unwind(panic))
                })
                .collect()
        });

        debug!(
            tracks = total,
            workers = self.workers_for(total),
            failed = failures.len(),
            "frame refreshed"
        );
        failures
    }
}

fn refresh_chunk(
    chunk: &mut [&mut ExtractorTrack],
    streams: &StreamMap,
    codec: &dyn CodecMath,
) -> Vec<RefreshFailure> {
    let mut failures = Vec::new();
    for track in chunk.iter_mut() {
        match track.construct_extractors(streams, codec) {
            Ok(()) => {
                track.readiness().increase_processed_frames();
                track.readiness().set_frames_ready(true);
            }
            Err(error) => {
                warn!(
                    viewport_id = track.viewport_id(),
                    error = %error,
                    "extractor refresh failed"
                );
                failures.push(RefreshFailure {
                    viewport_id: track.viewport_id(),
                    error,
                });
            }
        }
    }
    failures
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{load_frame, stream_map, FakeCodec, ScriptedOracle};
    use crate::ExtractorConfig;
    use crate::ExtractorTrackManager;
    use omaf_packing::{HighResPlusFullLowResPacking, ProjectionFormat};

    fn tracks() -> BTreeMap<ViewportId, ExtractorTrack> {
        let config = ExtractorConfig::new(2).packing_strategy(HighResPlusFullLowResPacking::NAME);
        let mut manager = ExtractorTrackManager::new(config);
        manager
            .initialize(&stream_map(), &mut ScriptedOracle::reference(), &FakeCodec::default())
            .unwrap();
        manager.into_tracks()
    }

    #[test]
    fn test_workers_for() {
        let pool = SegmentationPool::new(4);
        assert_eq!(pool.workers_for(6), 2);
        assert_eq!(pool.workers_for(8), 2);
        assert_eq!(pool.workers_for(0), 0);
        assert_eq!(SegmentationPool::new(0).tracks_per_thread(), 1);
    }

    #[test]
    fn test_refresh_every_track() {
        let mut tracks = tracks();
        let mut streams = stream_map();
        let codec = FakeCodec::default();
        let pool = SegmentationPool::new(4);

        assert!(pool.refresh_frame(&mut tracks, &streams, &codec).is_empty());
        load_frame(&mut streams, 2);
        assert!(pool.refresh_frame(&mut tracks, &streams, &codec).is_empty());

        for track in tracks.values() {
            assert!(track.readiness().frames_ready());
            assert_eq!(track.readiness().processed_frames(), 2);
            assert!(track.extractors().values().all(|e| e.sample.data_length == 22));
        }
        assert_eq!(tracks[&5].extractors().len(), 10);
    }

    #[test]
    fn test_failure_isolated_to_track() {
        let mut tracks = tracks();
        tracks.insert(9, ExtractorTrack::new(9, ProjectionFormat::Erp));
        let streams = stream_map();
        let pool = SegmentationPool::new(3);

        let failures = pool.refresh_frame(&mut tracks, &streams, &FakeCodec::default());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].viewport_id, 9);
        assert!(matches!(failures[0].error, PackingError::InvalidData(_)));
        assert!(!tracks[&9].readiness().frames_ready());
        assert_eq!(tracks[&9].readiness().processed_frames(), 0);
        assert!(tracks[&0].readiness().frames_ready());
    }
}
