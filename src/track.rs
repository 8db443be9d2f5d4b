//! Extractor tracks: one merged viewport picture assembled from tile slices.
//!
//! A track's topology (packing, merge order, parameter sets) is fixed when the
//! generator builds it. Every frame only the extractors change: a rewritten
//! slice header carried inline, and a reference to the slice data in the
//! source tile track.
//!
//! # Extractor NAL layout
//!
//! ```text
//! +-------------+---------+--------------------------+-----------------------------+
//! | length (4)  | 62 01   | 02 len header bytes...   | 00 ref off data_off data_len | ...
//! +-------------+---------+--------------------------+-----------------------------+
//!                NAL hdr    inline constructor          sample constructor
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::{BufMut, Bytes, BytesMut};
use omaf_packing::{
    ContentCoverage, PicResolution, ProjectionFormat, RegionWisePacking, TileDef,
    TilesMergeDirectionInCol,
};
use tracing::{debug, trace};

use crate::catalog::{video_stream, StreamMap};
use crate::hevc::{nal_header, nal_unit_type, Nalu, LENGTH_FIELD_LEN};
use crate::oracle::{CodecMath, ProjectionKind};
use crate::rewriter::{ParameterSetRewriter, RewrittenSlice};
use crate::tileset::ViewportId;
use crate::PackingError;

/// Constructor type of an inline constructor.
const INLINE_CONSTRUCTOR: u8 = 2;
/// Constructor type of a sample constructor.
const SAMPLE_CONSTRUCTOR: u8 = 0;
/// Largest inline constructor payload; its length is a single byte.
pub const MAX_INLINE_LEN: usize = u8::MAX as usize;

/// Reference to slice data in a source tile track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SampleConstructor {
    /// Media stream holding the referenced tile.
    pub stream_idx: u8,
    /// Tile index in the referenced stream.
    pub track_ref_index: u16,
    pub sample_offset: i8,
    /// Offset of the slice data in the referenced sample.
    pub data_offset: u32,
    /// Length of the slice data.
    pub data_length: u32,
}

/// Bytes carried in the extractor itself.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InlineConstructor {
    /// Length field, NAL header and rewritten slice header.
    pub data: Vec<u8>,
}

impl InlineConstructor {
    #[must_use]
    pub fn length(&self) -> usize {
        self.data.len()
    }
}

/// One tile of one frame of a merged picture.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Extractor {
    pub sample: SampleConstructor,
    pub inline: InlineConstructor,
}

/// Extractor availability of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TrackState {
    /// No usable extractors.
    #[default]
    Uninitialized,
    /// Extractors are being built or refreshed.
    Building,
    /// Extractors of the current frame are complete.
    Ready,
}

#[derive(Debug, Default)]
struct Readiness {
    state: TrackState,
    processed_frames: u64,
}

/// Per-track readiness shared between the producer and segmentation workers.
///
/// Accessors hold the lock only for the read or write. A consumer waiting for
/// a frame polls [`frames_ready`](Self::frames_ready).
#[derive(Debug, Default)]
pub struct TrackReadiness {
    inner: Mutex<Readiness>,
}

impl TrackReadiness {
    fn lock(&self) -> MutexGuard<'_, Readiness> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn state(&self) -> TrackState {
        self.lock().state
    }

    pub fn set_state(&self, state: TrackState) {
        self.lock().state = state;
    }

    pub fn frames_ready(&self) -> bool {
        self.lock().state == TrackState::Ready
    }

    pub fn set_frames_ready(&self, ready: bool) {
        self.lock().state = if ready {
            TrackState::Ready
        } else {
            TrackState::Uninitialized
        };
    }

    pub fn processed_frames(&self) -> u64 {
        self.lock().processed_frames
    }

    /// Count one more processed frame, returning the new total.
    pub fn increase_processed_frames(&self) -> u64 {
        let mut inner = self.lock();
        inner.processed_frames += 1;
        inner.processed_frames
    }
}

/// Extractor track of one viewport.
#[derive(Debug)]
pub struct ExtractorTrack {
    viewport_id: ViewportId,
    projection: ProjectionFormat,
    vps: Nalu,
    sps: Nalu,
    pps: Nalu,
    projection_sei: Option<Nalu>,
    rwpk_sei: Option<Nalu>,
    dst_rwpk: RegionWisePacking,
    coverage: ContentCoverage,
    merge_dir: TilesMergeDirectionInCol,
    pic_res: Vec<PicResolution>,
    tiles: Vec<TileDef>,
    /// Keyed by position in merge order.
    extractors: BTreeMap<u16, Extractor>,
    readiness: Arc<TrackReadiness>,
    seg_nalus: Vec<Bytes>,
}

impl ExtractorTrack {
    /// Empty track for `viewport_id`. Topology is filled by the generator.
    #[must_use]
    pub fn new(viewport_id: ViewportId, projection: ProjectionFormat) -> Self {
        Self {
            viewport_id,
            projection,
            vps: Nalu::default(),
            sps: Nalu::default(),
            pps: Nalu::default(),
            projection_sei: None,
            rwpk_sei: None,
            dst_rwpk: RegionWisePacking::default(),
            coverage: ContentCoverage::default(),
            merge_dir: TilesMergeDirectionInCol::default(),
            pic_res: Vec::new(),
            tiles: Vec::new(),
            extractors: BTreeMap::new(),
            readiness: Arc::new(TrackReadiness::default()),
            seg_nalus: Vec::new(),
        }
    }

    pub(crate) fn set_parameter_sets(
        &mut self,
        vps: &Nalu,
        sps: &Nalu,
        pps: &Nalu,
    ) -> Result<(), PackingError> {
        self.vps.set_from(vps, "VPS")?;
        self.sps.set_from(sps, "SPS")?;
        self.pps.set_from(pps, "PPS")
    }

    pub(crate) fn set_topology(
        &mut self,
        tiles: Vec<TileDef>,
        dst_rwpk: RegionWisePacking,
        merge_dir: TilesMergeDirectionInCol,
        coverage: ContentCoverage,
        pic_res: Vec<PicResolution>,
    ) {
        self.tiles = tiles;
        self.dst_rwpk = dst_rwpk;
        self.merge_dir = merge_dir;
        self.coverage = coverage;
        self.pic_res = pic_res;
    }

    pub fn viewport_id(&self) -> ViewportId {
        self.viewport_id
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

    pub fn dst_rwpk(&self) -> &RegionWisePacking {
        &self.dst_rwpk
    }

    pub fn content_coverage(&self) -> &ContentCoverage {
        &self.coverage
    }

    pub fn merge_direction(&self) -> &TilesMergeDirectionInCol {
        &self.merge_dir
    }

    /// Resolution of every video stream, highest bitrate first.
    pub fn pic_resolutions(&self) -> &[PicResolution] {
        &self.pic_res
    }

    /// Viewport tiles this track was packed from.
    pub fn tiles(&self) -> &[TileDef] {
        &self.tiles
    }

    pub fn packed_pic_size(&self) -> PicResolution {
        PicResolution {
            width: self.dst_rwpk.packed_pic_width,
            height: self.dst_rwpk.packed_pic_height,
        }
    }

    /// Extractors of the current frame, keyed by merge position.
    pub fn extractors(&self) -> &BTreeMap<u16, Extractor> {
        &self.extractors
    }

    pub fn readiness(&self) -> &Arc<TrackReadiness> {
        &self.readiness
    }

    /// Build or refresh the extractors for the frame currently held by `streams`.
    ///
    /// The first call, and the first after [`destroy_extractors`](Self::destroy_extractors),
    /// generates every extractor. Later calls only refresh header bytes and
    /// data offsets. On failure the previous extractors are kept and the track
    /// reads as not ready.
    pub fn construct_extractors(
        &mut self,
        streams: &StreamMap,
        codec: &dyn CodecMath,
    ) -> Result<(), PackingError> {
        self.readiness.set_state(TrackState::Building);
        let result = if self.extractors.is_empty() {
            self.generate_extractors(streams, codec)
        } else {
            self.update_extractors(streams, codec)
        };
        self.readiness.set_state(if result.is_ok() {
            TrackState::Ready
        } else {
            TrackState::Uninitialized
        });
        result
    }

    /// Build one extractor per tile of the merged picture.
    pub fn generate_extractors(
        &mut self,
        streams: &StreamMap,
        codec: &dyn CodecMath,
    ) -> Result<(), PackingError> {
        let slices = self.rewrite_slices(streams, codec)?;
        let extractors: BTreeMap<u16, Extractor> = self
            .merge_dir
            .iter()
            .zip(slices)
            .enumerate()
            .map(|(pos, (tile, slice))| {
                let extractor = Extractor {
                    sample: SampleConstructor {
                        stream_idx: tile.stream_idx_in_media,
                        track_ref_index: tile.orig_tile_idx,
                        sample_offset: 0,
                        data_offset: slice.data_offset,
                        data_length: slice.data_length,
                    },
                    inline: InlineConstructor { data: slice.header },
                };
                (pos as u16, extractor)
            })
            .collect();
        self.extractors = extractors;
        debug!(
            viewport_id = self.viewport_id,
            extractors = self.extractors.len(),
            "extractors generated"
        );
        Ok(())
    }

    /// Refresh existing extractors for a new frame.
    pub fn update_extractors(
        &mut self,
        streams: &StreamMap,
        codec: &dyn CodecMath,
    ) -> Result<(), PackingError> {
        if self.extractors.is_empty() {
            return Err(PackingError::invalid_data(format!(
                "track {} has no extractors to update",
                self.viewport_id
            )));
        }
        if let Some(missing) =
            (0..self.merge_dir.tile_count() as u16).find(|pos| !self.extractors.contains_key(pos))
        {
            return Err(PackingError::ExtractorNotFound(missing));
        }

        let slices = self.rewrite_slices(streams, codec)?;
        for (pos, slice) in slices.into_iter().enumerate() {
            let pos = pos as u16;
            let extractor = self
                .extractors
                .get_mut(&pos)
                .ok_or(PackingError::ExtractorNotFound(pos))?;
            extractor.inline.data = slice.header;
            extractor.sample.data_offset = slice.data_offset;
            extractor.sample.data_length = slice.data_length;
        }
        trace!(viewport_id = self.viewport_id, "extractors updated");
        Ok(())
    }

    /// Rewritten slice header of every tile, in merge order.
    fn rewrite_slices(
        &self,
        streams: &StreamMap,
        codec: &dyn CodecMath,
    ) -> Result<Vec<RewrittenSlice>, PackingError> {
        let packed = self.packed_pic_size();
        if packed.width == 0 || packed.height == 0 {
            return Err(PackingError::invalid_data(format!(
                "track {} has a {}x{} packed picture",
                self.viewport_id, packed.width, packed.height
            )));
        }
        if self.merge_dir.is_empty() {
            return Err(PackingError::null_pointer("tiles merge direction"));
        }

        let rewriter = ParameterSetRewriter::new(codec);
        self.merge_dir
            .iter()
            .map(|tile| {
                let stream = video_stream(streams, tile.stream_idx_in_media)?;
                let info = stream.tile(tile.orig_tile_idx).ok_or_else(|| {
                    PackingError::null_pointer(format!(
                        "tile {} of stream {}",
                        tile.orig_tile_idx, tile.stream_idx_in_media
                    ))
                })?;
                if info.nalu.is_empty() {
                    return Err(PackingError::null_pointer(format!(
                        "NAL unit of tile {} in stream {}",
                        tile.orig_tile_idx, tile.stream_idx_in_media
                    )));
                }
                let slice = rewriter.rewrite_slice_header(&info.nalu, tile.dst_ctu_index, packed)?;
                if slice.header.len() > MAX_INLINE_LEN {
                    return Err(PackingError::invalid_data(format!(
                        "{} byte slice header does not fit an inline constructor",
                        slice.header.len()
                    )));
                }
                Ok(slice)
            })
            .collect()
    }

    /// Drop every extractor, keeping the topology.
    pub fn destroy_extractors(&mut self) {
        self.extractors.clear();
        self.readiness.set_state(TrackState::Uninitialized);
    }

    /// Projection SEI, generated on first use.
    pub fn projection_sei(&mut self, codec: &dyn CodecMath) -> Result<&Nalu, PackingError> {
        if self.projection_sei.is_none() {
            let kind = ProjectionKind::for_projection(self.projection)
                .ok_or(PackingError::UnsupportedProjection)?;
            let sei = ParameterSetRewriter::new(codec).projection_sei(kind)?;
            self.projection_sei = Some(sei);
        }
        self.projection_sei
            .as_ref()
            .ok_or_else(|| PackingError::null_pointer("projection SEI"))
    }

    /// Region-wise packing SEI, generated on first use.
    pub fn rwpk_sei(&mut self, codec: &dyn CodecMath) -> Result<&Nalu, PackingError> {
        if self.rwpk_sei.is_none() {
            let sei = ParameterSetRewriter::new(codec).rwpk_sei(&self.dst_rwpk)?;
            self.rwpk_sei = Some(sei);
        }
        self.rwpk_sei
            .as_ref()
            .ok_or_else(|| PackingError::null_pointer("RWPK SEI"))
    }

    /// Serialize the current extractors into one length-prefixed extractor NAL unit.
    pub fn extractors_nalu(&self) -> Result<Bytes, PackingError> {
        if self.extractors.is_empty() {
            return Err(PackingError::invalid_data(format!(
                "track {} has no extractors",
                self.viewport_id
            )));
        }
        let size = self
            .extractors
            .values()
            .map(|e| 2 + e.inline.length() + 11)
            .sum::<usize>();
        let mut buf = BytesMut::with_capacity(LENGTH_FIELD_LEN + 2 + size);
        buf.put_u32(0);
        buf.put_slice(&nal_header(nal_unit_type::EXTRACTOR));
        for extractor in self.extractors.values() {
            buf.put_u8(INLINE_CONSTRUCTOR);
            buf.put_u8(extractor.inline.length() as u8);
            buf.put_slice(&extractor.inline.data);

            let sample = &extractor.sample;
            let track_ref = u8::try_from(sample.track_ref_index).map_err(|_| {
                PackingError::invalid_data(format!(
                    "track reference {} does not fit a sample constructor",
                    sample.track_ref_index
                ))
            })?;
            buf.put_u8(SAMPLE_CONSTRUCTOR);
            buf.put_u8(track_ref);
            buf.put_i8(sample.sample_offset);
            buf.put_u32(sample.data_offset);
            buf.put_u32(sample.data_length);
        }
        let len = (buf.len() - LENGTH_FIELD_LEN) as u32;
        buf[..LENGTH_FIELD_LEN].copy_from_slice(&len.to_be_bytes());
        Ok(buf.freeze())
    }

    /// Queue the current extractor NAL unit for the open segment.
    pub fn add_extractors_nalu_to_seg(&mut self) -> Result<(), PackingError> {
        let nalu = self.extractors_nalu()?;
        self.seg_nalus.push(nalu);
        Ok(())
    }

    /// Release every NAL unit queued for the open segment.
    pub fn destroy_curr_seg_nalus(&mut self) {
        self.seg_nalus.clear();
    }

    /// Extractor NAL units queued for the open segment.
    pub fn curr_seg_nalus(&self) -> &[Bytes] {
        &self.seg_nalus
    }

    /// Open a segment. Queued NAL units are released when the scope ends.
    pub fn segment_scope(&mut self) -> SegmentScope<'_> {
        SegmentScope { track: self }
    }
}

/// Extractor NAL units of one output segment.
///
/// [`finish`](Self::finish) hands the queued units to the segment writer.
/// Dropping the scope without finishing discards them.
pub struct SegmentScope<'a> {
    track: &'a mut ExtractorTrack,
}

impl SegmentScope<'_> {
    /// Queue the current frame's extractor NAL unit.
    pub fn add_extractors_nalu(&mut self) -> Result<(), PackingError> {
        self.track.add_extractors_nalu_to_seg()
    }

    pub fn track(&mut self) -> &mut ExtractorTrack {
        self.track
    }

    /// Close the segment, returning its NAL units.
    pub fn finish(self) -> Vec<Bytes> {
        std::mem::take(&mut self.track.seg_nalus)
    }
}

impl Drop for SegmentScope<'_> {
    fn drop(&mut self) {
        if !self.track.seg_nalus.is_empty() {
            debug!(
                viewport_id = self.track.viewport_id,
                nalus = self.track.seg_nalus.len(),
                "discarding unfinished segment"
            );
            self.track.destroy_curr_seg_nalus();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{load_frame, stream_map, FakeCodec, SLICE_HEADER_LEN};
    use omaf_packing::SingleTile;

    /// Track merging high tiles 1 and 5 above each other, then low tile 0.
    fn track() -> ExtractorTrack {
        let tile = |stream_idx_in_media, orig_tile_idx, dst_ctu_index| SingleTile {
            stream_idx_in_media,
            orig_tile_idx,
            dst_ctu_index,
        };
        let mut track = ExtractorTrack::new(3, ProjectionFormat::Erp);
        track.set_topology(
            Vec::new(),
            RegionWisePacking {
                packed_pic_width: 1920,
                packed_pic_height: 1920,
                ..Default::default()
            },
            TilesMergeDirectionInCol {
                columns: vec![vec![tile(1, 1, 0), tile(1, 5, 450)], vec![tile(0, 0, 15)]],
            },
            ContentCoverage::default(),
            Vec::new(),
        );
        track
    }

    #[test]
    fn test_generate_extractors() {
        let streams = stream_map();
        let codec = FakeCodec::default();
        let mut track = track();
        track.construct_extractors(&streams, &codec).unwrap();

        assert_eq!(track.extractors().len(), 3);
        assert!(track.readiness().frames_ready());
        let second = &track.extractors()[&1];
        assert_eq!(second.sample.stream_idx, 1);
        assert_eq!(second.sample.track_ref_index, 5);
        assert_eq!(second.sample.sample_offset, 0);
        assert_eq!(second.sample.data_offset, 4 + 2 + u32::from(SLICE_HEADER_LEN));
        // 29 byte fixture slice minus start code, NAL header and slice header.
        assert_eq!(second.sample.data_length, 20);
        assert_eq!(&second.inline.data[9..], &450u32.to_be_bytes());
        for extractor in track.extractors().values() {
            assert!(extractor.inline.length() > 0);
            assert!(extractor.sample.data_length > 0);
            let len = u32::from_be_bytes(extractor.inline.data[..4].try_into().unwrap());
            assert_eq!(
                len as usize,
                extractor.inline.length() - 4 + extractor.sample.data_length as usize
            );
        }
    }

    #[test]
    fn test_update_refreshes_lengths() {
        let mut streams = stream_map();
        let codec = FakeCodec::default();
        let mut track = track();
        track.construct_extractors(&streams, &codec).unwrap();

        load_frame(&mut streams, 4);
        track.construct_extractors(&streams, &codec).unwrap();
        assert_eq!(track.extractors().len(), 3);
        assert_eq!(track.extractors()[&0].sample.data_length, 24);
        assert_eq!(FakeCodec::calls(&codec.slice_calls), 6);
    }

    #[test]
    fn test_destroy_then_regenerate() {
        let streams = stream_map();
        let codec = FakeCodec::default();
        let mut track = track();
        track.construct_extractors(&streams, &codec).unwrap();
        let first = track.extractors().clone();

        track.destroy_extractors();
        assert!(track.extractors().is_empty());
        assert!(!track.readiness().frames_ready());
        assert!(matches!(
            track.update_extractors(&streams, &codec),
            Err(PackingError::InvalidData(_))
        ));

        track.construct_extractors(&streams, &codec).unwrap();
        assert_eq!(track.extractors(), &first);
    }

    #[test]
    fn test_missing_stream() {
        let mut streams = stream_map();
        streams.remove(&0);
        let codec = FakeCodec::default();
        let mut track = track();
        assert!(matches!(
            track.construct_extractors(&streams, &codec),
            Err(PackingError::StreamNotFound(0))
        ));
        assert!(track.extractors().is_empty());
        assert_eq!(track.readiness().state(), TrackState::Uninitialized);
    }

    #[test]
    fn test_failed_update_keeps_previous_frame() {
        let streams = stream_map();
        let mut track = track();
        track
            .construct_extractors(&streams, &FakeCodec::default())
            .unwrap();
        let before = track.extractors().clone();

        let failing = FakeCodec {
            fail_slices: true,
            ..Default::default()
        };
        assert!(matches!(
            track.construct_extractors(&streams, &failing),
            Err(PackingError::OperationFailed { .. })
        ));
        assert_eq!(track.extractors(), &before);
        assert!(!track.readiness().frames_ready());
    }

    #[test]
    fn test_update_with_missing_extractor() {
        let streams = stream_map();
        let codec = FakeCodec::default();
        let mut track = track();
        track.construct_extractors(&streams, &codec).unwrap();
        track.extractors.remove(&2);
        assert!(matches!(
            track.update_extractors(&streams, &codec),
            Err(PackingError::ExtractorNotFound(2))
        ));
    }

    #[test]
    fn test_zero_packed_size() {
        let streams = stream_map();
        let mut track = track();
        track.dst_rwpk.packed_pic_height = 0;
        assert!(matches!(
            track.generate_extractors(&streams, &FakeCodec::default()),
            Err(PackingError::InvalidData(_))
        ));
    }

    #[test]
    fn test_seis_generated_once() {
        let codec = FakeCodec::default();
        let mut track = track();
        let first = track.projection_sei(&codec).unwrap().clone();
        let second = track.projection_sei(&codec).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(first.sei_payload_type, 150);
        assert_eq!(FakeCodec::calls(&codec.projection_calls), 1);

        track.rwpk_sei(&codec).unwrap();
        track.rwpk_sei(&codec).unwrap();
        assert_eq!(FakeCodec::calls(&codec.rwpk_calls), 1);

        let mut planar = ExtractorTrack::new(0, ProjectionFormat::Planar);
        assert!(matches!(
            planar.projection_sei(&codec),
            Err(PackingError::UnsupportedProjection)
        ));
    }

    #[test]
    fn test_parameter_sets_set_once() {
        let vps = Nalu::from_annex_b(vec![0, 0, 0, 1, 0x40, 0x01]);
        let sps = Nalu::from_annex_b(vec![0, 0, 0, 1, 0x42, 0x01]);
        let pps = Nalu::from_annex_b(vec![0, 0, 0, 1, 0x44, 0x01]);
        let mut track = track();
        track.set_parameter_sets(&vps, &sps, &pps).unwrap();
        assert_eq!(track.sps(), &sps);
        assert!(matches!(
            track.set_parameter_sets(&vps, &sps, &pps),
            Err(PackingError::NaluAlreadySet("VPS"))
        ));
    }

    #[test]
    fn test_extractors_nalu_layout() {
        let streams = stream_map();
        let mut track = track();
        track
            .construct_extractors(&streams, &FakeCodec::default())
            .unwrap();
        let nalu = track.extractors_nalu().unwrap();

        let len = u32::from_be_bytes(nalu[..4].try_into().unwrap()) as usize;
        assert_eq!(len, nalu.len() - 4);
        assert_eq!(&nalu[4..6], &[0x62, 0x01]);

        // First tile: inline constructor of 13 bytes, then its sample constructor.
        assert_eq!(&nalu[6..8], &[INLINE_CONSTRUCTOR, 13]);
        let sample = &nalu[21..32];
        assert_eq!(sample[0], SAMPLE_CONSTRUCTOR);
        assert_eq!(sample[1], 1);
        assert_eq!(sample[2], 0);
        assert_eq!(&sample[3..7], &9u32.to_be_bytes());
        assert_eq!(&sample[7..11], &20u32.to_be_bytes());
        assert_eq!(nalu.len(), 6 + 3 * (2 + 13 + 11));

        assert!(ExtractorTrack::new(0, ProjectionFormat::Erp)
            .extractors_nalu()
            .is_err());
    }

    #[test]
    fn test_segment_scope() {
        let streams = stream_map();
        let mut track = track();
        track
            .construct_extractors(&streams, &FakeCodec::default())
            .unwrap();

        let finished = {
            let mut seg = track.segment_scope();
            seg.add_extractors_nalu().unwrap();
            seg.add_extractors_nalu().unwrap();
            seg.finish()
        };
        assert_eq!(finished.len(), 2);
        assert!(track.curr_seg_nalus().is_empty());

        {
            let mut seg = track.segment_scope();
            seg.add_extractors_nalu().unwrap();
            assert_eq!(seg.track().curr_seg_nalus().len(), 1);
        }
        assert!(track.curr_seg_nalus().is_empty());

        track.add_extractors_nalu_to_seg().unwrap();
        assert_eq!(track.curr_seg_nalus().len(), 1);
        track.destroy_curr_seg_nalus();
        assert!(track.curr_seg_nalus().is_empty());
    }

    #[test]
    fn test_readiness_counters() {
        let readiness = TrackReadiness::default();
        assert_eq!(readiness.state(), TrackState::Uninitialized);
        assert_eq!(readiness.increase_processed_frames(), 1);
        assert_eq!(readiness.increase_processed_frames(), 2);
        assert_eq!(readiness.processed_frames(), 2);
        readiness.set_frames_ready(true);
        assert!(readiness.frames_ready());
        readiness.set_state(TrackState::Building);
        assert!(!readiness.frames_ready());
    }
}
