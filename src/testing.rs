//! Test doubles for the geometry and codec-math contract.

use std::sync::atomic::{AtomicUsize, Ordering};

use omaf_packing::{PicResolution, RegionWisePacking, TileArrangement, TileDef};

use crate::catalog::{MediaStream, StreamMap, VideoStream};
use crate::coverage::{coverage_from_rect, CoverageDef, ProjRect};
use crate::hevc::Nalu;
use crate::oracle::{CodecMath, ExternalError, ProjectionKind, ViewportOracle, ViewportParams};

pub const HIGH_BITRATE: u64 = 4166280;
pub const LOW_BITRATE: u64 = 3990720;
pub const TILE_SIZE: u32 = 960;
/// Slice header bytes following the NAL header in every fixture tile.
pub const SLICE_HEADER_LEN: u16 = 3;

const PARAMETER_SETS: [u8; 21] = [
    0, 0, 0, 1, 0x40, 0x01, 0x0c, // VPS
    0, 0, 0, 1, 0x42, 0x01, 0x01, // SPS
    0, 0, 0, 1, 0x44, 0x01, 0xc1, // PPS
];

/// Two-resolution ERP source: 3840x1920 in 4x2 tiles plus 1920x960 in 2x1 tiles.
pub struct ErpFixture {
    pub high: VideoStream,
    pub low: VideoStream,
}

pub fn erp_fixture() -> ErpFixture {
    let mut high = VideoStream::erp(3840, 1920, 2, 4, HIGH_BITRATE).unwrap();
    let mut low = VideoStream::erp(1920, 960, 1, 2, LOW_BITRATE).unwrap();
    high.set_parameter_sets(&PARAMETER_SETS).unwrap();
    low.set_parameter_sets(&PARAMETER_SETS).unwrap();
    ErpFixture { high, low }
}

/// Fixture streams keyed 0 (low) and 1 (high), with frame 0 loaded.
///
/// The low resolution stream has the smaller index so ranking by bitrate,
/// not by index, is exercised.
pub fn stream_map() -> StreamMap {
    let fixture = erp_fixture();
    let mut streams = StreamMap::new();
    streams.insert(0, MediaStream::Video(fixture.low));
    streams.insert(1, MediaStream::Video(fixture.high));
    load_frame(&mut streams, 0);
    streams
}

/// Replace every tile NAL unit with the fixture slice of `frame`.
///
/// Slice data grows by one byte per frame.
pub fn load_frame(streams: &mut StreamMap, frame: u8) {
    for (&stream_idx, stream) in streams.iter_mut() {
        let Some(vs) = stream.as_video_mut() else {
            continue;
        };
        for tile_idx in 0..vs.tile_count() as u16 {
            let mut data = vec![0, 0, 0, 1, 0x26, 0x01, 0xaf, stream_idx, tile_idx as u8];
            data.extend(std::iter::repeat(frame).take(20 + usize::from(frame)));
            vs.set_tile_nalu(tile_idx, Nalu::slice(data, SLICE_HEADER_LEN))
                .unwrap();
        }
    }
}

/// High resolution tile `idx` in geometry coordinates, index unresolved.
pub fn tile_def(idx: u16) -> TileDef {
    let (tile, cols) = (TILE_SIZE as i32, 4);
    TileDef::new(i32::from(idx) % cols * tile, i32::from(idx) / cols * tile, 0, 0)
}

pub fn tile_defs(idx: &[u16]) -> Vec<TileDef> {
    idx.iter().copied().map(tile_def).collect()
}

/// Viewport oracle replaying a fixed cycle of selections.
///
/// Every `set_viewport` advances to the next entry; `configure` rewinds.
/// When `initial` is set, the first `set_viewport` returns it instead.
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    script: Vec<Vec<TileDef>>,
    pub initial: Option<Vec<TileDef>>,
    next: usize,
    current: Vec<TileDef>,
    params: Option<ViewportParams>,
    pub poses: Vec<(f32, f32)>,
}

impl ScriptedOracle {
    pub fn new(script: Vec<Vec<TileDef>>) -> Self {
        Self {
            script,
            ..Default::default()
        }
    }

    /// Five 4-tile viewports followed by the whole picture.
    pub fn reference() -> Self {
        Self::new(vec![
            tile_defs(&[0, 1, 4, 5]),
            tile_defs(&[1, 2, 5, 6]),
            tile_defs(&[2, 3, 6, 7]),
            tile_defs(&[3, 0, 7, 4]),
            tile_defs(&[0, 1, 2, 3]),
            tile_defs(&[0, 1, 2, 3, 4, 5, 6, 7]),
        ])
    }

    pub fn last_params(&self) -> Option<ViewportParams> {
        self.params
    }
}

impl ViewportOracle for ScriptedOracle {
    fn configure(&mut self, params: &ViewportParams) -> Result<(), ExternalError> {
        self.params = Some(*params);
        self.next = 0;
        Ok(())
    }

    fn set_viewport(&mut self, yaw: f32, pitch: f32) -> Result<(), ExternalError> {
        if let Some(tiles) = self.initial.take() {
            self.current = tiles;
            self.poses.push((yaw, pitch));
            return Ok(());
        }
        if self.script.is_empty() {
            return Err(ExternalError::new(-1, "empty script"));
        }
        self.current = self.script[self.next % self.script.len()].clone();
        self.next += 1;
        self.poses.push((yaw, pitch));
        Ok(())
    }

    fn process(&mut self) -> Result<(), ExternalError> {
        Ok(())
    }

    fn tiles_in_viewport(&mut self) -> Result<Vec<TileDef>, ExternalError> {
        Ok(self.current.clone())
    }

    fn content_coverage(&mut self, tiles: &[TileDef]) -> Result<CoverageDef, ExternalError> {
        let left = tiles.iter().map(|t| t.x).min().unwrap_or(0) as u32;
        let top = tiles.iter().map(|t| t.y).min().unwrap_or(0) as u32;
        let right = tiles.iter().map(|t| t.x).max().unwrap_or(0) as u32 + TILE_SIZE;
        let bottom = tiles.iter().map(|t| t.y).max().unwrap_or(0) as u32 + TILE_SIZE;
        Ok(coverage_from_rect(
            3840,
            1920,
            ProjRect {
                left,
                top,
                width: right - left,
                height: bottom - top,
            },
        ))
    }
}

/// Deterministic codec math counting its calls.
///
/// Outputs carry their inputs in a recognizable form:
/// - slice header: start code, NAL header, 3 header bytes, CTU index (u32 BE)
/// - SPS: start code, NAL header, width and height (u32 BE)
/// - PPS: start code, NAL header, tile column and row counts
/// - SEIs: start code, NAL header, payload type, one byte of content
#[derive(Debug, Default)]
pub struct FakeCodec {
    pub slice_calls: AtomicUsize,
    pub sps_calls: AtomicUsize,
    pub pps_calls: AtomicUsize,
    pub projection_calls: AtomicUsize,
    pub rwpk_calls: AtomicUsize,
    /// Fail the PPS call with this zero-based number.
    pub fail_pps_call: Option<usize>,
    pub fail_slices: bool,
}

impl FakeCodec {
    pub fn calls(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

impl CodecMath for FakeCodec {
    fn generate_slice_header(
        &self,
        nalu: &[u8],
        ctu_index: u32,
        _dst: PicResolution,
    ) -> Result<Vec<u8>, ExternalError> {
        self.slice_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_slices {
            return Err(ExternalError::new(-2, "slice header"));
        }
        if nalu.len() < 9 || nalu[..4] != [0, 0, 0, 1] {
            return Err(ExternalError::new(-3, "not a normalized slice"));
        }
        let mut out = nalu[..9].to_vec();
        out.extend_from_slice(&ctu_index.to_be_bytes());
        Ok(out)
    }

    fn generate_sps(&self, sps: &[u8], dst: PicResolution) -> Result<Vec<u8>, ExternalError> {
        self.sps_calls.fetch_add(1, Ordering::SeqCst);
        let mut out = sps[..6].to_vec();
        out.extend_from_slice(&dst.width.to_be_bytes());
        out.extend_from_slice(&dst.height.to_be_bytes());
        Ok(out)
    }

    fn generate_pps(&self, pps: &[u8], arrange: &TileArrangement) -> Result<Vec<u8>, ExternalError> {
        let call = self.pps_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pps_call == Some(call) {
            return Err(ExternalError::new(-4, "pps"));
        }
        let mut out = pps[..6].to_vec();
        out.push(arrange.cols() as u8);
        out.push(arrange.rows() as u8);
        Ok(out)
    }

    fn generate_projection_sei(&self, kind: ProjectionKind) -> Result<Vec<u8>, ExternalError> {
        self.projection_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0, 0, 0, 1, 0x4e, 0x01, kind.sei_payload_type() as u8, 0x01])
    }

    fn generate_rwpk_sei(&self, rwpk: &RegionWisePacking) -> Result<Vec<u8>, ExternalError> {
        self.rwpk_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![0, 0, 0, 1, 0x4e, 0x01, 155, rwpk.num_regions() as u8])
    }
}
