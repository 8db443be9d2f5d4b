//! HEVC NAL unit handling for extractor tracks.
//!
//! Only what the extractor pipeline needs: NAL type classification, Annex B
//! splitting of parameter-set blobs, start code normalization and the
//! length-field rewrite applied to generated headers and SEIs.
//!
//! # NAL layout
//!
//! ```text
//! Annex B:     00 00 00 01 | nal header (2 bytes) | payload
//! Length form: LL LL LL LL | nal header (2 bytes) | payload
//! ```
//!
//! Generated slice headers and SEIs come back from the codec library in Annex B
//! form. Their start code is overwritten with the big-endian length field
//! before they are stored in a sample.

use bytes::Bytes;

use crate::PackingError;

/// HEVC NAL unit type constants.
pub mod nal_unit_type {
    /// IDR picture with RADL pictures
    pub const IDR_W_RADL: u8 = 19;
    /// IDR picture without leading pictures
    pub const IDR_N_LP: u8 = 20;
    /// Clean random access picture
    pub const CRA: u8 = 21;
    /// Video parameter set
    pub const VPS: u8 = 32;
    /// Sequence parameter set
    pub const SPS: u8 = 33;
    /// Picture parameter set
    pub const PPS: u8 = 34;
    /// Prefix supplemental enhancement information
    pub const PREFIX_SEI: u8 = 39;
    /// Extractor (ISO/IEC 14496-15)
    pub const EXTRACTOR: u8 = 49;
}

/// OMAF SEI payload types.
pub mod sei_payload_type {
    pub const EQUIRECT_PROJECTION: u16 = 150;
    pub const CUBEMAP_PROJECTION: u16 = 151;
    pub const REGION_WISE_PACKING: u16 = 155;
}

/// Length of the Annex B start code forced onto codec-library inputs.
pub const START_CODE_LEN: usize = 4;
/// Length of the HEVC NAL unit header.
pub const NAL_HEADER_LEN: usize = 2;
/// Length of the sample length field replacing the start code.
pub const LENGTH_FIELD_LEN: usize = 4;

const ANNEX_B_START_CODE: [u8; START_CODE_LEN] = [0x00, 0x00, 0x00, 0x01];

/// NAL unit type from the first header byte.
#[must_use]
pub fn nal_type(header: u8) -> u8 {
    (header >> 1) & 0x3f
}

/// Size of the start code at the beginning of `data`: 4, 3, or 0 if none.
#[must_use]
pub fn start_code_size(data: &[u8]) -> usize {
    match data {
        [0, 0, 0, 1, ..] => 4,
        [0, 0, 1, ..] => 3,
        _ => 0,
    }
}

/// One HEVC NAL unit as carried through the extractor pipeline.
///
/// `data` keeps its leading start code (or length field). `start_codes_size`
/// says how many leading bytes that prefix takes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Nalu {
    pub data: Bytes,
    pub start_codes_size: u8,
    pub nalu_type: u8,
    /// SEI payload type; 0 for non-SEI units.
    pub sei_payload_type: u16,
    /// Slice segment header length in bytes, after the NAL header. 0 for non-slice units.
    pub slice_header_len: u16,
}

impl Nalu {
    /// Wrap an Annex B NAL unit, reading its start code and type.
    pub fn from_annex_b(data: impl Into<Bytes>) -> Self {
        let data = data.into();
        let start_codes_size = start_code_size(&data);
        let nalu_type = data.get(start_codes_size).copied().map(nal_type).unwrap_or(0);
        Self {
            data,
            start_codes_size: start_codes_size as u8,
            nalu_type,
            ..Default::default()
        }
    }

    /// Wrap a slice NAL unit whose slice header length is known.
    pub fn slice(data: impl Into<Bytes>, slice_header_len: u16) -> Self {
        Self {
            slice_header_len,
            ..Self::from_annex_b(data)
        }
    }

    /// Total size including the start code.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns true if this NAL unit is a parameter set (VPS, SPS or PPS).
    #[must_use]
    pub fn is_parameter_set(&self) -> bool {
        matches!(
            self.nalu_type,
            nal_unit_type::VPS | nal_unit_type::SPS | nal_unit_type::PPS
        )
    }

    /// Returns true if this NAL unit is a coded slice (types 0..=31).
    #[must_use]
    pub fn is_slice(&self) -> bool {
        self.nalu_type < nal_unit_type::VPS
    }

    /// Bytes after the start code, beginning with the NAL header.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.data[usize::from(self.start_codes_size).min(self.data.len())..]
    }

    /// Copy of this unit with its prefix replaced by a 4-byte Annex B start code.
    ///
    /// The codec library expects exactly four prefix bytes at offset 0, so a
    /// 3-byte start code grows by one byte.
    pub fn to_normalized_annex_b(&self) -> Result<Vec<u8>, PackingError> {
        let payload = self.payload();
        if payload.len() < NAL_HEADER_LEN {
            return Err(PackingError::invalid_data(format!(
                "NAL unit of {} bytes has no header",
                self.data.len()
            )));
        }
        let mut out = Vec::with_capacity(START_CODE_LEN + payload.len());
        out.extend_from_slice(&ANNEX_B_START_CODE);
        out.extend_from_slice(payload);
        Ok(out)
    }

    /// Fill this holder from `src`.
    ///
    /// Fails if `src` carries no data or this holder is already filled.
    pub fn set_from(&mut self, src: &Nalu, what: &'static str) -> Result<(), PackingError> {
        if src.is_empty() {
            return Err(PackingError::invalid_data(format!("empty {}", what)));
        }
        if !self.is_empty() {
            return Err(PackingError::NaluAlreadySet(what));
        }
        *self = src.clone();
        Ok(())
    }
}

/// Split an Annex B blob (e.g. VPS+SPS+PPS from an encoder) into NAL units.
///
/// Each returned unit keeps its own start code.
#[must_use]
pub fn parse_annex_b(data: &[u8]) -> Vec<Nalu> {
    let mut starts = Vec::new();
    let mut i = 0;
    while i + 2 < data.len() {
        let sc = start_code_size(&data[i..]);
        if sc > 0 {
            starts.push(i);
            i += sc;
        } else {
            i += 1;
        }
    }

    starts
        .iter()
        .enumerate()
        .filter_map(|(n, &start)| {
            let end = starts.get(n + 1).copied().unwrap_or(data.len());
            let nalu = Nalu::from_annex_b(Bytes::copy_from_slice(&data[start..end]));
            (nalu.payload().len() >= NAL_HEADER_LEN).then_some(nalu)
        })
        .collect()
}

/// Overwrite the 4-byte prefix of a generated NAL unit with its big-endian payload length.
pub fn write_length_field(buf: &mut [u8]) -> Result<(), PackingError> {
    if buf.len() < LENGTH_FIELD_LEN {
        return Err(PackingError::invalid_data(format!(
            "{} bytes cannot hold a length field",
            buf.len()
        )));
    }
    let len = (buf.len() - LENGTH_FIELD_LEN) as u32;
    buf[..LENGTH_FIELD_LEN].copy_from_slice(&len.to_be_bytes());
    Ok(())
}

/// Two-byte HEVC NAL header with layer id 0 and `temporal_id_plus1 = 1`.
#[must_use]
pub fn nal_header(nalu_type: u8) -> [u8; NAL_HEADER_LEN] {
    [(nalu_type & 0x3f) << 1, 0x01]
}
