//! Parameter set, slice header and SEI rewriting for merged pictures.
//!
//! Every output is taken from the codec library in Annex B form and, where it
//! ends up inside a sample, gets its start code replaced by a length field.

use omaf_packing::{PicResolution, RegionWisePacking, TileArrangement};

use crate::hevc::{nal_unit_type, write_length_field, Nalu, NAL_HEADER_LEN};
use crate::oracle::{CodecMath, ProjectionKind};
use crate::PackingError;

/// A slice header rewritten for the merged picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewrittenSlice {
    /// Length field, NAL header and new slice header.
    pub header: Vec<u8>,
    /// Offset of the slice data in the source NAL unit.
    pub data_offset: u32,
    /// Length of the slice data, excluding the original header.
    pub data_length: u32,
}

/// Borrows the codec library to rewrite headers.
#[derive(Clone, Copy)]
pub struct ParameterSetRewriter<'a> {
    codec: &'a dyn CodecMath,
}

impl<'a> ParameterSetRewriter<'a> {
    pub fn new(codec: &'a dyn CodecMath) -> Self {
        Self { codec }
    }

    /// SPS for a `dst`-sized merged picture.
    pub fn rewrite_sps(&self, orig: &Nalu, dst: PicResolution) -> Result<Nalu, PackingError> {
        if dst.width == 0 || dst.height == 0 {
            return Err(PackingError::invalid_data(format!(
                "SPS for a {}x{} picture",
                dst.width, dst.height
            )));
        }
        let input = orig.to_normalized_annex_b()?;
        let sps = self
            .codec
            .generate_sps(&input, dst)
            .map_err(|e| PackingError::operation_failed("generate SPS", e))?;
        Ok(Nalu::from_annex_b(sps))
    }

    /// PPS carrying the merged tile grid.
    pub fn rewrite_pps(&self, orig: &Nalu, arrange: &TileArrangement) -> Result<Nalu, PackingError> {
        if arrange.rows() == 0 || arrange.cols() == 0 {
            return Err(PackingError::invalid_data("PPS for an empty tile grid"));
        }
        let input = orig.to_normalized_annex_b()?;
        let pps = self
            .codec
            .generate_pps(&input, arrange)
            .map_err(|e| PackingError::operation_failed("generate PPS", e))?;
        Ok(Nalu::from_annex_b(pps))
    }

    /// New slice header placing `tile` at `ctu_index` of a `packed`-sized picture.
    ///
    /// The header's first four bytes are replaced by its big-endian length
    /// plus the length of the slice data it will be followed by.
    pub fn rewrite_slice_header(
        &self,
        tile: &Nalu,
        ctu_index: u32,
        packed: PicResolution,
    ) -> Result<RewrittenSlice, PackingError> {
        let prefix = usize::from(tile.start_codes_size)
            + NAL_HEADER_LEN
            + usize::from(tile.slice_header_len);
        if tile.len() <= prefix {
            return Err(PackingError::invalid_data(format!(
                "slice of {} bytes without data after a {} byte header",
                tile.len(),
                prefix
            )));
        }
        let data_offset = (4 + NAL_HEADER_LEN + usize::from(tile.slice_header_len)) as u32;
        let data_length = (tile.len() - prefix) as u32;

        let input = tile.to_normalized_annex_b()?;
        let mut header = self
            .codec
            .generate_slice_header(&input, ctu_index, packed)
            .map_err(|e| PackingError::operation_failed("generate slice header", e))?;
        write_length_field(&mut header)?;
        let length = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) + data_length;
        header[..4].copy_from_slice(&length.to_be_bytes());

        Ok(RewrittenSlice {
            header,
            data_offset,
            data_length,
        })
    }

    /// Projection SEI for `kind`, length-prefixed.
    pub fn projection_sei(&self, kind: ProjectionKind) -> Result<Nalu, PackingError> {
        let mut sei = self
            .codec
            .generate_projection_sei(kind)
            .map_err(|e| PackingError::operation_failed("generate projection SEI", e))?;
        write_length_field(&mut sei)?;
        Ok(sei_nalu(sei, kind.sei_payload_type()))
    }

    /// Region-wise packing SEI, length-prefixed.
    pub fn rwpk_sei(&self, rwpk: &RegionWisePacking) -> Result<Nalu, PackingError> {
        let mut sei = self
            .codec
            .generate_rwpk_sei(rwpk)
            .map_err(|e| PackingError::operation_failed("generate RWPK SEI", e))?;
        write_length_field(&mut sei)?;
        Ok(sei_nalu(
            sei,
            crate::hevc::sei_payload_type::REGION_WISE_PACKING,
        ))
    }
}

fn sei_nalu(data: Vec<u8>, payload_type: u16) -> Nalu {
    Nalu {
        data: data.into(),
        start_codes_size: 4,
        nalu_type: nal_unit_type::PREFIX_SEI,
        sei_payload_type: payload_type,
        slice_header_len: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCodec;

    fn tile() -> Nalu {
        // 3-byte start code, 2-byte header, 3-byte slice header, 5 bytes of data.
        Nalu::slice(
            vec![0, 0, 1, 0x26, 0x01, 0xaf, 0x01, 0x02, 9, 9, 9, 9, 9],
            3,
        )
    }

    #[test]
    fn test_slice_header_length_field() {
        let codec = FakeCodec::default();
        let rewriter = ParameterSetRewriter::new(&codec);
        let slice = rewriter
            .rewrite_slice_header(&tile(), 45, PicResolution { width: 2880, height: 1920 })
            .unwrap();

        // Normalized input keeps 9 bytes, then the 4-byte CTU index.
        assert_eq!(slice.header.len(), 13);
        assert_eq!(slice.data_offset, 9);
        assert_eq!(slice.data_length, 5);
        assert_eq!(&slice.header[..4], &(9u32 + 5).to_be_bytes());
        assert_eq!(&slice.header[4..6], &[0x26, 0x01]);
        assert_eq!(&slice.header[9..], &45u32.to_be_bytes());
    }

    #[test]
    fn test_slice_without_data_rejected() {
        let codec = FakeCodec::default();
        let rewriter = ParameterSetRewriter::new(&codec);
        let empty = Nalu::slice(vec![0, 0, 0, 1, 0x26, 0x01, 0xaf, 0x01, 0x02], 3);
        assert!(matches!(
            rewriter.rewrite_slice_header(&empty, 0, PicResolution { width: 64, height: 64 }),
            Err(PackingError::InvalidData(_))
        ));
        assert_eq!(FakeCodec::calls(&codec.slice_calls), 0);
    }

    #[test]
    fn test_codec_failure_maps_to_operation_failed() {
        let codec = FakeCodec {
            fail_slices: true,
            ..Default::default()
        };
        let rewriter = ParameterSetRewriter::new(&codec);
        let err = rewriter
            .rewrite_slice_header(&tile(), 0, PicResolution { width: 64, height: 64 })
            .unwrap_err();
        assert!(matches!(
            err,
            PackingError::OperationFailed { op: "generate slice header", .. }
        ));
    }

    #[test]
    fn test_parameter_sets() {
        let codec = FakeCodec::default();
        let rewriter = ParameterSetRewriter::new(&codec);
        let sps = Nalu::from_annex_b(vec![0, 0, 1, 0x42, 0x01, 0x01]);
        let out = rewriter
            .rewrite_sps(&sps, PicResolution { width: 2880, height: 1920 })
            .unwrap();
        assert_eq!(out.nalu_type, nal_unit_type::SPS);
        assert_eq!(&out.payload()[2..6], &2880u32.to_be_bytes());
        assert!(matches!(
            rewriter.rewrite_sps(&sps, PicResolution { width: 0, height: 1920 }),
            Err(PackingError::InvalidData(_))
        ));

        let pps = Nalu::from_annex_b(vec![0, 0, 0, 1, 0x44, 0x01, 0xc1]);
        let arrange = TileArrangement {
            tile_row_heights: vec![1920],
            tile_col_widths: vec![15, 15, 15],
        };
        let out = rewriter.rewrite_pps(&pps, &arrange).unwrap();
        assert_eq!(out.payload(), &[0x44, 0x01, 3, 1]);
        assert!(rewriter.rewrite_pps(&pps, &TileArrangement::default()).is_err());
    }

    #[test]
    fn test_seis_are_length_prefixed() {
        let codec = FakeCodec::default();
        let rewriter = ParameterSetRewriter::new(&codec);
        let proj = rewriter.projection_sei(ProjectionKind::Equirect).unwrap();
        assert_eq!(&proj.data[..4], &[0, 0, 0, 4]);
        assert_eq!(proj.nalu_type, nal_unit_type::PREFIX_SEI);
        assert_eq!(proj.sei_payload_type, 150);

        let rwpk = rewriter.rwpk_sei(&RegionWisePacking::default()).unwrap();
        assert_eq!(rwpk.sei_payload_type, 155);
        assert_eq!(rwpk.payload()[2], 155);
    }
}
