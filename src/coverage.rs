//! Sphere coverage of a tile-set.

use omaf_packing::{ContentCoverage, ProjectionFormat, SphereRegion};

/// Angles are stored in units of 2^-16 degrees.
pub const DEGREE_UNITS: f64 = 65536.0;

/// Coverage of one tile-set as reported by the geometry library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CoverageDef {
    pub centre_azimuth: i32,
    pub centre_elevation: i32,
    pub azimuth_range: u32,
    pub elevation_range: u32,
}

impl CoverageDef {
    /// Single-region `ContentCoverage` for a track of the given projection.
    #[must_use]
    pub fn to_content_coverage(&self, projection: ProjectionFormat) -> ContentCoverage {
        ContentCoverage {
            coverage_shape_type: u8::from(projection == ProjectionFormat::Erp),
            view_idc_presence_flag: false,
            default_view_idc: 0,
            sphere_regions: vec![SphereRegion {
                view_idc: 0,
                centre_azimuth: self.centre_azimuth,
                centre_elevation: self.centre_elevation,
                centre_tilt: 0,
                azimuth_range: self.azimuth_range,
                elevation_range: self.elevation_range,
                interpolate: false,
            }],
        }
    }
}

/// Rectangle in projected ERP picture coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProjRect {
    pub left: u32,
    pub top: u32,
    pub width: u32,
    pub height: u32,
}

/// Coverage of an ERP rectangle in a `pic_width x pic_height` picture.
///
/// Azimuth grows to the left of the picture centre, elevation grows upward.
#[must_use]
pub fn coverage_from_rect(pic_width: u32, pic_height: u32, rect: ProjRect) -> CoverageDef {
    let (w, h) = (f64::from(pic_width.max(1)), f64::from(pic_height.max(1)));
    let centre_x = f64::from(rect.left) + f64::from(rect.width) / 2.0;
    let centre_y = f64::from(rect.top) + f64::from(rect.height) / 2.0;
    CoverageDef {
        centre_azimuth: ((w / 2.0 - centre_x) * 360.0 * DEGREE_UNITS / w) as i32,
        centre_elevation: ((h / 2.0 - centre_y) * 180.0 * DEGREE_UNITS / h) as i32,
        azimuth_range: (f64::from(rect.width) * 360.0 * DEGREE_UNITS / w) as u32,
        elevation_range: (f64::from(rect.height) * 180.0 * DEGREE_UNITS / h) as u32,
    }
}
