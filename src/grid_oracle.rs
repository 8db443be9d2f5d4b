//! Approximate viewport geometry on an ERP tile grid.
//!
//! Maps the viewport's yaw/pitch box straight onto the projected picture,
//! ignoring the sphere-to-plane distortion away from the equator. Good enough
//! to plan extractor tracks without the real geometry library.
//!
//! ```text
//!   x = (0.5 - azimuth / 360) * W        azimuth grows to the left
//!   y = (0.5 - elevation / 180) * H      elevation grows upward
//! ```

use std::collections::BTreeSet;

use omaf_packing::{ProjectionFormat, TileDef};

use crate::coverage::{coverage_from_rect, CoverageDef, ProjRect, DEGREE_UNITS};
use crate::oracle::{ExternalError, ViewportOracle, ViewportParams};

const NOT_CONFIGURED: i32 = -1;
const UNSUPPORTED: i32 = -2;

/// Tile selection by box overlap on an equirectangular tile grid.
#[derive(Debug, Default)]
pub struct ErpGridOracle {
    params: Option<ViewportParams>,
    pose: (f32, f32),
    selection: Vec<TileDef>,
}

impl ErpGridOracle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn params(&self) -> Result<&ViewportParams, ExternalError> {
        self.params
            .as_ref()
            .ok_or_else(|| ExternalError::new(NOT_CONFIGURED, "viewport not configured"))
    }

    fn tile_size(params: &ViewportParams) -> (u32, u32) {
        (
            params.in_width / u32::from(params.tile_cols),
            params.in_height / u32::from(params.tile_rows),
        )
    }
}

fn x_of(azimuth: f64, width: f64) -> f64 {
    (0.5 - azimuth / 360.0) * width
}

fn y_of(elevation: f64, height: f64) -> f64 {
    (0.5 - elevation.clamp(-90.0, 90.0) / 180.0) * height
}

impl ViewportOracle for ErpGridOracle {
    fn configure(&mut self, params: &ViewportParams) -> Result<(), ExternalError> {
        if params.projection != ProjectionFormat::Erp {
            return Err(ExternalError::new(UNSUPPORTED, "only ERP sources are supported"));
        }
        if params.tile_rows == 0
            || params.tile_cols == 0
            || params.in_width < u32::from(params.tile_cols)
            || params.in_height < u32::from(params.tile_rows)
        {
            return Err(ExternalError::new(UNSUPPORTED, "empty tile grid"));
        }
        self.params = Some(*params);
        self.selection.clear();
        Ok(())
    }

    fn set_viewport(&mut self, yaw: f32, pitch: f32) -> Result<(), ExternalError> {
        self.params()?;
        self.pose = (yaw, pitch);
        Ok(())
    }

    fn process(&mut self) -> Result<(), ExternalError> {
        let params = *self.params()?;
        let (tile_w, tile_h) = Self::tile_size(&params);
        let (width, height) = (f64::from(params.in_width), f64::from(params.in_height));
        let (cols, rows) = (i64::from(params.tile_cols), i64::from(params.tile_rows));
        let (yaw, pitch) = (f64::from(self.pose.0), f64::from(self.pose.1));
        let (half_h, half_v) = (
            f64::from(params.viewport.fov_h) / 2.0,
            f64::from(params.viewport.fov_v) / 2.0,
        );

        let (top, bottom) = (pitch + half_v, pitch - half_v);
        let touches_pole = top >= 90.0 || bottom <= -90.0;
        let columns: Vec<i64> = if touches_pole || half_h * 2.0 >= 360.0 {
            (0..cols).collect()
        } else {
            let first = (x_of(yaw + half_h, width) / f64::from(tile_w)).floor() as i64;
            let last = (x_of(yaw - half_h, width) / f64::from(tile_w)).ceil() as i64 - 1;
            if last - first + 1 >= cols {
                (0..cols).collect()
            } else {
                (first..=last).map(|c| c.rem_euclid(cols)).collect()
            }
        };

        let first_row = (y_of(top, height) / f64::from(tile_h)).floor() as i64;
        let last_row = (y_of(bottom, height) / f64::from(tile_h)).ceil() as i64 - 1;
        let (first_row, last_row) = (first_row.clamp(0, rows - 1), last_row.clamp(0, rows - 1));

        self.selection = (first_row..=last_row)
            .flat_map(|row| columns.iter().map(move |&col| (row, col)))
            .map(|(row, col)| {
                TileDef::new(
                    (col as u32 * tile_w) as i32,
                    (row as u32 * tile_h) as i32,
                    0,
                    (row * cols + col) as u16,
                )
            })
            .collect();
        Ok(())
    }

    fn tiles_in_viewport(&mut self) -> Result<Vec<TileDef>, ExternalError> {
        self.params()?;
        Ok(self.selection.clone())
    }

    fn content_coverage(&mut self, tiles: &[TileDef]) -> Result<CoverageDef, ExternalError> {
        let params = *self.params()?;
        if tiles.is_empty() {
            return Err(ExternalError::new(UNSUPPORTED, "no tiles to cover"));
        }
        let (tile_w, tile_h) = Self::tile_size(&params);
        let cols = u32::from(params.tile_cols);

        let used: BTreeSet<u32> = tiles.iter().map(|t| t.x as u32 / tile_w).collect();
        // A wrapped span starts at the column whose left neighbour is unused.
        let start = used
            .iter()
            .copied()
            .find(|&c| !used.contains(&((c + cols - 1) % cols)))
            .unwrap_or(0);
        let top = tiles.iter().map(|t| t.y as u32).min().unwrap_or(0);
        let bottom = tiles.iter().map(|t| t.y as u32).max().unwrap_or(0) + tile_h;

        let mut coverage = coverage_from_rect(
            params.in_width,
            params.in_height,
            ProjRect {
                left: start * tile_w,
                top,
                width: used.len() as u32 * tile_w,
                height: bottom - top,
            },
        );
        let half_turn = (180.0 * DEGREE_UNITS) as i32;
        if coverage.centre_azimuth < -half_turn {
            coverage.centre_azimuth += 2 * half_turn;
        }
        Ok(coverage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ExtractorConfig, ViewportInfo};
    use crate::generator::ExtractorTrackGenerator;
    use crate::testing::stream_map;
    use omaf_packing::{HighResPlusFullLowResPacking, StrategyRegistry};

    fn oracle() -> ErpGridOracle {
        let mut oracle = ErpGridOracle::new();
        oracle
            .configure(&ViewportParams {
                viewport: ViewportInfo::default(),
                projection: ProjectionFormat::Erp,
                in_width: 3840,
                in_height: 1920,
                tile_rows: 2,
                tile_cols: 4,
            })
            .unwrap();
        oracle
    }

    fn select(oracle: &mut ErpGridOracle, yaw: f32, pitch: f32) -> Vec<u16> {
        oracle.set_viewport(yaw, pitch).unwrap();
        oracle.process().unwrap();
        oracle
            .tiles_in_viewport()
            .unwrap()
            .iter()
            .map(|t| t.idx)
            .collect()
    }

    #[test]
    fn test_front_view() {
        let mut oracle = oracle();
        assert_eq!(select(&mut oracle, 0.0, 0.0), vec![1, 2, 5, 6]);
        assert_eq!(select(&mut oracle, 90.0, 0.0), vec![0, 1, 4, 5]);
    }

    #[test]
    fn test_wraps_in_azimuth() {
        let mut oracle = oracle();
        assert_eq!(select(&mut oracle, 180.0, 0.0), vec![3, 0, 7, 4]);

        let tiles = oracle.tiles_in_viewport().unwrap();
        let coverage = oracle.content_coverage(&tiles).unwrap();
        assert_eq!(coverage.centre_azimuth, -180 * 65536);
        assert_eq!(coverage.azimuth_range, 180 * 65536);
        assert_eq!(coverage.elevation_range, 180 * 65536);
    }

    #[test]
    fn test_pole_takes_whole_rows() {
        let mut oracle = oracle();
        assert_eq!(select(&mut oracle, 0.0, 90.0), vec![0, 1, 2, 3]);
        assert_eq!(select(&mut oracle, 45.0, -90.0), vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_requires_configuration() {
        let mut oracle = ErpGridOracle::new();
        assert!(oracle.set_viewport(0.0, 0.0).is_err());
        assert!(oracle
            .configure(&ViewportParams {
                viewport: ViewportInfo::default(),
                projection: ProjectionFormat::Cubemap,
                in_width: 2880,
                in_height: 1920,
                tile_rows: 2,
                tile_cols: 3,
            })
            .is_err());
    }

    #[test]
    fn test_plans_fixture() {
        let config = ExtractorConfig::new(2).packing_strategy(HighResPlusFullLowResPacking::NAME);
        let registry = StrategyRegistry::with_builtin();
        let plan = ExtractorTrackGenerator::new(&config, &registry)
            .plan(&stream_map(), &mut ErpGridOracle::new())
            .unwrap();
        assert_eq!(plan.initial_selection, 4);
        assert!(!plan.viewports.is_empty());
        for viewport in &plan.viewports {
            assert!(viewport.dst_rwpk.num_regions() > viewport.tiles.len());
            assert_eq!(viewport.merge_dir.tile_count(), viewport.dst_rwpk.num_regions());
            assert_eq!(viewport.coverage.coverage_shape_type, 1);
        }
    }
}
