//! Sweep of candidate viewing directions over the whole sphere.
//!
//! For every pose on a yaw/pitch grid the geometry oracle reports the tiles
//! in view. Each selection is normalized so it packs into a near-square
//! picture, then kept if no identical tile-set was seen before.
//!
//! ```text
//! pitch  90 +---+---+---+---+---+---+---+---+---+
//!           |   |   |   |   |   |   |   |   |   |
//!        0  +---+---+---+---+---+---+---+---+---+   step = half a tile
//!           |   |   |   |   |   |   |   |   |   |
//!       -90 +---+---+---+---+---+---+---+---+---+
//!         -180                 yaw               180
//! ```

use omaf_packing::{square_factor, ProjectionFormat, TileDef};
use tracing::debug;

use crate::catalog::VideoStream;
use crate::config::ViewportInfo;
use crate::oracle::{ViewportOracle, ViewportParams};
use crate::tileset::TileSetCollection;
use crate::PackingError;

/// Largest allowed difference between the two sides of a packed tile grid.
pub const MAX_SIDE_DIFFERENCE: usize = 3;

/// Angular sweep step in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepStep {
    pub yaw: f32,
    pub pitch: f32,
}

impl SweepStep {
    /// Half the angular size of one tile of `stream`.
    pub fn for_stream(stream: &VideoStream) -> Result<Self, PackingError> {
        let tile = stream
            .tile(0)
            .ok_or_else(|| PackingError::invalid_data("stream without tiles"))?;
        let (tile_w, tile_h) = (tile.width as f32, tile.height as f32);
        let (width, height) = (stream.width() as f32, stream.height() as f32);

        let step = match stream.projection() {
            ProjectionFormat::Cubemap => {
                let (face_w, face_h) = (width / 3.0, height / 2.0);
                Self {
                    yaw: 90.0 * tile_w / face_w / 2.0,
                    pitch: 90.0 * tile_h / face_h / 2.0,
                }
            }
            _ => Self {
                yaw: 360.0 * tile_w / width / 2.0,
                pitch: 180.0 * tile_h / height / 2.0,
            },
        };
        if !(step.yaw > 0.0 && step.pitch > 0.0) {
            return Err(PackingError::invalid_data(format!(
                "sweep step {}x{} from {}x{} tiles",
                step.yaw, step.pitch, tile_w, tile_h
            )));
        }
        Ok(step)
    }

    /// Every pose of the sweep, yaw in the outer loop.
    pub fn poses(&self) -> impl Iterator<Item = (f32, f32)> {
        let yaw_count = (360.0 / self.yaw).floor() as u32;
        let pitch_count = (180.0 / self.pitch).floor() as u32;
        let step = *self;
        (0..=yaw_count).flat_map(move |i| {
            let yaw = (-180.0 + i as f32 * step.yaw).min(180.0);
            (0..=pitch_count).map(move |j| (yaw, (-90.0 + j as f32 * step.pitch).min(90.0)))
        })
    }
}

/// Whether `(yaw, pitch)` lies in [-180, 180] x [-90, 90].
#[must_use]
pub fn is_valid_pose(yaw: f32, pitch: f32) -> bool {
    (-180.0..=180.0).contains(&yaw) && (-90.0..=90.0).contains(&pitch)
}

/// Append duplicate tiles until `tiles` packs into a near-square grid.
///
/// A count with no factor above 1 first gets one copy of tile 0. Then, while
/// the grid sides differ by more than [`MAX_SIDE_DIFFERENCE`], copies of the
/// selected tiles are appended in turn, redoing the first rule after each one.
/// Selected tiles are never removed.
pub fn normalize_tile_set(tiles: &mut Vec<TileDef>) {
    let selected = tiles.len();
    if selected == 0 {
        return;
    }
    pad_degenerate(tiles);
    let mut next = 0;
    loop {
        let sqrt = square_factor(tiles.len());
        let divided = tiles.len() / sqrt;
        if sqrt.abs_diff(divided) <= MAX_SIDE_DIFFERENCE {
            break;
        }
        tiles.push(tiles[next % selected]);
        next += 1;
        pad_degenerate(tiles);
    }
}

fn pad_degenerate(tiles: &mut Vec<TileDef>) {
    if square_factor(tiles.len()) == 1 {
        tiles.push(tiles[0]);
    }
}

/// Per-sweep statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepStats {
    pub samples: usize,
    pub distinct: usize,
    pub padded: usize,
}

/// Sweeps the sphere with one geometry oracle against the main stream's tiles.
pub struct ViewportSampler<'a> {
    oracle: &'a mut dyn ViewportOracle,
    main: &'a VideoStream,
    viewport: ViewportInfo,
    step: SweepStep,
    stats: SweepStats,
}

impl<'a> ViewportSampler<'a> {
    pub fn new(
        oracle: &'a mut dyn ViewportOracle,
        main: &'a VideoStream,
        viewport: ViewportInfo,
    ) -> Result<Self, PackingError> {
        let step = SweepStep::for_stream(main)?;
        Ok(Self {
            oracle,
            main,
            viewport,
            step,
            stats: SweepStats::default(),
        })
    }

    pub fn step(&self) -> SweepStep {
        self.step
    }

    pub fn stats(&self) -> SweepStats {
        self.stats
    }

    /// Sweep every pose and collect the distinct normalized tile-sets.
    pub fn sweep(&mut self) -> Result<TileSetCollection, PackingError> {
        // Pad the field of view by one step so a pose between two grid
        // points never misses a partly visible tile.
        let params = ViewportParams {
            viewport: ViewportInfo {
                fov_h: self.viewport.fov_h + self.step.yaw,
                fov_v: self.viewport.fov_v + self.step.pitch,
                ..self.viewport
            },
            projection: self.main.projection(),
            in_width: self.main.width(),
            in_height: self.main.height(),
            tile_rows: self.main.tile_rows(),
            tile_cols: self.main.tile_cols(),
        };
        self.oracle
            .configure(&params)
            .map_err(|e| PackingError::operation_failed("configure viewport", e))?;

        let mut sets = TileSetCollection::new();
        self.stats = SweepStats::default();
        for (yaw, pitch) in self.step.poses() {
            let mut tiles = self.sample(yaw, pitch)?;
            let selected = tiles.len();
            normalize_tile_set(&mut tiles);
            if tiles.len() != selected {
                self.stats.padded += 1;
            }

            let coverage = self
                .oracle
                .content_coverage(&tiles)
                .map_err(|e| PackingError::operation_failed("content coverage", e))?;
            self.stats.samples += 1;
            sets.insert(tiles, coverage);
        }
        self.stats.distinct = sets.len();

        debug!(
            samples = self.stats.samples,
            distinct = self.stats.distinct,
            padded = self.stats.padded,
            buckets = ?sets.bucket_sizes(),
            yaw_step = self.step.yaw,
            pitch_step = self.step.pitch,
            "viewport sweep finished"
        );
        Ok(sets)
    }

    /// Tiles in view at one pose, resolved to projected picture indices.
    pub fn sample(&mut self, yaw: f32, pitch: f32) -> Result<Vec<TileDef>, PackingError> {
        if !is_valid_pose(yaw, pitch) {
            return Err(PackingError::InvalidViewport { yaw, pitch });
        }
        self.oracle
            .set_viewport(yaw, pitch)
            .map_err(|e| PackingError::operation_failed("set viewport", e))?;
        self.oracle
            .process()
            .map_err(|e| PackingError::operation_failed("process viewport", e))?;
        let mut tiles = self
            .oracle
            .tiles_in_viewport()
            .map_err(|e| PackingError::operation_failed("tiles in viewport", e))?;

        let total = self.main.tile_count();
        if tiles.is_empty() || tiles.len() > total {
            return Err(PackingError::SelectionInvalid {
                count: tiles.len(),
                total,
            });
        }
        for tile in &mut tiles {
            tile.idx = self
                .main
                .resolve(tile.x, tile.y, tile.face_id)
                .ok_or(PackingError::TileNotFound {
                    x: tile.x,
                    y: tile.y,
                    face_id: tile.face_id,
                })?;
        }
        Ok(tiles)
    }
}
