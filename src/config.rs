//! Configuration for extractor track generation.

/// Tile-set count above which subset pruning runs.
pub const DEFAULT_REFINE_THRESHOLD: usize = 100;

/// Initial viewport handed to the geometry library.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportInfo {
    /// Viewport width in pixels.
    pub width: u32,
    /// Viewport height in pixels.
    pub height: u32,
    /// Yaw in degrees, [-180, 180].
    pub yaw: f32,
    /// Pitch in degrees, [-90, 90].
    pub pitch: f32,
    /// Horizontal field of view in degrees.
    pub fov_h: f32,
    /// Vertical field of view in degrees.
    pub fov_v: f32,
}

impl Default for ViewportInfo {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 1024,
            yaw: 90.0,
            pitch: 0.0,
            fov_h: 80.0,
            fov_v: 90.0,
        }
    }
}

/// Configuration for [`ExtractorTrackManager`](crate::ExtractorTrackManager).
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractorConfig {
    /// Number of video streams the packaged media declares.
    pub declared_video_count: u8,
    /// Initial viewport.
    pub viewport: ViewportInfo,
    /// Registered packing strategy name. `None` disables extractor tracks.
    pub packing_strategy: Option<String>,
    /// Distinct tile-set count above which subset pruning runs.
    pub refine_threshold: usize,
    /// Extractor tracks refreshed per segmentation worker. 0 derives it from the tile grid.
    pub extractor_tracks_per_seg_thread: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            declared_video_count: 1,
            viewport: ViewportInfo::default(),
            packing_strategy: None,
            refine_threshold: DEFAULT_REFINE_THRESHOLD,
            extractor_tracks_per_seg_thread: 0,
        }
    }
}

impl ExtractorConfig {
    /// Create a configuration for media with `declared_video_count` video streams.
    #[must_use]
    pub fn new(declared_video_count: u8) -> Self {
        Self {
            declared_video_count,
            ..Default::default()
        }
    }

    /// Set the initial viewport.
    #[must_use]
    pub fn viewport(mut self, viewport: ViewportInfo) -> Self {
        self.viewport = viewport;
        self
    }

    /// Set the initial viewport pose.
    #[must_use]
    pub fn pose(mut self, yaw: f32, pitch: f32) -> Self {
        self.viewport.yaw = yaw;
        self.viewport.pitch = pitch;
        self
    }

    /// Set the initial field of view.
    #[must_use]
    pub fn fov(mut self, horizontal: f32, vertical: f32) -> Self {
        self.viewport.fov_h = horizontal;
        self.viewport.fov_v = vertical;
        self
    }

    /// Enable extractor tracks with the named packing strategy.
    #[must_use]
    pub fn packing_strategy(mut self, name: impl Into<String>) -> Self {
        self.packing_strategy = Some(name.into());
        self
    }

    /// Set the distinct tile-set count above which subset pruning runs.
    #[must_use]
    pub fn refine_threshold(mut self, threshold: usize) -> Self {
        self.refine_threshold = threshold;
        self
    }

    /// Set the number of extractor tracks refreshed per segmentation worker.
    #[must_use]
    pub fn extractor_tracks_per_seg_thread(mut self, tracks: usize) -> Self {
        self.extractor_tracks_per_seg_thread = tracks;
        self
    }

    /// Tracks per segmentation worker for a main stream of `tile_count` tiles.
    ///
    /// An unset value becomes the first of 4, 3 and 2 dividing the tile count, or 1.
    #[must_use]
    pub fn resolve_tracks_per_seg_thread(&self, tile_count: usize) -> usize {
        if self.extractor_tracks_per_seg_thread > 0 {
            return self.extractor_tracks_per_seg_thread;
        }
        [4, 3, 2]
            .into_iter()
            .find(|n| tile_count % n == 0)
            .unwrap_or(1)
    }
}
