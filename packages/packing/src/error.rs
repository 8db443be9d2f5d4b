//! Error types for viewport packing and extractor track construction.

use thiserror::Error;

/// Errors that can occur while selecting, packing or extracting viewport tiles.
#[derive(Debug, Error)]
pub enum PackingError {
    /// A required handle, holder or collaborator is missing.
    #[error("missing required {0}")]
    NullPointer(String),

    /// Zero or garbled width, height or bitstream data.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// A tile references a media stream index absent from the stream map.
    #[error("media stream {0} not found")]
    StreamNotFound(u8),

    /// An update was requested for a tile with no prior extractor.
    #[error("no extractor for tile {0}")]
    ExtractorNotFound(u16),

    /// The geometry oracle returned an out-of-range tile count during a sweep.
    #[error("tile selection returned {count} tiles, expected 1..={total}")]
    SelectionInvalid { count: usize, total: usize },

    /// The geometry oracle returned an unusable result outside the sweep.
    #[error("incorrect tile selection result: {0}")]
    SelectionIncorrectResult(String),

    /// Declared and actual video stream counts disagree.
    #[error("declared {declared} video streams but found {actual}")]
    VideoNumMismatch { declared: u8, actual: u8 },

    /// An external codec-math or geometry call reported an error.
    #[error("{op} failed: {reason}")]
    OperationFailed { op: &'static str, reason: String },

    /// No packing strategy is configured.
    #[error("no packing strategy configured")]
    NullGenerator,

    /// The configured packing strategy name is not registered.
    #[error("unknown packing strategy: {0}")]
    UnknownStrategy(String),

    /// Viewport pose outside [-180, 180] x [-90, 90].
    #[error("invalid viewport pose: yaw {yaw}, pitch {pitch}")]
    InvalidViewport { yaw: f32, pitch: f32 },

    /// No tile of the main stream sits at the given geometry coordinates.
    #[error("no tile at ({x}, {y}) on face {face_id}")]
    TileNotFound { x: i32, y: i32, face_id: i32 },

    /// Projection format without a matching projection SEI.
    #[error("unsupported projection format")]
    UnsupportedProjection,

    /// A parameter set or SEI holder was already filled.
    #[error("{0} already set")]
    NaluAlreadySet(&'static str),
}

impl PackingError {
    /// Create a NullPointer error naming the missing item.
    pub fn null_pointer(what: impl Into<String>) -> Self {
        Self::NullPointer(what.into())
    }

    /// Create an InvalidData error with a message.
    pub fn invalid_data(msg: impl Into<String>) -> Self {
        Self::InvalidData(msg.into())
    }

    /// Create an OperationFailed error for an external call.
    pub fn operation_failed(op: &'static str, reason: impl ToString) -> Self {
        Self::OperationFailed {
            op,
            reason: reason.to_string(),
        }
    }

    /// Create a SelectionIncorrectResult error with a message.
    pub fn incorrect_selection(msg: impl Into<String>) -> Self {
        Self::SelectionIncorrectResult(msg.into())
    }
}
