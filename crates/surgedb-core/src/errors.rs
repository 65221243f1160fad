//! Codec error type.

use thiserror::Error;

/// Failure to decode an inbound frame.
///
/// Decode failures are recovered locally by the connection engine: the
/// offending frame is discarded with a diagnostic and the receive loop
/// continues. They are never surfaced to application callbacks.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame was not valid JSON, or a batch element had the wrong shape.
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),

    /// The frame parsed as JSON but was neither an object nor an array.
    #[error("unexpected frame shape: expected object or array, got {kind}")]
    UnexpectedShape {
        /// JSON kind that was actually received.
        kind: &'static str,
    },
}
