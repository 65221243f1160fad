//! Client error taxonomy.

use surgedb_core::{CorrelationId, DecodeError};
use thiserror::Error;

/// Errors surfaced to application code by the client.
///
/// Inbound decode failures and routing misses are deliberately absent:
/// those are recovered inside the engine and only reported as diagnostics.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No usable socket capability: bad endpoint URL or unsupported scheme.
    /// Reported once at construction; no connection is attempted.
    #[error("transport unavailable: {reason}")]
    TransportUnavailable {
        /// Why the transport cannot be constructed.
        reason: String,
    },

    /// The connection engine is gone (its task ended), so the request could
    /// not even be buffered.
    #[error("connection engine terminated")]
    ConnectionClosed,

    /// A correlation ID collided with one still registered.
    #[error("correlation id {uid} already registered")]
    DuplicateCorrelation {
        /// The colliding ID.
        uid: CorrelationId,
    },

    /// A document-scoped operation needs a key the snapshot does not carry.
    #[error("snapshot has no document key")]
    MissingDocumentKey,

    /// A write payload must be a JSON object.
    #[error("document value must be a JSON object")]
    InvalidDocument,

    /// An outbound request failed to serialize.
    #[error(transparent)]
    Codec(#[from] DecodeError),
}
