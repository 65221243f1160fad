//! Snapshots and deferred-write handles.
//!
//! A [`Snapshot`] is the read-only view of a response delivered to a
//! subscription callback. It holds only a non-owning back-reference to its
//! originating collection (name plus a connection handle clone) so that
//! follow-up requests, like deferred writes, can be routed without keeping
//! the registry alive.

use std::fmt;

use serde_json::Value;

use surgedb_core::{CorrelationId, Operation, Request, codec};

use crate::connection::ConnectionHandle;
use crate::errors::ClientError;

/// Read-only view of a document or change payload.
#[derive(Clone)]
pub struct Snapshot {
    uid: CorrelationId,
    key: Option<String>,
    value: Value,
    collection: String,
    conn: ConnectionHandle,
}

impl Snapshot {
    pub(crate) fn new(
        uid: CorrelationId,
        key: Option<String>,
        value: Value,
        collection: String,
        conn: ConnectionHandle,
    ) -> Self {
        Self {
            uid,
            key,
            value,
            collection,
            conn,
        }
    }

    /// Correlation ID of the subscription this snapshot answered.
    #[must_use]
    pub fn uid(&self) -> &CorrelationId {
        &self.uid
    }

    /// Document identity, when the payload carries one.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }

    /// Payload: a document, an array of documents, or null.
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Name of the collection this snapshot came from.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Deferred-write handle for this document.
    ///
    /// Fails with [`ClientError::MissingDocumentKey`] when the snapshot
    /// carries no document identity to target.
    pub fn on_disconnect(&self) -> Result<OnDisconnect, ClientError> {
        let key = self.key.clone().ok_or(ClientError::MissingDocumentKey)?;
        Ok(OnDisconnect {
            collection: self.collection.clone(),
            key,
            conn: self.conn.clone(),
        })
    }
}

impl fmt::Debug for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("uid", &self.uid)
            .field("key", &self.key)
            .field("collection", &self.collection)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

/// Write intents the server applies when this client disconnects.
///
/// Each call sends one immediate request tagged `onDisconnect`; the server
/// parks it and replays it once the connection terminates. No response
/// arrives before then, so deferred writes register no subscription.
pub struct OnDisconnect {
    collection: String,
    key: String,
    conn: ConnectionHandle,
}

impl OnDisconnect {
    pub(crate) fn new(collection: String, key: String, conn: ConnectionHandle) -> Self {
        Self {
            collection,
            key,
            conn,
        }
    }

    /// Delete this document when the connection terminates.
    pub fn remove(&self) -> Result<CorrelationId, ClientError> {
        let request = Request::write(&self.collection, Operation::Delete)
            .with_key(&self.key)
            .deferred();
        self.send(&request)
    }

    /// Replace this document with `value` when the connection terminates.
    pub fn set(&self, value: Value) -> Result<CorrelationId, ClientError> {
        let Value::Object(map) = value else {
            return Err(ClientError::InvalidDocument);
        };
        let request = Request::write(&self.collection, Operation::Replace)
            .with_key(&self.key)
            .with_value(map)
            .deferred();
        self.send(&request)
    }

    fn send(&self, request: &Request) -> Result<CorrelationId, ClientError> {
        let frame = codec::encode(request)?;
        self.conn.send(frame)?;
        Ok(request.uid.clone())
    }
}
