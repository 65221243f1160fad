//! Wire-format types matching the surgedb websocket protocol.
//!
//! Outbound frames are [`Request`] values; inbound frames decode to one or
//! more [`Response`] values (the server batches queued notifications into a
//! JSON array). The server's decoder assumes a fixed frame shape, so a
//! `Request` serializes every field: an absent operation becomes `null` and
//! empty query/value become `{}`, never omitted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::CorrelationId;

/// Request scope: what kind of operation the server should run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    /// Subscribe to change events on a collection. Persistent.
    Watch,
    /// Read all matching documents. One-shot.
    Find,
    /// Read a single matching document. One-shot.
    FindOne,
    /// Perform a single CRUD operation. One-shot.
    Write,
}

impl Scope {
    /// Wire string for this scope.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Watch => "watch",
            Self::Find => "find",
            Self::FindOne => "findOne",
            Self::Write => "write",
        }
    }

    /// Whether a subscription with this scope survives its first response.
    #[must_use]
    pub fn is_persistent(self) -> bool {
        matches!(self, Self::Watch)
    }
}

/// Change/write operation kind.
///
/// Selects which change events a watch delivers, or which write a
/// `Scope::Write` request performs. Meaningless for find scopes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// A new document was (or should be) inserted.
    Insert,
    /// An existing document was (or should be) partially updated.
    Update,
    /// A document was (or should be) deleted.
    Delete,
    /// A document was (or should be) replaced wholesale.
    Replace,
}

impl Operation {
    /// Wire string for this operation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Replace => "replace",
        }
    }
}

/// Outbound request frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// Correlation ID, echoed on every response for this request.
    #[serde(rename = "_uid")]
    pub uid: CorrelationId,
    /// Target collection name.
    pub collection: String,
    /// Document selector (e.g. `{"_id": key}`). Empty when unused.
    #[serde(default)]
    pub query: Map<String, Value>,
    /// Request scope.
    pub scope: Scope,
    /// Operation to observe (watch) or perform (write). `null` otherwise.
    pub operation: Option<Operation>,
    /// Document payload for writes. Empty when unused.
    #[serde(default)]
    pub value: Map<String, Value>,
    /// When `true`, the server parks this request and applies it once this
    /// client's connection terminates.
    #[serde(rename = "onDisconnect")]
    pub on_disconnect: bool,
}

impl Request {
    fn new(collection: impl Into<String>, scope: Scope, operation: Option<Operation>) -> Self {
        Self {
            uid: CorrelationId::new(),
            collection: collection.into(),
            query: Map::new(),
            scope,
            operation,
            value: Map::new(),
            on_disconnect: false,
        }
    }

    /// Build a watch request for the given change operation.
    #[must_use]
    pub fn watch(collection: impl Into<String>, operation: Operation) -> Self {
        Self::new(collection, Scope::Watch, Some(operation))
    }

    /// Build a find request (all matching documents).
    #[must_use]
    pub fn find(collection: impl Into<String>) -> Self {
        Self::new(collection, Scope::Find, None)
    }

    /// Build a findOne request (single matching document).
    #[must_use]
    pub fn find_one(collection: impl Into<String>) -> Self {
        Self::new(collection, Scope::FindOne, None)
    }

    /// Build a write request performing the given operation.
    #[must_use]
    pub fn write(collection: impl Into<String>, operation: Operation) -> Self {
        Self::new(collection, Scope::Write, Some(operation))
    }

    /// Set the document selector.
    #[must_use]
    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = query;
        self
    }

    /// Select a document by key (`{"_id": key}`).
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        let _ = self
            .query
            .insert("_id".to_owned(), Value::String(key.into()));
        self
    }

    /// Set the document payload.
    #[must_use]
    pub fn with_value(mut self, value: Map<String, Value>) -> Self {
        self.value = value;
        self
    }

    /// Mark this request as deferred until disconnect.
    #[must_use]
    pub fn deferred(mut self) -> Self {
        self.on_disconnect = true;
        self
    }
}

/// Inbound response frame.
///
/// Everything except the correlation ID is optional: an insert
/// acknowledgment carries only `_uid` and `key`, a find result carries an
/// array `value`, and a change notification embeds the `operation` that
/// produced it so watch subscriptions can filter client-side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Correlation ID of the request this answers or notifies for.
    #[serde(rename = "_uid")]
    pub uid: CorrelationId,
    /// Originating collection, when the server includes it.
    #[serde(default)]
    pub collection: Option<String>,
    /// Document identity, when the server includes it.
    #[serde(default)]
    pub key: Option<String>,
    /// Change operation that produced this notification, if any.
    #[serde(default)]
    pub operation: Option<Operation>,
    /// Payload: a document, an array of documents, or nothing.
    #[serde(default)]
    pub value: Value,
}

impl Response {
    /// Document identity: the explicit `key` field, falling back to the
    /// payload's `_id` when the server sent a bare document.
    #[must_use]
    pub fn document_key(&self) -> Option<String> {
        if let Some(key) = &self.key {
            return Some(key.clone());
        }
        match self.value.get("_id") {
            Some(Value::String(s)) => Some(s.clone()),
            Some(other) if !other.is_null() => Some(other.to_string()),
            _ => None,
        }
    }
}
