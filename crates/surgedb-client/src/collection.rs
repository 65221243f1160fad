//! Collection handle: the fluent surface for issuing operations.
//!
//! Thin builder over the subscription registry: each method constructs a
//! [`Request`], registers a [`Subscription`] for its responses, and hands
//! the encoded frame to the connection. All ordering and lifetime behavior
//! lives underneath, in the registry and connection manager.

use std::sync::Arc;

use serde_json::Value;

use surgedb_core::{CorrelationId, Operation, Request, Scope};

use crate::document::Document;
use crate::errors::ClientError;
use crate::registry::{Subscription, SubscriptionRegistry};
use crate::snapshot::Snapshot;

/// Handle for one named collection of documents.
#[derive(Clone)]
pub struct Collection {
    registry: Arc<SubscriptionRegistry>,
}

impl Collection {
    pub(crate) fn new(registry: Arc<SubscriptionRegistry>) -> Self {
        Self { registry }
    }

    /// Collection name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.registry.collection()
    }

    /// Subscribe to change events of the given operation.
    ///
    /// Persistent: the callback fires for every matching change until the
    /// returned correlation id is passed to [`cancel`](Self::cancel).
    pub fn watch(
        &self,
        operation: Operation,
        callback: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<CorrelationId, ClientError> {
        let request = Request::watch(self.name(), operation);
        let subscription = Subscription::new(
            request.uid.clone(),
            Scope::Watch,
            Some(operation),
            Arc::new(callback),
        );
        self.registry.register(subscription, &request)
    }

    /// Read all documents. One-shot: the callback fires once with the
    /// result array.
    pub fn get(
        &self,
        callback: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<CorrelationId, ClientError> {
        self.one_shot(Request::find(self.name()), Scope::Find, callback)
    }

    /// Read a single document. One-shot.
    pub fn get_one(
        &self,
        callback: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<CorrelationId, ClientError> {
        self.one_shot(Request::find_one(self.name()), Scope::FindOne, callback)
    }

    /// Insert a document. One-shot: the callback fires with the server's
    /// acknowledgment carrying the new document key.
    pub fn add(
        &self,
        value: Value,
        callback: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<CorrelationId, ClientError> {
        let Value::Object(map) = value else {
            return Err(ClientError::InvalidDocument);
        };
        let request = Request::write(self.name(), Operation::Insert).with_value(map);
        self.one_shot(request, Scope::Write, callback)
    }

    /// Delete the document with the given key. One-shot acknowledgment.
    pub fn remove(
        &self,
        key: &str,
        callback: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<CorrelationId, ClientError> {
        let request = Request::write(self.name(), Operation::Delete).with_key(key);
        self.one_shot(request, Scope::Write, callback)
    }

    /// Handle for a single document by key.
    #[must_use]
    pub fn doc(&self, key: impl Into<String>) -> Document {
        Document::new(Arc::clone(&self.registry), key.into())
    }

    /// Expire a pending one-shot or unsubscribe a watch.
    ///
    /// Returns whether a registered entry was removed. Responses arriving
    /// for a cancelled correlation id are dropped silently.
    pub fn cancel(&self, uid: &CorrelationId) -> bool {
        self.registry.cancel(uid)
    }

    /// Number of live subscriptions on this collection.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.registry.len()
    }

    fn one_shot(
        &self,
        request: Request,
        scope: Scope,
        callback: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<CorrelationId, ClientError> {
        let subscription =
            Subscription::new(request.uid.clone(), scope, None, Arc::new(callback));
        self.registry.register(subscription, &request)
    }
}
