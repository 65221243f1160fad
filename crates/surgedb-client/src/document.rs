//! Document handle: key-addressed operations on one record.

use std::sync::Arc;

use serde_json::Value;

use surgedb_core::{CorrelationId, Operation, Request, Scope};

use crate::errors::ClientError;
use crate::registry::{Subscription, SubscriptionRegistry};
use crate::snapshot::{OnDisconnect, Snapshot};

/// Handle for a single document within a collection.
#[derive(Clone)]
pub struct Document {
    registry: Arc<SubscriptionRegistry>,
    key: String,
}

impl Document {
    pub(crate) fn new(registry: Arc<SubscriptionRegistry>, key: String) -> Self {
        Self { registry, key }
    }

    /// Document key.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Replace this document with `value`. One-shot acknowledgment.
    pub fn set(
        &self,
        value: Value,
        callback: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<CorrelationId, ClientError> {
        let Value::Object(map) = value else {
            return Err(ClientError::InvalidDocument);
        };
        let request = Request::write(self.registry.collection(), Operation::Replace)
            .with_key(&self.key)
            .with_value(map);
        let subscription = Subscription::new(
            request.uid.clone(),
            Scope::Write,
            None,
            Arc::new(callback),
        );
        self.registry.register(subscription, &request)
    }

    /// Delete this document. One-shot acknowledgment.
    pub fn remove(
        &self,
        callback: impl Fn(Snapshot) + Send + Sync + 'static,
    ) -> Result<CorrelationId, ClientError> {
        let request = Request::write(self.registry.collection(), Operation::Delete)
            .with_key(&self.key);
        let subscription = Subscription::new(
            request.uid.clone(),
            Scope::Write,
            None,
            Arc::new(callback),
        );
        self.registry.register(subscription, &request)
    }

    /// Deferred-write handle targeting this document.
    #[must_use]
    pub fn on_disconnect(&self) -> OnDisconnect {
        OnDisconnect::new(
            self.registry.collection().to_owned(),
            self.key.clone(),
            self.registry.connection().clone(),
        )
    }
}
