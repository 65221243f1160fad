//! Per-collection subscription registry.
//!
//! Stores live subscriptions keyed by correlation id and applies the
//! lifetime rules on dispatch:
//!
//! | scope          | lifetime   | fires on                                   |
//! |----------------|------------|--------------------------------------------|
//! | watch          | persistent | every response matching the operation filter |
//! | find / findOne | one-shot   | first response for the correlation id      |
//! | write          | one-shot   | first response (acknowledgment)            |
//!
//! One-shot removal is atomic with dispatch, so a duplicate response for
//! the same correlation id is silently dropped. Watch filtering happens
//! after lookup: a non-matching change leaves the subscription registered
//! but does not invoke the callback.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, trace};

use surgedb_core::{CorrelationId, Operation, Request, Response, Scope, codec};

use crate::connection::ConnectionHandle;
use crate::errors::ClientError;
use crate::snapshot::Snapshot;

/// Callback invoked with each delivered snapshot.
pub type Callback = Arc<dyn Fn(Snapshot) + Send + Sync + 'static>;

/// How long a subscription stays registered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifetime {
    /// Removed atomically with its first dispatch.
    OneShot,
    /// Retained until explicitly cancelled or the registry is torn down.
    Persistent,
}

impl Lifetime {
    /// Lifetime implied by a request scope.
    #[must_use]
    pub fn for_scope(scope: Scope) -> Self {
        if scope.is_persistent() {
            Self::Persistent
        } else {
            Self::OneShot
        }
    }
}

/// A registered interest in responses for one correlation id.
pub struct Subscription {
    uid: CorrelationId,
    scope: Scope,
    filter: Option<Operation>,
    lifetime: Lifetime,
    callback: Callback,
}

impl Subscription {
    /// Create a subscription; lifetime is implied by the scope.
    pub fn new(
        uid: CorrelationId,
        scope: Scope,
        filter: Option<Operation>,
        callback: Callback,
    ) -> Self {
        Self {
            uid,
            scope,
            filter,
            lifetime: Lifetime::for_scope(scope),
            callback,
        }
    }

    /// Correlation ID this subscription listens on.
    #[must_use]
    pub fn uid(&self) -> &CorrelationId {
        &self.uid
    }

    /// Lifetime of this subscription.
    #[must_use]
    pub fn lifetime(&self) -> Lifetime {
        self.lifetime
    }
}

/// Outcome of offering a response to a registry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The callback fired (one-shot entries are gone afterwards).
    Delivered,
    /// The correlation id matched a watch whose operation filter rejected
    /// the event; the subscription stays registered.
    Filtered,
    /// No subscription here owns the correlation id.
    Miss,
}

/// Live subscriptions for one collection.
pub struct SubscriptionRegistry {
    collection: String,
    conn: ConnectionHandle,
    subscriptions: Mutex<HashMap<CorrelationId, Subscription>>,
    lookups: AtomicU64,
    delivered: AtomicU64,
    filtered: AtomicU64,
}

impl SubscriptionRegistry {
    pub(crate) fn new(collection: String, conn: ConnectionHandle) -> Self {
        Self {
            collection,
            conn,
            subscriptions: Mutex::new(HashMap::new()),
            lookups: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            filtered: AtomicU64::new(0),
        }
    }

    /// Collection this registry serves.
    #[must_use]
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Store a subscription and immediately send its encoded request.
    ///
    /// The entry is rolled back if the frame cannot even be buffered, so a
    /// failed register leaves no orphan.
    pub fn register(
        &self,
        subscription: Subscription,
        request: &Request,
    ) -> Result<CorrelationId, ClientError> {
        debug_assert_eq!(subscription.uid, request.uid);
        let uid = subscription.uid.clone();
        let frame = codec::encode(request)?;

        {
            let mut subscriptions = self.subscriptions.lock();
            if subscriptions.contains_key(&uid) {
                return Err(ClientError::DuplicateCorrelation { uid });
            }
            let _ = subscriptions.insert(uid.clone(), subscription);
        }

        if let Err(e) = self.conn.send(frame) {
            let _ = self.subscriptions.lock().remove(&uid);
            return Err(e);
        }
        debug!(collection = %self.collection, %uid, scope = request.scope.as_str(), "registered subscription");
        Ok(uid)
    }

    /// Offer a response to this registry.
    ///
    /// Looks up the correlation id; on a hit, invokes the callback with a
    /// constructed [`Snapshot`] (outside the map lock). One-shot entries
    /// are removed before the callback runs, making removal atomic with
    /// dispatch.
    pub fn dispatch(&self, response: &Response) -> DispatchOutcome {
        let _ = self.lookups.fetch_add(1, Ordering::Relaxed);

        let callback = {
            let mut subscriptions = self.subscriptions.lock();
            let persistent_callback = match subscriptions.get(&response.uid) {
                None => return DispatchOutcome::Miss,
                Some(subscription) => {
                    // Watch filter: an explicit non-matching operation is
                    // skipped but keeps the subscription. An absent
                    // operation passes, since servers that filter change
                    // streams server-side do not embed the operation on
                    // each event.
                    if subscription.scope == Scope::Watch {
                        if let (Some(filter), Some(operation)) =
                            (subscription.filter, response.operation)
                        {
                            if filter != operation {
                                let _ = self.filtered.fetch_add(1, Ordering::Relaxed);
                                trace!(
                                    collection = %self.collection,
                                    uid = %response.uid,
                                    wanted = filter.as_str(),
                                    got = operation.as_str(),
                                    "watch filtered out non-matching operation"
                                );
                                return DispatchOutcome::Filtered;
                            }
                        }
                    }
                    match subscription.lifetime {
                        Lifetime::Persistent => Some(Arc::clone(&subscription.callback)),
                        Lifetime::OneShot => None,
                    }
                }
            };
            match persistent_callback {
                Some(callback) => callback,
                // One-shot: removal is atomic with dispatch.
                None => match subscriptions.remove(&response.uid) {
                    Some(subscription) => subscription.callback,
                    None => return DispatchOutcome::Miss,
                },
            }
        };

        let snapshot = Snapshot::new(
            response.uid.clone(),
            response.document_key(),
            response.value.clone(),
            self.collection.clone(),
            self.conn.clone(),
        );
        callback(snapshot);
        let _ = self.delivered.fetch_add(1, Ordering::Relaxed);
        DispatchOutcome::Delivered
    }

    /// Expire a registered entry: a pending one-shot that will never get a
    /// response, or a watch to unsubscribe. Returns whether an entry was
    /// removed.
    pub fn cancel(&self, uid: &CorrelationId) -> bool {
        let removed = self.subscriptions.lock().remove(uid).is_some();
        if removed {
            debug!(collection = %self.collection, %uid, "cancelled subscription");
        }
        removed
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.subscriptions.lock().len()
    }

    /// Whether no subscriptions are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.subscriptions.lock().is_empty()
    }

    /// Total correlation-id lookups performed by [`dispatch`](Self::dispatch).
    #[must_use]
    pub fn lookup_count(&self) -> u64 {
        self.lookups.load(Ordering::Relaxed)
    }

    /// Total snapshots delivered to callbacks.
    #[must_use]
    pub fn delivered_count(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Total watch events skipped by the operation filter.
    #[must_use]
    pub fn filtered_count(&self) -> u64 {
        self.filtered.load(Ordering::Relaxed)
    }

    pub(crate) fn connection(&self) -> &ConnectionHandle {
        &self.conn
    }
}
