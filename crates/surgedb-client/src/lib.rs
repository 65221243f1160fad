//! # surgedb-client
//!
//! Client SDK for surgedb: subscribe to live changes in named remote
//! collections, issue reads and writes against them, and receive
//! asynchronous notifications as matching change events occur, all
//! multiplexed over one persistent websocket.
//!
//! The heart of the crate is the connection-and-subscription engine:
//!
//! - [`connection`]: one transport, its `Connecting -> Open -> Closed`
//!   lifecycle, and FIFO delivery of outbound frames whether or not the
//!   socket is ready yet
//! - [`registry`]: per-collection subscriptions keyed by correlation id,
//!   with one-shot versus persistent lifetimes and watch filtering
//! - [`Database`]: the facade owning both, routing every inbound response
//!   to the registry that recognizes it
//!
//! Everything else ([`Collection`], [`Document`], [`Snapshot`]) is a thin
//! fluent layer that builds requests and delegates.
//!
//! # Usage
//!
//! ```no_run
//! use surgedb_client::{ClientConfig, Database, Operation};
//!
//! # async fn example() -> Result<(), surgedb_client::ClientError> {
//! let db = Database::connect(&ClientConfig::from_env())?;
//! let users = db.collection("users");
//!
//! let _watch = users.watch(Operation::Insert, |snapshot| {
//!     println!("new user: {:?}", snapshot.value());
//! })?;
//!
//! let _get = users.get(|snapshot| {
//!     println!("all users: {:?}", snapshot.value());
//! })?;
//! # Ok(())
//! # }
//! ```
//!
//! There is no automatic reconnection: once the connection closes, the
//! state observed through [`Database::state_watch`] goes `Closed` and
//! stays there. Sends issued after that are buffered, never flushed, and
//! never dropped.

#![deny(unsafe_code)]

pub mod collection;
pub mod config;
pub mod connection;
pub mod database;
pub mod document;
pub mod errors;
pub mod queue;
pub mod registry;
pub mod snapshot;
pub mod transport;

pub use surgedb_core::{CorrelationId, Operation, Request, Response, Scope};

pub use collection::Collection;
pub use config::ClientConfig;
pub use connection::{ConnectionHandle, ConnectionState};
pub use database::Database;
pub use document::Document;
pub use errors::ClientError;
pub use registry::{DispatchOutcome, Lifetime, Subscription, SubscriptionRegistry};
pub use snapshot::{OnDisconnect, Snapshot};
pub use transport::{
    MemoryHandle, MemoryTransport, Transport, TransportChannels, TransportError, TransportEvent,
    WebSocketTransport,
};
