//! # surgedb-core
//!
//! Protocol vocabulary shared by every surgedb crate.
//!
//! A surgedb client talks to the server over a single websocket carrying
//! JSON text frames. This crate defines that wire format and nothing else:
//!
//! - **Correlation IDs**: [`CorrelationId`], the client-generated token that
//!   links a request to its eventual response(s)
//! - **Requests**: [`Request`] with its [`Scope`] (watch / find / findOne /
//!   write) and [`Operation`] (insert / update / delete / replace)
//! - **Responses**: [`Response`], delivered singly or batched in an array
//! - **Codec**: [`codec::encode`] / [`codec::decode`] plus [`DecodeError`]
//!
//! No state, no IO. The connection engine lives in `surgedb-client`.

#![deny(unsafe_code)]

pub mod codec;
pub mod errors;
pub mod ids;
pub mod protocol;

pub use errors::DecodeError;
pub use ids::CorrelationId;
pub use protocol::{Operation, Request, Response, Scope};
