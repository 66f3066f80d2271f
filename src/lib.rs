//! A bidirectional JSON-RPC 2.0 adapter: decode requests into whatever a
//! host dispatcher expects, encode its replies back onto the wire, and do
//! the same in reverse for outgoing calls.
//!
//! [`server::ServerCodec`] and [`client::ClientCodec`] are the two codec
//! halves; [`server::serve_connection`] is a ready-made loop over the
//! former for hosts happy to work with [`serde_json::Value`] params through
//! the [`dispatcher::Dispatcher`] trait. Batches (a JSON array of requests)
//! are transparently dispatched through that same trait via
//! [`batch::run_batch`]; a host never sees `JSONRPC1.Batch` as a real
//! method name.

pub mod batch;
pub mod client;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod id;
pub mod pipe;
pub mod server;
pub mod wire;

pub use client::{ClientCodec, ResponseHeader};
pub use context::Context;
pub use dispatcher::{Dispatcher, HandlerError, ParamShape};
pub use error::{CodecError, Error};
pub use id::Id;
pub use server::{RequestHeader, ServerCodec, serve_connection, serve_with_context};
