// SPDX-License-Identifier: MIT OR Apache-2.0
//! The JSON-RPC 2.0 wire-level error object, plus the host-facing transport error.
//!
//! This module defines two distinct error types that are easy to conflate:
//!
//! - [`Error`] is the JSON-RPC `error` object: it travels over the wire, has a
//!   `code`/`message`/`data`, and is what [`crate::server::ServerCodec`] writes
//!   and [`crate::client::ClientCodec`] reads.
//! - [`CodecError`] is what codec operations return to the host in Rust's
//!   `Result::Err` position: I/O failures, end-of-stream, and shutdown. It
//!   never appears on the wire.

use std::fmt::{Display, Formatter};

/// A JSON-RPC 2.0 error object.
///
/// Reserved codes: -32700 Parse Error, -32600 Invalid Request, -32601 Method
/// Not Found, -32602 Invalid Params, -32603 Internal Error, -32000 through
/// -32099 server-implementation errors. Anything else is application-defined.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
pub struct Error {
    /// The error code.
    pub code: i64,
    /// A short, human-readable description of the error.
    pub message: String,
    /// Optional additional information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "jsonrpc error {}: {}", self.code, self.message)
    }
}

impl std::error::Error for Error {}

/// Well-known JSON-RPC 2.0 error codes (§4.4, §7).
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
pub const SERVER_ERROR: i64 = -32000;

/// Lower bound (inclusive) of the reserved server-error range.
pub const SERVER_ERROR_RANGE_START: i64 = -32099;
/// Upper bound (inclusive) of the reserved server-error range.
pub const SERVER_ERROR_RANGE_END: i64 = -32000;

impl Error {
    /// `code: -32700`, `message: "Parse error"`.
    pub fn parse_error() -> Self {
        Self { code: PARSE_ERROR, message: "Parse error".into(), data: None }
    }

    /// `code: -32600`, `message: "Invalid Request"`.
    pub fn invalid_request() -> Self {
        Self { code: INVALID_REQUEST, message: "Invalid Request".into(), data: None }
    }

    /// `code: -32601`, `message: "Method not found"`.
    pub fn method_not_found() -> Self {
        Self { code: METHOD_NOT_FOUND, message: "Method not found".into(), data: None }
    }

    /// `code: -32602`, with `detail` describing what was wrong with the params.
    pub fn invalid_params(detail: impl Into<String>) -> Self {
        Self { code: INVALID_PARAMS, message: "Invalid params".into(), data: Some(detail.into().into()) }
    }

    /// `code: -32603`, with `message` describing the internal failure.
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self { code: INTERNAL_ERROR, message: message.into(), data: None }
    }

    /// `code: -32000`, used for a host method error that carries no structured code.
    pub fn server_error(message: impl Into<String>) -> Self {
        Self { code: SERVER_ERROR, message: message.into(), data: None }
    }

    /// Whether `code` falls in a range this crate recognizes as valid: any of
    /// the named codes, or within the reserved server-error range.
    pub fn is_valid(&self) -> bool {
        matches!(
            self.code,
            PARSE_ERROR | INVALID_REQUEST | METHOD_NOT_FOUND | INVALID_PARAMS | INTERNAL_ERROR
        ) || (SERVER_ERROR_RANGE_START..=SERVER_ERROR_RANGE_END).contains(&self.code)
    }

    /// Classify a non-domain error surfaced by the host dispatcher (§4.4).
    ///
    /// Hosts that can't or don't construct an [`Error`] directly report a
    /// plain [`std::error::Error`]; this maps its rendered message onto the
    /// JSON-RPC code space by sniffing the same `rpc:`/`json:` prefixes a
    /// Go `net/rpc` style dispatcher's own errors carry.
    pub fn classify_host_error(err: &(dyn std::error::Error + 'static)) -> Self {
        let msg = err.to_string();
        if msg.starts_with("rpc: service/method request ill-formed:")
            || msg.starts_with("rpc: can't find service")
            || msg.starts_with("rpc: can't find method")
        {
            Self { code: METHOD_NOT_FOUND, message: msg, data: None }
        } else if msg.starts_with("json: cannot unmarshal") {
            Self { code: INVALID_PARAMS, message: msg, data: None }
        } else {
            Self::server_error(msg)
        }
    }
}

/// Host-facing failure from a codec operation.
///
/// Distinct from [`Error`]: this is the Rust-level `Result::Err`, never
/// serialized onto the wire. Hosts match on it to decide whether to retry,
/// log, or tear the connection down.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The underlying stream returned an I/O error.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The stream ended cleanly before a new message began. Ordinary
    /// termination, not a failure in itself.
    #[error("end of stream")]
    EndOfStream,

    /// The connection (or the codec's `Close`) was torn down while this
    /// call was still pending a reply.
    #[error("connection is shutting down")]
    Shutdown,

    /// A response arrived whose shape could not be reconciled with §3's
    /// invariants, or whose id matched nothing pending.
    #[error("bad response from server: {0}")]
    BadResponse(String),

    /// The caller tried to write a request whose params are not representable
    /// on the wire (§4.2): scalars, or anything that isn't array/object/absent.
    #[error("unsupported parameter type: {0}")]
    UnsupportedParams(String),

    /// A sibling call's response body failed to decode; every other pending
    /// call is poisoned with this so hosts don't wait forever (§4.2, §7).
    #[error("some other Call failed to unmarshal Reply")]
    SiblingDecodeFailed,
}
