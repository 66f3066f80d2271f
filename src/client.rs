// SPDX-License-Identifier: MIT OR Apache-2.0
//! The client-side codec (§4.2): write a request, read the next response
//! header, read its body.
//!
//! Mirrors [`crate::server::ServerCodec`]'s three-operation shape, but from
//! the caller's side: [`ClientCodec::write_request`] assigns the wire id
//! from the host's own sequence number, and [`ClientCodec::read_response_header`]
//! resolves an incoming id back to that sequence number via the pending-call
//! table.

use crate::error::{CodecError, Error};
use crate::id::Id;
use crate::wire::{ClientRequest, ClientResponse, Outcome};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::de::IoRead;
use std::collections::BTreeMap;
use std::io::{Read, Write};

/// What [`ClientCodec::read_response_header`] hands back for one decoded response.
#[derive(Debug)]
pub struct ResponseHeader {
    /// The host sequence number this response resolves, recovered from the
    /// pending-call table.
    pub seq: u64,
    /// Set when the server reported a failure; when present,
    /// [`ClientCodec::read_response_body`] is a no-op (§4.2): there is no
    /// result to decode once an error is already known.
    pub error: Option<Error>,
}

/// The client-side half of the codec (§4.2).
pub struct ClientCodec<R: Read, W: Write> {
    responses: serde_json::StreamDeserializer<'static, IoRead<R>, Value>,
    writer: W,
    /// Host sequence number -> the id we sent on the wire for it.
    pending: BTreeMap<u64, Id>,
    current: Option<(u64, Outcome)>,
    poisoned: bool,
    shutdown: bool,
}

impl<R: Read, W: Write> ClientCodec<R, W> {
    /// Build a client codec over a reader (incoming responses) and writer
    /// (outgoing requests).
    pub fn new(reader: R, writer: W) -> Self {
        ClientCodec {
            responses: serde_json::Deserializer::from_reader(reader).into_iter::<Value>(),
            writer,
            pending: BTreeMap::new(),
            current: None,
            poisoned: false,
            shutdown: false,
        }
    }

    /// Encode and write one request under `seq`, the host's own call
    /// sequence number (used verbatim as the wire id). Records `seq` in the
    /// pending-call table; a reply is expected.
    ///
    /// Validates `params` before writing a single byte: only an array,
    /// object, or absent value is representable (§4.2). A scalar is
    /// rejected with [`CodecError::UnsupportedParams`] and nothing reaches
    /// the wire.
    pub fn write_request<T: Serialize>(&mut self, seq: u64, method: &str, params: Option<&T>) -> Result<(), CodecError> {
        self.write(Some(seq), method, params)
    }

    /// Encode and write one notification: `id` is JSON `null` (§3, §6) and
    /// nothing is recorded in the pending-call table, since a notification
    /// never receives a reply.
    pub fn write_notification<T: Serialize>(&mut self, method: &str, params: Option<&T>) -> Result<(), CodecError> {
        self.write(None, method, params)
    }

    fn write<T: Serialize>(&mut self, seq: Option<u64>, method: &str, params: Option<&T>) -> Result<(), CodecError> {
        if self.shutdown {
            return Err(CodecError::Shutdown);
        }
        if self.poisoned {
            return Err(CodecError::SiblingDecodeFailed);
        }

        let params_value = match params {
            None => None,
            Some(p) => {
                let value = serde_json::to_value(p).map_err(to_io_error)?;
                match value {
                    Value::Null => None,
                    Value::Array(_) | Value::Object(_) => Some(value),
                    other => {
                        return Err(CodecError::UnsupportedParams(format!(
                            "params for {method} serialize to a JSON {}, not an array or object",
                            json_kind(&other)
                        )));
                    }
                }
            }
        };

        let id = match seq {
            Some(seq) => Id::from(seq as i64),
            None => Id::null(),
        };
        let request = ClientRequest { method: method.to_string(), params: params_value, id: id.as_value().clone() };
        serde_json::to_writer(&mut self.writer, &request).map_err(to_io_error)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        if let Some(seq) = seq {
            self.pending.insert(seq, id);
        }
        Ok(())
    }

    /// Decode the next response and resolve it to a pending sequence number.
    ///
    /// A response whose id cannot be parsed, or whose shape violates §3's
    /// invariants, poisons the codec (see [`ClientCodec::take_poisoned`]):
    /// every other pending call is now unrecoverable, since the stream's
    /// framing may be fine but correlation to the right call no longer is.
    pub fn read_response_header(&mut self) -> Result<ResponseHeader, CodecError> {
        if self.poisoned {
            return Err(CodecError::SiblingDecodeFailed);
        }
        if self.shutdown {
            return Err(CodecError::Shutdown);
        }

        match self.responses.next() {
            None => Err(CodecError::EndOfStream),
            Some(Err(e)) => {
                self.poisoned = true;
                log::error!("jrpc_bridge: malformed response, poisoning {} pending call(s): {e}", self.pending.len());
                Err(CodecError::BadResponse(e.to_string()))
            }
            Some(Ok(Value::Object(obj))) => match ClientResponse::from_object(obj) {
                Ok(resp) => {
                    let seq = self.resolve_seq(&resp.id);
                    let error = match &resp.outcome {
                        Outcome::Failure(e) => Some(e.clone()),
                        Outcome::Success(_) => None,
                    };
                    self.current = Some((seq, resp.outcome));
                    Ok(ResponseHeader { seq, error })
                }
                Err(msg) => {
                    self.poisoned = true;
                    Err(CodecError::BadResponse(msg))
                }
            },
            Some(Ok(_)) => {
                self.poisoned = true;
                Err(CodecError::BadResponse("response is not a JSON object".into()))
            }
        }
    }

    /// Resolve an incoming id to a pending sequence number, removing it from
    /// the table. Falls back to the lowest still-pending sequence number
    /// when the id matches nothing pending; a malformed or misrouted
    /// response still has to be assigned to *some* call so the host doesn't
    /// wait on it forever.
    fn resolve_seq(&mut self, id: &Id) -> u64 {
        let found = self.pending.iter().find(|(_, v)| *v == id).map(|(seq, _)| *seq);
        let seq = found.or_else(|| self.pending.keys().next().copied()).unwrap_or(0);
        self.pending.remove(&seq);
        seq
    }

    /// Decode the body for the response whose header was just read.
    ///
    /// A no-op returning `T::default()` when the header carried an error;
    /// there is no result to decode. A decode failure here poisons the
    /// codec the same way a malformed header does.
    pub fn read_response_body<T: DeserializeOwned + Default>(&mut self) -> Result<T, CodecError> {
        let (_, outcome) = self.current.take().expect("read_response_body called without a pending header");
        match outcome {
            Outcome::Success(value) => serde_json::from_value(value).map_err(|_| {
                self.poisoned = true;
                CodecError::SiblingDecodeFailed
            }),
            Outcome::Failure(_) => Ok(T::default()),
        }
    }

    /// If a decode failure poisoned the codec, take every sequence number
    /// that was still pending when it happened, so the host can fail each
    /// one with [`CodecError::SiblingDecodeFailed`].
    pub fn take_poisoned(&mut self) -> Option<Vec<u64>> {
        if self.poisoned { Some(std::mem::take(&mut self.pending).into_keys().collect()) } else { None }
    }

    /// Mark this codec shut down and return every sequence number that was
    /// still pending, for the host to fail with [`CodecError::Shutdown`].
    pub fn close(&mut self) -> Vec<u64> {
        self.shutdown = true;
        std::mem::take(&mut self.pending).into_keys().collect()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn to_io_error(e: serde_json::Error) -> CodecError {
    CodecError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
