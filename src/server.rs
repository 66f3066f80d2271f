// SPDX-License-Identifier: MIT OR Apache-2.0
//! The server-side codec (§4.1): decode a request header, decode its body,
//! write one response.
//!
//! [`ServerCodec`] exposes exactly the three operations §4.1 calls for.
//! A host that wants full static typing per registered method drives these
//! directly. [`serve_connection`] is the higher-level, dynamically-typed
//! convenience built on top of them (§2 "public entry points"); it is also
//! what the batch dispatcher (§4.3) uses internally to serve the loopback
//! connection, since batch elements are inherently dynamic.

use crate::context::Context;
use crate::dispatcher::{Dispatcher, HandlerError, ParamShape};
use crate::error::{CodecError, Error};
use crate::id::{Id, IdSlot};
use crate::wire::{RawServerRequest, ServerResponse};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use serde_json::de::IoRead;
use std::io::{Read, Write};

/// The method name and sequence number for one decoded request (§4.1).
///
/// For a batch, `method` is [`crate::batch::BATCH_METHOD`] and the params
/// (available via [`ServerCodec::read_request_body`]) are the raw batch
/// array. For a request the codec could not even parse, `method` is empty;
/// see [`ServerCodec::pending_error`] to detect that case.
#[derive(Debug, Clone)]
pub struct RequestHeader {
    pub method: String,
    pub seq: u64,
}

/// What the codec is waiting to write a response for.
enum Slot {
    /// An ordinary call awaiting a reply under this id.
    Call { id: Id },
    /// A notification: whatever the host passes to `write_response` is discarded.
    Notification,
    /// The synthetic batch method (§4.3): the response is an already-built
    /// JSON array, written unwrapped.
    Batch,
    /// `read_request_header` already determined the response (a framing or
    /// shape error); `write_response` ignores whatever the host supplies.
    Preempted { id: Id, error: Error },
}

/// The server-side half of the codec (§4.1).
pub struct ServerCodec<R: Read, W: Write> {
    requests: serde_json::StreamDeserializer<'static, IoRead<R>, Value>,
    writer: W,
    seq: u64,
    slot: Option<Slot>,
    pending_params: Option<Value>,
}

impl<R: Read, W: Write> ServerCodec<R, W> {
    /// Build a server codec over a reader (incoming requests) and writer
    /// (outgoing responses). Most hosts want [`serve_connection`] instead of
    /// driving these three operations by hand.
    pub fn new(reader: R, writer: W) -> Self {
        ServerCodec {
            requests: serde_json::Deserializer::from_reader(reader).into_iter::<Value>(),
            writer,
            seq: 0,
            slot: None,
            pending_params: None,
        }
    }

    /// Decode the next framed JSON value and classify it (§4.1).
    ///
    /// Returns [`CodecError::EndOfStream`] on ordinary stream exhaustion.
    /// Never fails for a malformed request; malformed input instead
    /// produces a [`ServerCodec::pending_error`] the host must still drain
    /// with [`ServerCodec::read_request_body`] and flush with
    /// [`ServerCodec::write_response`].
    pub fn read_request_header(&mut self) -> Result<RequestHeader, CodecError> {
        self.seq += 1;
        let seq = self.seq;

        let value = match self.requests.next() {
            None => return Err(CodecError::EndOfStream),
            Some(Ok(v)) => v,
            Some(Err(e)) => {
                log::warn!("jrpc_bridge: parse error decoding request: {e}");
                self.preempt(Id::null(), Error::parse_error());
                return Ok(RequestHeader { method: String::new(), seq });
            }
        };

        match value {
            Value::Array(elements) if elements.is_empty() => {
                self.preempt(Id::null(), Error::invalid_request());
                Ok(RequestHeader { method: String::new(), seq })
            }
            Value::Array(elements) => {
                self.slot = Some(Slot::Batch);
                self.pending_params = Some(Value::Array(elements));
                Ok(RequestHeader { method: crate::batch::BATCH_METHOD.to_string(), seq })
            }
            Value::Object(_) => {
                let raw: RawServerRequest = serde_json::from_value(value)
                    .expect("RawServerRequest has no required fields; deserialize from an object cannot fail");
                match raw.interpret() {
                    Ok(req) => {
                        self.pending_params = req.params;
                        let method = req.method;
                        match req.id {
                            IdSlot::Present(id) => self.slot = Some(Slot::Call { id }),
                            IdSlot::Absent => self.slot = Some(Slot::Notification),
                        }
                        Ok(RequestHeader { method, seq })
                    }
                    Err((error, id)) => {
                        self.preempt(id, error);
                        Ok(RequestHeader { method: String::new(), seq })
                    }
                }
            }
            _ => {
                self.preempt(Id::null(), Error::invalid_request());
                Ok(RequestHeader { method: String::new(), seq })
            }
        }
    }

    fn preempt(&mut self, id: Id, error: Error) {
        self.pending_params = None;
        self.slot = Some(Slot::Preempted { id, error });
    }

    /// Whether the current slot's response is already decided; the host
    /// should skip dispatch entirely and go straight to `write_response`.
    pub fn pending_error(&self) -> Option<&Error> {
        match &self.slot {
            Some(Slot::Preempted { error, .. }) => Some(error),
            _ => None,
        }
    }

    /// Whether the current slot is a notification (no response will be sent).
    pub fn is_notification(&self) -> bool {
        matches!(self.slot, Some(Slot::Notification))
    }

    /// Decode the stored params into `T`, validating their JSON shape
    /// against `shape` first (§4.1).
    ///
    /// A no-op returning `T::default()` when [`ServerCodec::pending_error`]
    /// is set; the params were never meaningfully parsed in that case.
    pub fn read_request_body<T: DeserializeOwned + Default>(&mut self, shape: ParamShape) -> Result<T, Error> {
        if matches!(self.slot, Some(Slot::Preempted { .. })) {
            return Ok(T::default());
        }
        let params = self.pending_params.take();
        shape.validate(&params, std::any::type_name::<T>())?;
        let value = params.unwrap_or_else(|| shape.default_value());
        serde_json::from_value(value).map_err(|e| Error::invalid_params(e.to_string()))
    }

    /// Write the single response this slot calls for, or nothing at all for
    /// a notification (or a fully-suppressed empty batch).
    ///
    /// # Panics
    /// Panics if called without a preceding `read_request_header`, or twice
    /// for the same header; the host-driven state machine in §4.1 forbids
    /// both.
    pub fn write_response<T: Serialize>(&mut self, outcome: Result<T, HandlerError>) -> Result<(), CodecError> {
        let slot = self.slot.take().expect("write_response called without a pending request");
        match slot {
            Slot::Preempted { id, error } => self.write_failure(id, error),
            Slot::Notification => Ok(()),
            Slot::Batch => match outcome {
                Ok(value) => match to_value(value)? {
                    Value::Array(items) if items.is_empty() => Ok(()),
                    other => self.write_raw(&other),
                },
                Err(handler_error) => self.write_failure(Id::null(), handler_error.into_wire_error()),
            },
            Slot::Call { id } => match outcome {
                Ok(value) => self.write_raw(&ServerResponse::success(id, to_value(value)?)),
                Err(handler_error) => self.write_failure(id, handler_error.into_wire_error()),
            },
        }
    }

    fn write_failure(&mut self, id: Id, error: Error) -> Result<(), CodecError> {
        self.write_raw(&ServerResponse::failure(id, error))
    }

    fn write_raw<T: Serialize>(&mut self, value: &T) -> Result<(), CodecError> {
        serde_json::to_writer(&mut self.writer, value).map_err(to_io_error)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, CodecError> {
    serde_json::to_value(value).map_err(to_io_error)
}

fn to_io_error(e: serde_json::Error) -> CodecError {
    CodecError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}

/// Drive one [`ServerCodec`] to completion against `dispatcher`, the
/// dynamically-typed convenience entry point (§2).
///
/// Decodes requests until the stream ends cleanly, dispatching each one
/// (batch requests are intercepted and run through
/// [`crate::batch::run_batch`] rather than reaching `dispatcher`) and
/// writing back whatever response each slot calls for. Returns `Ok(())` on
/// ordinary stream exhaustion.
pub fn serve_connection<R: Read, W: Write, D: Dispatcher + ?Sized>(
    reader: R,
    writer: W,
    dispatcher: &D,
) -> Result<(), CodecError> {
    serve_with_context(reader, writer, dispatcher, Context::new())
}

/// As [`serve_connection`], but under a caller-supplied context rather than
/// a fresh one; the batch dispatcher (§4.3) uses this to hand every
/// synthetic sub-invocation the same context (and so the same cancellation
/// flag) as the batch call itself.
pub fn serve_with_context<R: Read, W: Write, D: Dispatcher + ?Sized>(
    reader: R,
    writer: W,
    dispatcher: &D,
    ctx: Context,
) -> Result<(), CodecError> {
    let mut codec = ServerCodec::new(reader, writer);
    loop {
        let header = match codec.read_request_header() {
            Ok(h) => h,
            Err(CodecError::EndOfStream) => return Ok(()),
            Err(e) => return Err(e),
        };

        if codec.pending_error().is_some() {
            let _: Value = codec
                .read_request_body(ParamShape::Any)
                .expect("Any shape never fails to validate or decode");
            codec.write_response(Ok(Value::Null))?;
            continue;
        }

        let params: Value = codec
            .read_request_body(ParamShape::Any)
            .expect("Any shape never fails to validate or decode");
        let params = if params.is_null() { None } else { Some(params) };

        let outcome = if header.method == crate::batch::BATCH_METHOD {
            let elements = params.and_then(|v| v.as_array().cloned()).unwrap_or_default();
            crate::batch::run_batch(dispatcher, &elements, &ctx)
        } else {
            dispatcher.call(&header.method, params, &ctx)
        };

        codec.write_response(outcome)?;
    }
}
