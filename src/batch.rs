// SPDX-License-Identifier: MIT OR Apache-2.0
//! The synthetic `JSONRPC1.Batch` method (§4.3).
//!
//! A JSON-RPC batch is a top-level array of requests that must be dispatched
//! and replied to as a unit, in order, with notifications and
//! without-id-invalid-requests silently dropped from the reply array. Rather
//! than teaching the server codec's state machine a second parsing path for
//! this, the batch array is wrapped into one ordinary call to this synthetic
//! method and served over a loopback connection built from [`crate::pipe`],
//! reusing the exact same [`crate::server::serve_with_context`] loop a real
//! connection uses.

use crate::context::Context;
use crate::dispatcher::{Dispatcher, HandlerError};
use crate::error::Error;
use crate::pipe;
use serde_json::Value;
use std::io::Write;

/// The method name the server codec dispatches a non-empty top-level JSON
/// array under (§4.1, §4.3). Never sent or received as a literal method name
/// on the wire; it only ever appears as the `method` field of the
/// [`crate::server::RequestHeader`] the codec hands back for a batch.
pub const BATCH_METHOD: &str = "JSONRPC1.Batch";

/// Whether `element` is shaped so the server codec will actually write a
/// reply for it. Mirrors `ServerCodec::read_request_header`'s own
/// classification exactly (down to a malformed or method-less object still
/// getting an error reply even without an `id`, per §4.1) so the driver
/// waits for exactly as many reply lines as the inner codec will write.
///
/// A non-empty array element recurses, since the inner codec would dispatch
/// it as a nested batch; an array reply is itself suppressed only when
/// every one of its own elements would be.
fn expects_reply(element: &Value) -> bool {
    match element {
        Value::Array(items) => items.is_empty() || items.iter().any(expects_reply),
        Value::Object(_) => {
            match serde_json::from_value::<crate::wire::RawServerRequest>(element.clone()).ok().and_then(|raw| raw.interpret().ok()) {
                Some(req) => !req.id.is_notification(),
                None => true,
            }
        }
        _ => true,
    }
}

/// Run one batch of already-parsed elements against `dispatcher`, returning
/// the JSON array of replies (possibly empty, in which case the caller must
/// suppress the response entirely rather than write `[]`).
pub fn run_batch<D: Dispatcher + ?Sized>(dispatcher: &D, elements: &[Value], ctx: &Context) -> Result<Value, HandlerError> {
    log::debug!("jrpc_bridge: dispatching batch of {} element(s)", elements.len());
    let ((mut driver_writer, driver_reader), (server_writer, server_reader)) = pipe::duplex();

    let result = std::thread::scope(|scope| {
        let server_ctx = ctx.clone();
        let serve_handle = scope.spawn(move || {
            crate::server::serve_with_context(server_reader, server_writer, dispatcher, server_ctx)
        });

        for element in elements {
            if let Err(e) = write_element(&mut driver_writer, element) {
                return Err(Error::internal_error(format!("batch: failed writing sub-request: {e}")));
            }
        }
        drop(driver_writer);

        let mut replies = Vec::new();
        let mut stream = serde_json::Deserializer::from_reader(driver_reader).into_iter::<Value>();
        for element in elements {
            if !expects_reply(element) {
                continue;
            }
            match stream.next() {
                Some(Ok(reply)) => replies.push(reply),
                Some(Err(e)) => return Err(Error::internal_error(format!("batch: malformed sub-reply: {e}"))),
                None => return Err(Error::internal_error("batch: connection closed before all replies arrived")),
            }
        }
        drop(stream);

        match serve_handle.join() {
            Ok(Ok(())) => Ok(Value::Array(replies)),
            Ok(Err(e)) => Err(Error::internal_error(format!("batch: sub-connection failed: {e}"))),
            Err(_) => Err(Error::internal_error("batch: sub-connection thread panicked")),
        }
    });

    result.map_err(HandlerError::Domain)
}

fn write_element<W: Write>(writer: &mut W, element: &Value) -> std::io::Result<()> {
    serde_json::to_writer(&mut *writer, element)?;
    writer.write_all(b"\n")
}
