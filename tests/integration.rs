// SPDX-License-Identifier: MIT OR Apache-2.0
//! Black-box integration tests (§8): drive the server and client codecs
//! against each other over the in-memory loopback pipe, the way two real
//! peers on a socket would.

use jrpc_bridge::{Context, Dispatcher, HandlerError, ParamShape};
use jrpc_bridge::error::Error;
use jrpc_bridge::server::serve_connection;
use serde_json::{Value, json};
use std::io::Cursor;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

struct SumDispatcher;

impl Dispatcher for SumDispatcher {
    fn call(&self, method: &str, params: Option<Value>, _ctx: &Context) -> Result<Value, HandlerError> {
        match method {
            "Svc.Sum" => {
                ParamShape::Array.validate(&params, "[2]int").map_err(HandlerError::Domain)?;
                let args: [i64; 2] = serde_json::from_value(params.unwrap_or(Value::Null))
                    .map_err(|e| HandlerError::Domain(Error::invalid_params(e.to_string())))?;
                Ok(json!(args[0] + args[1]))
            }
            "Svc.Msg" => Ok(Value::Null),
            _ => Err(HandlerError::Domain(Error::method_not_found())),
        }
    }
}

fn run(input: &str) -> String {
    init_logging();
    let mut out = Vec::new();
    serve_connection(Cursor::new(input.as_bytes()), &mut out, &SumDispatcher).unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn malformed_top_level_is_a_single_parse_error() {
    assert_eq!(run("x\n"), "{\"id\":null,\"error\":{\"code\":-32700,\"message\":\"Parse error\"}}\n");
}

#[test]
fn call_round_trips_result() {
    assert_eq!(
        run("{\"id\":0,\"method\":\"Svc.Sum\",\"params\":[3,5]}\n"),
        "{\"id\":0,\"result\":8,\"error\":null}\n"
    );
}

#[test]
fn batch_drops_notifications_and_preserves_order() {
    let input = "[{\"method\":\"Svc.Msg\",\"params\":[\"one\"]},{\"id\":0,\"method\":\"Svc.Sum\",\"params\":[2,3]},{\"method\":\"Svc.Msg\",\"params\":[\"two\"]}]\n";
    assert_eq!(run(input), "[{\"id\":0,\"result\":5,\"error\":null}]\n");
}

#[test]
fn notification_then_call_with_no_separator() {
    let input = "{\"method\":\"Svc.Sum\",\"params\":[2,3]}{\"id\":0,\"method\":\"Svc.Sum\",\"params\":[3,5]}\n";
    assert_eq!(run(input), "{\"id\":0,\"result\":8,\"error\":null}\n");
}

#[test]
fn wrong_param_shape_is_invalid_params() {
    let out = run("{\"id\":0,\"method\":\"Svc.Sum\",\"params\":{}}\n");
    assert!(out.contains("\"code\":-32602"));
}

#[test]
fn empty_batch_is_invalid_request() {
    assert_eq!(run("[]\n"), "{\"id\":null,\"error\":{\"code\":-32600,\"message\":\"Invalid Request\"}}\n");
}

#[test]
fn batch_with_one_invalid_element_reports_its_own_error() {
    let out = run("[{\"id\":0,\"method\":\"Svc.Sum\",\"params\":[1,1]},5]\n");
    let parsed: Value = serde_json::from_str(out.trim_end()).unwrap();
    let array = parsed.as_array().unwrap();
    assert_eq!(array.len(), 2);
    assert_eq!(array[0]["result"], json!(2));
    assert_eq!(array[1]["error"]["code"], json!(-32600));
}

#[test]
fn id_number_zero_and_string_zero_round_trip_distinctly() {
    assert_eq!(
        run("{\"id\":\"0\",\"method\":\"Svc.Sum\",\"params\":[3,5]}\n"),
        "{\"id\":\"0\",\"result\":8,\"error\":null}\n"
    );
    assert_eq!(
        run("{\"id\":0,\"method\":\"Svc.Sum\",\"params\":[3,5]}\n"),
        "{\"id\":0,\"result\":8,\"error\":null}\n"
    );
}

/// Drives a real `ClientCodec` against a `ServerCodec` wired together over
/// the loopback pipe, the way a client library and a server would over a
/// socket; exercises write_request/read_response_header/read_response_body
/// together instead of each in isolation.
#[test]
fn client_codec_calls_server_codec_over_a_loopback_pipe() {
    init_logging();
    let ((client_writer, client_reader), (server_writer, server_reader)) = jrpc_bridge::pipe::duplex();

    let server = std::thread::spawn(move || {
        serve_connection(server_reader, server_writer, &SumDispatcher).unwrap();
    });

    let mut client = jrpc_bridge::ClientCodec::new(client_reader, client_writer);
    client.write_request(0, "Svc.Sum", Some(&[3, 5])).unwrap();
    let header = client.read_response_header().unwrap();
    assert_eq!(header.seq, 0);
    assert!(header.error.is_none());
    let value: i64 = client.read_response_body().unwrap();
    assert_eq!(value, 8);

    client.close();
    drop(client);
    server.join().unwrap();
}

/// A notification written by the client produces no reply at all; a
/// following call on the same connection still gets one.
#[test]
fn client_notification_gets_no_reply_but_following_call_does() {
    init_logging();
    let ((client_writer, client_reader), (server_writer, server_reader)) = jrpc_bridge::pipe::duplex();

    let server = std::thread::spawn(move || {
        serve_connection(server_reader, server_writer, &SumDispatcher).unwrap();
    });

    let mut client = jrpc_bridge::ClientCodec::new(client_reader, client_writer);
    client.write_notification("Svc.Msg", Some(&["hi"])).unwrap();
    client.write_request(0, "Svc.Sum", Some(&[3, 5])).unwrap();

    let header = client.read_response_header().unwrap();
    assert_eq!(header.seq, 0);
    let value: i64 = client.read_response_body().unwrap();
    assert_eq!(value, 8);

    client.close();
    drop(client);
    server.join().unwrap();
}
