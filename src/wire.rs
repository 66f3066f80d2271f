// SPDX-License-Identifier: MIT OR Apache-2.0
//! Wire-level request/response envelopes (§3).
//!
//! Two pairs of types live here: [`ServerRequest`]/[`ServerResponse`], which
//! the server codec decodes/encodes, and [`ClientRequest`]/[`ClientResponse`],
//! which the client codec encodes/decodes. They are deliberately asymmetric;
//! a server decodes requests loosely (so it can still produce a precise
//! error) and encodes responses strictly, while a client encodes requests
//! strictly and decodes responses with the stricter validation called for
//! in §3.

use crate::error::Error;
use crate::id::{Id, IdSlot};
use serde::Serialize;
use serde::ser::SerializeStruct;
use serde_json::{Map, Value};

/// A loosely-parsed top-level JSON object, decoded just far enough to let
/// the server codec classify it (§4.1): `method` and `id` are kept as raw
/// `Value`s so the codec can tell "absent" from "wrong type" from "valid".
#[derive(Debug, Clone, serde::Deserialize)]
pub struct RawServerRequest {
    #[serde(default)]
    pub jsonrpc: Option<Value>,
    #[serde(default)]
    pub method: Option<Value>,
    #[serde(default)]
    pub params: Option<Value>,
    /// `None` means the `id` member was absent entirely (a notification).
    /// `Some(Value::Null)` means it was present and `null`.
    #[serde(default, deserialize_with = "id_field::deserialize")]
    pub id: Option<Value>,
}

/// `serde(deserialize_with)` helper so `id: Option<Value>` distinguishes
/// "absent" from "present and null" the way `#[serde(default)]` alone cannot.
mod id_field {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Some(Value::deserialize(deserializer)?))
    }
}

impl RawServerRequest {
    /// Interpret the raw fields into a validated [`ServerRequest`], or the
    /// specific error §4.1 calls for.
    ///
    /// Returns `(request, captured_id)` on success; on failure returns the
    /// error to enqueue plus whatever id could still be salvaged (null if
    /// the id itself was also malformed).
    pub fn interpret(self) -> Result<ServerRequest, (Error, Id)> {
        let id_slot = match self.id {
            None => IdSlot::Absent,
            Some(v) => match Id::from_value(v) {
                Some(id) => IdSlot::Present(id),
                None => IdSlot::Present(Id::null()),
            },
        };
        let captured_id = id_slot.or_null();

        let method = match &self.method {
            Some(Value::String(s)) => s.clone(),
            _ => return Err((Error::invalid_request(), captured_id)),
        };

        if let Some(params) = &self.params {
            if !(params.is_array() || params.is_object()) {
                return Err((Error::invalid_request(), captured_id));
            }
        }

        Ok(ServerRequest { method, params: self.params, id: id_slot })
    }
}

/// A validated server-bound request (§3 "Server request envelope").
#[derive(Debug, Clone)]
pub struct ServerRequest {
    pub method: String,
    pub params: Option<Value>,
    pub id: IdSlot,
}

/// Either a successful result or a failure, for [`ServerResponse`]/[`ClientResponse`].
#[derive(Debug, Clone)]
pub enum Outcome {
    Success(Value),
    Failure(Error),
}

/// A server-emitted response (§3 "Server response envelope", §6).
///
/// Serializes as `{"id", "result", "error": null}` on success and
/// `{"id", "error"}` (no `result` key at all) on failure; the asymmetric
/// "legacy field presence contract" called out in §3 and §9.
#[derive(Debug, Clone)]
pub struct ServerResponse {
    pub id: Id,
    pub outcome: Outcome,
}

impl ServerResponse {
    pub fn success(id: Id, result: Value) -> Self {
        ServerResponse { id, outcome: Outcome::Success(result) }
    }

    pub fn failure(id: Id, error: Error) -> Self {
        ServerResponse { id, outcome: Outcome::Failure(error) }
    }
}

impl Serialize for ServerResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match &self.outcome {
            Outcome::Success(result) => {
                let mut s = serializer.serialize_struct("ServerResponse", 3)?;
                s.serialize_field("id", self.id.as_value())?;
                s.serialize_field("result", result)?;
                s.serialize_field("error", &Option::<&Error>::None)?;
                s.end()
            }
            Outcome::Failure(error) => {
                let mut s = serializer.serialize_struct("ServerResponse", 2)?;
                s.serialize_field("id", self.id.as_value())?;
                s.serialize_field("error", error)?;
                s.end()
            }
        }
    }
}

/// A client-emitted request (§3 "Client request envelope", §6).
///
/// `params` is omitted from the wire entirely when `None`, per §4.2
/// ("omitted entirely when the effective value is ... absent").
#[derive(Debug, Clone)]
pub struct ClientRequest {
    pub method: String,
    pub params: Option<Value>,
    /// The JSON id: a number for a call, `null` for a notification.
    pub id: Value,
}

impl Serialize for ClientRequest {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let len = if self.params.is_some() { 3 } else { 2 };
        let mut s = serializer.serialize_struct("ClientRequest", len)?;
        s.serialize_field("method", &self.method)?;
        if let Some(params) = &self.params {
            s.serialize_field("params", params)?;
        }
        s.serialize_field("id", &self.id)?;
        s.end()
    }
}

/// A client-decoded response (§3 "Client response envelope").
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub id: Id,
    pub outcome: Outcome,
}

/// Top-level object keys a client response is allowed to carry. `jsonrpc` is
/// tolerated (§9: "tolerate if present, do not require") but anything else
/// is a protocol violation.
const ALLOWED_RESPONSE_KEYS: &[&str] = &["jsonrpc", "id", "result", "error"];

impl ClientResponse {
    /// Validate and interpret a parsed top-level JSON object as a client
    /// response, enforcing every invariant in §3's "Client response envelope".
    pub fn from_object(mut obj: Map<String, Value>) -> Result<Self, String> {
        for key in obj.keys() {
            if !ALLOWED_RESPONSE_KEYS.contains(&key.as_str()) {
                return Err(format!("unexpected field in response: {key:?}"));
            }
        }

        let id_value = obj.remove("id").ok_or_else(|| "response missing id".to_string())?;
        let id = Id::from_value(id_value).ok_or_else(|| "response id is not a number, string, or null".to_string())?;

        // "result" must be tracked by key presence, not by whether its value
        // happens to be null: a success reply for a method returning nothing
        // is `{"id":X,"result":null,"error":null}` (see ServerResponse), and
        // that still has to classify as success.
        let result_present = obj.contains_key("result");
        let result = obj.remove("result").unwrap_or(Value::Null);
        let error = match obj.remove("error") {
            Some(Value::Null) | None => None,
            Some(v) => Some(
                serde_json::from_value::<Error>(v)
                    .map_err(|e| format!("malformed error object: {e}"))?,
            ),
        };

        match (result_present, error) {
            (true, Some(_)) => Err("response has both result and error".to_string()),
            (false, None) => Err("response has neither result nor error".to_string()),
            (true, None) => Ok(ClientResponse { id, outcome: Outcome::Success(result) }),
            (false, Some(error)) => Ok(ClientResponse { id, outcome: Outcome::Failure(error) }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_response_emits_null_error_field() {
        let resp = ServerResponse::success(Id::from(0i64), json!(8));
        let s = serde_json::to_string(&resp).unwrap();
        assert_eq!(s, r#"{"id":0,"result":8,"error":null}"#);
    }

    #[test]
    fn failure_response_omits_result_field() {
        let resp = ServerResponse::failure(Id::null(), Error::parse_error());
        let s = serde_json::to_string(&resp).unwrap();
        assert_eq!(s, r#"{"id":null,"error":{"code":-32700,"message":"Parse error"}}"#);
    }

    #[test]
    fn client_request_omits_absent_params() {
        let req = ClientRequest { method: "Svc.Sum".into(), params: None, id: json!(0) };
        let s = serde_json::to_string(&req).unwrap();
        assert_eq!(s, r#"{"method":"Svc.Sum","id":0}"#);
    }

    #[test]
    fn client_request_includes_params_when_present() {
        let req = ClientRequest { method: "Svc.Sum".into(), params: Some(json!([3, 5])), id: json!(0) };
        let s = serde_json::to_string(&req).unwrap();
        assert_eq!(s, r#"{"method":"Svc.Sum","params":[3,5],"id":0}"#);
    }

    #[test]
    fn client_response_rejects_both_result_and_error() {
        let obj: Map<String, Value> =
            serde_json::from_value(json!({"id": 1, "result": 1, "error": {"code": -1, "message": "x"}})).unwrap();
        assert!(ClientResponse::from_object(obj).is_err());
    }

    #[test]
    fn client_response_rejects_neither_result_nor_error() {
        let obj: Map<String, Value> = serde_json::from_value(json!({"id": 1})).unwrap();
        assert!(ClientResponse::from_object(obj).is_err());
    }

    #[test]
    fn client_response_rejects_unknown_field() {
        let obj: Map<String, Value> =
            serde_json::from_value(json!({"id": 1, "result": 1, "extra": true})).unwrap();
        assert!(ClientResponse::from_object(obj).is_err());
    }

    #[test]
    fn client_response_null_result_is_success_not_neither() {
        let obj: Map<String, Value> =
            serde_json::from_value(json!({"id": 1, "result": null, "error": null})).unwrap();
        let resp = ClientResponse::from_object(obj).unwrap();
        assert!(matches!(resp.outcome, Outcome::Success(Value::Null)));
    }

    #[test]
    fn client_response_tolerates_jsonrpc_field() {
        let obj: Map<String, Value> =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "result": 1})).unwrap();
        assert!(ClientResponse::from_object(obj).is_ok());
    }

    #[test]
    fn raw_server_request_distinguishes_absent_and_null_id() {
        let with_null: RawServerRequest = serde_json::from_str(r#"{"method":"M","id":null}"#).unwrap();
        assert_eq!(with_null.id, Some(Value::Null));
        let absent: RawServerRequest = serde_json::from_str(r#"{"method":"M"}"#).unwrap();
        assert_eq!(absent.id, None);
    }

    #[test]
    fn raw_server_request_scalar_params_is_invalid_request() {
        let raw: RawServerRequest = serde_json::from_str(r#"{"method":"M","params":5,"id":1}"#).unwrap();
        let err = raw.interpret().unwrap_err();
        assert_eq!(err.0.code, crate::error::INVALID_REQUEST);
    }

    #[test]
    fn raw_server_request_missing_method_is_invalid_request() {
        let raw: RawServerRequest = serde_json::from_str(r#"{"id":7}"#).unwrap();
        let err = raw.interpret().unwrap_err();
        assert_eq!(err.0.code, crate::error::INVALID_REQUEST);
        assert_eq!(err.1, Id::from(7i64));
    }
}
