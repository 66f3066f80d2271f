// SPDX-License-Identifier: MIT OR Apache-2.0
//! The host dispatcher seam (§1, §9 "Host dispatcher interface").
//!
//! The host RPC dispatcher; registration of services, method reflection,
//! parameter marshaling into user types; is explicitly out of scope for
//! this crate (§1). What the core *does* need is a narrow seam to call into
//! that dispatcher: once during ordinary serving, and recursively once per
//! element of a batch (§4.3). [`Dispatcher`] is that seam.
//!
//! Rust has no runtime reflection over a registered method's declared
//! parameter type, so instead of the server codec guessing a shape, the
//! host states it directly via [`ParamShape`] when it asks to decode params.

use crate::error::Error;
use serde_json::Value;

/// The JSON shape a host's parameter type expects (§4.1).
///
/// Declared by the host when it calls
/// [`crate::server::ServerCodec::read_request_body`], so the codec can
/// validate the raw `params` JSON against it before attempting to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamShape {
    /// A fixed-size array or tuple: params must be a JSON array.
    Array,
    /// A growable sequence (`Vec<T>` and friends): params must be a JSON
    /// array; missing params decodes to an empty sequence.
    Slice,
    /// A string-keyed map: params must be a JSON object; missing params
    /// decodes to an empty map.
    Map,
    /// A named-field struct: params may be absent or a JSON object. Unlike
    /// [`ParamShape::Array`], a JSON array is never accepted here; this
    /// core does not support positional struct params (§9).
    Struct,
    /// No shape constraint; whatever `serde_json` can decode into the
    /// target type, including scalars.
    Any,
}

impl ParamShape {
    /// Validate `params` against this shape, returning the Invalid Params
    /// message §4.1 calls for on a mismatch, naming `type_name`.
    pub(crate) fn validate(self, params: &Option<Value>, type_name: &str) -> Result<(), Error> {
        match self {
            ParamShape::Array => match params {
                Some(Value::Array(_)) => Ok(()),
                _ => Err(Error::invalid_params(format!("expected an array of params for {type_name}"))),
            },
            ParamShape::Slice => match params {
                None | Some(Value::Array(_)) => Ok(()),
                _ => Err(Error::invalid_params(format!("expected an array of params for {type_name}"))),
            },
            ParamShape::Map => match params {
                None | Some(Value::Object(_)) => Ok(()),
                _ => Err(Error::invalid_params(format!("expected an object of params for {type_name}"))),
            },
            ParamShape::Struct => match params {
                None | Some(Value::Object(_)) => Ok(()),
                _ => Err(Error::invalid_params(format!("expected an object of params for {type_name}"))),
            },
            ParamShape::Any => Ok(()),
        }
    }

    /// The JSON value to decode when `params` was absent on the wire.
    pub(crate) fn default_value(self) -> Value {
        match self {
            ParamShape::Slice => Value::Array(Vec::new()),
            ParamShape::Map | ParamShape::Struct => Value::Object(Default::default()),
            ParamShape::Array | ParamShape::Any => Value::Null,
        }
    }
}

/// What a host method handler returns when it fails, distinguishing a
/// structured domain [`Error`] from an opaque error it didn't construct
/// itself (§4.4).
#[derive(Debug)]
pub enum HandlerError {
    /// The host already built a JSON-RPC [`Error`]; serialize it verbatim.
    Domain(Error),
    /// Any other error; classified via [`Error::classify_host_error`].
    Other(Box<dyn std::error::Error + Send + Sync>),
}

impl HandlerError {
    /// Resolve to the wire-level [`Error`] that should be sent for this failure.
    pub fn into_wire_error(self) -> Error {
        match self {
            HandlerError::Domain(e) => e,
            HandlerError::Other(e) => Error::classify_host_error(e.as_ref()),
        }
    }
}

impl From<Error> for HandlerError {
    fn from(e: Error) -> Self {
        HandlerError::Domain(e)
    }
}

/// The host RPC dispatcher, as seen by this crate.
///
/// An embedding application implements this to register its methods; the
/// server codec and batch dispatcher call [`Dispatcher::call`] once a
/// request has been decoded and validated. The dispatcher receives raw
/// params because the *shape* check (§4.1) already happened in
/// [`crate::server::ServerCodec::read_request_body`]; decoding into a
/// concrete type is the dispatcher's own business.
pub trait Dispatcher: Send + Sync {
    /// Invoke `method` with `params` (already validated as array/object/absent)
    /// under request-scoped `ctx`, returning the JSON result to serialize or
    /// the error to report.
    ///
    /// An unknown `method` should return
    /// `Err(HandlerError::Domain(Error::method_not_found()))`.
    fn call(&self, method: &str, params: Option<Value>, ctx: &crate::context::Context) -> Result<Value, HandlerError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn array_shape_rejects_object_params() {
        let err = ParamShape::Array.validate(&Some(serde_json::json!({})), "[2]int").unwrap_err();
        assert_eq!(err.code, crate::error::INVALID_PARAMS);
    }

    #[test]
    fn slice_shape_allows_missing_params() {
        assert!(ParamShape::Slice.validate(&None, "Vec<i64>").is_ok());
    }

    #[test]
    fn struct_shape_rejects_array_params() {
        let err = ParamShape::Struct.validate(&Some(serde_json::json!([1, 2])), "Args").unwrap_err();
        assert_eq!(err.code, crate::error::INVALID_PARAMS);
    }

    #[test]
    fn handler_error_classifies_other_errors() {
        #[derive(Debug)]
        struct NotFound;
        impl std::fmt::Display for NotFound {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "rpc: can't find method Svc.Nope")
            }
        }
        impl std::error::Error for NotFound {}

        let he = HandlerError::Other(Box::new(NotFound));
        let wire = he.into_wire_error();
        assert_eq!(wire.code, crate::error::METHOD_NOT_FOUND);
    }
}
