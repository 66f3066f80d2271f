// SPDX-License-Identifier: MIT OR Apache-2.0
//! The JSON-RPC `id`: a number, a string, or null; round-tripped verbatim.
//!
//! `serde_json::Value` already distinguishes `Value::Number(0)` from
//! `Value::String("0")`, so representing an id as a validated wrapper around
//! `Value` is sufficient to satisfy the round-trip invariant in §3: an id
//! that arrived as the string `"0"` is never re-emitted as the number `0`.

use serde_json::Value;

/// An id that is present on the wire: a JSON number, string, or null.
///
/// Constructed only through [`Id::from_value`], which rejects arrays,
/// objects, booleans, and other shapes JSON-RPC doesn't recognize as ids.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct Id(Value);

impl Id {
    /// The `null` id.
    pub fn null() -> Self {
        Id(Value::Null)
    }

    /// Build an id from an already-parsed JSON value, validating its shape.
    ///
    /// Returns `None` if `value` is an array, object, or boolean; none of
    /// which are valid JSON-RPC ids.
    pub fn from_value(value: Value) -> Option<Self> {
        match &value {
            Value::Number(_) | Value::String(_) | Value::Null => Some(Id(value)),
            _ => None,
        }
    }

    /// Borrow the underlying JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Consume this id, returning the underlying JSON value.
    pub fn into_value(self) -> Value {
        self.0
    }

    /// True if this id is JSON `null` (as opposed to absent; see [`IdSlot`]).
    pub fn is_null(&self) -> bool {
        self.0.is_null()
    }
}

impl From<i64> for Id {
    fn from(v: i64) -> Self {
        Id(Value::from(v))
    }
}

impl From<&str> for Id {
    fn from(v: &str) -> Self {
        Id(Value::from(v))
    }
}

impl From<String> for Id {
    fn from(v: String) -> Self {
        Id(Value::from(v))
    }
}

impl<'de> serde::Deserialize<'de> for Id {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        Id::from_value(value).ok_or_else(|| serde::de::Error::custom("id must be a number, string, or null"))
    }
}

/// Whether a request carried an `id` member at all.
///
/// A request with no `id` member is a notification (§3, §4.1): the codec
/// must suppress any response for it entirely, even an error response.
/// This is the "present flag" called for in the data model, paired with the
/// [`Id`] payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdSlot {
    /// The request carried an id (possibly `null`) and expects a reply.
    Present(Id),
    /// The request had no `id` member at all: a notification.
    Absent,
}

impl IdSlot {
    /// True for [`IdSlot::Absent`].
    pub fn is_notification(&self) -> bool {
        matches!(self, IdSlot::Absent)
    }

    /// The id to echo in a response, defaulting to `null` for a notification
    /// slot that is (abnormally) being replied to anyway, e.g. a Parse Error
    /// whose id could not be determined at all (§4.1).
    pub fn or_null(&self) -> Id {
        match self {
            IdSlot::Present(id) => id.clone(),
            IdSlot::Absent => Id::null(),
        }
    }
}
