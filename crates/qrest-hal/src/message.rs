//! Untyped backend messages.
//!
//! Vendor responses are kept as [`ServerMessage`] (a JSON value) and read
//! through [`MessageExt`], whose accessors fail with
//! [`ServerError::MalformedResponse`] instead of defaulting.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::error::{ServerError, ServerResult};

/// Opaque structured response from a backend.
pub type ServerMessage = Value;

/// Request headers, ordered by name.
pub type RestHeaders = BTreeMap<String, String>;

/// Strict field access on a [`ServerMessage`].
pub trait MessageExt {
    /// Get a field that must be present (any type, including null).
    fn field(&self, name: &str) -> ServerResult<&Value>;

    /// Get a string field.
    fn str_field(&self, name: &str) -> ServerResult<&str>;

    /// Get an optional string field; present-but-not-a-string is an error.
    fn opt_str_field(&self, name: &str) -> ServerResult<Option<&str>>;

    /// Get a signed integer field.
    fn i64_field(&self, name: &str) -> ServerResult<i64>;

    /// Get an unsigned integer field.
    fn u64_field(&self, name: &str) -> ServerResult<u64>;

    /// Get an object field.
    fn object_field(&self, name: &str) -> ServerResult<&Map<String, Value>>;

    /// Get an array field.
    fn array_field(&self, name: &str) -> ServerResult<&Vec<Value>>;
}

impl MessageExt for Value {
    fn field(&self, name: &str) -> ServerResult<&Value> {
        let object = self
            .as_object()
            .ok_or_else(|| ServerError::malformed(format!("expected an object containing '{name}'"), self))?;
        object
            .get(name)
            .ok_or_else(|| ServerError::malformed(format!("missing field '{name}'"), self))
    }

    fn str_field(&self, name: &str) -> ServerResult<&str> {
        self.field(name)?
            .as_str()
            .ok_or_else(|| ServerError::malformed(format!("field '{name}' is not a string"), self))
    }

    fn opt_str_field(&self, name: &str) -> ServerResult<Option<&str>> {
        match self.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(_) => Err(ServerError::malformed(
                format!("field '{name}' is not a string"),
                self,
            )),
        }
    }

    fn i64_field(&self, name: &str) -> ServerResult<i64> {
        self.field(name)?
            .as_i64()
            .ok_or_else(|| ServerError::malformed(format!("field '{name}' is not an integer"), self))
    }

    fn u64_field(&self, name: &str) -> ServerResult<u64> {
        self.field(name)?.as_u64().ok_or_else(|| {
            ServerError::malformed(
                format!("field '{name}' is not a non-negative integer"),
                self,
            )
        })
    }

    fn object_field(&self, name: &str) -> ServerResult<&Map<String, Value>> {
        self.field(name)?
            .as_object()
            .ok_or_else(|| ServerError::malformed(format!("field '{name}' is not an object"), self))
    }

    fn array_field(&self, name: &str) -> ServerResult<&Vec<Value>> {
        self.field(name)?
            .as_array()
            .ok_or_else(|| ServerError::malformed(format!("field '{name}' is not an array"), self))
    }
}
