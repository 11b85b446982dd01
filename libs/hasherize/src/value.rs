use std::any::{Any, TypeId};

use serde::Serialize;

use crate::Hasherize;
use crate::error::HashError;

/// Canonical value representation: scalar, ordered sequence, or nested map.
pub type Value = serde_json::Value;

/// Ordered field map produced by encode and consumed by decode.
///
/// Key order is insertion order (`serde_json` is built with `preserve_order`).
pub type Hash = serde_json::Map<String, Value>;

/// Borrowed nested instance of a convertible type.
#[derive(Clone, Copy)]
pub struct ObjectRef<'a> {
    object: &'a dyn Any,
    type_name: &'static str,
}

impl<'a> ObjectRef<'a> {
    pub fn new<T: Hasherize>(object: &'a T) -> Self {
        Self {
            object,
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        (*self.object).type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn as_any(&self) -> &'a dyn Any {
        self.object
    }
}

/// A field as read from an instance, before encoding.
///
/// - `Value`: already a plain value; transforms apply to it directly.
/// - `Object`: a nested instance; encoded through its own type's schema.
/// - `List`: ordered sequence; elements resolved individually.
pub enum FieldRef<'a> {
    Value(Value),
    Object(ObjectRef<'a>),
    List(Vec<FieldRef<'a>>),
}

impl<'a> FieldRef<'a> {
    pub fn value(value: impl Into<Value>) -> Self {
        FieldRef::Value(value.into())
    }

    /// Serialize any serde value into a plain field.
    pub fn serialize<T: Serialize + ?Sized>(value: &T) -> Result<Self, HashError> {
        Ok(FieldRef::Value(serde_json::to_value(value)?))
    }

    pub fn object<T: Hasherize>(object: &'a T) -> Self {
        FieldRef::Object(ObjectRef::new(object))
    }

    /// `None` encodes as `null`.
    pub fn optional_object<T: Hasherize>(object: Option<&'a T>) -> Self {
        match object {
            Some(o) => FieldRef::Object(ObjectRef::new(o)),
            None => FieldRef::Value(Value::Null),
        }
    }

    pub fn objects<T: Hasherize>(objects: &'a [T]) -> Self {
        FieldRef::List(objects.iter().map(FieldRef::object).collect())
    }
}

impl std::fmt::Debug for FieldRef<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldRef::Value(v) => f.debug_tuple("Value").field(v).finish(),
            FieldRef::Object(o) => write!(f, "Object({})", o.type_name),
            FieldRef::List(items) => f.debug_tuple("List").field(items).finish(),
        }
    }
}

/// A decoded field, handed to reconstruction strategies through `Fields`.
pub enum FieldValue {
    Value(Value),
    Object(Box<dyn Any + Send>),
    List(Vec<FieldValue>),
}

impl FieldValue {
    pub fn is_object(&self) -> bool {
        matches!(self, FieldValue::Object(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            FieldValue::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Take the decoded instance out, if this slot holds a `T`.
    ///
    /// Returns the slot back unchanged on mismatch.
    pub fn downcast<T: Hasherize>(self) -> Result<T, FieldValue> {
        match self {
            FieldValue::Object(boxed) => match boxed.downcast::<T>() {
                Ok(object) => Ok(*object),
                Err(boxed) => Err(FieldValue::Object(boxed)),
            },
            other => Err(other),
        }
    }

    /// Convert a value-only slot back to a plain `Value`.
    ///
    /// Lists convert element-wise; any decoded object makes this fail.
    pub fn into_value(self) -> Option<Value> {
        match self {
            FieldValue::Value(v) => Some(v),
            FieldValue::Object(_) => None,
            FieldValue::List(items) => items
                .into_iter()
                .map(FieldValue::into_value)
                .collect::<Option<Vec<_>>>()
                .map(Value::Array),
        }
    }
}

impl std::fmt::Debug for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
            FieldValue::Object(_) => f.write_str("Object(..)"),
            FieldValue::List(items) => f.debug_tuple("List").field(items).finish(),
        }
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        FieldValue::Value(value)
    }
}
