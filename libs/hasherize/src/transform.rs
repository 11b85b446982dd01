use std::sync::Arc;

use crate::value::Value;

/// Error returned by user-supplied transforms.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Encode-side value transform: `value -> encoded value`.
///
/// Transforms are plain closures resolved at declaration time. They must be
/// `Send + Sync` so a frozen registry can be shared between threads.
pub type ToTransform = Arc<dyn Fn(Value) -> Result<Value, BoxError> + Send + Sync>;

/// Decode-side value transform: `(encoded value, metadata) -> value`.
///
/// The second argument is the round-trip metadata of the current decode
/// call, or `Value::Null` when the input carried none.
pub type FromTransform = Arc<dyn Fn(Value, &Value) -> Result<Value, BoxError> + Send + Sync>;

pub(crate) fn to_transform<F>(f: F) -> ToTransform
where
    F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}

pub(crate) fn from_transform<F>(f: F) -> FromTransform
where
    F: Fn(Value, &Value) -> Result<Value, BoxError> + Send + Sync + 'static,
{
    Arc::new(f)
}
