use serde::de::DeserializeOwned;

use crate::Hasherize;
use crate::error::HashError;
use crate::field::{ElementType, FieldDescriptor};
use crate::registry::Registry;
use crate::schema::TypeSchema;
use crate::value::{FieldValue, Hash, Value};

/// Decoded field map handed to reconstruction strategies.
///
/// Keeps input key order. Accessors remove the entry they read, so each
/// field is moved out exactly once.
#[derive(Debug, Default)]
pub struct Fields {
    entries: Vec<(String, FieldValue)>,
}

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a field.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) {
        let name = name.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| k == &name) {
            entry.1 = value;
        } else {
            self.entries.push((name, value));
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let pos = self.entries.iter().position(|(k, _)| k == name)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Deserialize a plain field.
    ///
    /// An absent field deserializes from `null`: `Option<_>` targets become
    /// `None`, anything else fails with `MissingField`.
    pub fn take<V: DeserializeOwned>(&mut self, name: &str) -> Result<V, HashError> {
        match self.remove(name) {
            Some(slot) => {
                let value = slot
                    .into_value()
                    .ok_or_else(|| HashError::mismatch(name, "a plain value"))?;
                serde_json::from_value(value).map_err(|e| HashError::mismatch(name, e.to_string()))
            }
            None => serde_json::from_value(Value::Null)
                .map_err(|_| HashError::MissingField(name.to_string())),
        }
    }

    /// Take the raw value of a plain field.
    pub fn take_value(&mut self, name: &str) -> Option<Value> {
        self.remove(name).and_then(FieldValue::into_value)
    }

    /// Take a decoded nested instance.
    pub fn take_object<U: Hasherize>(&mut self, name: &str) -> Result<U, HashError> {
        let slot = self
            .remove(name)
            .ok_or_else(|| HashError::MissingField(name.to_string()))?;
        slot.downcast::<U>()
            .map_err(|_| HashError::mismatch(name, std::any::type_name::<U>()))
    }

    /// Like `take_object`, with absent or `null` fields read as `None`.
    pub fn take_optional_object<U: Hasherize>(&mut self, name: &str) -> Result<Option<U>, HashError> {
        match self.remove(name) {
            None | Some(FieldValue::Value(Value::Null)) => Ok(None),
            Some(slot) => slot
                .downcast::<U>()
                .map(Some)
                .map_err(|_| HashError::mismatch(name, std::any::type_name::<U>())),
        }
    }

    /// Take a collection whose every element decoded to a `U`.
    ///
    /// Absent or `null` collections read as empty.
    pub fn take_objects<U: Hasherize>(&mut self, name: &str) -> Result<Vec<U>, HashError> {
        match self.remove(name) {
            None | Some(FieldValue::Value(Value::Null)) => Ok(Vec::new()),
            Some(FieldValue::List(items)) => items
                .into_iter()
                .map(|item| {
                    item.downcast::<U>().map_err(|_| {
                        HashError::mismatch(name, format!("a list of {}", std::any::type_name::<U>()))
                    })
                })
                .collect(),
            Some(_) => Err(HashError::mismatch(name, "a list")),
        }
    }

    /// Take a collection with mixed elements (decoded objects and plain values).
    pub fn take_list(&mut self, name: &str) -> Result<Vec<FieldValue>, HashError> {
        match self.remove(name) {
            None | Some(FieldValue::Value(Value::Null)) => Ok(Vec::new()),
            Some(FieldValue::List(items)) => Ok(items),
            Some(FieldValue::Value(Value::Array(values))) => {
                Ok(values.into_iter().map(FieldValue::Value).collect())
            }
            Some(_) => Err(HashError::mismatch(name, "a list")),
        }
    }
}

impl IntoIterator for Fields {
    type Item = (String, FieldValue);
    type IntoIter = std::vec::IntoIter<(String, FieldValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Decode `hash` into a `T` using `schema`.
///
/// The reserved metadata key is stripped at every level. A nested map's own
/// metadata overrides the inherited one for its subtree.
pub(crate) fn decode_hash<T: Hasherize>(
    registry: &Registry,
    schema: &TypeSchema<T>,
    mut hash: Hash,
    inherited: &Value,
    depth: usize,
) -> Result<T, HashError> {
    let max_depth = registry.config().max_depth;
    if depth > max_depth {
        return Err(HashError::DepthExceeded(max_depth));
    }

    let own = hash.shift_remove(registry.metadata_key());
    let metadata = own.as_ref().unwrap_or(inherited);

    let mut fields = Fields::new();
    for (key, value) in hash {
        let Some(field) = schema.field(&key) else {
            tracing::debug!(type_name = %schema.type_name(), field = %key, "unconfigured field in input");
            return Err(HashError::UnconfiguredField {
                type_name: schema.type_name().to_string(),
                field: key,
            });
        };
        let decoded = match (field.element_type(), field.object_type()) {
            (Some(element), _) => decode_collection(registry, field, element, value, metadata, depth)?,
            (None, Some(object)) => {
                decode_element(registry, field, object, value, metadata, depth)?
            }
            (None, None) => FieldValue::Value(field.apply_from(value, metadata)?),
        };
        fields.insert(key, decoded);
    }

    schema.reconstruct(fields).inspect_err(|e| {
        tracing::debug!(type_name = %schema.type_name(), error = %e, "reconstruction failed");
    })
}

/// Decode a collection field: apply `from` to each element, then decode
/// every map-shaped result as `element`.
fn decode_collection(
    registry: &Registry,
    field: &FieldDescriptor,
    element: ElementType,
    value: Value,
    metadata: &Value,
    depth: usize,
) -> Result<FieldValue, HashError> {
    let items = match value {
        Value::Array(items) => items,
        Value::Null => return Ok(FieldValue::Value(Value::Null)),
        _ => return Err(HashError::mismatch(field.name(), "a sequence")),
    };

    items
        .into_iter()
        .map(|item| decode_element(registry, field, element, item, metadata, depth))
        .collect::<Result<Vec<_>, _>>()
        .map(FieldValue::List)
}

/// `from`, then decode a map-shaped result as `element`; anything else
/// passes through as a plain value.
fn decode_element(
    registry: &Registry,
    field: &FieldDescriptor,
    element: ElementType,
    value: Value,
    metadata: &Value,
    depth: usize,
) -> Result<FieldValue, HashError> {
    match field.apply_from(value, metadata)? {
        Value::Object(hash) => Ok(FieldValue::Object(registry.decode_nested(
            element.id(),
            element.name(),
            hash,
            metadata,
            depth + 1,
        )?)),
        other => Ok(FieldValue::Value(other)),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn take_missing_option_is_none() {
        let mut fields = Fields::new();
        let value: Option<String> = fields.take("commit").unwrap();
        assert_eq!(value, None);
    }

    #[test]
    fn take_missing_required_fails() {
        let mut fields = Fields::new();
        let err = fields.take::<String>("commit").unwrap_err();
        assert!(matches!(err, HashError::MissingField(ref f) if f == "commit"));
    }

    #[test]
    fn take_wrong_type_is_mismatch() {
        let mut fields = Fields::new();
        fields.insert("count", json!("three").into());
        assert!(matches!(
            fields.take::<u32>("count"),
            Err(HashError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn take_moves_the_field_out() {
        let mut fields = Fields::new();
        fields.insert("file", json!("README.md").into());
        assert_eq!(fields.take::<String>("file").unwrap(), "README.md");
        assert!(!fields.contains("file"));
        assert!(fields.is_empty());
    }

    #[test]
    fn insert_replaces_and_keeps_order() {
        let mut fields = Fields::new();
        fields.insert("a", json!(1).into());
        fields.insert("b", json!(2).into());
        fields.insert("a", json!(3).into());
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(fields.get("a").and_then(FieldValue::as_value), Some(&json!(3)));
    }

    #[test]
    fn take_list_accepts_plain_arrays() {
        let mut fields = Fields::new();
        fields.insert("tags", json!(["x", "y"]).into());
        let items = fields.take_list("tags").unwrap();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| !i.is_object()));
    }

    #[test]
    fn take_objects_treats_absent_as_empty() {
        struct Unit;
        impl Hasherize for Unit {
            fn read_field(&self, name: &str) -> Result<crate::FieldRef<'_>, HashError> {
                Err(HashError::UnreadableField {
                    type_name: "Unit".into(),
                    field: name.into(),
                })
            }
            fn from_fields(_: Fields) -> Result<Self, HashError> {
                Ok(Unit)
            }
        }

        let mut fields = Fields::new();
        assert!(fields.take_objects::<Unit>("items").unwrap().is_empty());
        fields.insert("items", json!("nope").into());
        assert!(matches!(
            fields.take_objects::<Unit>("items"),
            Err(HashError::TypeMismatch { .. })
        ));
    }
}
