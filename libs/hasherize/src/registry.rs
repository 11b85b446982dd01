use std::any::TypeId;
use std::collections::HashMap;

use crate::Hasherize;
use crate::builder::{Declaration, FieldOptions};
use crate::config::HashConfig;
use crate::decode;
use crate::encode;
use crate::error::HashError;
use crate::field::FieldDescriptor;
use crate::schema::{ErasedSchema, TypeSchema};
use crate::value::{Hash, ObjectRef, Value};

/// Registry of every convertible type, keyed by `TypeId`.
///
/// Built once at startup through `declare*` (requires `&mut self`), then
/// shared immutably for `encode`/`decode`. A type's schema is created on its
/// first declaration.
pub struct Registry {
    schemas: HashMap<TypeId, Box<dyn ErasedSchema>>,
    config: HashConfig,
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_config(HashConfig::default())
    }
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: HashConfig) -> Self {
        Self {
            schemas: HashMap::new(),
            config,
        }
    }

    pub fn config(&self) -> &HashConfig {
        &self.config
    }

    /// Reserved key carrying round-trip metadata.
    pub fn metadata_key(&self) -> &str {
        &self.config.metadata_key
    }

    /// Register one field per name against `T` and return a builder bound
    /// to them.
    pub fn declare<T: Hasherize>(
        &mut self,
        names: impl IntoIterator<Item = impl AsRef<str>>,
    ) -> Declaration<'_, T> {
        self.declare_with(names, FieldOptions::default())
    }

    /// Like `declare`, seeding every new descriptor with `options`.
    pub fn declare_with<T: Hasherize>(
        &mut self,
        names: impl IntoIterator<Item = impl AsRef<str>>,
        options: FieldOptions,
    ) -> Declaration<'_, T> {
        let metadata_key = self.config.metadata_key.clone();
        let schema = self.schema_mut::<T>();
        let bound = names
            .into_iter()
            .map(|name| {
                let name = name.as_ref();
                if name == metadata_key {
                    tracing::warn!(
                        type_name = %schema.type_name(),
                        field = %name,
                        "field name collides with the metadata key, encode will reject it"
                    );
                }
                let mut field = FieldDescriptor::new(name);
                field.to = options.to.clone();
                field.from = options.from.clone();
                schema.add_field(field)
            })
            .collect();
        Declaration::new(schema, bound)
    }

    pub fn is_registered<T: Hasherize>(&self) -> bool {
        self.schemas.contains_key(&TypeId::of::<T>())
    }

    /// Declared field names of `T` in encode order. Empty if unregistered.
    pub fn field_names<T: Hasherize>(&self) -> Vec<&str> {
        self.schemas
            .get(&TypeId::of::<T>())
            .map(|s| s.field_names())
            .unwrap_or_default()
    }

    pub fn schema<T: Hasherize>(&self) -> Result<&TypeSchema<T>, HashError> {
        self.schemas
            .get(&TypeId::of::<T>())
            .and_then(|s| s.as_any().downcast_ref::<TypeSchema<T>>())
            .ok_or_else(|| HashError::UnregisteredType(std::any::type_name::<T>().to_string()))
    }

    /// Object → map, in declaration order.
    pub fn encode<T: Hasherize>(&self, object: &T) -> Result<Hash, HashError> {
        let schema = self.schema::<T>()?;
        encode::encode_object(self, schema, object, 0)
    }

    /// Encode, then append the reserved metadata key.
    pub fn encode_with_metadata<T: Hasherize>(
        &self,
        object: &T,
        metadata: Value,
    ) -> Result<Hash, HashError> {
        let mut hash = self.encode(object)?;
        hash.insert(self.config.metadata_key.clone(), metadata);
        Ok(hash)
    }

    /// Map → object. Unknown keys fail with `UnconfiguredField`.
    pub fn decode<T: Hasherize>(&self, hash: Hash) -> Result<T, HashError> {
        let schema = self.schema::<T>()?;
        decode::decode_hash(self, schema, hash, &Value::Null, 0)
    }

    /// Decode any `Value`; only objects are accepted.
    pub fn decode_value<T: Hasherize>(&self, value: Value) -> Result<T, HashError> {
        match value {
            Value::Object(hash) => self.decode(hash),
            _ => Err(HashError::mismatch(std::any::type_name::<T>(), "an object")),
        }
    }

    pub(crate) fn encode_nested(
        &self,
        object: ObjectRef<'_>,
        depth: usize,
    ) -> Result<Hash, HashError> {
        let schema = self
            .schemas
            .get(&object.type_id())
            .ok_or_else(|| HashError::UnregisteredType(object.type_name().to_string()))?;
        schema.encode_any(self, object.as_any(), depth)
    }

    pub(crate) fn decode_nested(
        &self,
        type_id: TypeId,
        type_name: &str,
        hash: Hash,
        metadata: &Value,
        depth: usize,
    ) -> Result<Box<dyn std::any::Any + Send>, HashError> {
        let schema = self
            .schemas
            .get(&type_id)
            .ok_or_else(|| HashError::UnregisteredType(type_name.to_string()))?;
        schema.decode_any(self, hash, metadata, depth)
    }

    fn schema_mut<T: Hasherize>(&mut self) -> &mut TypeSchema<T> {
        let slot = self.schemas.entry(TypeId::of::<T>()).or_insert_with(|| {
            tracing::debug!(type_name = %std::any::type_name::<T>(), "registering type");
            Box::new(TypeSchema::<T>::new())
        });
        match slot.as_any_mut().downcast_mut::<TypeSchema<T>>() {
            Some(schema) => schema,
            None => unreachable!("schema slot keyed by TypeId holds a different type"),
        }
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.schemas.values().map(|s| s.type_name()).collect();
        types.sort_unstable();
        f.debug_struct("Registry")
            .field("types", &types)
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::DEFAULT_METADATA_KEY;
    use crate::{FieldRef, Fields};

    #[derive(Debug, PartialEq)]
    struct Flag(bool);

    impl Hasherize for Flag {
        fn read_field(&self, name: &str) -> Result<FieldRef<'_>, HashError> {
            match name {
                "on" => Ok(FieldRef::value(self.0)),
                _ => Err(HashError::UnreadableField {
                    type_name: "Flag".into(),
                    field: name.into(),
                }),
            }
        }

        fn from_fields(mut fields: Fields) -> Result<Self, HashError> {
            Ok(Flag(fields.take("on")?))
        }
    }

    #[test]
    fn schema_is_created_lazily() {
        let mut registry = Registry::new();
        assert!(!registry.is_registered::<Flag>());
        assert!(registry.field_names::<Flag>().is_empty());

        registry.declare::<Flag>(["on"]);
        assert!(registry.is_registered::<Flag>());
        assert_eq!(registry.field_names::<Flag>(), vec!["on"]);
    }

    #[test]
    fn unregistered_type_fails_both_ways() {
        let registry = Registry::new();
        assert!(matches!(
            registry.encode(&Flag(true)),
            Err(HashError::UnregisteredType(_))
        ));
        assert!(matches!(
            registry.decode::<Flag>(Hash::new()),
            Err(HashError::UnregisteredType(_))
        ));
    }

    #[test]
    fn declare_with_seeds_transforms() {
        let mut registry = Registry::new();
        registry.declare_with::<Flag>(
            ["on"],
            FieldOptions::new()
                .to(|v| Ok(Value::from(if v.as_bool() == Some(true) { "yes" } else { "no" })))
                .from(|v, _| Ok(Value::from(v.as_str() == Some("yes")))),
        );

        let hash = registry.encode(&Flag(true)).unwrap();
        assert_eq!(Value::Object(hash.clone()), json!({"on": "yes"}));
        assert_eq!(registry.decode::<Flag>(hash).unwrap(), Flag(true));
    }

    #[test]
    fn encode_with_metadata_appends_reserved_key() {
        let mut registry = Registry::new();
        registry.declare::<Flag>(["on"]);

        let hash = registry.encode_with_metadata(&Flag(false), json!({"v": 1})).unwrap();
        let keys: Vec<&String> = hash.keys().collect();
        assert_eq!(keys, vec!["on", "__hasherize_meta__"]);
        assert_eq!(registry.decode::<Flag>(hash).unwrap(), Flag(false));
    }

    #[test]
    fn field_named_like_metadata_key_is_rejected_on_encode() {
        let mut registry = Registry::new();
        registry.declare::<Flag>(["on", DEFAULT_METADATA_KEY]);

        let err = registry.encode(&Flag(true)).unwrap_err();
        assert!(matches!(err, HashError::Config(ref msg) if msg.contains(DEFAULT_METADATA_KEY)));

        let mut registry = Registry::with_config(HashConfig {
            metadata_key: "on".into(),
            ..Default::default()
        });
        registry.declare::<Flag>(["on"]);
        assert!(matches!(registry.encode(&Flag(true)), Err(HashError::Config(_))));
    }

    #[test]
    fn decode_value_rejects_non_objects() {
        let mut registry = Registry::new();
        registry.declare::<Flag>(["on"]);
        assert!(matches!(
            registry.decode_value::<Flag>(json!([1, 2])),
            Err(HashError::TypeMismatch { .. })
        ));
        assert_eq!(registry.decode_value::<Flag>(json!({"on": true})).unwrap(), Flag(true));
    }

    #[test]
    fn registry_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Registry>();
    }
}
