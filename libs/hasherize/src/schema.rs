use std::any::Any;
use std::sync::Arc;

use crate::Hasherize;
use crate::decode::{self, Fields};
use crate::encode;
use crate::error::HashError;
use crate::field::FieldDescriptor;
use crate::registry::Registry;
use crate::value::{Hash, Value};

/// Whole-object reconstruction strategy: decoded field map → instance.
pub type Reconstruct<T> = Arc<dyn Fn(Fields) -> Result<T, HashError> + Send + Sync>;

/// Type registry of one convertible type.
///
/// Field order is declaration order and determines encoded key order.
/// Append-only: a repeated field name replaces the earlier descriptor in place.
pub struct TypeSchema<T> {
    type_name: &'static str,
    fields: Vec<FieldDescriptor>,
    reconstruction: Option<Reconstruct<T>>,
}

impl<T: Hasherize> TypeSchema<T> {
    pub(crate) fn new() -> Self {
        Self {
            type_name: std::any::type_name::<T>(),
            fields: Vec::new(),
            reconstruction: None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_reconstruction(&self) -> bool {
        self.reconstruction.is_some()
    }

    /// Register `field`, returning its position.
    pub(crate) fn add_field(&mut self, field: FieldDescriptor) -> usize {
        if let Some(pos) = self.fields.iter().position(|f| f.name == field.name) {
            tracing::debug!(type_name = %self.type_name, field = %field.name, "field redeclared, replacing");
            self.fields[pos] = field;
            pos
        } else {
            tracing::trace!(type_name = %self.type_name, field = %field.name, "field declared");
            self.fields.push(field);
            self.fields.len() - 1
        }
    }

    pub(crate) fn field_at_mut(&mut self, pos: usize) -> &mut FieldDescriptor {
        &mut self.fields[pos]
    }

    pub(crate) fn set_reconstruction(&mut self, strategy: Reconstruct<T>) {
        if self.reconstruction.is_some() {
            tracing::debug!(type_name = %self.type_name, "reconstruction strategy replaced");
        }
        self.reconstruction = Some(strategy);
    }

    /// Build an instance from decoded fields.
    ///
    /// Falls back to `Hasherize::from_fields` without a registered strategy.
    pub(crate) fn reconstruct(&self, fields: Fields) -> Result<T, HashError> {
        match &self.reconstruction {
            Some(strategy) => strategy(fields),
            None => T::from_fields(fields),
        }
    }
}

impl<T> std::fmt::Debug for TypeSchema<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeSchema")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields)
            .field("reconstruction", &self.reconstruction.is_some())
            .finish()
    }
}

/// Type-erased view of a `TypeSchema`, used when recursing into nested
/// objects whose concrete type is only known by `TypeId`.
pub(crate) trait ErasedSchema: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn field_names(&self) -> Vec<&str>;

    fn encode_any(&self, registry: &Registry, object: &dyn Any, depth: usize)
    -> Result<Hash, HashError>;

    fn decode_any(
        &self,
        registry: &Registry,
        hash: Hash,
        metadata: &Value,
        depth: usize,
    ) -> Result<Box<dyn Any + Send>, HashError>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Hasherize> ErasedSchema for TypeSchema<T> {
    fn type_name(&self) -> &'static str {
        self.type_name
    }

    fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.name()).collect()
    }

    fn encode_any(
        &self,
        registry: &Registry,
        object: &dyn Any,
        depth: usize,
    ) -> Result<Hash, HashError> {
        let object = object
            .downcast_ref::<T>()
            .ok_or_else(|| HashError::UnregisteredType(self.type_name.to_string()))?;
        encode::encode_object(registry, self, object, depth)
    }

    fn decode_any(
        &self,
        registry: &Registry,
        hash: Hash,
        metadata: &Value,
        depth: usize,
    ) -> Result<Box<dyn Any + Send>, HashError> {
        let object = decode::decode_hash(registry, self, hash, metadata, depth)?;
        Ok(Box::new(object))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
