use std::sync::Arc;

use crate::Hasherize;
use crate::decode::Fields;
use crate::error::HashError;
use crate::field::{ElementType, FieldDescriptor};
use crate::schema::TypeSchema;
use crate::transform::{self, BoxError, FromTransform, ToTransform};
use crate::value::Value;

/// Initial transforms for every field named in one `declare_with` call.
#[derive(Clone, Default)]
pub struct FieldOptions {
    pub(crate) to: Option<ToTransform>,
    pub(crate) from: Option<FromTransform>,
}

impl FieldOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn to<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.to = Some(transform::to_transform(f));
        self
    }

    pub fn from<F>(mut self, f: F) -> Self
    where
        F: Fn(Value, &Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        self.from = Some(transform::from_transform(f));
        self
    }
}

impl std::fmt::Debug for FieldOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldOptions")
            .field("to", &self.to.is_some())
            .field("from", &self.from.is_some())
            .finish()
    }
}

/// Fluent builder bound to the descriptors registered by one `declare` call.
///
/// Every setter applies to all bound descriptors. `set_reconstruction`
/// configures the owning type instead and ends the chain.
///
/// ```ignore
/// registry
///     .declare::<Member>(["label"])
///     .to(|v| Ok(format!("--{}", v.as_str().unwrap_or_default()).into()))
///     .set_reconstruction(|mut f| Ok(Member { label: f.take("label")? }));
/// ```
pub struct Declaration<'r, T: Hasherize> {
    schema: &'r mut TypeSchema<T>,
    bound: Vec<usize>,
}

impl<'r, T: Hasherize> Declaration<'r, T> {
    pub(crate) fn new(schema: &'r mut TypeSchema<T>, bound: Vec<usize>) -> Self {
        Self { schema, bound }
    }

    pub fn to<F>(self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        let to = transform::to_transform(f);
        self.apply(|field| field.to = Some(Arc::clone(&to)))
    }

    pub fn from<F>(self, f: F) -> Self
    where
        F: Fn(Value, &Value) -> Result<Value, BoxError> + Send + Sync + 'static,
    {
        let from = transform::from_transform(f);
        self.apply(|field| field.from = Some(Arc::clone(&from)))
    }

    /// Mark the bound fields as sequences of `E` instances.
    pub fn collection<E: Hasherize>(self) -> Self {
        let element = ElementType::of::<E>();
        self.apply(|field| {
            field.element_type = Some(element);
            field.object_type = None;
        })
    }

    /// Mark the bound fields as holding a single nested `E` (or `null`).
    pub fn object<E: Hasherize>(self) -> Self {
        let object = ElementType::of::<E>();
        self.apply(|field| {
            field.object_type = Some(object);
            field.element_type = None;
        })
    }

    /// Set the reconstruction strategy of the whole owning type.
    pub fn set_reconstruction<F>(self, f: F)
    where
        F: Fn(Fields) -> Result<T, HashError> + Send + Sync + 'static,
    {
        tracing::debug!(type_name = %self.schema.type_name(), "reconstruction strategy set");
        self.schema.set_reconstruction(Arc::new(f));
    }

    /// Names of the descriptors this builder is bound to.
    pub fn field_names(&self) -> Vec<&str> {
        self.bound
            .iter()
            .map(|&pos| self.schema.fields()[pos].name())
            .collect()
    }

    fn apply(self, mut f: impl FnMut(&mut FieldDescriptor)) -> Self {
        for &pos in &self.bound {
            f(self.schema.field_at_mut(pos));
        }
        self
    }
}
