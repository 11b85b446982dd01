use std::any::TypeId;

use crate::Hasherize;
use crate::error::HashError;
use crate::transform::{FromTransform, ToTransform};
use crate::value::Value;

/// Reference to the convertible type held by a nested or collection field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementType {
    id: TypeId,
    name: &'static str,
}

impl ElementType {
    pub fn of<T: Hasherize>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: std::any::type_name::<T>(),
        }
    }

    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// One convertible attribute of a type.
///
/// With `element_type` set the field holds an ordered sequence and the
/// transforms apply per element (after recursive encode, before recursive
/// decode). With `object_type` set it holds a single nested instance, decoded
/// from the map the `from` transform returns.
#[derive(Clone)]
pub struct FieldDescriptor {
    pub(crate) name: String,
    pub(crate) to: Option<ToTransform>,
    pub(crate) from: Option<FromTransform>,
    pub(crate) element_type: Option<ElementType>,
    pub(crate) object_type: Option<ElementType>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            to: None,
            from: None,
            element_type: None,
            object_type: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn element_type(&self) -> Option<ElementType> {
        self.element_type
    }

    pub fn object_type(&self) -> Option<ElementType> {
        self.object_type
    }

    pub fn is_collection(&self) -> bool {
        self.element_type.is_some()
    }

    pub fn has_to(&self) -> bool {
        self.to.is_some()
    }

    pub fn has_from(&self) -> bool {
        self.from.is_some()
    }

    /// Apply `to_transform`, identity if absent.
    pub(crate) fn apply_to(&self, value: Value) -> Result<Value, HashError> {
        match &self.to {
            Some(to) => to(value).map_err(|source| HashError::Transform {
                field: self.name.clone(),
                source,
            }),
            None => Ok(value),
        }
    }

    /// Apply `from_transform`, identity if absent.
    pub(crate) fn apply_from(&self, value: Value, metadata: &Value) -> Result<Value, HashError> {
        match &self.from {
            Some(from) => from(value, metadata).map_err(|source| HashError::Transform {
                field: self.name.clone(),
                source,
            }),
            None => Ok(value),
        }
    }
}

impl std::fmt::Debug for FieldDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("to", &self.to.is_some())
            .field("from", &self.from.is_some())
            .field("element_type", &self.element_type.map(|e| e.name))
            .field("object_type", &self.object_type.map(|e| e.name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::transform::{from_transform, to_transform};

    #[test]
    fn missing_transforms_are_identity() {
        let field = FieldDescriptor::new("file");
        assert_eq!(field.apply_to(json!("README.md")).unwrap(), json!("README.md"));
        assert_eq!(field.apply_from(json!(3), &Value::Null).unwrap(), json!(3));
    }

    #[test]
    fn from_receives_metadata() {
        let mut field = FieldDescriptor::new("n");
        field.from = Some(from_transform(|v, meta| {
            Ok(json!([v, meta.clone()]))
        }));
        let out = field.apply_from(json!(1), &json!({"kind": "int"})).unwrap();
        assert_eq!(out, json!([1, {"kind": "int"}]));
    }

    #[test]
    fn transform_error_names_field() {
        let mut field = FieldDescriptor::new("port");
        field.to = Some(to_transform(|_| Err("out of range".into())));
        let err = field.apply_to(json!(70000)).unwrap_err();
        assert_eq!(err.to_string(), "transform for field 'port' failed: out of range");
    }
}
