use crate::Hasherize;
use crate::error::HashError;
use crate::field::{ElementType, FieldDescriptor};
use crate::registry::Registry;
use crate::schema::TypeSchema;
use crate::value::{FieldRef, Hash, Value};

/// Walk `schema` in declaration order and build the field map of `object`.
pub(crate) fn encode_object<T: Hasherize>(
    registry: &Registry,
    schema: &TypeSchema<T>,
    object: &T,
    depth: usize,
) -> Result<Hash, HashError> {
    let max_depth = registry.config().max_depth;
    if depth > max_depth {
        return Err(HashError::DepthExceeded(max_depth));
    }

    let mut hash = Hash::new();
    for field in schema.fields() {
        if field.name() == registry.metadata_key() {
            return Err(HashError::Config(format!(
                "field '{}' of {} collides with the metadata key",
                field.name(),
                schema.type_name()
            )));
        }
        let raw = object.read_field(field.name())?;
        let value = match field.element_type() {
            Some(element) => encode_collection(registry, field, element, raw, depth)?,
            None => {
                let value = resolve(registry, raw, depth)?;
                field.apply_to(value)?
            }
        };
        hash.insert(field.name().to_string(), value);
    }
    Ok(hash)
}

/// Encode a collection field: resolve each element, then apply `to` to it.
///
/// `null` stands for an absent collection and passes through untouched.
fn encode_collection(
    registry: &Registry,
    field: &FieldDescriptor,
    element: ElementType,
    raw: FieldRef<'_>,
    depth: usize,
) -> Result<Value, HashError> {
    let items = match raw {
        FieldRef::List(items) => items,
        FieldRef::Value(Value::Array(values)) => values.into_iter().map(FieldRef::Value).collect(),
        FieldRef::Value(Value::Null) => return Ok(Value::Null),
        _ => return Err(HashError::mismatch(field.name(), "a sequence")),
    };

    let mut out = Vec::with_capacity(items.len());
    for item in items {
        if let FieldRef::Object(object) = &item {
            if object.type_id() != element.id() {
                tracing::trace!(
                    field = %field.name(),
                    expected = %element.name(),
                    actual = %object.type_name(),
                    "collection element of another convertible type"
                );
            }
        }
        let encoded = resolve(registry, item, depth)?;
        out.push(field.apply_to(encoded)?);
    }
    Ok(Value::Array(out))
}

/// Turn a `FieldRef` into a plain value, encoding nested objects through
/// their own schema.
fn resolve(registry: &Registry, raw: FieldRef<'_>, depth: usize) -> Result<Value, HashError> {
    match raw {
        FieldRef::Value(value) => Ok(value),
        FieldRef::Object(object) => Ok(Value::Object(registry.encode_nested(object, depth + 1)?)),
        FieldRef::List(items) => items
            .into_iter()
            .map(|item| resolve(registry, item, depth))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::Fields;

    struct Node {
        name: String,
        children: Vec<Node>,
    }

    impl Hasherize for Node {
        fn read_field(&self, name: &str) -> Result<FieldRef<'_>, HashError> {
            match name {
                "name" => Ok(FieldRef::value(self.name.clone())),
                "children" => Ok(FieldRef::objects(&self.children)),
                _ => Err(HashError::UnreadableField {
                    type_name: "Node".into(),
                    field: name.into(),
                }),
            }
        }

        fn from_fields(mut fields: Fields) -> Result<Self, HashError> {
            Ok(Node {
                name: fields.take("name")?,
                children: fields.take_objects("children")?,
            })
        }
    }

    fn node(name: &str, children: Vec<Node>) -> Node {
        Node {
            name: name.into(),
            children,
        }
    }

    fn registry(max_depth: usize) -> Registry {
        let mut registry = Registry::with_config(crate::HashConfig {
            max_depth,
            ..Default::default()
        });
        registry.declare::<Node>(["name"]);
        registry.declare::<Node>(["children"]).collection::<Node>();
        registry
    }

    #[test]
    fn keys_follow_declaration_order() {
        let hash = registry(8).encode(&node("root", vec![])).unwrap();
        let keys: Vec<&String> = hash.keys().collect();
        assert_eq!(keys, vec!["name", "children"]);
    }

    #[test]
    fn nested_collections_recurse() {
        let tree = node("a", vec![node("b", vec![node("c", vec![])])]);
        let hash = registry(8).encode(&tree).unwrap();
        assert_eq!(
            Value::Object(hash),
            json!({"name": "a", "children": [{"name": "b", "children": [{"name": "c", "children": []}]}]})
        );
    }

    #[test]
    fn depth_limit_is_enforced() {
        let tree = node("a", vec![node("b", vec![node("c", vec![])])]);
        assert!(registry(2).encode(&tree).is_ok());
        assert!(matches!(
            registry(1).encode(&tree),
            Err(HashError::DepthExceeded(1))
        ));
    }

    #[test]
    fn decode_shares_the_depth_limit() {
        let input = json!({"name": "a", "children": [{"name": "b", "children": [{"name": "c"}]}]});
        assert!(registry(2).decode_value::<Node>(input.clone()).is_ok());
        assert!(matches!(
            registry(1).decode_value::<Node>(input),
            Err(HashError::DepthExceeded(1))
        ));
    }

    #[test]
    fn collection_to_applies_per_element_after_recursion() {
        let mut registry = registry(8);
        registry
            .declare::<Node>(["children"])
            .collection::<Node>()
            .to(|v| Ok(json!({"wrapped": v})));

        let hash = registry.encode(&node("a", vec![node("b", vec![])])).unwrap();
        assert_eq!(
            hash["children"],
            json!([{"wrapped": {"name": "b", "children": []}}])
        );
    }

    #[test]
    fn collection_rejects_scalars() {
        struct Bad;
        impl Hasherize for Bad {
            fn read_field(&self, _: &str) -> Result<FieldRef<'_>, HashError> {
                Ok(FieldRef::value("not a list"))
            }
            fn from_fields(_: Fields) -> Result<Self, HashError> {
                Ok(Bad)
            }
        }

        let mut registry = Registry::new();
        registry.declare::<Bad>(["items"]).collection::<Node>();
        assert!(matches!(
            registry.encode(&Bad),
            Err(HashError::TypeMismatch { ref field, .. }) if field == "items"
        ));
    }
}
