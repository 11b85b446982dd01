//! Declarative object ↔ map conversion.
//!
//! A type opts in by implementing [`Hasherize`] (usually through
//! `#[derive(Hasherize)]`) and declaring its convertible fields once on a
//! [`Registry`]:
//!
//! ```ignore
//! let mut registry = Registry::new();
//! registry.declare::<Owner>(["file", "commit"]);
//! registry.declare::<Owner>(["items"]).collection::<Member>();
//! registry.declare::<Member>(["label"]).to(|v| Ok(format!("--{}", v.as_str().unwrap_or_default()).into()));
//!
//! let hash = registry.encode(&owner)?;
//! let back: Owner = registry.decode(hash)?;
//! ```

// Lets `#[derive(Hasherize)]` expand to `::hasherize::...` inside this crate too.
extern crate self as hasherize;

pub mod builder;
pub mod config;
pub mod decode;
mod encode;
pub mod error;
pub mod field;
pub mod registry;
pub mod schema;
pub mod transform;
pub mod value;

pub use builder::{Declaration, FieldOptions};
pub use config::{DEFAULT_METADATA_KEY, HashConfig};
pub use decode::Fields;
pub use error::HashError;
pub use field::{ElementType, FieldDescriptor};
pub use hasherize_derive::Hasherize;
pub use registry::Registry;
pub use schema::TypeSchema;
pub use transform::BoxError;
pub use value::{FieldRef, FieldValue, Hash, ObjectRef, Value};

/// Convertibility capability.
///
/// `read_field` exposes the instance's value for a declared field name;
/// `from_fields` is the default reconstruction used when the type has no
/// registered strategy.
pub trait Hasherize: Sized + Send + 'static {
    fn read_field(&self, name: &str) -> Result<FieldRef<'_>, HashError>;

    fn from_fields(fields: Fields) -> Result<Self, HashError>;
}
