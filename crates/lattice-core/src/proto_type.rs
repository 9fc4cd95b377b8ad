//! Canonical fully-qualified type names.
//!
//! A [`ProtoType`] is the identity of one schema entity: a scalar, a message,
//! an enum, or a map shape. The fully-qualified dotted name is the graph key
//! everywhere in the linker, so equality and hashing are defined over the name
//! alone. Linked nodes refer to each other by `ProtoType` key into the shared
//! graph rather than by owned nesting, which makes recursive message
//! definitions "holds the same key" instead of infinite ownership.

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// The kind of entity a [`ProtoType`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TypeKind {
    Scalar,
    Message,
    Enum,
    Map,
}

/// The built-in scalar type names of the schema language.
pub const SCALAR_TYPES: &[&str] = &[
    "double", "float", "int32", "int64", "uint32", "uint64", "sint32", "sint64", "fixed32",
    "fixed64", "sfixed32", "sfixed64", "bool", "string", "bytes",
];

/// A canonical fully-qualified type name plus the kind of thing it names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtoType {
    name: String,
    kind: TypeKind,
    /// Key type of a map shape.
    key_type: Option<Box<ProtoType>>,
    /// Value type of a map shape.
    value_type: Option<Box<ProtoType>>,
}

impl ProtoType {
    /// Look up a scalar by its type name, e.g. `int32`.
    pub fn scalar(name: &str) -> Option<Self> {
        SCALAR_TYPES.contains(&name).then(|| Self {
            name: name.to_string(),
            kind: TypeKind::Scalar,
            key_type: None,
            value_type: None,
        })
    }

    /// A message type with the given fully-qualified name.
    pub fn message(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Message,
            key_type: None,
            value_type: None,
        }
    }

    /// An enum type with the given fully-qualified name.
    pub fn enumeration(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: TypeKind::Enum,
            key_type: None,
            value_type: None,
        }
    }

    /// A map shape over the given key and value types.
    pub fn map(key_type: ProtoType, value_type: ProtoType) -> Self {
        Self {
            name: format!("map<{}, {}>", key_type.name, value_type.name),
            kind: TypeKind::Map,
            key_type: Some(Box::new(key_type)),
            value_type: Some(Box::new(value_type)),
        }
    }

    /// The fully-qualified dotted name. This is the graph key.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TypeKind {
        self.kind
    }

    pub fn is_scalar(&self) -> bool {
        self.kind == TypeKind::Scalar
    }

    pub fn is_map(&self) -> bool {
        self.kind == TypeKind::Map
    }

    /// Key type of a map shape, `None` otherwise.
    pub fn key_type(&self) -> Option<&ProtoType> {
        self.key_type.as_deref()
    }

    /// Value type of a map shape, `None` otherwise.
    pub fn value_type(&self) -> Option<&ProtoType> {
        self.value_type.as_deref()
    }

    /// The last segment of the dotted name, e.g. `Inner` for `pkg.Outer.Inner`.
    pub fn simple_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) => &self.name[idx + 1..],
            None => &self.name,
        }
    }

    /// Everything before the last segment: the enclosing type or package.
    /// Empty for an unqualified name.
    pub fn enclosing(&self) -> &str {
        match self.name.rfind('.') {
            Some(idx) => &self.name[..idx],
            None => "",
        }
    }

    /// The name of a type nested inside this one.
    pub fn nested(&self, simple_name: &str, kind: TypeKind) -> Self {
        let name = format!("{}.{}", self.name, simple_name);
        match kind {
            TypeKind::Enum => Self::enumeration(name),
            _ => Self::message(name),
        }
    }
}

// Identity is the fully-qualified name; kinds and map shapes are derived
// attributes of the same entity.
impl PartialEq for ProtoType {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for ProtoType {}

impl Hash for ProtoType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Display for ProtoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_lookup() {
        assert!(ProtoType::scalar("int32").is_some());
        assert!(ProtoType::scalar("string").is_some());
        assert!(ProtoType::scalar("Pod").is_none());
        assert!(ProtoType::scalar("").is_none());
    }

    #[test]
    fn test_equality_is_name_only() {
        let as_message = ProtoType::message("pkg.Thing");
        let as_enum = ProtoType::enumeration("pkg.Thing");
        assert_eq!(as_message, as_enum);
    }

    #[test]
    fn test_simple_name_and_enclosing() {
        let ty = ProtoType::message("pkg.Outer.Inner");
        assert_eq!(ty.simple_name(), "Inner");
        assert_eq!(ty.enclosing(), "pkg.Outer");

        let bare = ProtoType::message("Solo");
        assert_eq!(bare.simple_name(), "Solo");
        assert_eq!(bare.enclosing(), "");
    }

    #[test]
    fn test_map_display() {
        let map = ProtoType::map(
            ProtoType::scalar("string").unwrap(),
            ProtoType::message("pkg.Value"),
        );
        assert_eq!(map.to_string(), "map<string, pkg.Value>");
        assert!(map.is_map());
        assert_eq!(map.key_type().unwrap().name(), "string");
        assert_eq!(map.value_type().unwrap().name(), "pkg.Value");
    }

    #[test]
    fn test_nested() {
        let outer = ProtoType::message("pkg.Outer");
        let inner = outer.nested("Inner", TypeKind::Enum);
        assert_eq!(inner.name(), "pkg.Outer.Inner");
        assert_eq!(inner.kind(), TypeKind::Enum);
    }
}
