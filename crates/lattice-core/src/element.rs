//! Parsed syntax elements, as handed across the parser boundary.
//!
//! The lexer/parser collaborator turns one source file into a
//! [`ProtoFileElement`]: an immutable, purely syntactic representation with
//! every type reference still "as written". Nothing here is resolved; the
//! linker owns that. Every element carries its own [`Location`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::location::Location;

/// Option values keyed by option name, as literal JSON-shaped values.
pub type Options = BTreeMap<String, serde_json::Value>;

/// The syntax version a file declares.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Syntax {
    #[default]
    Proto2,
    Proto3,
}

/// A field's declared cardinality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Label {
    Required,
    Optional,
    Repeated,
}

/// An inclusive range of field tags, used for reserved and extension ranges.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TagRange {
    pub start: i32,
    pub end: i32,
}

impl TagRange {
    pub fn new(start: i32, end: i32) -> Self {
        Self { start, end }
    }

    /// A range covering a single tag.
    pub fn single(tag: i32) -> Self {
        Self {
            start: tag,
            end: tag,
        }
    }

    pub fn contains(&self, tag: i32) -> bool {
        self.start <= tag && tag <= self.end
    }
}

/// One parsed source file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtoFileElement {
    pub location: Location,
    pub package_name: Option<String>,
    pub syntax: Syntax,
    /// Root-relative paths of regular imports, in declaration order.
    pub imports: Vec<String>,
    /// Root-relative paths of `import public` declarations.
    pub public_imports: Vec<String>,
    pub types: Vec<TypeElement>,
    pub services: Vec<ServiceElement>,
    pub extend_blocks: Vec<ExtendElement>,
    pub options: Options,
}

/// A declared message or enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TypeElement {
    Message(MessageElement),
    Enum(EnumElement),
}

impl TypeElement {
    pub fn name(&self) -> &str {
        match self {
            TypeElement::Message(message) => &message.name,
            TypeElement::Enum(enumeration) => &enumeration.name,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            TypeElement::Message(message) => &message.location,
            TypeElement::Enum(enumeration) => &enumeration.location,
        }
    }

    pub fn nested_types(&self) -> &[TypeElement] {
        match self {
            TypeElement::Message(message) => &message.nested_types,
            TypeElement::Enum(_) => &[],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MessageElement {
    pub location: Location,
    pub name: String,
    pub documentation: Option<String>,
    pub fields: Vec<FieldElement>,
    pub nested_types: Vec<TypeElement>,
    pub reserved_tags: Vec<TagRange>,
    pub reserved_names: Vec<String>,
    /// Tag ranges this message opens up for third-party extension fields.
    pub extension_ranges: Vec<TagRange>,
    pub options: Options,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldElement {
    pub location: Location,
    /// Absent for proto3 singular fields.
    pub label: Option<Label>,
    /// The type exactly as written, e.g. `Inner`, `.pkg.Outer`, or
    /// `map<string, Project>`.
    pub type_name: String,
    pub name: String,
    pub tag: i32,
    pub default_value: Option<String>,
    pub json_name: Option<String>,
    pub options: Options,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnumElement {
    pub location: Location,
    pub name: String,
    pub documentation: Option<String>,
    pub constants: Vec<EnumConstantElement>,
    pub options: Options,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnumConstantElement {
    pub location: Location,
    pub name: String,
    pub value: i32,
    pub options: Options,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceElement {
    pub location: Location,
    pub name: String,
    pub documentation: Option<String>,
    pub rpcs: Vec<RpcElement>,
    pub options: Options,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RpcElement {
    pub location: Location,
    pub name: String,
    /// Request type as written.
    pub request_type: String,
    /// Response type as written.
    pub response_type: String,
    pub request_streaming: bool,
    pub response_streaming: bool,
    pub options: Options,
    pub documentation: Option<String>,
}

/// A top-level `extend` block adding fields to some target message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtendElement {
    pub location: Location,
    /// Target type as written.
    pub name: String,
    pub fields: Vec<FieldElement>,
    pub documentation: Option<String>,
}
