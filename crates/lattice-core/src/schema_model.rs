//! The linked schema node types.
//!
//! These are the nodes of the symbol-resolved graph the linker produces. Where
//! a syntax element carries a type name as written, a linked node carries a
//! resolved [`ProtoType`]. Nodes never own one another across the graph:
//! a message lists its nested types and a field names its target by
//! `ProtoType` key, and the schema's shared map is the single owner. The graph
//! is built once per load and is immutable afterwards.

use serde::{Deserialize, Serialize};

use crate::element::{Label, Options, Syntax, TagRange};
use crate::location::Location;
use crate::proto_type::ProtoType;

/// Whether a file was loaded to be emitted or only to satisfy references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    /// Loaded under a source root; some target must emit for it.
    Source,
    /// Loaded under a proto root purely for linking.
    Path,
}

/// One linked file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProtoFile {
    pub location: Location,
    /// Root-relative import path, the file's key in the schema.
    pub path: String,
    /// The root this file was loaded under.
    pub root: String,
    pub role: Role,
    pub package_name: Option<String>,
    pub syntax: Syntax,
    pub imports: Vec<String>,
    pub public_imports: Vec<String>,
    /// Keys of the file's top-level types, in declaration order.
    pub types: Vec<ProtoType>,
    /// Fully-qualified names of the file's services, in declaration order.
    pub services: Vec<String>,
    pub extend_blocks: Vec<Extend>,
    pub options: Options,
}

impl ProtoFile {
    /// The package this file declares, or `""` when it declares none.
    pub fn package(&self) -> &str {
        self.package_name.as_deref().unwrap_or("")
    }
}

/// A linked message or enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Type {
    Message(MessageType),
    Enum(EnumType),
}

impl Type {
    pub fn name(&self) -> &ProtoType {
        match self {
            Type::Message(message) => &message.name,
            Type::Enum(enumeration) => &enumeration.name,
        }
    }

    /// Path of the declaring file.
    pub fn file(&self) -> &str {
        match self {
            Type::Message(message) => &message.file,
            Type::Enum(enumeration) => &enumeration.file,
        }
    }

    pub fn location(&self) -> &Location {
        match self {
            Type::Message(message) => &message.location,
            Type::Enum(enumeration) => &enumeration.location,
        }
    }

    pub fn options(&self) -> &Options {
        match self {
            Type::Message(message) => &message.options,
            Type::Enum(enumeration) => &enumeration.options,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageType {
    pub name: ProtoType,
    /// Path of the declaring file.
    pub file: String,
    pub location: Location,
    pub documentation: Option<String>,
    pub fields: Vec<Field>,
    /// Keys of types declared inside this message, in declaration order.
    pub nested_types: Vec<ProtoType>,
    pub reserved_tags: Vec<TagRange>,
    pub reserved_names: Vec<String>,
    pub extension_ranges: Vec<TagRange>,
    pub options: Options,
    /// True for the two-field entry messages synthesized for map fields.
    pub map_entry: bool,
}

impl MessageType {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|field| field.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Field {
    pub location: Location,
    pub label: Label,
    pub name: String,
    pub tag: i32,
    /// The resolved target type.
    pub proto_type: ProtoType,
    pub default_value: Option<String>,
    pub json_name: Option<String>,
    pub options: Options,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumType {
    pub name: ProtoType,
    /// Path of the declaring file.
    pub file: String,
    pub location: Location,
    pub documentation: Option<String>,
    pub constants: Vec<EnumConstant>,
    /// Whether distinct constants may share a value.
    pub allow_alias: bool,
    pub options: Options,
}

impl EnumType {
    pub fn constant(&self, name: &str) -> Option<&EnumConstant> {
        self.constants.iter().find(|constant| constant.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnumConstant {
    pub location: Location,
    pub name: String,
    pub value: i32,
    pub options: Options,
    pub documentation: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    /// Fully-qualified service name.
    pub name: String,
    /// Path of the declaring file.
    pub file: String,
    pub location: Location,
    pub documentation: Option<String>,
    pub rpcs: Vec<Rpc>,
    pub options: Options,
}

impl Service {
    pub fn rpc(&self, name: &str) -> Option<&Rpc> {
        self.rpcs.iter().find(|rpc| rpc.name == name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rpc {
    pub location: Location,
    pub name: String,
    pub request_type: ProtoType,
    pub response_type: ProtoType,
    pub request_streaming: bool,
    pub response_streaming: bool,
    pub options: Options,
    pub documentation: Option<String>,
}

/// A linked `extend` block: a resolved target plus the extension fields it
/// contributes. Extension field tags must fall inside the target's declared
/// extension ranges.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extend {
    pub location: Location,
    pub target: ProtoType,
    pub fields: Vec<Field>,
    pub documentation: Option<String>,
}
