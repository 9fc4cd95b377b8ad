//! Core schema data model and type system for the lattice schema linker

pub mod element;
pub mod identifier_set;
pub mod location;
pub mod proto_type;
pub mod schema_model;

pub use identifier_set::{IdentifierSet, Pattern};
pub use location::Location;
pub use proto_type::{ProtoType, TypeKind};
