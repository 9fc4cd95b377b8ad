//! Shared element builders for integration tests.
//!
//! Elements are what the parser collaborator would hand over; tests construct
//! them directly and mount them in a [`MemorySource`].

#![allow(dead_code)]

use lattice_core::element::{
    EnumConstantElement, EnumElement, FieldElement, MessageElement, ProtoFileElement, RpcElement,
    ServiceElement, TypeElement,
};
use lattice_linker::error::LinkError;
use lattice_linker::{LinkConfig, Loader, MemorySource, Schema};

/// A file element with a package and regular imports.
pub fn file(package: Option<&str>, imports: &[&str]) -> ProtoFileElement {
    ProtoFileElement {
        package_name: package.map(str::to_string),
        imports: imports.iter().map(|import| import.to_string()).collect(),
        ..Default::default()
    }
}

pub fn message(name: &str, fields: Vec<FieldElement>) -> TypeElement {
    TypeElement::Message(MessageElement {
        name: name.to_string(),
        fields,
        ..Default::default()
    })
}

pub fn field(name: &str, tag: i32, type_name: &str) -> FieldElement {
    FieldElement {
        name: name.to_string(),
        tag,
        type_name: type_name.to_string(),
        ..Default::default()
    }
}

pub fn enumeration(name: &str, constants: &[(&str, i32)]) -> TypeElement {
    TypeElement::Enum(EnumElement {
        name: name.to_string(),
        constants: constants
            .iter()
            .map(|(constant_name, value)| EnumConstantElement {
                name: constant_name.to_string(),
                value: *value,
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    })
}

pub fn service(name: &str, rpcs: Vec<RpcElement>) -> ServiceElement {
    ServiceElement {
        name: name.to_string(),
        rpcs,
        ..Default::default()
    }
}

pub fn rpc(name: &str, request: &str, response: &str) -> RpcElement {
    RpcElement {
        name: name.to_string(),
        request_type: request.to_string(),
        response_type: response.to_string(),
        ..Default::default()
    }
}

/// Mount the files under one source root and load them.
pub fn load(files: Vec<(&str, ProtoFileElement)>) -> Result<Schema, Vec<LinkError>> {
    let mut source = MemorySource::new();
    for (path, element) in files {
        source.add("protos", path, element);
    }
    let config = LinkConfig {
        source_roots: vec!["protos".to_string()],
        ..Default::default()
    };
    Loader::new(&source).load(&config)
}

/// Like [`load`], but panics with the error list on failure.
pub fn load_ok(files: Vec<(&str, ProtoFileElement)>) -> Schema {
    match load(files) {
        Ok(schema) => schema,
        Err(errors) => panic!("expected a clean load, got: {:#?}", errors),
    }
}

/// A comparable projection of a schema: type names to (field name, tag,
/// resolved type, label) rows, plus service rpc rows. Locations stay out of
/// the picture, matching the "never in equality" rule.
pub fn signature(schema: &Schema) -> Vec<(String, Vec<String>)> {
    let mut rows = Vec::new();
    for ty in schema.types() {
        let row = match ty {
            lattice_core::schema_model::Type::Message(message) => message
                .fields
                .iter()
                .map(|field| {
                    format!(
                        "{}={} {} {:?}",
                        field.tag,
                        field.name,
                        field.proto_type.name(),
                        field.label
                    )
                })
                .collect(),
            lattice_core::schema_model::Type::Enum(enumeration) => enumeration
                .constants
                .iter()
                .map(|constant| format!("{}={}", constant.value, constant.name))
                .collect(),
        };
        rows.push((ty.name().name().to_string(), row));
    }
    for serv in schema.services() {
        let row = serv
            .rpcs
            .iter()
            .map(|rpc| {
                format!(
                    "{}({} -> {})",
                    rpc.name,
                    rpc.request_type.name(),
                    rpc.response_type.name()
                )
            })
            .collect();
        rows.push((serv.name.clone(), row));
    }
    rows
}
