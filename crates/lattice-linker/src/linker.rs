//! Two-pass schema graph construction.
//!
//! Pass 1 registers every declared type's canonical name across all files, so
//! forward references and legitimately cyclic message references are
//! representable with no declaration-order constraints. Pass 2 resolves every
//! reference against the declaring scope and builds the linked nodes.
//!
//! Resolution order for a name as written: the innermost enclosing message
//! scope outward to the file's package, then the name taken as fully
//! qualified (a leading dot forces this), then import-relative against each
//! visible package. Visibility is the file's own package plus the packages of
//! its imports, with `import public` re-exported transitively.
//!
//! Errors accumulate across the whole load; one invocation reports every
//! problem it can find.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use tracing::trace;

use lattice_core::element::{
    EnumElement, FieldElement, Label, MessageElement, ProtoFileElement, ServiceElement,
    TypeElement,
};
use lattice_core::schema_model::{
    EnumConstant, EnumType, Extend, Field, MessageType, ProtoFile, Role, Rpc, Service, Type,
};
use lattice_core::{Location, ProtoType, TypeKind};

use crate::error::LinkError;
use crate::schema::Schema;

/// Highest tag a field may use: 2^29 - 1.
const MAX_TAG: i32 = (1 << 29) - 1;
/// Tags 19000-19999 are reserved by the protocol.
const PROTOCOL_RESERVED_START: i32 = 19_000;
const PROTOCOL_RESERVED_END: i32 = 19_999;

/// One file handed to the linker, with its load provenance.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub root: String,
    pub path: String,
    pub role: Role,
    pub element: ProtoFileElement,
}

impl LoadedFile {
    pub fn new(root: impl Into<String>, path: impl Into<String>, role: Role,
               element: ProtoFileElement) -> Self {
        Self {
            root: root.into(),
            path: path.into(),
            role,
            element,
        }
    }
}

#[derive(Debug, Clone)]
struct Registered {
    kind: TypeKind,
    package: String,
}

/// The resolved form of one field's as-written type.
enum FieldType {
    Single(ProtoType),
    Map { key: ProtoType, value: ProtoType },
}

/// Scope a reference is resolved in.
struct ResolveContext<'a> {
    package: &'a str,
    /// Enclosing type names, innermost last.
    scope: &'a [String],
    /// Packages visible to the declaring file.
    visible: &'a BTreeSet<String>,
}

/// Builds a [`Schema`] from loaded files.
pub struct Linker {
    registry: BTreeMap<String, Registered>,
    errors: Vec<LinkError>,
}

impl Linker {
    /// Link loaded files into a schema, or report every problem found.
    pub fn link(files: Vec<LoadedFile>) -> Result<Schema, Vec<LinkError>> {
        let mut linker = Linker {
            registry: BTreeMap::new(),
            errors: Vec::new(),
        };

        // Pass 1: register all declared names before resolving anything.
        for file in &files {
            let package = file.element.package_name.clone().unwrap_or_default();
            for type_element in &file.element.types {
                linker.register(&package, &package, type_element);
            }
        }
        trace!(types = linker.registry.len(), "registered declared types");

        let elements_by_path: HashMap<&str, &ProtoFileElement> = files
            .iter()
            .map(|file| (file.path.as_str(), &file.element))
            .collect();

        // Pass 2: resolve references and build the linked nodes.
        let mut linked_files: BTreeMap<String, ProtoFile> = BTreeMap::new();
        let mut types: BTreeMap<String, Type> = BTreeMap::new();
        let mut services: BTreeMap<String, Service> = BTreeMap::new();
        for file in &files {
            let linked = linker.link_file(file, &elements_by_path, &mut types, &mut services);
            linked_files.insert(file.path.clone(), linked);
        }

        linker.validate_extensions(&linked_files, &types);

        if linker.errors.is_empty() {
            Ok(Schema::new(linked_files, types, services))
        } else {
            Err(linker.errors)
        }
    }

    fn register(&mut self, package: &str, enclosing: &str, element: &TypeElement) {
        let name = if enclosing.is_empty() {
            element.name().to_string()
        } else {
            format!("{}.{}", enclosing, element.name())
        };
        let kind = match element {
            TypeElement::Message(_) => TypeKind::Message,
            TypeElement::Enum(_) => TypeKind::Enum,
        };
        let previous = self.registry.insert(
            name.clone(),
            Registered {
                kind,
                package: package.to_string(),
            },
        );
        if previous.is_some() {
            self.errors.push(LinkError::DuplicateType {
                name: name.clone(),
                location: element.location().clone(),
            });
        }
        for nested in element.nested_types() {
            self.register(package, &name, nested);
        }
    }

    fn link_file(
        &mut self,
        file: &LoadedFile,
        elements_by_path: &HashMap<&str, &ProtoFileElement>,
        types: &mut BTreeMap<String, Type>,
        services: &mut BTreeMap<String, Service>,
    ) -> ProtoFile {
        let element = &file.element;
        let package = element.package_name.clone().unwrap_or_default();
        let visible = visible_packages(element, elements_by_path);

        let mut root_types = Vec::new();
        for type_element in &element.types {
            let key =
                self.link_type(&file.path, &package, &[], type_element, &visible, types);
            root_types.push(key);
        }

        let mut service_names = Vec::new();
        for service_element in &element.services {
            let name = if package.is_empty() {
                service_element.name.clone()
            } else {
                format!("{}.{}", package, service_element.name)
            };
            let service =
                self.link_service(&file.path, &name, &package, service_element, &visible);
            if services.insert(name.clone(), service).is_some() {
                self.errors.push(LinkError::DuplicateType {
                    name: name.clone(),
                    location: service_element.location.clone(),
                });
            }
            service_names.push(name);
        }

        let mut extend_blocks = Vec::new();
        for extend_element in &element.extend_blocks {
            let context = ResolveContext {
                package: &package,
                scope: &[],
                visible: &visible,
            };
            let Some(target) = self.resolve(
                &extend_element.name,
                &context,
                &format!("extend {}", extend_element.name),
                &extend_element.location,
            ) else {
                continue;
            };
            if target.kind() != TypeKind::Message {
                self.errors.push(LinkError::ExpectedMessage {
                    name: target.name().to_string(),
                    context: format!("extend {}", extend_element.name),
                    location: extend_element.location.clone(),
                });
                continue;
            }
            let mut fields = Vec::new();
            for field_element in &extend_element.fields {
                if let Some(FieldType::Single(proto_type)) = self.resolve_field_type(
                    field_element,
                    &context,
                    &format!("extension field {}", field_element.name),
                ) {
                    fields.push(build_field(field_element, proto_type));
                }
            }
            extend_blocks.push(Extend {
                location: extend_element.location.clone(),
                target,
                fields,
                documentation: extend_element.documentation.clone(),
            });
        }

        ProtoFile {
            location: element.location.clone(),
            path: file.path.clone(),
            root: file.root.clone(),
            role: file.role,
            package_name: element.package_name.clone(),
            syntax: element.syntax,
            imports: element.imports.clone(),
            public_imports: element.public_imports.clone(),
            types: root_types,
            services: service_names,
            extend_blocks,
            options: element.options.clone(),
        }
    }

    fn link_type(
        &mut self,
        file_path: &str,
        package: &str,
        scope: &[String],
        element: &TypeElement,
        visible: &BTreeSet<String>,
        types: &mut BTreeMap<String, Type>,
    ) -> ProtoType {
        let name = match scope.last() {
            Some(enclosing) => format!("{}.{}", enclosing, element.name()),
            None if package.is_empty() => element.name().to_string(),
            None => format!("{}.{}", package, element.name()),
        };

        match element {
            TypeElement::Message(message) => {
                let key = ProtoType::message(&name);
                let mut child_scope = scope.to_vec();
                child_scope.push(name.clone());

                let mut nested_types = Vec::new();
                for nested in &message.nested_types {
                    nested_types.push(self.link_type(
                        file_path,
                        package,
                        &child_scope,
                        nested,
                        visible,
                        types,
                    ));
                }

                let context = ResolveContext {
                    package,
                    scope: &child_scope,
                    visible,
                };
                let mut fields = Vec::new();
                for field_element in &message.fields {
                    let resolved = self.resolve_field_type(
                        field_element,
                        &context,
                        &format!("{}.{}", name, field_element.name),
                    );
                    match resolved {
                        None => {}
                        Some(FieldType::Single(proto_type)) => {
                            fields.push(build_field(field_element, proto_type));
                        }
                        Some(FieldType::Map { key: map_key, value }) => {
                            let entry_key = self.synthesize_map_entry(
                                file_path,
                                package,
                                &name,
                                field_element,
                                map_key,
                                value,
                                types,
                            );
                            let mut field = build_field(field_element, entry_key.clone());
                            field.label = Label::Repeated;
                            fields.push(field);
                            nested_types.push(entry_key);
                        }
                    }
                }

                self.validate_message(&name, message);

                types.insert(
                    name.clone(),
                    Type::Message(MessageType {
                        name: key.clone(),
                        file: file_path.to_string(),
                        location: message.location.clone(),
                        documentation: message.documentation.clone(),
                        fields,
                        nested_types,
                        reserved_tags: message.reserved_tags.clone(),
                        reserved_names: message.reserved_names.clone(),
                        extension_ranges: message.extension_ranges.clone(),
                        options: message.options.clone(),
                        map_entry: false,
                    }),
                );
                key
            }
            TypeElement::Enum(enumeration) => {
                let key = ProtoType::enumeration(&name);
                self.validate_enum(&name, enumeration);
                let constants = enumeration
                    .constants
                    .iter()
                    .map(|constant| EnumConstant {
                        location: constant.location.clone(),
                        name: constant.name.clone(),
                        value: constant.value,
                        options: constant.options.clone(),
                        documentation: constant.documentation.clone(),
                    })
                    .collect();
                types.insert(
                    name.clone(),
                    Type::Enum(EnumType {
                        name: key.clone(),
                        file: file_path.to_string(),
                        location: enumeration.location.clone(),
                        documentation: enumeration.documentation.clone(),
                        constants,
                        allow_alias: allow_alias(enumeration),
                        options: enumeration.options.clone(),
                    }),
                );
                key
            }
        }
    }

    fn link_service(
        &mut self,
        file_path: &str,
        name: &str,
        package: &str,
        element: &ServiceElement,
        visible: &BTreeSet<String>,
    ) -> Service {
        let context = ResolveContext {
            package,
            scope: &[],
            visible,
        };
        let mut rpcs = Vec::new();
        for rpc_element in &element.rpcs {
            let rpc_name = format!("{}.{}", name, rpc_element.name);
            let request = self.resolve_rpc_type(
                &rpc_element.request_type,
                &context,
                &rpc_name,
                &rpc_element.location,
            );
            let response = self.resolve_rpc_type(
                &rpc_element.response_type,
                &context,
                &rpc_name,
                &rpc_element.location,
            );
            let (Some(request_type), Some(response_type)) = (request, response) else {
                continue;
            };
            rpcs.push(Rpc {
                location: rpc_element.location.clone(),
                name: rpc_element.name.clone(),
                request_type,
                response_type,
                request_streaming: rpc_element.request_streaming,
                response_streaming: rpc_element.response_streaming,
                options: rpc_element.options.clone(),
                documentation: rpc_element.documentation.clone(),
            });
        }
        Service {
            name: name.to_string(),
            file: file_path.to_string(),
            location: element.location.clone(),
            documentation: element.documentation.clone(),
            rpcs,
            options: element.options.clone(),
        }
    }

    /// Resolve an RPC request or response type, which must be a message.
    fn resolve_rpc_type(
        &mut self,
        name_as_written: &str,
        context: &ResolveContext<'_>,
        rpc_name: &str,
        location: &Location,
    ) -> Option<ProtoType> {
        let resolved = self.resolve(name_as_written, context, rpc_name, location)?;
        if resolved.kind() != TypeKind::Message {
            self.errors.push(LinkError::ExpectedMessage {
                name: resolved.name().to_string(),
                context: rpc_name.to_string(),
                location: location.clone(),
            });
            return None;
        }
        Some(resolved)
    }

    /// Resolve a field's as-written type, handling map shapes.
    fn resolve_field_type(
        &mut self,
        field: &FieldElement,
        context: &ResolveContext<'_>,
        error_context: &str,
    ) -> Option<FieldType> {
        if let Some(inner) = field
            .type_name
            .strip_prefix("map<")
            .and_then(|rest| rest.strip_suffix('>'))
        {
            let (key_name, value_name) = inner.split_once(',').unwrap_or((inner, ""));
            let key_name = key_name.trim();
            let value_name = value_name.trim();

            let key = ProtoType::scalar(key_name);
            let valid_key = matches!(
                key_name,
                "int32" | "int64" | "uint32" | "uint64" | "sint32" | "sint64" | "fixed32"
                    | "fixed64" | "sfixed32" | "sfixed64" | "bool" | "string"
            );
            let Some(key) = key.filter(|_| valid_key) else {
                self.errors.push(LinkError::InvalidMapKey {
                    field: error_context.to_string(),
                    location: field.location.clone(),
                });
                return None;
            };
            let value = self.resolve(value_name, context, error_context, &field.location)?;
            return Some(FieldType::Map { key, value });
        }

        self.resolve(&field.type_name, context, error_context, &field.location)
            .map(FieldType::Single)
    }

    /// Resolve a name as written to its [`ProtoType`] key.
    fn resolve(
        &mut self,
        name_as_written: &str,
        context: &ResolveContext<'_>,
        error_context: &str,
        location: &Location,
    ) -> Option<ProtoType> {
        // A leading dot forces fully-qualified resolution.
        if let Some(fully_qualified) = name_as_written.strip_prefix('.') {
            if let Some(registered) = self.registry.get(fully_qualified) {
                if context.visible.contains(&registered.package) {
                    return Some(proto_type_for(fully_qualified, registered.kind));
                }
            }
            self.errors.push(LinkError::UnresolvedReference {
                reference: name_as_written.to_string(),
                context: error_context.to_string(),
                location: location.clone(),
            });
            return None;
        }

        if let Some(scalar) = ProtoType::scalar(name_as_written) {
            return Some(scalar);
        }

        // Innermost enclosing scope outward.
        for scope in context.scope.iter().rev() {
            let candidate = format!("{}.{}", scope, name_as_written);
            if let Some(registered) = self.registry.get(&candidate) {
                return Some(proto_type_for(&candidate, registered.kind));
            }
        }

        // Same-package unqualified.
        let candidate = if context.package.is_empty() {
            name_as_written.to_string()
        } else {
            format!("{}.{}", context.package, name_as_written)
        };
        if let Some(registered) = self.registry.get(&candidate) {
            return Some(proto_type_for(&candidate, registered.kind));
        }

        // The name as written taken as fully qualified.
        if let Some(registered) = self.registry.get(name_as_written) {
            if context.visible.contains(&registered.package) {
                return Some(proto_type_for(name_as_written, registered.kind));
            }
        }

        // Import-relative: each visible package's namespace.
        let mut hits: Vec<String> = Vec::new();
        for package in context.visible {
            if package.is_empty() || package == context.package {
                continue;
            }
            let candidate = format!("{}.{}", package, name_as_written);
            if self.registry.contains_key(&candidate) {
                hits.push(candidate);
            }
        }
        match hits.len() {
            0 => {
                self.errors.push(LinkError::UnresolvedReference {
                    reference: name_as_written.to_string(),
                    context: error_context.to_string(),
                    location: location.clone(),
                });
                None
            }
            1 => {
                let name = hits.pop().unwrap_or_default();
                let kind = self.registry[&name].kind;
                Some(proto_type_for(&name, kind))
            }
            _ => {
                self.errors.push(LinkError::AmbiguousReference {
                    reference: name_as_written.to_string(),
                    context: error_context.to_string(),
                    candidates: hits,
                    location: location.clone(),
                });
                None
            }
        }
    }

    /// Synthesize the two-field entry message for a map field, so downstream
    /// consumers treat maps uniformly as a special repeated message field.
    fn synthesize_map_entry(
        &mut self,
        file_path: &str,
        package: &str,
        message_name: &str,
        field: &FieldElement,
        key: ProtoType,
        value: ProtoType,
        types: &mut BTreeMap<String, Type>,
    ) -> ProtoType {
        let entry_name = format!("{}.{}Entry", message_name, upper_camel(&field.name));
        let entry_key = ProtoType::message(&entry_name);

        if self
            .registry
            .insert(
                entry_name.clone(),
                Registered {
                    kind: TypeKind::Message,
                    package: package.to_string(),
                },
            )
            .is_some()
        {
            self.errors.push(LinkError::DuplicateType {
                name: entry_name.clone(),
                location: field.location.clone(),
            });
        }

        let entry_field = |name: &str, tag: i32, proto_type: ProtoType| Field {
            location: field.location.clone(),
            label: Label::Optional,
            name: name.to_string(),
            tag,
            proto_type,
            default_value: None,
            json_name: None,
            options: Default::default(),
            documentation: None,
        };

        types.insert(
            entry_name,
            Type::Message(MessageType {
                name: entry_key.clone(),
                file: file_path.to_string(),
                location: field.location.clone(),
                documentation: None,
                fields: vec![entry_field("key", 1, key), entry_field("value", 2, value)],
                nested_types: Vec::new(),
                reserved_tags: Vec::new(),
                reserved_names: Vec::new(),
                extension_ranges: Vec::new(),
                options: Default::default(),
                map_entry: true,
            }),
        );
        entry_key
    }

    fn validate_message(&mut self, name: &str, message: &MessageElement) {
        let mut seen_tags: HashSet<i32> = HashSet::new();
        let mut seen_names: HashSet<&str> = HashSet::new();
        for field in &message.fields {
            if field.tag < 1
                || field.tag > MAX_TAG
                || (PROTOCOL_RESERVED_START..=PROTOCOL_RESERVED_END).contains(&field.tag)
            {
                self.errors.push(LinkError::TagOutOfRange {
                    tag: field.tag,
                    field: field.name.clone(),
                    location: field.location.clone(),
                });
            }
            if !seen_tags.insert(field.tag) {
                self.errors.push(LinkError::DuplicateTag {
                    tag: field.tag,
                    type_name: name.to_string(),
                    location: field.location.clone(),
                });
            }
            if !seen_names.insert(field.name.as_str()) {
                self.errors.push(LinkError::DuplicateFieldName {
                    name: field.name.clone(),
                    type_name: name.to_string(),
                    location: field.location.clone(),
                });
            }
            if message
                .reserved_tags
                .iter()
                .any(|range| range.contains(field.tag))
            {
                self.errors.push(LinkError::ReservedTag {
                    tag: field.tag,
                    field: field.name.clone(),
                    type_name: name.to_string(),
                    location: field.location.clone(),
                });
            }
            if message.reserved_names.iter().any(|reserved| reserved == &field.name) {
                self.errors.push(LinkError::ReservedName {
                    field: field.name.clone(),
                    type_name: name.to_string(),
                    location: field.location.clone(),
                });
            }
        }
    }

    fn validate_enum(&mut self, name: &str, enumeration: &EnumElement) {
        if allow_alias(enumeration) {
            return;
        }
        let mut seen_values: HashMap<i32, &str> = HashMap::new();
        for constant in &enumeration.constants {
            if seen_values.insert(constant.value, &constant.name).is_some() {
                self.errors.push(LinkError::EnumValueCollision {
                    constant: constant.name.clone(),
                    value: constant.value,
                    enum_name: name.to_string(),
                    location: constant.location.clone(),
                });
            }
        }
    }

    /// Extension fields must fall inside the target's declared ranges. Runs
    /// after every file is built so targets in later files are available.
    fn validate_extensions(
        &mut self,
        files: &BTreeMap<String, ProtoFile>,
        types: &BTreeMap<String, Type>,
    ) {
        for file in files.values() {
            for extend in &file.extend_blocks {
                let Some(Type::Message(target)) = types.get(extend.target.name()) else {
                    continue;
                };
                for field in &extend.fields {
                    let in_range = target
                        .extension_ranges
                        .iter()
                        .any(|range| range.contains(field.tag));
                    if !in_range {
                        self.errors.push(LinkError::ExtensionOutOfRange {
                            tag: field.tag,
                            field: field.name.clone(),
                            target: extend.target.name().to_string(),
                            location: field.location.clone(),
                        });
                    }
                }
            }
        }
    }
}

/// Packages visible to a file: its own, plus each import's, with
/// `import public` re-exported transitively.
fn visible_packages(
    element: &ProtoFileElement,
    elements_by_path: &HashMap<&str, &ProtoFileElement>,
) -> BTreeSet<String> {
    let mut visible = BTreeSet::new();
    visible.insert(element.package_name.clone().unwrap_or_default());

    let mut queue: VecDeque<&str> = element
        .imports
        .iter()
        .chain(element.public_imports.iter())
        .map(String::as_str)
        .collect();
    let mut seen: HashSet<&str> = queue.iter().copied().collect();

    while let Some(path) = queue.pop_front() {
        let Some(imported) = elements_by_path.get(path) else {
            continue;
        };
        visible.insert(imported.package_name.clone().unwrap_or_default());
        for public in &imported.public_imports {
            if seen.insert(public) {
                queue.push_back(public);
            }
        }
    }
    visible
}

fn proto_type_for(name: &str, kind: TypeKind) -> ProtoType {
    match kind {
        TypeKind::Enum => ProtoType::enumeration(name),
        _ => ProtoType::message(name),
    }
}

fn build_field(element: &FieldElement, proto_type: ProtoType) -> Field {
    Field {
        location: element.location.clone(),
        label: element.label.unwrap_or(Label::Optional),
        name: element.name.clone(),
        tag: element.tag,
        proto_type,
        default_value: element.default_value.clone(),
        json_name: element.json_name.clone(),
        options: element.options.clone(),
        documentation: element.documentation.clone(),
    }
}

fn allow_alias(enumeration: &EnumElement) -> bool {
    enumeration.options.get("allow_alias") == Some(&serde_json::Value::Bool(true))
}

/// `foo_bar_baz` to `FooBarBaz`, for synthesized map entry names.
fn upper_camel(name: &str) -> String {
    name.split('_')
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            let mut chars = segment.chars();
            match chars.next() {
                Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}
