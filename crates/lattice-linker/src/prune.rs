//! Identifier-set-driven pruning (tree-shaking) over the linked graph.
//!
//! Mark-and-sweep: seed a worklist from the include patterns, traverse every
//! edge kind (field types, extension targets and their extra fields, RPC
//! request/response types, option-value type references), and rebuild a new
//! smaller schema from the marked nodes. The input schema is never mutated.
//!
//! Exclusion is global and path-independent: the decision is made once, when a
//! node is first dequeued, and holds no matter how many other kept nodes
//! reference it. A message kept transitively still carries all its fields
//! unless an individual field's target type was itself excluded.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

use tracing::warn;

use lattice_core::identifier_set::Pattern;
use lattice_core::schema_model::{Extend, ProtoFile, Service, Type};
use lattice_core::{IdentifierSet, ProtoType, TypeKind};

use crate::schema::Schema;

/// The output of a prune: the smaller schema plus every include/exclude entry
/// that never matched anything, for stale-configuration reporting.
#[derive(Debug, Clone)]
pub struct PruneResult {
    pub schema: Schema,
    pub unused_roots: Vec<String>,
    pub unused_excludes: Vec<String>,
}

/// How much of a node survived the sweep.
#[derive(Debug, Default)]
struct Marks {
    /// Nodes kept in full.
    whole: BTreeSet<String>,
    /// Nodes kept member-by-member, from member-form include patterns.
    members: BTreeMap<String, BTreeSet<String>>,
    /// Nodes dropped by an exclude pattern.
    excluded: BTreeSet<String>,
    /// Individual members dropped by an exclude pattern, as `Type#member`.
    excluded_members: BTreeSet<String>,
}

impl Marks {
    fn keeps_target(&self, proto_type: &ProtoType) -> bool {
        proto_type.is_scalar()
            || self.whole.contains(proto_type.name())
            || self.members.contains_key(proto_type.name())
    }
}

fn member_key(type_name: &str, member: &str) -> String {
    format!("{}#{}", type_name, member)
}

pub(crate) fn prune(schema: &Schema, set: &IdentifierSet) -> PruneResult {
    Pruner::new(schema, set).run()
}

struct Pruner<'a> {
    schema: &'a Schema,
    includes: Vec<Pattern<'a>>,
    excludes: Vec<Pattern<'a>>,
    used_includes: Vec<bool>,
    used_excludes: Vec<bool>,
    marks: Marks,
    /// (node name, member) work items; `None` member marks the whole node.
    queue: VecDeque<(String, Option<String>)>,
    /// Extension blocks indexed by target type name.
    extends_by_target: BTreeMap<&'a str, Vec<&'a Extend>>,
}

impl<'a> Pruner<'a> {
    fn new(schema: &'a Schema, set: &'a IdentifierSet) -> Self {
        let includes: Vec<Pattern<'a>> = set.includes().iter().map(|p| Pattern::parse(p)).collect();
        let excludes: Vec<Pattern<'a>> = set.excludes().iter().map(|p| Pattern::parse(p)).collect();
        let mut extends_by_target: BTreeMap<&'a str, Vec<&'a Extend>> = BTreeMap::new();
        for file in schema.files() {
            for extend in &file.extend_blocks {
                extends_by_target
                    .entry(extend.target.name())
                    .or_default()
                    .push(extend);
            }
        }
        Self {
            schema,
            used_includes: vec![false; includes.len()],
            used_excludes: vec![false; excludes.len()],
            includes,
            excludes,
            marks: Marks::default(),
            queue: VecDeque::new(),
            extends_by_target,
        }
    }

    fn run(mut self) -> PruneResult {
        self.seed();
        self.sweep();
        let schema = self.rebuild();

        let unused_roots: Vec<String> = self
            .includes
            .iter()
            .zip(&self.used_includes)
            .filter(|(_, used)| !**used)
            .map(|(pattern, _)| raw_pattern(pattern))
            .collect();
        let unused_excludes: Vec<String> = self
            .excludes
            .iter()
            .zip(&self.used_excludes)
            .filter(|(_, used)| !**used)
            .map(|(pattern, _)| raw_pattern(pattern))
            .collect();

        if !unused_roots.is_empty() {
            warn!(entries = ?unused_roots, "prune roots matched nothing in this schema");
        }
        if !unused_excludes.is_empty() {
            warn!(entries = ?unused_excludes, "prune excludes matched nothing in this schema");
        }

        PruneResult {
            schema,
            unused_roots,
            unused_excludes,
        }
    }

    /// Seed the worklist from the include patterns. Empty includes keep
    /// everything.
    fn seed(&mut self) {
        if self.includes.is_empty() {
            let names: Vec<String> = self
                .schema
                .types()
                .map(|ty| ty.name().name().to_string())
                .chain(self.schema.services().map(|service| service.name.clone()))
                .collect();
            for name in names {
                self.queue.push_back((name, None));
            }
            return;
        }

        let mut seeds: Vec<(usize, String, Option<String>)> = Vec::new();
        for (index, pattern) in self.includes.iter().enumerate() {
            match pattern {
                Pattern::Exact(name) => {
                    if self.schema.get_type(name).is_some() || self.schema.get_service(name).is_some()
                    {
                        seeds.push((index, name.to_string(), None));
                    }
                }
                Pattern::Member { type_name, member } => {
                    if self.node_has_member(type_name, member) {
                        seeds.push((index, type_name.to_string(), Some(member.to_string())));
                    }
                }
                Pattern::Package(_) => {
                    for ty in self.schema.types() {
                        let package = self.schema.package_of_type(ty);
                        if pattern.matches_type(package, ty.name().name()) {
                            seeds.push((index, ty.name().name().to_string(), None));
                        }
                    }
                    for service in self.schema.services() {
                        let package = self.schema.package_of_service(service);
                        if pattern.matches_type(package, &service.name) {
                            seeds.push((index, service.name.clone(), None));
                        }
                    }
                }
            }
        }
        for (index, name, member) in seeds {
            self.used_includes[index] = true;
            self.queue.push_back((name, member));
        }
    }

    fn node_has_member(&self, type_name: &str, member: &str) -> bool {
        match self.schema.get_type(type_name) {
            Some(Type::Message(message)) => message.field(member).is_some(),
            Some(Type::Enum(enumeration)) => enumeration.constant(member).is_some(),
            None => self
                .schema
                .get_service(type_name)
                .is_some_and(|service| service.rpc(member).is_some()),
        }
    }

    fn sweep(&mut self) {
        while let Some((name, member)) = self.queue.pop_front() {
            if self.marks.excluded.contains(&name) {
                continue;
            }
            match member {
                None => self.visit_node(name),
                Some(member) => self.visit_member(name, member),
            }
        }
    }

    fn package_of(&self, name: &str) -> &'a str {
        let schema = self.schema;
        if let Some(ty) = schema.get_type(name) {
            schema.package_of_type(ty)
        } else if let Some(service) = schema.get_service(name) {
            schema.package_of_service(service)
        } else {
            ""
        }
    }

    fn visit_node(&mut self, name: String) {
        if self.marks.whole.contains(&name) {
            return;
        }

        let package = self.package_of(&name);
        let mut excluded = false;
        for (index, pattern) in self.excludes.iter().enumerate() {
            if pattern.matches_type(package, &name) {
                self.used_excludes[index] = true;
                excluded = true;
            }
        }
        if excluded {
            self.marks.excluded.insert(name);
            return;
        }

        self.marks.whole.insert(name.clone());
        self.marks.members.remove(&name);
        self.traverse_node(&name);
    }

    fn visit_member(&mut self, name: String, member: String) {
        if self.marks.whole.contains(&name) {
            return;
        }
        if self
            .marks
            .members
            .get(&name)
            .is_some_and(|kept| kept.contains(&member))
        {
            return;
        }

        let package = self.package_of(&name);
        let mut excluded = false;
        for (index, pattern) in self.excludes.iter().enumerate() {
            if pattern.matches_member(package, &name, &member) {
                self.used_excludes[index] = true;
                excluded = true;
            }
        }
        if excluded {
            self.marks.excluded_members.insert(member_key(&name, &member));
            return;
        }

        self.marks
            .members
            .entry(name.clone())
            .or_default()
            .insert(member.clone());
        self.traverse_member(&name, &member);
    }

    /// Push every outgoing edge of a wholly kept node.
    fn traverse_node(&mut self, name: &str) {
        let schema = self.schema;
        let package = self.package_of(name);
        if let Some(ty) = schema.get_type(name) {
            match ty {
                Type::Message(message) => {
                    let fields: Vec<(String, ProtoType)> = message
                        .fields
                        .iter()
                        .map(|field| (field.name.clone(), field.proto_type.clone()))
                        .collect();
                    for (field_name, proto_type) in fields {
                        if self.exclude_member_edge(package, name, &field_name) {
                            continue;
                        }
                        self.push_type_edge(&proto_type);
                    }
                    self.push_option_edges(ty.options().keys());
                    self.push_extension_edges(name, package);
                }
                Type::Enum(_) => {
                    // Constants are kept wholesale with their enum.
                    self.push_option_edges(ty.options().keys());
                }
            }
        } else if let Some(service) = schema.get_service(name) {
            let rpcs: Vec<(String, ProtoType, ProtoType)> = service
                .rpcs
                .iter()
                .map(|rpc| {
                    (
                        rpc.name.clone(),
                        rpc.request_type.clone(),
                        rpc.response_type.clone(),
                    )
                })
                .collect();
            let options: Vec<String> = service.options.keys().cloned().collect();
            for (rpc_name, request, response) in rpcs {
                if self.exclude_member_edge(package, name, &rpc_name) {
                    continue;
                }
                self.push_type_edge(&request);
                self.push_type_edge(&response);
            }
            self.push_option_edges(options.iter());
        }
    }

    /// Push the edges of one kept member.
    fn traverse_member(&mut self, name: &str, member: &str) {
        let schema = self.schema;
        if let Some(ty) = schema.get_type(name) {
            match ty {
                Type::Message(message) => {
                    if let Some(field) = message.field(member) {
                        let proto_type = field.proto_type.clone();
                        self.push_type_edge(&proto_type);
                    }
                }
                Type::Enum(_) => {}
            }
        } else if let Some(service) = schema.get_service(name) {
            if let Some(rpc) = service.rpc(member) {
                let request = rpc.request_type.clone();
                let response = rpc.response_type.clone();
                self.push_type_edge(&request);
                self.push_type_edge(&response);
            }
        }
    }

    /// An exclude pattern consuming this member edge during traversal. Only
    /// member-form patterns can newly match here: a type- or package-form
    /// exclude would have dropped the whole container at dequeue time.
    fn exclude_member_edge(&mut self, package: &str, name: &str, member: &str) -> bool {
        let mut excluded = false;
        for (index, pattern) in self.excludes.iter().enumerate() {
            if matches!(pattern, Pattern::Member { .. })
                && pattern.matches_member(package, name, member)
            {
                self.used_excludes[index] = true;
                excluded = true;
            }
        }
        if excluded {
            self.marks.excluded_members.insert(member_key(name, member));
        }
        excluded
    }

    fn push_type_edge(&mut self, proto_type: &ProtoType) {
        match proto_type.kind() {
            TypeKind::Message | TypeKind::Enum => {
                self.queue.push_back((proto_type.name().to_string(), None));
            }
            TypeKind::Map => {
                if let Some(value) = proto_type.value_type() {
                    self.push_type_edge(&value.clone());
                }
            }
            TypeKind::Scalar => {}
        }
    }

    /// Option keys naming a linked type are edges too.
    fn push_option_edges<'k>(&mut self, keys: impl Iterator<Item = &'k String>) {
        let hits: Vec<String> = keys
            .filter(|key| self.schema.get_type(key).is_some())
            .cloned()
            .collect();
        for key in hits {
            self.queue.push_back((key, None));
        }
    }

    /// Keeping a message keeps the extensions that target it, which pulls in
    /// the extension fields' types.
    fn push_extension_edges(&mut self, name: &str, package: &str) {
        let Some(extends) = self.extends_by_target.get(name) else {
            return;
        };
        let edges: Vec<(String, ProtoType)> = extends
            .iter()
            .flat_map(|extend| {
                extend
                    .fields
                    .iter()
                    .map(|field| (field.name.clone(), field.proto_type.clone()))
            })
            .collect();
        for (field_name, proto_type) in edges {
            if self.exclude_member_edge(package, name, &field_name) {
                continue;
            }
            self.push_type_edge(&proto_type);
        }
    }

    /// Build the new schema from the marks.
    fn rebuild(&self) -> Schema {
        let mut types: BTreeMap<String, Type> = BTreeMap::new();
        for ty in self.schema.types() {
            let name = ty.name().name();
            if self.marks.whole.contains(name) {
                types.insert(name.to_string(), self.rebuild_whole_type(ty));
            } else if let Some(kept) = self.marks.members.get(name) {
                types.insert(name.to_string(), self.rebuild_member_type(ty, kept));
            }
        }

        let mut services: BTreeMap<String, Service> = BTreeMap::new();
        for service in self.schema.services() {
            if self.marks.whole.contains(&service.name) {
                services.insert(service.name.clone(), self.rebuild_service(service, None));
            } else if let Some(kept) = self.marks.members.get(&service.name) {
                services.insert(
                    service.name.clone(),
                    self.rebuild_service(service, Some(kept)),
                );
            }
        }

        let mut files: BTreeMap<String, ProtoFile> = BTreeMap::new();
        for file in self.schema.files() {
            let mut rebuilt = file.clone();
            rebuilt.types.retain(|key| types.contains_key(key.name()));
            rebuilt.services.retain(|name| services.contains_key(name));
            rebuilt.extend_blocks = file
                .extend_blocks
                .iter()
                .filter(|extend| self.marks.keeps_target(&extend.target))
                .map(|extend| {
                    let mut rebuilt_extend = extend.clone();
                    rebuilt_extend.fields.retain(|field| {
                        !self
                            .marks
                            .excluded_members
                            .contains(&member_key(extend.target.name(), &field.name))
                            && self.marks.keeps_target(&field.proto_type)
                    });
                    rebuilt_extend
                })
                .filter(|extend| !extend.fields.is_empty())
                .collect();
            files.insert(file.path.clone(), rebuilt);
        }

        Schema::new(files, types, services)
    }

    fn rebuild_whole_type(&self, ty: &Type) -> Type {
        match ty {
            Type::Message(message) => {
                let mut rebuilt = message.clone();
                let name = message.name.name();
                rebuilt.fields.retain(|field| {
                    !self
                        .marks
                        .excluded_members
                        .contains(&member_key(name, &field.name))
                        && self.marks.keeps_target(&field.proto_type)
                });
                rebuilt
                    .nested_types
                    .retain(|nested| self.marks.keeps_target(nested));
                Type::Message(rebuilt)
            }
            Type::Enum(enumeration) => Type::Enum(enumeration.clone()),
        }
    }

    fn rebuild_member_type(&self, ty: &Type, kept: &BTreeSet<String>) -> Type {
        match ty {
            Type::Message(message) => {
                let mut rebuilt = message.clone();
                rebuilt.fields.retain(|field| {
                    kept.contains(&field.name) && self.marks.keeps_target(&field.proto_type)
                });
                rebuilt
                    .nested_types
                    .retain(|nested| self.marks.keeps_target(nested));
                Type::Message(rebuilt)
            }
            Type::Enum(enumeration) => {
                let mut rebuilt = enumeration.clone();
                rebuilt
                    .constants
                    .retain(|constant| kept.contains(&constant.name));
                Type::Enum(rebuilt)
            }
        }
    }

    fn rebuild_service(&self, service: &Service, kept: Option<&BTreeSet<String>>) -> Service {
        let name = service.name.as_str();
        let mut rebuilt = service.clone();
        rebuilt.rpcs.retain(|rpc| {
            let member_kept = match kept {
                Some(kept) => kept.contains(&rpc.name),
                None => {
                    !self
                        .marks
                        .excluded_members
                        .contains(&member_key(name, &rpc.name))
                }
            };
            member_kept
                && self.marks.keeps_target(&rpc.request_type)
                && self.marks.keeps_target(&rpc.response_type)
        });
        rebuilt
    }
}

fn raw_pattern(pattern: &Pattern<'_>) -> String {
    match pattern {
        Pattern::Exact(name) => (*name).to_string(),
        Pattern::Member { type_name, member } => format!("{}#{}", type_name, member),
        Pattern::Package(package) => format!("{}.*", package),
    }
}

/// Re-check of the rebuild invariant, used by debug assertions in tests: a
/// pruned schema never contains a field type name unresolvable inside itself.
pub fn is_closed(schema: &Schema) -> bool {
    for ty in schema.types() {
        if let Type::Message(message) = ty {
            for field in &message.fields {
                if !field.proto_type.is_scalar()
                    && schema.get_type(field.proto_type.name()).is_none()
                {
                    return false;
                }
            }
        }
    }
    for service in schema.services() {
        for rpc in &service.rpcs {
            if schema.get_type(rpc.request_type.name()).is_none()
                || schema.get_type(rpc.response_type.name()).is_none()
            {
                return false;
            }
        }
    }
    true
}
