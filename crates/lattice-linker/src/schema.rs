//! The immutable linked schema graph.
//!
//! A [`Schema`] is built once per load and never mutated: every pass after the
//! linker borrows it, and pruning produces a new, separate, smaller schema.
//! Files, types, and services are keyed maps so lookups are by canonical name
//! and enumeration order is deterministic.

use std::collections::BTreeMap;

use serde::Serialize;

use lattice_core::schema_model::{ProtoFile, Service, Type};
use lattice_core::{IdentifierSet, ProtoType};

use crate::deps;
use crate::prune::{self, PruneResult};

/// A symbol-resolved schema graph.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Schema {
    /// Files keyed by root-relative path.
    files: BTreeMap<String, ProtoFile>,
    /// Every linked message and enum, keyed by fully-qualified name. Includes
    /// nested types and synthesized map entry messages.
    types: BTreeMap<String, Type>,
    /// Every linked service, keyed by fully-qualified name.
    services: BTreeMap<String, Service>,
}

impl Schema {
    pub(crate) fn new(
        files: BTreeMap<String, ProtoFile>,
        types: BTreeMap<String, Type>,
        services: BTreeMap<String, Service>,
    ) -> Self {
        Self {
            files,
            types,
            services,
        }
    }

    /// The file loaded at this root-relative path.
    pub fn proto_file(&self, path: &str) -> Option<&ProtoFile> {
        self.files.get(path)
    }

    /// All files, in path order.
    pub fn files(&self) -> impl Iterator<Item = &ProtoFile> {
        self.files.values()
    }

    /// The type with this fully-qualified name.
    pub fn get_type(&self, name: &str) -> Option<&Type> {
        self.types.get(name)
    }

    /// The service with this fully-qualified name.
    pub fn get_service(&self, name: &str) -> Option<&Service> {
        self.services.get(name)
    }

    /// All types, in name order.
    pub fn types(&self) -> impl Iterator<Item = &Type> {
        self.types.values()
    }

    /// All services, in name order.
    pub fn services(&self) -> impl Iterator<Item = &Service> {
        self.services.values()
    }

    /// Resolve a name to its [`ProtoType`] key: a scalar, or a declared type.
    pub fn proto_type(&self, name: &str) -> Option<ProtoType> {
        ProtoType::scalar(name).or_else(|| self.types.get(name).map(|ty| ty.name().clone()))
    }

    /// The package a type was declared in, via its declaring file.
    pub(crate) fn package_of_type(&self, ty: &Type) -> &str {
        self.files
            .get(ty.file())
            .map(ProtoFile::package)
            .unwrap_or("")
    }

    /// The package a service was declared in.
    pub(crate) fn package_of_service(&self, service: &Service) -> &str {
        self.files
            .get(service.file.as_str())
            .map(ProtoFile::package)
            .unwrap_or("")
    }

    /// Compute the subgraph reachable from the set's includes, minus its
    /// excludes. Returns the new schema together with the include/exclude
    /// entries that never matched anything.
    pub fn prune(&self, set: &IdentifierSet) -> PruneResult {
        prune::prune(self, set)
    }

    /// The file at `path` followed by everything it transitively imports,
    /// dependents before dependencies. Empty when `path` is not loaded.
    pub fn all_dependencies(&self, path: &str) -> Vec<&ProtoFile> {
        deps::all_dependencies(self, path)
    }
}
