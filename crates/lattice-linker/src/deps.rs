//! Deterministic per-file dependency export.
//!
//! Reflection and interchange consumers want the entry point first, so the
//! ordering here is the inverse of a build order: for any A importing B,
//! A precedes B. Depth-first pre-order from the entry file, with a visited set
//! to deduplicate and to tolerate file cycles — a file can legally
//! self-reference through a resolved type without that being a rejected
//! package cycle.

use std::collections::HashSet;

use lattice_core::schema_model::ProtoFile;

use crate::schema::Schema;

/// The file at `path` and every file it transitively imports (regular and
/// public), entry first, dependents before dependencies. Empty when `path` is
/// not in the schema.
pub fn all_dependencies<'s>(schema: &'s Schema, path: &str) -> Vec<&'s ProtoFile> {
    let mut result = Vec::new();
    let mut visited: HashSet<&str> = HashSet::new();
    visit(schema, path, &mut visited, &mut result);
    result
}

fn visit<'s>(
    schema: &'s Schema,
    path: &str,
    visited: &mut HashSet<&'s str>,
    result: &mut Vec<&'s ProtoFile>,
) {
    let Some(file) = schema.proto_file(path) else {
        return;
    };
    if !visited.insert(file.path.as_str()) {
        return;
    }
    // Pre-order: a file lands in the result the instant it is first visited,
    // before its imports are walked.
    result.push(file);
    for import in file.imports.iter().chain(file.public_imports.iter()) {
        visit(schema, import, visited, result);
    }
}
