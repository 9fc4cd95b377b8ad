//! Include/exclude identifier pattern sets for tree-shaking.
//!
//! A pattern is one of three forms:
//!
//! - an exact type name: `pkg.Outer` or `pkg.Outer.Inner`
//! - an exact member name: `pkg.Outer#field_name`
//! - a package wildcard: `pkg.*`
//!
//! Wildcard matching is exact: `pkg.*` matches every type declared in package
//! `pkg` (and, through those types, their members), never types of a
//! subpackage like `pkg.sub`. A bare name matches only that exact type or
//! member.

use serde::{Deserialize, Serialize};

/// An include/exclude pattern pair selecting a subgraph.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentifierSet {
    includes: Vec<String>,
    excludes: Vec<String>,
}

impl IdentifierSet {
    pub fn new(includes: Vec<String>, excludes: Vec<String>) -> Self {
        Self { includes, excludes }
    }

    /// A set that keeps everything: no includes, no excludes.
    pub fn everything() -> Self {
        Self::default()
    }

    pub fn includes(&self) -> &[String] {
        &self.includes
    }

    pub fn excludes(&self) -> &[String] {
        &self.excludes
    }

    /// True when no includes are listed, which means "keep everything".
    pub fn is_exhaustive(&self) -> bool {
        self.includes.is_empty()
    }
}

/// One pattern parsed into its match form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern<'a> {
    /// Matches exactly one type by fully-qualified name.
    Exact(&'a str),
    /// Matches one member (field, constant, or rpc) of one type.
    Member { type_name: &'a str, member: &'a str },
    /// Matches every type declared in exactly this package.
    Package(&'a str),
}

impl<'a> Pattern<'a> {
    pub fn parse(raw: &'a str) -> Pattern<'a> {
        if let Some(package) = raw.strip_suffix(".*") {
            return Pattern::Package(package);
        }
        if let Some((type_name, member)) = raw.split_once('#') {
            return Pattern::Member { type_name, member };
        }
        Pattern::Exact(raw)
    }

    /// Whether this pattern keeps or drops the named type as a whole.
    /// Member patterns never match a whole type; they select into it.
    pub fn matches_type(&self, package: &str, type_name: &str) -> bool {
        match self {
            Pattern::Exact(name) => *name == type_name,
            Pattern::Member { .. } => false,
            Pattern::Package(pattern_package) => *pattern_package == package,
        }
    }

    /// Whether this pattern covers the named member of the named type. An
    /// exact type pattern covers all of the type's members; a package wildcard
    /// covers every member of every type in the package.
    pub fn matches_member(&self, package: &str, type_name: &str, member: &str) -> bool {
        match self {
            Pattern::Exact(name) => *name == type_name,
            Pattern::Member {
                type_name: pattern_type,
                member: pattern_member,
            } => *pattern_type == type_name && *pattern_member == member,
            Pattern::Package(pattern_package) => *pattern_package == package,
        }
    }
}
