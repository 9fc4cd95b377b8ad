//! Target profiles: per-type override directives discovered by hierarchical
//! path search.
//!
//! A profile substitutes target-specific adapters for chosen types without
//! touching the schema itself. Profile files are named `<profile>.wire` and
//! are discovered by walking upward from each loaded file's directory to its
//! root; every discovered file's directives merge into one [`Profile`]. A
//! directive may only override a type whose declaring file the profile file
//! imports, and directives naming types outside the loaded schema are skipped,
//! since profiles are commonly written against a broader schema superset.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use lattice_core::element::Options;
use lattice_core::{Location, ProtoType};

use crate::error::ProfileError;
use crate::schema::Schema;
use crate::source::ElementSource;

/// File extension of profile files.
pub const PROFILE_EXTENSION: &str = "wire";

/// One parsed profile file, as handed across the parser boundary.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileFileElement {
    pub location: Location,
    /// Root-relative paths of the schema files this profile file imports.
    pub imports: Vec<String>,
    pub overrides: Vec<TypeOverrideElement>,
    pub options: Options,
}

/// One parsed override directive.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TypeOverrideElement {
    pub location: Location,
    /// Fully-qualified name of the type being overridden.
    pub type_name: String,
    /// The substituted target type name.
    pub target: String,
    /// The adapter reference mediating between the two.
    pub adapter: String,
}

/// The resolved (target, adapter) pair for one overridden type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeOverride {
    pub target: String,
    pub adapter: String,
}

/// A named set of per-type overrides resolved against a loaded schema.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Profile {
    name: String,
    overrides: BTreeMap<String, TypeOverride>,
}

impl Profile {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The override for a type, if any directive names it.
    pub fn get(&self, proto_type: &ProtoType) -> Option<&TypeOverride> {
        self.overrides.get(proto_type.name())
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }
}

/// Discovers and merges the profile files for one schema.
pub struct ProfileResolver<'a> {
    schema: &'a Schema,
    source: &'a dyn ElementSource,
}

impl<'a> ProfileResolver<'a> {
    pub fn new(schema: &'a Schema, source: &'a dyn ElementSource) -> Self {
        Self { schema, source }
    }

    /// Resolve the named profile against the schema. Missing-import and
    /// malformed-directive problems fail the whole resolution; they are still
    /// accumulated so one invocation reports every problem found.
    pub fn resolve(&self, profile_name: &str) -> Result<Profile, Vec<ProfileError>> {
        let mut overrides = BTreeMap::new();
        let mut errors = Vec::new();

        let mut files_by_root: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for file in self.schema.files() {
            files_by_root
                .entry(file.root.as_str())
                .or_default()
                .push(file.path.as_str());
        }

        for (root, paths) in &files_by_root {
            let candidates = candidate_paths(profile_name, paths);
            // Candidates are deepest-first; apply them shallowest-first so a
            // deeper file's directive overwrites a shallower one.
            for candidate in candidates.iter().rev() {
                let element = match self.source.read_profile(root, candidate) {
                    Ok(Some(element)) => element,
                    Ok(None) => continue,
                    Err(source_error) => {
                        errors.push(ProfileError::Unreadable {
                            path: candidate.clone(),
                            reason: source_error.reason,
                            location: Location::new(*root, candidate.clone()),
                        });
                        continue;
                    }
                };
                self.apply_file(candidate, &element, &mut overrides, &mut errors);
            }
        }

        if errors.is_empty() {
            Ok(Profile {
                name: profile_name.to_string(),
                overrides,
            })
        } else {
            Err(errors)
        }
    }

    fn apply_file(
        &self,
        profile_path: &str,
        element: &ProfileFileElement,
        overrides: &mut BTreeMap<String, TypeOverride>,
        errors: &mut Vec<ProfileError>,
    ) {
        for directive in &element.overrides {
            if directive.target.is_empty() || directive.adapter.is_empty() {
                errors.push(ProfileError::MalformedDirective {
                    type_name: directive.type_name.clone(),
                    reason: "a target and an adapter are both required".to_string(),
                    location: directive.location.clone(),
                });
                continue;
            }

            let Some(declared) = self.schema.get_type(&directive.type_name) else {
                debug!(
                    type_name = %directive.type_name,
                    profile = %profile_path,
                    "directive names a type outside this schema, skipping"
                );
                continue;
            };

            let declaring_file = declared.file();
            if !element.imports.iter().any(|import| import == declaring_file) {
                errors.push(ProfileError::MissingImport {
                    profile_path: profile_path.to_string(),
                    file_path: declaring_file.to_string(),
                    location: directive.location.clone(),
                });
                continue;
            }

            overrides.insert(
                directive.type_name.clone(),
                TypeOverride {
                    target: directive.target.clone(),
                    adapter: directive.adapter.clone(),
                },
            );
        }
    }
}

/// Candidate profile-file paths for the files of one root: for each file, walk
/// from the file's directory up to the root, appending `<name>.wire` at every
/// level. Deepest directory first, bare root-level file last; candidates are
/// unioned and de-duplicated across files.
pub fn candidate_paths(profile_name: &str, file_paths: &[&str]) -> Vec<String> {
    let file_name = format!("{}.{}", profile_name, PROFILE_EXTENSION);
    let mut seen = BTreeSet::new();
    let mut ordered: Vec<(usize, String)> = Vec::new();

    for path in file_paths {
        let mut dir = match path.rfind('/') {
            Some(idx) => &path[..idx],
            None => "",
        };
        loop {
            let candidate = if dir.is_empty() {
                file_name.clone()
            } else {
                format!("{}/{}", dir, file_name)
            };
            if seen.insert(candidate.clone()) {
                let depth = if dir.is_empty() {
                    0
                } else {
                    dir.split('/').count()
                };
                ordered.push((depth, candidate));
            }
            if dir.is_empty() {
                break;
            }
            dir = match dir.rfind('/') {
                Some(idx) => &dir[..idx],
                None => "",
            };
        }
    }

    ordered.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));
    ordered.into_iter().map(|(_, candidate)| candidate).collect()
}
