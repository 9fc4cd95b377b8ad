//! Root orchestration: source roots, proto roots, and the import closure.
//!
//! Files under a source root must ultimately be emitted by some target; files
//! under a proto root exist purely to satisfy references and are loaded on
//! demand while chasing the import closure. A load either completes or fails
//! synchronously with the accumulated error list; unused roots are reported as
//! warnings and never abort the run.

use std::collections::{BTreeSet, HashSet, VecDeque};

use tracing::warn;

use lattice_core::schema_model::Role;
use lattice_core::Location;

use crate::config::LinkConfig;
use crate::cycle;
use crate::error::LinkError;
use crate::linker::{Linker, LoadedFile};
use crate::schema::Schema;
use crate::source::ElementSource;

/// Loads, links, and cycle-checks a schema per one [`LinkConfig`].
pub struct Loader<'a> {
    source: &'a dyn ElementSource,
}

impl<'a> Loader<'a> {
    pub fn new(source: &'a dyn ElementSource) -> Self {
        Self { source }
    }

    /// Load every file under the configured source roots, chase imports
    /// through the proto roots, link, and validate the package projection.
    pub fn load(&self, config: &LinkConfig) -> Result<Schema, Vec<LinkError>> {
        let mut errors: Vec<LinkError> = Vec::new();
        let mut loaded: Vec<LoadedFile> = Vec::new();
        let mut loaded_paths: HashSet<String> = HashSet::new();

        for root in &config.source_roots {
            let paths = match self.source.list(root) {
                Ok(paths) => paths,
                Err(source_error) => {
                    errors.push(LinkError::Source {
                        message: source_error.to_string(),
                        location: Location::new(root.clone(), ""),
                    });
                    continue;
                }
            };
            if paths.is_empty() {
                warn!(root = %root, "source root contributed no files");
            }
            for path in paths {
                if !loaded_paths.insert(path.clone()) {
                    continue;
                }
                match self.source.read(root, &path) {
                    Ok(Some(element)) => {
                        loaded.push(LoadedFile::new(root.clone(), path, Role::Source, element));
                    }
                    Ok(None) => errors.push(LinkError::Source {
                        message: format!("{} was listed but could not be read", path),
                        location: Location::new(root.clone(), path.clone()),
                    }),
                    Err(source_error) => errors.push(LinkError::Source {
                        message: source_error.to_string(),
                        location: Location::new(root.clone(), path.clone()),
                    }),
                }
            }
        }

        // Chase the import closure through the proto roots, first root wins.
        let mut queue: VecDeque<(String, String, Location)> = loaded
            .iter()
            .flat_map(|file| {
                file.element
                    .imports
                    .iter()
                    .chain(file.element.public_imports.iter())
                    .map(|import| {
                        (
                            import.clone(),
                            file.path.clone(),
                            file.element.location.clone(),
                        )
                    })
                    .collect::<Vec<_>>()
            })
            .collect();
        let mut used_proto_roots: BTreeSet<&String> = BTreeSet::new();

        while let Some((path, importer, importer_location)) = queue.pop_front() {
            if loaded_paths.contains(&path) {
                continue;
            }
            let mut found = false;
            for root in &config.proto_roots {
                match self.source.read(root, &path) {
                    Ok(Some(element)) => {
                        for import in element.imports.iter().chain(element.public_imports.iter())
                        {
                            queue.push_back((import.clone(), path.clone(), element.location.clone()));
                        }
                        loaded_paths.insert(path.clone());
                        loaded.push(LoadedFile::new(
                            root.clone(),
                            path.clone(),
                            Role::Path,
                            element,
                        ));
                        used_proto_roots.insert(root);
                        found = true;
                        break;
                    }
                    Ok(None) => {}
                    Err(source_error) => errors.push(LinkError::Source {
                        message: source_error.to_string(),
                        location: Location::new(root.clone(), path.clone()),
                    }),
                }
            }
            if !found {
                errors.push(LinkError::ImportNotFound {
                    path,
                    importer,
                    location: importer_location,
                });
            }
        }

        for root in &config.proto_roots {
            if !used_proto_roots.contains(root) {
                warn!(root = %root, "proto root satisfied no imports");
            }
        }

        let schema = match Linker::link(loaded) {
            Ok(schema) => schema,
            Err(link_errors) => {
                errors.extend(link_errors);
                return Err(errors);
            }
        };
        if !errors.is_empty() {
            return Err(errors);
        }

        let cycles = cycle::package_cycles(&schema);
        if !cycles.is_empty() {
            if config.permit_package_cycles {
                for component in &cycles {
                    warn!(cycle = %component.join(" -> "), "permitting package cycle");
                }
            } else {
                for component in cycles {
                    let location = component
                        .first()
                        .and_then(|package| {
                            schema
                                .files()
                                .find(|file| file.package() == package)
                                .map(|file| file.location.clone())
                        })
                        .unwrap_or_default();
                    errors.push(LinkError::PackageCycle {
                        cycle: component.join(" -> "),
                        location,
                    });
                }
                return Err(errors);
            }
        }

        Ok(schema)
    }
}
