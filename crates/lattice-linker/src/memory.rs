//! In-memory element source for tests and embedders.
//!
//! Holds pre-parsed elements keyed by `(root, path)`. Adding a file stamps its
//! location from where it is mounted, so diagnostics in tests read the same
//! way they would against a real tree.

use std::collections::BTreeMap;

use lattice_core::element::ProtoFileElement;
use lattice_core::Location;

use crate::error::SourceError;
use crate::profile::ProfileFileElement;
use crate::source::ElementSource;

/// An [`ElementSource`] backed by maps.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: BTreeMap<(String, String), ProtoFileElement>,
    profiles: BTreeMap<(String, String), ProfileFileElement>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mount a schema file under `root` at `path`. The element's location is
    /// stamped from the mount point.
    pub fn add(
        &mut self,
        root: impl Into<String>,
        path: impl Into<String>,
        mut element: ProtoFileElement,
    ) -> &mut Self {
        let root = root.into();
        let path = path.into();
        element.location = Location::new(root.clone(), path.clone());
        self.files.insert((root, path), element);
        self
    }

    /// Mount a profile file under `root` at `path`. Directives without a
    /// location of their own inherit the file's.
    pub fn add_profile(
        &mut self,
        root: impl Into<String>,
        path: impl Into<String>,
        mut element: ProfileFileElement,
    ) -> &mut Self {
        let root = root.into();
        let path = path.into();
        element.location = Location::new(root.clone(), path.clone());
        for directive in &mut element.overrides {
            if directive.location.path().is_empty() {
                directive.location = element.location.clone();
            }
        }
        self.profiles.insert((root, path), element);
        self
    }
}

impl ElementSource for MemorySource {
    fn list(&self, root: &str) -> Result<Vec<String>, SourceError> {
        Ok(self
            .files
            .keys()
            .filter(|(file_root, _)| file_root == root)
            .map(|(_, path)| path.clone())
            .collect())
    }

    fn read(&self, root: &str, path: &str) -> Result<Option<ProtoFileElement>, SourceError> {
        Ok(self
            .files
            .get(&(root.to_string(), path.to_string()))
            .cloned())
    }

    fn read_profile(
        &self,
        root: &str,
        path: &str,
    ) -> Result<Option<ProfileFileElement>, SourceError> {
        Ok(self
            .profiles
            .get(&(root.to_string(), path.to_string()))
            .cloned())
    }
}
