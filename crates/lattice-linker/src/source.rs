//! The collaborator seam to the excluded parser and file system.
//!
//! Everything that touches bytes on disk or turns text into syntax elements
//! lives behind [`ElementSource`]. The linker core only ever sees parsed
//! elements, which keeps every pass synchronous, deterministic, and testable
//! against the in-memory implementation in [`crate::memory`].

use lattice_core::element::ProtoFileElement;

use crate::error::SourceError;
use crate::profile::ProfileFileElement;

/// Lists and reads parsed schema files for the loader and profile resolver.
pub trait ElementSource {
    /// Enumerate the schema files under a root, as root-relative paths.
    /// The returned order is the load order for that root.
    fn list(&self, root: &str) -> Result<Vec<String>, SourceError>;

    /// Read and parse one file under a root. `Ok(None)` when no such file
    /// exists there, so the loader can probe several roots in order.
    fn read(&self, root: &str, path: &str) -> Result<Option<ProtoFileElement>, SourceError>;

    /// Read and parse one profile file under a root. `Ok(None)` when the
    /// candidate does not exist; the profile resolver probes many candidates
    /// and only existing ones participate.
    fn read_profile(
        &self,
        root: &str,
        path: &str,
    ) -> Result<Option<ProfileFileElement>, SourceError>;
}
