//! Schema graph linker, profile resolver, and pruner.
//!
//! This crate is the semantic middle layer of the schema compiler: it links
//! parsed files into one symbol-resolved [`Schema`], rejects illegal package
//! cycles, resolves target [`Profile`]s, prunes the graph down to an
//! identifier-selected subgraph, and exports deterministic per-file dependency
//! orderings for interchange consumers.

pub mod config;
pub mod cycle;
pub mod deps;
pub mod error;
pub mod linker;
pub mod loader;
pub mod memory;
pub mod profile;
pub mod prune;
pub mod schema;
pub mod source;

pub use config::LinkConfig;
pub use error::{LinkError, ProfileError};
pub use linker::{Linker, LoadedFile};
pub use loader::Loader;
pub use memory::MemorySource;
pub use profile::{Profile, ProfileResolver};
pub use prune::PruneResult;
pub use schema::Schema;
pub use source::ElementSource;
