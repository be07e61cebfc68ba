//! Core module for the declaration finder
//!
//! # Architecture
//!
//! - `symbols`: Symbol handles, kinds and declaration trees
//! - `compilation`: Compilations, assemblies and merged namespaces
//! - `metadata`: Metadata images and references
//! - `query` / `filter`: What to search for
//! - `criteria`: Which symbols count as declaration results
//! - `symbol_key`: Compilation-independent symbol identity
//! - `namespace`: Namespace identity normalization
//! - `project` / `solution`: Search collaborators
//! - `metadata_index`: Binary symbol indexes for metadata references
//! - `collector`: Source and metadata declaration collectors
//! - `search`: Searches composed from the collectors
//! - `error`, `config`, `cancel`: Ambient plumbing

pub mod cancel;
pub mod collector;
pub mod compilation;
pub mod config;
pub mod criteria;
pub mod error;
pub mod filter;
pub mod metadata;
pub mod metadata_index;
pub mod namespace;
pub mod project;
pub mod query;
pub mod search;
pub mod solution;
pub mod symbol_key;
pub mod symbols;

// Re-export commonly used types
pub use cancel::{check_cancelled, run_cancellable};
pub use collector::{
    find_metadata_declarations_with_normal_query,
    find_source_declarations_with_normal_query_in_project,
};
pub use compilation::{AssemblyOrigin, AssemblySymbol, Compilation, CompilationBuilder};
pub use config::FinderConfig;
pub use criteria::{filter_by_criteria, filter_by_criteria_owned, meets_criteria};
pub use error::{FinderError, Result, ResultExt};
pub use filter::SymbolFilter;
pub use metadata::{MetadataImage, MetadataReference};
pub use metadata_index::{try_get_index_for_reference, SymbolIndexService, SymbolTreeIndex};
pub use namespace::{translate_namespaces, translate_namespaces_owned};
pub use project::{DeclarationNameIndex, Project, ProjectId, SourceDocument, SourceProject};
pub use query::{SearchKind, SearchQuery};
pub use search::{
    find_all_declarations_with_normal_query,
    find_source_declarations_with_custom_query_in_project,
    find_source_declarations_with_normal_query,
    find_source_declarations_with_pattern_in_project,
};
pub use solution::Solution;
pub use symbol_key::{KeySegment, SymbolKey};
pub use symbols::{CompilationId, Declaration, NamespaceExtent, Symbol, SymbolId, SymbolKind};
