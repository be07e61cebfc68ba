//! declaration_finder - Symbol search and declaration resolution
//!
//! Finds declared namespaces, types and members matching a query across the
//! source compilations and precompiled metadata references of a multi-project
//! solution. Results always belong to the caller's compilation: symbols found
//! elsewhere are re-resolved by structural key before they are returned.
//!
//! # Architecture
//!
//! - **Collectors** (`core::collector`): append the declarations of one project
//!   or one metadata reference to a caller-owned result vector
//! - **Searches** (`core::search`): solution-wide, all-declarations, pattern and
//!   custom-predicate searches built from the collectors
//! - **Collaborators** (`core::project`, `core::metadata_index`): the project
//!   name pre-check and compilation provider, and the binary symbol index
//!
//! # Example
//! ```ignore
//! use std::sync::Arc;
//! use declaration_finder::{
//!     find_source_declarations_with_normal_query, Declaration, SearchQuery, Solution,
//!     SourceDocument, SourceProject, SymbolFilter,
//! };
//! use tokio_util::sync::CancellationToken;
//!
//! let project = SourceProject::new("App").with_document(SourceDocument::new(
//!     "src/Widget.cs",
//!     vec![Declaration::namespace("App").with_child(Declaration::class("Widget"))],
//! ));
//! let solution = Solution::default().with_project(Arc::new(project));
//!
//! let found = find_source_declarations_with_normal_query(
//!     &solution,
//!     &SearchQuery::exact("Widget", false),
//!     SymbolFilter::TYPE,
//!     &CancellationToken::new(),
//! )
//! .await?;
//! assert_eq!(found[0].qualified_name(), "App.Widget");
//! ```

pub mod core;

pub use crate::core::*;

/// Returns the version of the declaration_finder library
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
