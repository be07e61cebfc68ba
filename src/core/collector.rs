//! Declaration collectors
//!
//! Two entry points append matching declarations to a caller-owned result
//! vector: one searches a project's source compilation, the other a metadata
//! reference through its symbol index. Each call collects into a local vector
//! and extends `results` only once it has fully succeeded, so a cancelled or
//! failed call contributes nothing.
//!
//! Neither collector accepts custom queries; those go through
//! [`find_source_declarations_with_custom_query_in_project`](crate::core::search::find_source_declarations_with_custom_query_in_project).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::core::cancel::check_cancelled;
use crate::core::compilation::{AssemblySymbol, Compilation};
use crate::core::criteria::filter_by_criteria_owned;
use crate::core::error::Result;
use crate::core::filter::SymbolFilter;
use crate::core::metadata::MetadataReference;
use crate::core::metadata_index::try_get_index_for_reference;
use crate::core::project::Project;
use crate::core::query::{SearchKind, SearchQuery};
use crate::core::solution::Solution;
use crate::core::symbol_key::SymbolKey;
use crate::core::symbols::Symbol;

const CANCELLATION_POLL_INTERVAL: usize = 64;

/// Collect source declarations of `project` matching `query` and `filter`.
///
/// When `target_compilation` and `target_assembly` are both given and the
/// project's compilation is not the one that produced `target_assembly`, every
/// result is re-resolved into `target_compilation` by its [`SymbolKey`];
/// symbols that do not resolve there are dropped.
///
/// # Panics
///
/// If `query` is a custom query.
#[instrument(
    level = "debug",
    skip_all,
    fields(project = %project.id(), query = ?query, filter = ?filter)
)]
pub async fn find_source_declarations_with_normal_query_in_project(
    project: &dyn Project,
    query: &SearchQuery,
    filter: SymbolFilter,
    results: &mut Vec<Symbol>,
    target_compilation: Option<&Compilation>,
    target_assembly: Option<&Arc<AssemblySymbol>>,
    cancel: &CancellationToken,
) -> Result<()> {
    assert_ne!(
        query.kind(),
        SearchKind::Custom,
        "custom queries cannot collect declarations"
    );

    if !project
        .might_contain_symbol_named(query, filter, cancel)
        .await?
    {
        debug!("name index rules out a match");
        return Ok(());
    }

    let compilation = project.get_compilation(cancel).await?;
    let mut found = compilation.get_symbols_with_name(query, filter, cancel)?;

    if let (Some(target), Some(assembly)) = (target_compilation, target_assembly) {
        if !Arc::ptr_eq(compilation.source_assembly(), assembly) {
            found = translate_to_compilation(found, target, cancel)?;
        }
    }

    let found = filter_by_criteria_owned(found, filter);
    debug!(count = found.len(), "collected source declarations");
    results.extend(found);
    Ok(())
}

fn translate_to_compilation(
    symbols: Vec<Symbol>,
    target: &Compilation,
    cancel: &CancellationToken,
) -> Result<Vec<Symbol>> {
    let mut translated = Vec::with_capacity(symbols.len());
    for (i, symbol) in symbols.into_iter().enumerate() {
        if i % CANCELLATION_POLL_INTERVAL == 0 {
            check_cancelled(cancel)?;
        }
        let key = SymbolKey::create(&symbol);
        match key.resolve(target) {
            Some(resolved) => translated.push(resolved),
            None => debug!(%key, target = %target.id(), "dropping symbol with no equivalent"),
        }
    }
    Ok(translated)
}

/// Collect declarations of the metadata `reference` (whose symbols are
/// `assembly`) matching `query` and `filter`.
///
/// A missing reference, or one that cannot be indexed, contributes nothing.
/// The index already leaves out compiler-synthesized declarations and
/// accessors, so results are appended without another criteria pass.
///
/// # Panics
///
/// If `query` is a custom query.
#[instrument(
    level = "debug",
    skip_all,
    fields(
        assembly = assembly.name(),
        reference = ?reference.map(MetadataReference::path),
        query = ?query,
        filter = ?filter
    )
)]
pub async fn find_metadata_declarations_with_normal_query(
    solution: &Solution,
    assembly: &AssemblySymbol,
    reference: Option<&MetadataReference>,
    query: &SearchQuery,
    filter: SymbolFilter,
    results: &mut Vec<Symbol>,
    cancel: &CancellationToken,
) -> Result<()> {
    assert_ne!(
        query.kind(),
        SearchKind::Custom,
        "custom queries cannot collect declarations"
    );

    let Some(reference) = reference else {
        return Ok(());
    };

    let Some(index) = try_get_index_for_reference(solution, reference, false, cancel).await?
    else {
        debug!("no symbol index for reference");
        return Ok(());
    };

    let found = index.find(query, assembly, filter, cancel)?;
    debug!(count = found.len(), "collected metadata declarations");
    results.extend(found);
    Ok(())
}
