//! Declaration search across projects and references
//!
//! Composes the collectors into the searches callers actually run:
//!
//! - [`find_all_declarations_with_normal_query`]: one project's source plus
//!   every metadata reference it uses
//! - [`find_source_declarations_with_normal_query`]: the source of every
//!   project in a solution
//! - [`find_source_declarations_with_pattern_in_project`]: dotted
//!   `Container.Name` patterns
//! - [`find_source_declarations_with_custom_query_in_project`]: arbitrary
//!   symbol predicates
//!
//! # Example
//! ```ignore
//! use declaration_finder::{SearchQuery, Solution, SymbolFilter};
//! use tokio_util::sync::CancellationToken;
//!
//! let found = find_source_declarations_with_normal_query(
//!     &solution,
//!     &SearchQuery::exact("Console", false),
//!     SymbolFilter::TYPE,
//!     &CancellationToken::new(),
//! )
//! .await?;
//! ```

use std::collections::HashSet;

use futures::future::try_join_all;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use crate::core::cancel::check_cancelled;
use crate::core::collector::{
    find_metadata_declarations_with_normal_query,
    find_source_declarations_with_normal_query_in_project,
};
use crate::core::criteria::filter_by_criteria_owned;
use crate::core::error::{FinderError, Result};
use crate::core::filter::SymbolFilter;
use crate::core::namespace::translate_namespaces_owned;
use crate::core::project::Project;
use crate::core::query::SearchQuery;
use crate::core::solution::Solution;
use crate::core::symbols::Symbol;

const CANCELLATION_POLL_INTERVAL: usize = 256;

/// Declarations visible from `project`: its own source declarations followed
/// by those of each metadata reference, in reference order.
///
/// Namespaces are normalized to the project compilation's merged namespaces,
/// so a namespace declared in several assemblies appears once.
#[instrument(level = "debug", skip_all, fields(project = %project.id(), query = ?query))]
pub async fn find_all_declarations_with_normal_query(
    solution: &Solution,
    project: &dyn Project,
    query: &SearchQuery,
    filter: SymbolFilter,
    cancel: &CancellationToken,
) -> Result<Vec<Symbol>> {
    let mut results = Vec::new();
    find_source_declarations_with_normal_query_in_project(
        project,
        query,
        filter,
        &mut results,
        None,
        None,
        cancel,
    )
    .await?;

    let references = project.metadata_references();
    if results.is_empty() && references.is_empty() {
        return Ok(results);
    }

    let compilation = project.get_compilation(cancel).await?;
    for reference in &references {
        let Some(assembly) = compilation.assembly_for_reference(reference) else {
            debug!(reference = %reference.path().display(), "reference has no assembly");
            continue;
        };
        find_metadata_declarations_with_normal_query(
            solution,
            assembly,
            Some(reference),
            query,
            filter,
            &mut results,
            cancel,
        )
        .await?;
    }

    let results = translate_namespaces_owned(results, &compilation);
    Ok(dedup_in_order(results))
}

/// Source declarations of every project in `solution`.
///
/// Projects are searched concurrently; each project's results form one
/// contiguous block, in solution order.
#[instrument(level = "debug", skip_all, fields(projects = solution.projects().len(), query = ?query))]
pub async fn find_source_declarations_with_normal_query(
    solution: &Solution,
    query: &SearchQuery,
    filter: SymbolFilter,
    cancel: &CancellationToken,
) -> Result<Vec<Symbol>> {
    let searches = solution.projects().iter().map(|project| async move {
        let mut found = Vec::new();
        find_source_declarations_with_normal_query_in_project(
            project.as_ref(),
            query,
            filter,
            &mut found,
            None,
            None,
            cancel,
        )
        .await?;
        Ok::<_, FinderError>(found)
    });

    let blocks = try_join_all(searches).await?;
    Ok(blocks.into_iter().flatten().collect())
}

/// Source declarations of `project` matching a dotted pattern such as
/// `Collections.List` or `Add`.
///
/// The last segment is matched against declaration names ignoring case; the
/// preceding segments must match the innermost containers, innermost last.
pub async fn find_source_declarations_with_pattern_in_project(
    project: &dyn Project,
    pattern: &str,
    filter: SymbolFilter,
    cancel: &CancellationToken,
) -> Result<Vec<Symbol>> {
    let (containers, name) = parse_pattern(pattern)?;

    let mut found = Vec::new();
    find_source_declarations_with_normal_query_in_project(
        project,
        &SearchQuery::exact(name, true),
        filter,
        &mut found,
        None,
        None,
        cancel,
    )
    .await?;

    found.retain(|symbol| containers_match(symbol, &containers));
    Ok(found)
}

/// Source declarations of `project` accepted by a query of any kind,
/// including custom symbol predicates.
///
/// There is no name index to consult for custom queries, so this always
/// materializes the compilation.
#[instrument(level = "debug", skip_all, fields(project = %project.id(), query = ?query))]
pub async fn find_source_declarations_with_custom_query_in_project(
    project: &dyn Project,
    query: &SearchQuery,
    filter: SymbolFilter,
    cancel: &CancellationToken,
) -> Result<Vec<Symbol>> {
    let compilation = project.get_compilation(cancel).await?;

    let mut found = Vec::new();
    for (i, symbol) in compilation
        .source_assembly()
        .declared_symbols()
        .iter()
        .enumerate()
    {
        if i % CANCELLATION_POLL_INTERVAL == 0 {
            check_cancelled(cancel)?;
        }
        if query.matches_symbol(symbol) {
            found.push(symbol.clone());
        }
    }
    Ok(filter_by_criteria_owned(found, filter))
}

fn parse_pattern(pattern: &str) -> Result<(Vec<&str>, &str)> {
    let invalid = |message: &str| FinderError::InvalidPattern {
        pattern: pattern.to_string(),
        message: message.to_string(),
    };

    let mut segments: Vec<&str> = pattern.trim().split('.').map(str::trim).collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(invalid("empty name segment"));
    }
    let name = segments.pop().ok_or_else(|| invalid("empty pattern"))?;
    Ok((segments, name))
}

fn containers_match(symbol: &Symbol, containers: &[&str]) -> bool {
    let mut current = symbol.container();
    for expected in containers.iter().rev() {
        match current {
            Some(container)
                if !container.is_global_namespace()
                    && container.name().to_lowercase() == expected.to_lowercase() =>
            {
                current = container.container();
            }
            _ => return false,
        }
    }
    true
}

fn dedup_in_order(mut symbols: Vec<Symbol>) -> Vec<Symbol> {
    let mut seen = HashSet::with_capacity(symbols.len());
    symbols.retain(|symbol| seen.insert(symbol.clone()));
    symbols
}
