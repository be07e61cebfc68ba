//! Projects
//!
//! The [`Project`] trait is the seam between the declaration finder and
//! whatever loads projects and produces compilations. [`SourceProject`] is an
//! in-memory implementation fed with declaration trees.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;

use crate::core::cancel::{check_cancelled, run_cancellable};
use crate::core::compilation::Compilation;
use crate::core::error::Result;
use crate::core::filter::SymbolFilter;
use crate::core::metadata::MetadataReference;
use crate::core::query::{SearchKind, SearchQuery};
use crate::core::symbols::{Declaration, SymbolKind};

#[cfg(test)]
use mockall::automock;

static NEXT_PROJECT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a project within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProjectId(u64);

impl ProjectId {
    pub fn next() -> Self {
        Self(NEXT_PROJECT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "project#{}", self.0)
    }
}

/// A project the finder can search
///
/// This trait allows for mocking in tests and alternative implementations
/// (e.g., projects backed by a real compiler front end).
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Project: Send + Sync {
    fn id(&self) -> ProjectId;

    /// Precompiled references of this project
    fn metadata_references(&self) -> Vec<MetadataReference>;

    /// Cheap, conservative check: may answer `true` spuriously, must never
    /// answer `false` when a matching declaration exists.
    async fn might_contain_symbol_named(
        &self,
        query: &SearchQuery,
        filter: SymbolFilter,
        cancel: &CancellationToken,
    ) -> Result<bool>;

    /// The project's compilation (possibly cached)
    async fn get_compilation(&self, cancel: &CancellationToken) -> Result<Arc<Compilation>>;
}

/// Declared names of a set of documents, split by filter category
#[derive(Debug, Clone, Default)]
pub struct DeclarationNameIndex {
    namespaces: HashSet<String>,
    types: HashSet<String>,
    members: HashSet<String>,
    folded: HashSet<(Category, String)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Category {
    Namespace,
    Type,
    Member,
}

impl Category {
    fn of(kind: SymbolKind) -> Self {
        if kind.is_namespace() {
            Category::Namespace
        } else if kind.is_type() {
            Category::Type
        } else {
            Category::Member
        }
    }

    fn flag(self) -> SymbolFilter {
        match self {
            Category::Namespace => SymbolFilter::NAMESPACE,
            Category::Type => SymbolFilter::TYPE,
            Category::Member => SymbolFilter::MEMBER,
        }
    }
}

impl DeclarationNameIndex {
    /// Index every declaration in `documents`
    pub fn build<'a>(documents: impl IntoIterator<Item = &'a [Declaration]>) -> Self {
        let mut index = Self::default();
        for roots in documents {
            for root in roots {
                root.walk(&mut |decl| index.insert(decl.kind, &decl.name));
            }
        }
        index
    }

    fn insert(&mut self, kind: SymbolKind, name: &str) {
        let category = Category::of(kind);
        self.set_mut(category).insert(name.to_string());
        self.folded.insert((category, name.to_lowercase()));
    }

    fn set(&self, category: Category) -> &HashSet<String> {
        match category {
            Category::Namespace => &self.namespaces,
            Category::Type => &self.types,
            Category::Member => &self.members,
        }
    }

    fn set_mut(&mut self, category: Category) -> &mut HashSet<String> {
        match category {
            Category::Namespace => &mut self.namespaces,
            Category::Type => &mut self.types,
            Category::Member => &mut self.members,
        }
    }

    /// Number of distinct names across all categories
    pub fn len(&self) -> usize {
        self.namespaces.len() + self.types.len() + self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Conservative existence check for `query` restricted to `filter`
    pub fn might_contain(&self, query: &SearchQuery, filter: SymbolFilter) -> bool {
        [Category::Namespace, Category::Type, Category::Member]
            .into_iter()
            .filter(|category| filter.contains(category.flag()))
            .any(|category| self.category_might_contain(category, query))
    }

    fn category_might_contain(&self, category: Category, query: &SearchQuery) -> bool {
        match (query.kind(), query.name()) {
            (SearchKind::Exact, Some(name)) if query.ignore_case() => {
                self.folded.contains(&(category, name.to_lowercase()))
            }
            (SearchKind::Exact, Some(name)) => self.set(category).contains(name),
            _ => self.set(category).iter().any(|n| query.matches_name(n)),
        }
    }
}

/// One source document's top-level declarations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDocument {
    pub path: PathBuf,
    pub declarations: Vec<Declaration>,
}

impl SourceDocument {
    pub fn new(path: impl Into<PathBuf>, declarations: Vec<Declaration>) -> Self {
        Self {
            path: path.into(),
            declarations,
        }
    }
}

/// In-memory project built from declaration trees
pub struct SourceProject {
    id: ProjectId,
    name: String,
    assembly_name: String,
    documents: Vec<SourceDocument>,
    references: Vec<MetadataReference>,
    name_index: DeclarationNameIndex,
    compilation: OnceCell<Arc<Compilation>>,
}

impl SourceProject {
    /// Create a project whose assembly is named after the project
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            id: ProjectId::next(),
            assembly_name: name.clone(),
            name,
            documents: Vec::new(),
            references: Vec::new(),
            name_index: DeclarationNameIndex::default(),
            compilation: OnceCell::new(),
        }
    }

    pub fn with_assembly_name(mut self, assembly_name: impl Into<String>) -> Self {
        self.assembly_name = assembly_name.into();
        self
    }

    pub fn with_document(mut self, document: SourceDocument) -> Self {
        self.documents.push(document);
        self.reindex();
        self
    }

    pub fn with_reference(mut self, reference: MetadataReference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn documents(&self) -> &[SourceDocument] {
        &self.documents
    }

    pub fn name_index(&self) -> &DeclarationNameIndex {
        &self.name_index
    }

    /// True once the compilation has been built
    pub fn has_compilation(&self) -> bool {
        self.compilation.initialized()
    }

    fn reindex(&mut self) {
        self.name_index =
            DeclarationNameIndex::build(self.documents.iter().map(|d| d.declarations.as_slice()));
    }

    async fn build_compilation(&self) -> Result<Arc<Compilation>> {
        let mut builder = Compilation::builder(self.assembly_name.clone())
            .with_references(self.references.iter().cloned());
        for document in &self.documents {
            builder = builder.with_document(document.declarations.clone());
        }
        let project = self.name.clone();
        let compilation = tokio::task::spawn_blocking(move || {
            let compilation = builder.build();
            tracing::debug!(%project, compilation = %compilation.id(), "compilation built");
            compilation
        })
        .await?;
        Ok(Arc::new(compilation))
    }
}

impl fmt::Debug for SourceProject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceProject")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("documents", &self.documents.len())
            .field("references", &self.references.len())
            .finish()
    }
}

#[async_trait]
impl Project for SourceProject {
    fn id(&self) -> ProjectId {
        self.id
    }

    fn metadata_references(&self) -> Vec<MetadataReference> {
        self.references.clone()
    }

    async fn might_contain_symbol_named(
        &self,
        query: &SearchQuery,
        filter: SymbolFilter,
        cancel: &CancellationToken,
    ) -> Result<bool> {
        check_cancelled(cancel)?;
        Ok(self.name_index.might_contain(query, filter))
    }

    async fn get_compilation(&self, cancel: &CancellationToken) -> Result<Arc<Compilation>> {
        let compilation = run_cancellable(cancel, async {
            self.compilation
                .get_or_try_init(|| self.build_compilation())
                .await
                .cloned()
        })
        .await?;
        Ok(compilation)
    }
}
