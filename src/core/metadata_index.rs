//! Binary symbol index
//!
//! A [`SymbolTreeIndex`] flattens the declarations of one metadata reference
//! into a node table plus a case-insensitively sorted name table. Lookups
//! produce symbol keys which are then resolved against the caller's assembly,
//! so results always belong to the caller's compilation.
//!
//! # Persistence
//!
//! Indexes are written to `<cache dir>/<checksum>.idx` with bincode. A
//! persisted index is reused when its format version and checksum match and it
//! is younger than the configured maximum age.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

use crate::core::cancel::{check_cancelled, run_cancellable};
use crate::core::compilation::AssemblySymbol;
use crate::core::config::FinderConfig;
use crate::core::criteria::kind_meets_criteria;
use crate::core::error::{FinderError, Result};
use crate::core::filter::SymbolFilter;
use crate::core::metadata::{MetadataImage, MetadataReference};
use crate::core::query::{SearchKind, SearchQuery};
use crate::core::solution::Solution;
use crate::core::symbol_key::{KeySegment, SymbolKey};
use crate::core::symbols::{Declaration, Symbol, SymbolKind};

/// Index file format version (bump to invalidate persisted indexes)
const INDEX_VERSION: u32 = 2;

/// Index file extension
const INDEX_EXTENSION: &str = "idx";

const CANCELLATION_POLL_INTERVAL: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct IndexNode {
    name: String,
    kind: SymbolKind,
    arity: u32,
    /// Position among same-named siblings of the same kind and arity,
    /// counting declarations left out of the index
    ordinal: u32,
    parent: Option<u32>,
}

/// Searchable index over the declarations of one metadata reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolTreeIndex {
    version: u32,
    checksum: String,
    assembly_name: String,
    built_at: DateTime<Utc>,
    /// Declarations in declaration order, namespaces merged; parents precede
    /// their children
    nodes: Vec<IndexNode>,
    /// Node indices ordered by (lowercased name, node index)
    sorted: Vec<u32>,
    folded_names: Vec<String>,
}

impl SymbolTreeIndex {
    /// Build from a decoded image.
    ///
    /// Compiler-synthesized declarations, accessors and non-declarable kinds
    /// (type parameters, aliases) are left out, so lookups never need a
    /// second criteria pass.
    pub fn build(image: &MetadataImage, checksum: impl Into<String>) -> Self {
        let mut builder = NodeTableBuilder::default();
        for root in &image.declarations {
            builder.add(root, None);
        }
        let nodes = builder.nodes;

        let folded_names: Vec<String> = nodes.iter().map(|n| n.name.to_lowercase()).collect();
        let mut sorted: Vec<u32> = (0..nodes.len() as u32).collect();
        sorted.sort_by(|a, b| {
            folded_names[*a as usize]
                .cmp(&folded_names[*b as usize])
                .then(a.cmp(b))
        });

        Self {
            version: INDEX_VERSION,
            checksum: checksum.into(),
            assembly_name: image.assembly_name.clone(),
            built_at: Utc::now(),
            nodes,
            sorted,
            folded_names,
        }
    }

    /// Decode `reference` and build its index
    pub fn from_reference(reference: &MetadataReference) -> Result<Self> {
        let image = reference.read_image()?;
        Ok(Self::build(&image, reference.checksum()))
    }

    pub fn checksum(&self) -> &str {
        &self.checksum
    }

    pub fn assembly_name(&self) -> &str {
        &self.assembly_name
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Key of the declaration stored at `node`
    fn key_for(&self, node: u32) -> SymbolKey {
        let mut segments = Vec::new();
        let mut current = Some(node);
        while let Some(index) = current {
            let node = &self.nodes[index as usize];
            segments.push(KeySegment {
                name: node.name.clone(),
                kind: node.kind,
                arity: node.arity,
                ordinal: node.ordinal,
            });
            current = node.parent;
        }
        segments.reverse();
        SymbolKey::from_segments(segments)
    }

    /// Node indices whose name satisfies `query`, in declaration order
    fn candidates(&self, query: &SearchQuery) -> Vec<u32> {
        match (query.kind(), query.name()) {
            (SearchKind::Exact, Some(name)) => {
                let folded = name.to_lowercase();
                let start = self
                    .sorted
                    .partition_point(|i| self.folded_names[*i as usize] < folded);
                let mut hits: Vec<u32> = self.sorted[start..]
                    .iter()
                    .take_while(|i| self.folded_names[**i as usize] == folded)
                    .copied()
                    .filter(|i| query.matches_name(&self.nodes[*i as usize].name))
                    .collect();
                hits.sort_unstable();
                hits
            }
            _ => (0..self.nodes.len() as u32)
                .filter(|i| query.matches_name(&self.nodes[*i as usize].name))
                .collect(),
        }
    }

    /// Symbols of `assembly` matching `query` and `filter`.
    ///
    /// Entries that do not resolve in `assembly` (an index built from a
    /// different image than the assembly was) are skipped.
    pub fn find(
        &self,
        query: &SearchQuery,
        assembly: &AssemblySymbol,
        filter: SymbolFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<Symbol>> {
        let mut found = Vec::new();
        for (i, node) in self.candidates(query).into_iter().enumerate() {
            if i % CANCELLATION_POLL_INTERVAL == 0 {
                check_cancelled(cancel)?;
            }
            if !kind_meets_criteria(self.nodes[node as usize].kind, filter) {
                continue;
            }
            match self.key_for(node).resolve_in_assembly(assembly) {
                Some(symbol) => found.push(symbol),
                None => tracing::debug!(
                    assembly = assembly.name(),
                    key = %self.key_for(node),
                    "index entry missing from assembly"
                ),
            }
        }
        Ok(found)
    }

    /// Write atomically (temp file, then rename)
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let buffer = bincode::serialize(self)?;

        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path)?;
        file.write_all(&buffer)?;
        file.sync_all()?;
        fs::rename(&temp_path, path)?;
        Ok(())
    }

    /// Read a persisted index, rejecting other format versions
    pub fn load(path: &Path) -> Result<Self> {
        let buffer = fs::read(path)?;
        let index: SymbolTreeIndex = bincode::deserialize(&buffer)?;
        if index.version != INDEX_VERSION {
            return Err(FinderError::index(
                path,
                format!("format version {} (expected {})", index.version, INDEX_VERSION),
            ));
        }
        index
            .validate()
            .map_err(|message| FinderError::index(path, message))?;
        Ok(index)
    }

    /// Structural checks lookups rely on: table lengths agree, parents
    /// precede children, and `sorted` is an ordered permutation of the nodes.
    fn validate(&self) -> std::result::Result<(), String> {
        let len = self.nodes.len();
        if self.folded_names.len() != len || self.sorted.len() != len {
            return Err(format!(
                "table lengths disagree: {} nodes, {} names, {} sorted",
                len,
                self.folded_names.len(),
                self.sorted.len()
            ));
        }

        for (i, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent {
                if parent as usize >= i {
                    return Err(format!("node {i} has parent {parent}"));
                }
            }
        }

        let mut seen = vec![false; len];
        for &entry in &self.sorted {
            match seen.get_mut(entry as usize) {
                Some(slot) if !*slot => *slot = true,
                Some(_) => return Err(format!("sorted table repeats node {entry}")),
                None => return Err(format!("sorted table entry {entry} out of range")),
            }
        }
        if self
            .sorted
            .windows(2)
            .any(|w| self.folded_names[w[0] as usize] > self.folded_names[w[1] as usize])
        {
            return Err("sorted table out of order".to_string());
        }
        Ok(())
    }

    fn is_fresh(&self, max_age_hours: u64) -> bool {
        let Some(max_age) = i64::try_from(max_age_hours).ok().and_then(Duration::try_hours) else {
            return true;
        };
        Utc::now().signed_duration_since(self.built_at) <= max_age
    }
}

/// Flattens declaration trees the way a compilation lays out an assembly:
/// namespaces merge by (parent, name), and repeated declarations are told
/// apart by ordinal.
#[derive(Default)]
struct NodeTableBuilder {
    nodes: Vec<IndexNode>,
    namespaces: HashMap<(Option<u32>, String), u32>,
    sibling_counts: HashMap<(Option<u32>, String, SymbolKind, u32), u32>,
}

impl NodeTableBuilder {
    fn add(&mut self, decl: &Declaration, parent: Option<u32>) {
        if decl.kind.is_namespace() {
            if let Some(&existing) = self.namespaces.get(&(parent, decl.name.clone())) {
                for child in &decl.children {
                    self.add(child, Some(existing));
                }
                return;
            }
        }

        // Counted before filtering so ordinals agree with the assembly's
        let count = self
            .sibling_counts
            .entry((parent, decl.name.clone(), decl.kind, decl.arity))
            .or_insert(0);
        let ordinal = *count;
        *count += 1;

        let declarable = decl.kind.is_namespace() || decl.kind.is_type() || decl.kind.is_member();
        if !declarable || decl.implicitly_declared || decl.accessor {
            return;
        }

        let index = self.nodes.len() as u32;
        self.nodes.push(IndexNode {
            name: decl.name.clone(),
            kind: decl.kind,
            arity: decl.arity,
            ordinal,
            parent,
        });
        if decl.kind.is_namespace() {
            self.namespaces.insert((parent, decl.name.clone()), index);
        }
        for child in &decl.children {
            self.add(child, Some(index));
        }
    }
}

/// Builds, persists and caches symbol indexes for metadata references
pub struct SymbolIndexService {
    config: FinderConfig,
    cache: Mutex<HashMap<String, Arc<SymbolTreeIndex>>>,
}

impl SymbolIndexService {
    pub fn new(config: FinderConfig) -> Self {
        Self {
            config,
            cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &FinderConfig {
        &self.config
    }

    /// Where the index for `reference` is persisted, if persistence is configured
    pub fn index_path(&self, reference: &MetadataReference) -> Option<PathBuf> {
        self.config
            .index_cache_dir
            .as_ref()
            .map(|dir| dir.join(format!("{}.{}", reference.checksum(), INDEX_EXTENSION)))
    }

    /// Number of indexes held in memory
    pub fn cached_count(&self) -> usize {
        self.cache.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Lookup order: in-memory cache, persisted index, fresh build. With
    /// `load_only` no index is built.
    pub async fn get_index(
        &self,
        reference: &MetadataReference,
        load_only: bool,
        cancel: &CancellationToken,
    ) -> Result<Option<Arc<SymbolTreeIndex>>> {
        check_cancelled(cancel)?;

        if let Some(index) = self.cached(reference.checksum()) {
            return Ok(Some(index));
        }
        if let Some(index) = self.load_persisted(reference, cancel).await? {
            return Ok(Some(self.remember(index)));
        }
        if load_only {
            return Ok(None);
        }
        Ok(self
            .build(reference, cancel)
            .await?
            .map(|index| self.remember(index)))
    }

    fn cached(&self, checksum: &str) -> Option<Arc<SymbolTreeIndex>> {
        self.cache.lock().ok()?.get(checksum).cloned()
    }

    fn remember(&self, index: SymbolTreeIndex) -> Arc<SymbolTreeIndex> {
        let index = Arc::new(index);
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(index.checksum().to_string(), index.clone());
        }
        index
    }

    async fn load_persisted(
        &self,
        reference: &MetadataReference,
        cancel: &CancellationToken,
    ) -> Result<Option<SymbolTreeIndex>> {
        let Some(path) = self.index_path(reference) else {
            return Ok(None);
        };
        if !path.exists() {
            return Ok(None);
        }

        let loaded = run_cancellable(cancel, async {
            let load_path = path.clone();
            tokio::task::spawn_blocking(move || SymbolTreeIndex::load(&load_path))
                .await
                .map_err(FinderError::from)
        })
        .await?;

        match loaded {
            Ok(index)
                if index.checksum() == reference.checksum()
                    && index.is_fresh(self.config.max_index_age_hours) =>
            {
                Ok(Some(index))
            }
            Ok(_) => {
                tracing::debug!(path = %path.display(), "persisted symbol index is stale");
                Ok(None)
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable symbol index");
                Ok(None)
            }
        }
    }

    async fn build(
        &self,
        reference: &MetadataReference,
        cancel: &CancellationToken,
    ) -> Result<Option<SymbolTreeIndex>> {
        let source = reference.clone();
        let built = run_cancellable(cancel, async move {
            tokio::task::spawn_blocking(move || SymbolTreeIndex::from_reference(&source))
                .await
                .map_err(FinderError::from)
        })
        .await?;

        let index = match built {
            Ok(index) => index,
            Err(err) => {
                tracing::warn!(
                    reference = %reference.path().display(),
                    error = %err,
                    "cannot index metadata reference"
                );
                return Ok(None);
            }
        };
        tracing::info!(
            reference = %reference.path().display(),
            entries = index.len(),
            "built symbol index"
        );

        if self.config.persist_indexes {
            if let Some(path) = self.index_path(reference) {
                if let Err(err) = index.save(&path) {
                    tracing::warn!(path = %path.display(), error = %err, "failed to persist symbol index");
                }
            }
        }
        Ok(Some(index))
    }
}

impl Default for SymbolIndexService {
    fn default() -> Self {
        Self::new(FinderConfig::default())
    }
}

/// Get the symbol index for `reference` through the solution's index service.
///
/// `Ok(None)` means "nothing to search": the image is unreadable or, with
/// `load_only`, no index exists yet.
pub async fn try_get_index_for_reference(
    solution: &Solution,
    reference: &MetadataReference,
    load_only: bool,
    cancel: &CancellationToken,
) -> Result<Option<Arc<SymbolTreeIndex>>> {
    solution
        .index_service()
        .get_index(reference, load_only, cancel)
        .await
}
