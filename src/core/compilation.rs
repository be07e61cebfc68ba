//! Compilations and assemblies
//!
//! A [`Compilation`] owns every symbol it produced: the declarations of its
//! source assembly and of each readable metadata reference. Namespaces are
//! merged twice: once per assembly (the same namespace declared in several
//! documents is one symbol) and once per compilation (the same namespace
//! declared by several assemblies is one canonical symbol).

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::core::cancel::check_cancelled;
use crate::core::error::Result;
use crate::core::filter::SymbolFilter;
use crate::core::metadata::MetadataReference;
use crate::core::query::SearchQuery;
use crate::core::symbols::{
    CompilationId, Declaration, NamespaceExtent, Symbol, SymbolData, SymbolId, SymbolKind,
};

/// How often the name scan polls the cancellation token
const CANCELLATION_POLL_INTERVAL: usize = 256;

/// Where an assembly came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyOrigin {
    /// Built from the project's documents
    Source,
    /// Read from a metadata reference
    Metadata { checksum: String },
}

/// One assembly as seen by one compilation
pub struct AssemblySymbol {
    compilation: CompilationId,
    ordinal: u32,
    name: String,
    origin: AssemblyOrigin,
    global_namespace: Symbol,
    declared: Vec<Symbol>,
    members: HashMap<SymbolId, Vec<Symbol>>,
}

impl AssemblySymbol {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ordinal(&self) -> u32 {
        self.ordinal
    }

    pub fn origin(&self) -> &AssemblyOrigin {
        &self.origin
    }

    pub fn compilation_id(&self) -> CompilationId {
        self.compilation
    }

    /// The assembly-level global namespace
    pub fn global_namespace(&self) -> &Symbol {
        &self.global_namespace
    }

    /// Every declared symbol in declaration (pre-order) order, excluding the
    /// global namespace
    pub fn declared_symbols(&self) -> &[Symbol] {
        &self.declared
    }

    /// Direct members of a symbol declared by this assembly
    pub fn members_of(&self, container: &Symbol) -> &[Symbol] {
        if container.compilation_id() != self.compilation {
            return &[];
        }
        self.members
            .get(&container.id())
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Find a direct member by name, kind and arity. `ordinal` picks among
    /// repeated declarations (0 = first).
    pub fn find_member(
        &self,
        container: &Symbol,
        name: &str,
        kind: SymbolKind,
        arity: u32,
        ordinal: u32,
    ) -> Option<&Symbol> {
        self.members_of(container)
            .iter()
            .filter(|m| m.name() == name && m.kind() == kind && m.arity() == arity)
            .nth(ordinal as usize)
    }
}

impl fmt::Debug for AssemblySymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssemblySymbol")
            .field("name", &self.name)
            .field("ordinal", &self.ordinal)
            .field("compilation", &self.compilation)
            .field("origin", &self.origin)
            .field("symbols", &self.declared.len())
            .finish()
    }
}

/// The semantic model of one project: source assembly plus references
pub struct Compilation {
    id: CompilationId,
    assemblies: Vec<Arc<AssemblySymbol>>,
    reference_ordinals: HashMap<String, u32>,
    global_namespace: Symbol,
    merged_members: HashMap<SymbolId, Vec<Symbol>>,
    merged_by_name: HashMap<String, Symbol>,
}

impl Compilation {
    /// Start building a compilation whose source assembly is `assembly_name`
    pub fn builder(assembly_name: impl Into<String>) -> CompilationBuilder {
        CompilationBuilder::new(assembly_name)
    }

    pub fn id(&self) -> CompilationId {
        self.id
    }

    /// The assembly built from source
    pub fn source_assembly(&self) -> &Arc<AssemblySymbol> {
        &self.assemblies[0]
    }

    /// Assemblies built from metadata references, in reference order
    pub fn referenced_assemblies(&self) -> &[Arc<AssemblySymbol>] {
        &self.assemblies[1..]
    }

    pub fn assembly(&self, ordinal: u32) -> Option<&Arc<AssemblySymbol>> {
        self.assemblies.get(ordinal as usize)
    }

    /// The assembly this compilation built for `reference`, if it was readable
    pub fn assembly_for_reference(
        &self,
        reference: &MetadataReference,
    ) -> Option<&Arc<AssemblySymbol>> {
        let ordinal = self.reference_ordinals.get(&reference_key(reference))?;
        self.assembly(*ordinal)
    }

    /// The merged global namespace
    pub fn global_namespace(&self) -> &Symbol {
        &self.global_namespace
    }

    /// True if `symbol` was produced by this compilation
    pub fn owns(&self, symbol: &Symbol) -> bool {
        symbol.compilation_id() == self.id
    }

    /// Direct members of any symbol owned by this compilation.
    /// Merged namespaces list child namespaces and the types of every assembly.
    pub fn members_of(&self, container: &Symbol) -> &[Symbol] {
        if !self.owns(container) {
            return &[];
        }
        match container.namespace_extent() {
            Some(NamespaceExtent::Compilation) => self
                .merged_members
                .get(&container.id())
                .map(Vec::as_slice)
                .unwrap_or(&[]),
            _ => container
                .assembly_ordinal()
                .and_then(|ordinal| self.assembly(ordinal))
                .map(|assembly| assembly.members_of(container))
                .unwrap_or(&[]),
        }
    }

    /// The canonical merged namespace for `namespace`, which may come from
    /// any assembly or even another compilation. `None` for non-namespaces
    /// and for namespaces this compilation does not contain.
    pub fn get_compilation_namespace(&self, namespace: &Symbol) -> Option<Symbol> {
        if namespace.kind() != SymbolKind::Namespace {
            return None;
        }
        if self.owns(namespace) && namespace.namespace_extent() == Some(NamespaceExtent::Compilation)
        {
            return Some(namespace.clone());
        }
        self.merged_by_name.get(&namespace.qualified_name()).cloned()
    }

    /// Source declarations whose name satisfies `query`, restricted to the
    /// candidate kinds `filter` can select, in declaration order.
    ///
    /// The restriction is coarse: every non-namespace, non-type kind is a
    /// member candidate. Precise filtering is left to the criteria evaluator.
    pub fn get_symbols_with_name(
        &self,
        query: &SearchQuery,
        filter: SymbolFilter,
        cancel: &CancellationToken,
    ) -> Result<Vec<Symbol>> {
        let mut found = Vec::new();
        for (i, symbol) in self.source_assembly().declared_symbols().iter().enumerate() {
            if i % CANCELLATION_POLL_INTERVAL == 0 {
                check_cancelled(cancel)?;
            }
            if is_candidate_kind(symbol.kind(), filter) && query.matches_name(symbol.name()) {
                found.push(symbol.clone());
            }
        }
        Ok(found)
    }
}

impl fmt::Debug for Compilation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compilation")
            .field("id", &self.id)
            .field("assemblies", &self.assemblies)
            .finish()
    }
}

fn is_candidate_kind(kind: SymbolKind, filter: SymbolFilter) -> bool {
    if kind.is_namespace() {
        filter.contains(SymbolFilter::NAMESPACE)
    } else if kind.is_type() {
        filter.contains(SymbolFilter::TYPE)
    } else {
        filter.contains(SymbolFilter::MEMBER)
    }
}

fn reference_key(reference: &MetadataReference) -> String {
    format!("{}#{}", reference.path().display(), reference.checksum())
}

/// Builds a [`Compilation`] from declaration trees
pub struct CompilationBuilder {
    assembly_name: String,
    documents: Vec<Vec<Declaration>>,
    references: Vec<MetadataReference>,
}

impl CompilationBuilder {
    pub fn new(assembly_name: impl Into<String>) -> Self {
        Self {
            assembly_name: assembly_name.into(),
            documents: Vec::new(),
            references: Vec::new(),
        }
    }

    /// Add the top-level declarations of one source document
    pub fn with_document(mut self, declarations: Vec<Declaration>) -> Self {
        self.documents.push(declarations);
        self
    }

    pub fn with_reference(mut self, reference: MetadataReference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn with_references(mut self, references: impl IntoIterator<Item = MetadataReference>) -> Self {
        self.references.extend(references);
        self
    }

    /// Build the compilation. Unreadable references are skipped.
    pub fn build(self) -> Compilation {
        let id = CompilationId::next();
        let mut arena = Arena { compilation: id, next_id: 0 };

        let mut assemblies = Vec::with_capacity(1 + self.references.len());
        let mut reference_ordinals = HashMap::new();

        let source_roots: Vec<&Declaration> = self.documents.iter().flatten().collect();
        assemblies.push(Arc::new(build_assembly(
            &mut arena,
            0,
            self.assembly_name,
            AssemblyOrigin::Source,
            &source_roots,
        )));

        for reference in &self.references {
            let image = match reference.read_image() {
                Ok(image) => image,
                Err(err) => {
                    tracing::warn!(
                        reference = %reference.path().display(),
                        error = %err,
                        "skipping unreadable metadata reference"
                    );
                    continue;
                }
            };
            let ordinal = assemblies.len() as u32;
            let roots: Vec<&Declaration> = image.declarations.iter().collect();
            assemblies.push(Arc::new(build_assembly(
                &mut arena,
                ordinal,
                image.assembly_name,
                AssemblyOrigin::Metadata {
                    checksum: reference.checksum().to_string(),
                },
                &roots,
            )));
            reference_ordinals.insert(reference_key(reference), ordinal);
        }

        let mut merger = NamespaceMerger::new(&mut arena);
        let merged_global = merger.global.clone();
        for assembly in &assemblies {
            merger.merge(assembly, assembly.global_namespace(), &merged_global);
        }

        Compilation {
            id,
            global_namespace: merger.global,
            merged_members: merger.members,
            merged_by_name: merger.by_name,
            assemblies,
            reference_ordinals,
        }
    }
}

struct Arena {
    compilation: CompilationId,
    next_id: u32,
}

impl Arena {
    #[allow(clippy::too_many_arguments)]
    fn alloc(
        &mut self,
        name: &str,
        kind: SymbolKind,
        arity: u32,
        ordinal: u32,
        container: Option<Symbol>,
        assembly: Option<u32>,
        implicitly_declared: bool,
        accessor: bool,
    ) -> Symbol {
        let id = SymbolId(self.next_id);
        self.next_id += 1;
        Symbol(Arc::new(SymbolData {
            compilation: self.compilation,
            id,
            name: name.to_string(),
            kind,
            arity,
            ordinal,
            container,
            assembly,
            implicitly_declared,
            accessor,
        }))
    }
}

fn build_assembly(
    arena: &mut Arena,
    ordinal: u32,
    name: String,
    origin: AssemblyOrigin,
    roots: &[&Declaration],
) -> AssemblySymbol {
    let global = arena.alloc("", SymbolKind::Namespace, 0, 0, None, Some(ordinal), false, false);
    let mut builder = AssemblyTables {
        arena,
        ordinal,
        declared: Vec::new(),
        members: HashMap::new(),
        namespaces: HashMap::new(),
        sibling_counts: HashMap::new(),
    };
    for decl in roots {
        builder.add(&global, decl);
    }
    let AssemblyTables { declared, members, .. } = builder;

    AssemblySymbol {
        compilation: global.compilation_id(),
        ordinal,
        name,
        origin,
        global_namespace: global,
        declared,
        members,
    }
}

struct AssemblyTables<'a> {
    arena: &'a mut Arena,
    ordinal: u32,
    declared: Vec<Symbol>,
    members: HashMap<SymbolId, Vec<Symbol>>,
    namespaces: HashMap<(SymbolId, String), Symbol>,
    /// Declarations seen so far per (container, name, kind, arity)
    sibling_counts: HashMap<(SymbolId, String, SymbolKind, u32), u32>,
}

impl AssemblyTables<'_> {
    fn add(&mut self, container: &Symbol, decl: &Declaration) {
        let symbol = if decl.kind == SymbolKind::Namespace {
            let key = (container.id(), decl.name.clone());
            match self.namespaces.get(&key) {
                Some(existing) => existing.clone(),
                None => {
                    let symbol = self.new_symbol(container, decl);
                    self.namespaces.insert(key, symbol.clone());
                    symbol
                }
            }
        } else {
            self.new_symbol(container, decl)
        };

        for child in &decl.children {
            self.add(&symbol, child);
        }
    }

    fn new_symbol(&mut self, container: &Symbol, decl: &Declaration) -> Symbol {
        let count = self
            .sibling_counts
            .entry((container.id(), decl.name.clone(), decl.kind, decl.arity))
            .or_insert(0);
        let sibling_ordinal = *count;
        *count += 1;

        let symbol = self.arena.alloc(
            &decl.name,
            decl.kind,
            decl.arity,
            sibling_ordinal,
            Some(container.clone()),
            Some(self.ordinal),
            decl.implicitly_declared,
            decl.accessor,
        );
        self.declared.push(symbol.clone());
        self.members
            .entry(container.id())
            .or_default()
            .push(symbol.clone());
        symbol
    }
}

struct NamespaceMerger<'a> {
    arena: &'a mut Arena,
    global: Symbol,
    members: HashMap<SymbolId, Vec<Symbol>>,
    by_name: HashMap<String, Symbol>,
}

impl<'a> NamespaceMerger<'a> {
    fn new(arena: &'a mut Arena) -> Self {
        let global = arena.alloc("", SymbolKind::Namespace, 0, 0, None, None, false, false);
        let mut by_name = HashMap::new();
        by_name.insert(String::new(), global.clone());
        Self {
            arena,
            global,
            members: HashMap::new(),
            by_name,
        }
    }

    /// Fold one assembly namespace into its merged counterpart
    fn merge(&mut self, assembly: &AssemblySymbol, namespace: &Symbol, merged: &Symbol) {
        for member in assembly.members_of(namespace) {
            if member.kind() != SymbolKind::Namespace {
                self.members
                    .entry(merged.id())
                    .or_default()
                    .push(member.clone());
                continue;
            }
            let qualified = member.qualified_name();
            let child = match self.by_name.get(&qualified) {
                Some(existing) => existing.clone(),
                None => {
                    let child = self.arena.alloc(
                        member.name(),
                        SymbolKind::Namespace,
                        0,
                        0,
                        Some(merged.clone()),
                        None,
                        false,
                        false,
                    );
                    self.members
                        .entry(merged.id())
                        .or_default()
                        .push(child.clone());
                    self.by_name.insert(qualified, child.clone());
                    child
                }
            };
            self.merge(assembly, member, &child);
        }
    }
}
