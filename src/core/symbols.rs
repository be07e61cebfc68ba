//! Symbol model
//!
//! A [`Symbol`] is a handle to one declared entity inside one [`Compilation`].
//! Handles are cheap to clone and compare by identity: two compilations of the
//! same source produce two distinct, non-interchangeable symbols.
//!
//! [`Declaration`] trees are the compilation-independent input both source
//! documents and metadata images are made of.
//!
//! [`Compilation`]: crate::core::compilation::Compilation

use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

static NEXT_COMPILATION_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a compilation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CompilationId(u64);

impl CompilationId {
    /// Allocate a fresh id
    pub fn next() -> Self {
        Self(NEXT_COMPILATION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for CompilationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "compilation#{}", self.0)
    }
}

/// Index of a symbol within its compilation's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SymbolId(pub(crate) u32);

/// Closed set of symbol kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SymbolKind {
    Namespace,
    Class,
    Struct,
    Interface,
    Enum,
    Delegate,
    Method,
    Property,
    Event,
    Field,
    TypeParameter,
    Alias,
}

impl SymbolKind {
    /// Human-readable description
    pub fn as_str(self) -> &'static str {
        match self {
            SymbolKind::Namespace => "namespace",
            SymbolKind::Class => "class",
            SymbolKind::Struct => "struct",
            SymbolKind::Interface => "interface",
            SymbolKind::Enum => "enum",
            SymbolKind::Delegate => "delegate",
            SymbolKind::Method => "method",
            SymbolKind::Property => "property",
            SymbolKind::Event => "event",
            SymbolKind::Field => "field",
            SymbolKind::TypeParameter => "type parameter",
            SymbolKind::Alias => "alias",
        }
    }

    /// Any named-type kind
    pub fn is_type(self) -> bool {
        matches!(
            self,
            SymbolKind::Class
                | SymbolKind::Struct
                | SymbolKind::Interface
                | SymbolKind::Enum
                | SymbolKind::Delegate
        )
    }

    /// The non-type members a declaration search can return.
    /// Type parameters and aliases are deliberately not part of this set.
    pub fn is_member(self) -> bool {
        matches!(
            self,
            SymbolKind::Method | SymbolKind::Property | SymbolKind::Event | SymbolKind::Field
        )
    }

    pub fn is_namespace(self) -> bool {
        self == SymbolKind::Namespace
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a namespace symbol lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceExtent {
    /// Declared by one assembly (source or metadata), identified by ordinal
    Assembly(u32),
    /// The merged namespace of a whole compilation
    Compilation,
}

#[derive(Debug)]
pub(crate) struct SymbolData {
    pub(crate) compilation: CompilationId,
    pub(crate) id: SymbolId,
    pub(crate) name: String,
    pub(crate) kind: SymbolKind,
    pub(crate) arity: u32,
    pub(crate) ordinal: u32,
    pub(crate) container: Option<Symbol>,
    pub(crate) assembly: Option<u32>,
    pub(crate) implicitly_declared: bool,
    pub(crate) accessor: bool,
}

/// Handle to a declared entity owned by one compilation
#[derive(Clone)]
pub struct Symbol(pub(crate) Arc<SymbolData>);

impl Symbol {
    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn kind(&self) -> SymbolKind {
        self.0.kind
    }

    /// Generic arity (0 for non-generic declarations)
    pub fn arity(&self) -> u32 {
        self.0.arity
    }

    /// Position among earlier siblings with the same name, kind and arity
    /// (0 unless the container repeats the declaration, e.g. overloads)
    pub fn ordinal(&self) -> u32 {
        self.0.ordinal
    }

    pub fn id(&self) -> SymbolId {
        self.0.id
    }

    /// The compilation that produced this symbol
    pub fn compilation_id(&self) -> CompilationId {
        self.0.compilation
    }

    /// Containing symbol; `None` only for global namespaces
    pub fn container(&self) -> Option<&Symbol> {
        self.0.container.as_ref()
    }

    /// Ordinal of the declaring assembly; `None` for merged namespaces
    pub fn assembly_ordinal(&self) -> Option<u32> {
        self.0.assembly
    }

    /// Compiler-synthesized (e.g. default constructors)
    pub fn is_implicitly_declared(&self) -> bool {
        self.0.implicitly_declared
    }

    /// Property or event accessor method
    pub fn is_accessor(&self) -> bool {
        self.0.accessor
    }

    pub fn is_global_namespace(&self) -> bool {
        self.0.kind == SymbolKind::Namespace && self.0.container.is_none()
    }

    pub fn namespace_extent(&self) -> Option<NamespaceExtent> {
        if self.0.kind != SymbolKind::Namespace {
            return None;
        }
        Some(match self.0.assembly {
            Some(ordinal) => NamespaceExtent::Assembly(ordinal),
            None => NamespaceExtent::Compilation,
        })
    }

    /// Dotted name from the outermost non-global container down to this symbol
    pub fn qualified_name(&self) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let mut current = Some(self);
        while let Some(symbol) = current {
            if symbol.is_global_namespace() {
                break;
            }
            parts.push(symbol.name());
            current = symbol.container();
        }
        parts.reverse();
        parts.join(".")
    }
}

impl PartialEq for Symbol {
    fn eq(&self, other: &Self) -> bool {
        self.0.compilation == other.0.compilation && self.0.id == other.0.id
    }
}

impl Eq for Symbol {}

impl Hash for Symbol {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.compilation.hash(state);
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Symbol")
            .field("name", &self.qualified_name())
            .field("kind", &self.0.kind)
            .field("compilation", &self.0.compilation)
            .field("id", &self.0.id.0)
            .finish()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.0.kind, self.qualified_name())
    }
}

/// A compilation-independent declaration node
///
/// Source documents and metadata images are both sequences of these trees.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub kind: SymbolKind,
    #[serde(default)]
    pub arity: u32,
    #[serde(default)]
    pub implicitly_declared: bool,
    #[serde(default)]
    pub accessor: bool,
    #[serde(default)]
    pub children: Vec<Declaration>,
}

impl Declaration {
    pub fn new(name: impl Into<String>, kind: SymbolKind) -> Self {
        Self {
            name: name.into(),
            kind,
            arity: 0,
            implicitly_declared: false,
            accessor: false,
            children: Vec::new(),
        }
    }

    pub fn namespace(name: impl Into<String>) -> Self {
        Self::new(name, SymbolKind::Namespace)
    }

    pub fn class(name: impl Into<String>) -> Self {
        Self::new(name, SymbolKind::Class)
    }

    pub fn method(name: impl Into<String>) -> Self {
        Self::new(name, SymbolKind::Method)
    }

    pub fn with_arity(mut self, arity: u32) -> Self {
        self.arity = arity;
        self
    }

    pub fn implicit(mut self) -> Self {
        self.implicitly_declared = true;
        self
    }

    pub fn accessor(mut self) -> Self {
        self.accessor = true;
        self
    }

    pub fn with_child(mut self, child: Declaration) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Declaration>) -> Self {
        self.children.extend(children);
        self
    }

    /// Visit this node and all descendants in pre-order
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Declaration)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}
