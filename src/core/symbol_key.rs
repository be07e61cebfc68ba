//! Compilation-independent symbol keys
//!
//! A [`SymbolKey`] records the path from the global namespace down to a
//! symbol as (name, kind, arity) segments. Resolving the key walks the same
//! path in another compilation, which finds "the same" declaration there or
//! nothing at all.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::compilation::{AssemblySymbol, Compilation};
use crate::core::symbols::{Symbol, SymbolKind};

/// One step of a symbol key path
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeySegment {
    pub name: String,
    pub kind: SymbolKind,
    pub arity: u32,
    /// Which of several same-named declarations of the same kind and arity
    /// in one container (0 = first)
    #[serde(default)]
    pub ordinal: u32,
}

impl KeySegment {
    pub fn new(name: impl Into<String>, kind: SymbolKind, arity: u32) -> Self {
        Self {
            name: name.into(),
            kind,
            arity,
            ordinal: 0,
        }
    }

    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = ordinal;
        self
    }
}

/// Structural fingerprint of a symbol's identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SymbolKey {
    segments: Vec<KeySegment>,
}

impl SymbolKey {
    /// Compute the key of `symbol`. Global namespaces have an empty path.
    pub fn create(symbol: &Symbol) -> Self {
        let mut segments = Vec::new();
        let mut current = Some(symbol);
        while let Some(s) = current {
            if s.is_global_namespace() {
                break;
            }
            segments.push(KeySegment {
                name: s.name().to_string(),
                kind: s.kind(),
                arity: s.arity(),
                ordinal: s.ordinal(),
            });
            current = s.container();
        }
        segments.reverse();
        Self { segments }
    }

    pub fn from_segments(segments: Vec<KeySegment>) -> Self {
        Self { segments }
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.segments
    }

    /// Find the equivalent symbol in `compilation`.
    ///
    /// Namespaces resolve to the compilation's merged namespaces; types and
    /// members resolve to the matching declaration at the segment's ordinal,
    /// counted in assembly order.
    pub fn resolve(&self, compilation: &Compilation) -> Option<Symbol> {
        let mut current = compilation.global_namespace().clone();
        for segment in &self.segments {
            current = compilation
                .members_of(&current)
                .iter()
                .filter(|m| matches_segment(m, segment))
                .nth(segment.ordinal as usize)?
                .clone();
        }
        Some(current)
    }

    /// Find the equivalent symbol declared by `assembly` alone
    pub fn resolve_in_assembly(&self, assembly: &AssemblySymbol) -> Option<Symbol> {
        let mut current = assembly.global_namespace().clone();
        for segment in &self.segments {
            current = assembly
                .find_member(
                    &current,
                    &segment.name,
                    segment.kind,
                    segment.arity,
                    segment.ordinal,
                )?
                .clone();
        }
        Some(current)
    }
}

fn matches_segment(symbol: &Symbol, segment: &KeySegment) -> bool {
    symbol.name() == segment.name && symbol.kind() == segment.kind && symbol.arity() == segment.arity
}

impl fmt::Display for SymbolKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            f.write_str(&segment.name)?;
            if segment.arity > 0 {
                write!(f, "`{}", segment.arity)?;
            }
            if segment.ordinal > 0 {
                write!(f, "#{}", segment.ordinal)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::metadata::MetadataReference;
    use crate::core::symbols::Declaration;

    fn document() -> Vec<Declaration> {
        vec![Declaration::namespace("App").with_child(
            Declaration::class("List")
                .with_arity(1)
                .with_child(Declaration::method("Add")),
        )]
    }

    fn find<'a>(compilation: &'a Compilation, name: &str) -> &'a Symbol {
        compilation
            .source_assembly()
            .declared_symbols()
            .iter()
            .find(|s| s.name() == name)
            .unwrap()
    }

    #[test]
    fn test_key_path() {
        let compilation = Compilation::builder("App").with_document(document()).build();
        let key = SymbolKey::create(find(&compilation, "Add"));
        assert_eq!(key.to_string(), "App.List`1.Add");
        assert_eq!(key.segments().len(), 3);
    }

    #[test]
    fn test_resolve_into_other_compilation() {
        let first = Compilation::builder("App").with_document(document()).build();
        let second = Compilation::builder("App").with_document(document()).build();

        let original = find(&first, "Add");
        let resolved = SymbolKey::create(original).resolve(&second).unwrap();
        assert_ne!(&resolved, original);
        assert!(second.owns(&resolved));
        assert_eq!(resolved.qualified_name(), "App.List.Add");
    }

    #[test]
    fn test_resolve_in_same_compilation_is_identity() {
        let compilation = Compilation::builder("App").with_document(document()).build();
        let add = find(&compilation, "Add");
        assert_eq!(SymbolKey::create(add).resolve(&compilation).as_ref(), Some(add));
    }

    #[test]
    fn test_resolve_fails_on_arity_mismatch() {
        let first = Compilation::builder("App").with_document(document()).build();
        let second = Compilation::builder("App")
            .with_document(vec![Declaration::namespace("App").with_child(
                Declaration::class("List").with_child(Declaration::method("Add")),
            )])
            .build();
        assert!(SymbolKey::create(find(&first, "Add")).resolve(&second).is_none());
    }

    #[test]
    fn test_namespace_resolves_to_merged_namespace() {
        let compilation = Compilation::builder("App").with_document(document()).build();
        let resolved = SymbolKey::create(find(&compilation, "App"))
            .resolve(&compilation)
            .unwrap();
        assert_eq!(
            Some(resolved.clone()),
            compilation.get_compilation_namespace(&resolved)
        );
    }

    #[test]
    fn test_resolve_through_metadata_assembly() {
        let reference = MetadataReference::from_declarations(
            "ref/Lib.dll",
            "Lib",
            vec![Declaration::namespace("Lib").with_child(Declaration::class("Widget"))],
        )
        .unwrap();
        let compilation = Compilation::builder("App")
            .with_reference(reference.clone())
            .build();
        let assembly = compilation.assembly_for_reference(&reference).unwrap();

        let key = SymbolKey::from_segments(vec![
            KeySegment::new("Lib", SymbolKind::Namespace, 0),
            KeySegment::new("Widget", SymbolKind::Class, 0),
        ]);
        let in_assembly = key.resolve_in_assembly(assembly).unwrap();
        let in_compilation = key.resolve(&compilation).unwrap();
        assert_eq!(in_assembly, in_compilation);
        assert!(key.resolve_in_assembly(compilation.source_assembly()).is_none());
    }

    #[test]
    fn test_key_serializes() {
        let compilation = Compilation::builder("App").with_document(document()).build();
        let key = SymbolKey::create(find(&compilation, "List"));
        let json = serde_json::to_string(&key).unwrap();
        let back: SymbolKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, back);
    }

    fn overloads() -> Vec<Declaration> {
        vec![Declaration::class("Console")
            .with_child(Declaration::method("WriteLine"))
            .with_child(Declaration::method("Flush"))
            .with_child(Declaration::method("WriteLine"))]
    }

    fn write_lines(compilation: &Compilation) -> Vec<Symbol> {
        compilation
            .source_assembly()
            .declared_symbols()
            .iter()
            .filter(|s| s.name() == "WriteLine")
            .cloned()
            .collect()
    }

    #[test]
    fn test_overloads_get_distinct_keys() {
        let compilation = Compilation::builder("App").with_document(overloads()).build();
        let lines = write_lines(&compilation);
        let keys: Vec<SymbolKey> = lines.iter().map(SymbolKey::create).collect();

        assert_ne!(keys[0], keys[1]);
        assert_eq!(keys[1].to_string(), "Console.WriteLine#1");
        for (symbol, key) in lines.iter().zip(&keys) {
            assert_eq!(key.resolve(&compilation).as_ref(), Some(symbol));
            assert_eq!(
                key.resolve_in_assembly(compilation.source_assembly()).as_ref(),
                Some(symbol)
            );
        }
    }

    #[test]
    fn test_overloads_translate_one_to_one() {
        let first = Compilation::builder("App").with_document(overloads()).build();
        let second = Compilation::builder("App").with_document(overloads()).build();

        let translated: Vec<Symbol> = write_lines(&first)
            .iter()
            .map(|s| SymbolKey::create(s).resolve(&second).unwrap())
            .collect();
        assert_eq!(translated, write_lines(&second));
    }

    #[test]
    fn test_missing_overload_does_not_resolve() {
        let full = Compilation::builder("App").with_document(overloads()).build();
        let single = Compilation::builder("App")
            .with_document(vec![
                Declaration::class("Console").with_child(Declaration::method("WriteLine"))
            ])
            .build();

        let lines = write_lines(&full);
        assert!(SymbolKey::create(&lines[0]).resolve(&single).is_some());
        assert!(SymbolKey::create(&lines[1]).resolve(&single).is_none());
    }
}
