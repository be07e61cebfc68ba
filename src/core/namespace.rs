//! Namespace identity normalization
//!
//! Namespaces are global per compilation, but collectors can surface
//! assembly-level namespace symbols (or namespaces of another compilation).
//! These functions swap each one for the compilation's canonical namespace.

use std::borrow::Cow;

use crate::core::compilation::Compilation;
use crate::core::symbols::{Symbol, SymbolKind};

fn canonical(symbol: &Symbol, compilation: &Compilation) -> Option<Symbol> {
    if symbol.kind() != SymbolKind::Namespace {
        return None;
    }
    let canonical = compilation.get_compilation_namespace(symbol)?;
    if &canonical == symbol {
        return None;
    }
    Some(canonical)
}

/// Replace namespace symbols with their canonical instance in `compilation`.
///
/// Non-namespaces pass through, as do namespaces the compilation has no
/// canonical instance for. The input is borrowed back when nothing changed.
pub fn translate_namespaces<'a>(symbols: &'a [Symbol], compilation: &Compilation) -> Cow<'a, [Symbol]> {
    let Some(first) = symbols.iter().position(|s| canonical(s, compilation).is_some()) else {
        return Cow::Borrowed(symbols);
    };

    let mut translated = symbols.to_vec();
    for symbol in &mut translated[first..] {
        if let Some(replacement) = canonical(symbol, compilation) {
            *symbol = replacement;
        }
    }
    Cow::Owned(translated)
}

/// Owned variant of [`translate_namespaces`], rewriting in place
pub fn translate_namespaces_owned(mut symbols: Vec<Symbol>, compilation: &Compilation) -> Vec<Symbol> {
    for symbol in &mut symbols {
        if let Some(replacement) = canonical(symbol, compilation) {
            *symbol = replacement;
        }
    }
    symbols
}
