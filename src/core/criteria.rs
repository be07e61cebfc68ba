//! Criteria evaluation
//!
//! Pure functions deciding whether a symbol belongs in declaration results.

use std::borrow::Cow;

use crate::core::filter::SymbolFilter;
use crate::core::symbols::{Symbol, SymbolKind};

/// True if `symbol`'s kind is selected by `filter`
pub fn meets_criteria(symbol: &Symbol, filter: SymbolFilter) -> bool {
    kind_meets_criteria(symbol.kind(), filter)
}

pub(crate) fn kind_meets_criteria(kind: SymbolKind, filter: SymbolFilter) -> bool {
    if filter.contains(SymbolFilter::NAMESPACE) && kind.is_namespace() {
        return true;
    }
    if filter.contains(SymbolFilter::TYPE) && kind.is_type() {
        return true;
    }
    filter.contains(SymbolFilter::MEMBER) && kind.is_member()
}

fn is_included(symbol: &Symbol, filter: SymbolFilter) -> bool {
    !symbol.is_implicitly_declared() && !symbol.is_accessor() && meets_criteria(symbol, filter)
}

/// Keep the symbols that pass `filter`, dropping compiler-synthesized
/// declarations and accessors regardless of the filter.
///
/// Order is preserved. The input slice is borrowed back when nothing was
/// dropped.
pub fn filter_by_criteria(symbols: &[Symbol], filter: SymbolFilter) -> Cow<'_, [Symbol]> {
    match symbols.iter().position(|s| !is_included(s, filter)) {
        None => Cow::Borrowed(symbols),
        Some(first_dropped) => {
            let mut kept = Vec::with_capacity(symbols.len() - 1);
            kept.extend_from_slice(&symbols[..first_dropped]);
            kept.extend(
                symbols[first_dropped + 1..]
                    .iter()
                    .filter(|s| is_included(s, filter))
                    .cloned(),
            );
            Cow::Owned(kept)
        }
    }
}

/// Owned variant of [`filter_by_criteria`]; returns `symbols` itself when
/// nothing was dropped.
pub fn filter_by_criteria_owned(mut symbols: Vec<Symbol>, filter: SymbolFilter) -> Vec<Symbol> {
    if symbols.iter().all(|s| is_included(s, filter)) {
        return symbols;
    }
    symbols.retain(|s| is_included(s, filter));
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::compilation::Compilation;
    use crate::core::symbols::Declaration;

    fn sample() -> Vec<Symbol> {
        let compilation = Compilation::builder("Sample")
            .with_document(vec![Declaration::namespace("App").with_child(
                Declaration::class("Widget")
                    .with_child(Declaration::method(".ctor").implicit())
                    .with_child(Declaration::new("Size", SymbolKind::Property))
                    .with_child(Declaration::method("get_Size").accessor())
                    .with_child(Declaration::new("Changed", SymbolKind::Event))
                    .with_child(Declaration::new("count", SymbolKind::Field))
                    .with_child(Declaration::new("T", SymbolKind::TypeParameter)),
            )])
            .build();
        compilation.source_assembly().declared_symbols().to_vec()
    }

    fn names(symbols: &[Symbol]) -> Vec<&str> {
        symbols.iter().map(|s| s.name()).collect()
    }

    #[test]
    fn test_meets_criteria_per_flag() {
        let symbols = sample();
        let by_name = |n: &str| symbols.iter().find(|s| s.name() == n).unwrap().clone();

        assert!(meets_criteria(&by_name("App"), SymbolFilter::NAMESPACE));
        assert!(!meets_criteria(&by_name("App"), SymbolFilter::TYPE_AND_MEMBER));
        assert!(meets_criteria(&by_name("Widget"), SymbolFilter::TYPE));
        assert!(!meets_criteria(&by_name("Widget"), SymbolFilter::MEMBER));
        assert!(meets_criteria(&by_name("Size"), SymbolFilter::MEMBER));
        assert!(!meets_criteria(&by_name("T"), SymbolFilter::ALL));
    }

    #[test]
    fn test_empty_filter_matches_nothing() {
        for symbol in sample() {
            assert!(!meets_criteria(&symbol, SymbolFilter::NONE));
        }
    }

    #[test]
    fn test_filter_drops_implicit_and_accessors() {
        let symbols = sample();
        let filtered = filter_by_criteria(&symbols, SymbolFilter::ALL);
        assert_eq!(
            names(&filtered),
            vec!["App", "Widget", "Size", "Changed", "count"]
        );
    }

    #[test]
    fn test_filter_preserves_order_for_members() {
        let symbols = sample();
        let filtered = filter_by_criteria(&symbols, SymbolFilter::MEMBER);
        assert_eq!(names(&filtered), vec!["Size", "Changed", "count"]);
    }

    #[test]
    fn test_filter_borrows_when_unchanged() {
        let symbols = sample();
        let kept: Vec<Symbol> = filter_by_criteria(&symbols, SymbolFilter::ALL).into_owned();
        assert!(matches!(
            filter_by_criteria(&kept, SymbolFilter::ALL),
            Cow::Borrowed(_)
        ));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let symbols = sample();
        for filter in [
            SymbolFilter::NAMESPACE,
            SymbolFilter::TYPE,
            SymbolFilter::MEMBER,
            SymbolFilter::TYPE_AND_MEMBER,
            SymbolFilter::ALL,
        ] {
            let once = filter_by_criteria(&symbols, filter).into_owned();
            let twice = filter_by_criteria(&once, filter).into_owned();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn test_meets_criteria_is_monotonic() {
        let symbols = sample();
        let narrow = [SymbolFilter::NAMESPACE, SymbolFilter::TYPE, SymbolFilter::MEMBER];
        for symbol in &symbols {
            for flag in narrow {
                for extra in narrow {
                    if meets_criteria(symbol, flag) {
                        assert!(meets_criteria(symbol, flag | extra));
                    }
                }
            }
        }
    }

    #[test]
    fn test_owned_variant_matches_borrowed() {
        let symbols = sample();
        let borrowed = filter_by_criteria(&symbols, SymbolFilter::TYPE_AND_MEMBER).into_owned();
        let owned = filter_by_criteria_owned(symbols, SymbolFilter::TYPE_AND_MEMBER);
        assert_eq!(borrowed, owned);
    }
}
