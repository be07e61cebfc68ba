//! Symbol filter
//!
//! A small bitset selecting which symbol categories a search may return.

use std::fmt;
use std::ops::{BitOr, BitOrAssign};

/// Set of symbol categories eligible for inclusion in results
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SymbolFilter(u8);

impl SymbolFilter {
    pub const NONE: SymbolFilter = SymbolFilter(0);
    pub const NAMESPACE: SymbolFilter = SymbolFilter(0b001);
    pub const TYPE: SymbolFilter = SymbolFilter(0b010);
    pub const MEMBER: SymbolFilter = SymbolFilter(0b100);
    pub const TYPE_AND_MEMBER: SymbolFilter = SymbolFilter(0b110);
    pub const ALL: SymbolFilter = SymbolFilter(0b111);

    /// True if every flag in `flag` is set in `self`
    pub fn contains(self, flag: SymbolFilter) -> bool {
        self.0 & flag.0 == flag.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for SymbolFilter {
    type Output = SymbolFilter;

    fn bitor(self, rhs: SymbolFilter) -> SymbolFilter {
        SymbolFilter(self.0 | rhs.0)
    }
}

impl BitOrAssign for SymbolFilter {
    fn bitor_assign(&mut self, rhs: SymbolFilter) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for SymbolFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(SymbolFilter::NAMESPACE) {
            names.push("Namespace");
        }
        if self.contains(SymbolFilter::TYPE) {
            names.push("Type");
        }
        if self.contains(SymbolFilter::MEMBER) {
            names.push("Member");
        }
        write!(f, "SymbolFilter({})", names.join(" | "))
    }
}
