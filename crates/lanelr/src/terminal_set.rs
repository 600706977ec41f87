//! Lookahead contexts.

use crate::{
    digraph,
    grammar::{Grammar, TerminalID},
    util::{display_fn, display_joined},
};
use std::{fmt, hash::Hash};

/// A set of terminal symbols, iterated in increasing symbol order.
#[derive(Default, Clone)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}

impl TerminalSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.index())
    }

    /// Returns `true` if `id` was not yet present.
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.index())
    }

    pub fn remove(&mut self, id: TerminalID) -> bool {
        self.inner.remove(id.index())
    }

    /// Add every terminal in `other`. Returns `true` if the set grew.
    pub fn union_with(&mut self, other: &Self) -> bool {
        let before = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() != before
    }

    pub fn intersect_with(&mut self, other: &Self) {
        self.inner.intersect_with(&other.inner)
    }

    pub fn difference_with(&mut self, other: &Self) {
        self.inner.difference_with(&other.inner)
    }

    pub fn intersection(&self, other: &Self) -> Self {
        let mut result = self.clone();
        result.intersect_with(other);
        result
    }

    pub fn is_disjoint(&self, other: &Self) -> bool {
        self.inner.is_disjoint(&other.inner)
    }

    pub fn is_subset(&self, other: &Self) -> bool {
        self.inner.is_subset(&other.inner)
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn clear(&mut self) {
        self.inner.clear()
    }

    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner.iter().filter_map(TerminalID::from_index)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let names: Vec<_> = self.iter().map(|t| &g.terminals[&t]).collect();
            write!(f, "[{}]", display_joined(&names))?;
            Ok(())
        })
    }
}

impl PartialEq for TerminalSet {
    fn eq(&self, other: &Self) -> bool {
        self.inner.iter().eq(other.inner.iter())
    }
}
impl Eq for TerminalSet {}

impl Hash for TerminalSet {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        for raw in self.inner.iter() {
            raw.hash(state);
        }
    }
}

impl fmt::Debug for TerminalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.inner.iter()).finish()
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(TerminalID::index).collect(),
        }
    }
}

impl Extend<TerminalID> for TerminalSet {
    fn extend<I: IntoIterator<Item = TerminalID>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}

impl digraph::Set for TerminalSet {
    fn union_with(&mut self, other: &Self) -> bool {
        self.union_with(other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::SymbolID;

    fn set(raw: &[usize]) -> TerminalSet {
        raw.iter().filter_map(|&i| TerminalID::from_index(i)).collect()
    }

    #[test]
    fn union_reports_growth() {
        let mut a = set(&[0, 3]);
        assert!(!a.union_with(&set(&[3])));
        assert!(a.union_with(&set(&[2, 3])));
        assert_eq!(a.iter().map(TerminalID::index).collect::<Vec<_>>(), [0, 2, 3]);
    }

    #[test]
    fn display_lists_terminal_names() {
        let g = Grammar::define(|g| {
            let a = g.terminal("A", None)?;
            let plus = g.quoted_terminal("+", None)?;
            let s = g.nonterminal("S")?;
            g.rule(s, [SymbolID::T(a), SymbolID::T(plus)], None)?;
            Ok(())
        })
        .unwrap();
        let a = g.terminal_by_name("A").unwrap();
        let plus = g.terminal_by_name("+").unwrap();

        let context: TerminalSet = [a, plus, TerminalID::EOI].into_iter().collect();
        assert_eq!(context.display(&g).to_string(), "[$end A '+']");
        assert_eq!(TerminalSet::new().display(&g).to_string(), "[]");
    }

    #[test]
    fn equality_ignores_capacity() {
        let mut a = set(&[1, 40]);
        a.remove(TerminalID::from_index(40).unwrap());
        assert_eq!(a, set(&[1]));
        assert!(a.is_subset(&set(&[1, 2])));
        assert!(a.is_disjoint(&set(&[2])));
    }
}
