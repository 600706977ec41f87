//! Calculation of FIRST sets and `THEADS`.

use crate::{
    digraph::digraph,
    grammar::{Grammar, SymbolID},
    terminal_set::TerminalSet,
};

#[derive(Debug)]
pub struct FirstSets {
    /// indexed by `NonterminalID::index`.
    first: Vec<TerminalSet>,
    nullable: Vec<bool>,
}

impl FirstSets {
    #[tracing::instrument(skip_all)]
    pub fn new(g: &Grammar) -> Self {
        let len = g.nonterminals.len();
        let mut first = vec![TerminalSet::default(); len];
        let mut edges = vec![vec![]; len];
        let mut nullable = vec![false; len];
        for n in g.nonterminals.keys() {
            nullable[n.index()] = g.is_nullable(*n);
        }

        // For `X -> Y1 Y2 ... Yn`, scan Y1, Y2, ... up to the first
        // non-nullable symbol Yk. Each terminal among them is in First(X),
        // and First(X) includes First(Yi) of each nonterminal among them.
        for rule in g.rules.values() {
            let x = rule.left().index();
            for symbol in rule.right() {
                match symbol {
                    SymbolID::T(t) => {
                        first[x].insert(*t);
                        break;
                    }
                    SymbolID::N(n) => {
                        if n.index() != x && !edges[x].contains(&n.index()) {
                            edges[x].push(n.index());
                        }
                        if !nullable[n.index()] {
                            break;
                        }
                    }
                }
            }
        }

        digraph(&mut first, &edges);

        Self { first, nullable }
    }

    /// `THEADS(symbols)`: the terminals that can begin a string derived
    /// from `symbols`, added into `out`.
    ///
    /// Returns `true` if the whole of `symbols` can vanish.
    pub fn theads_into(&self, symbols: &[SymbolID], out: &mut TerminalSet) -> bool {
        for symbol in symbols {
            match symbol {
                SymbolID::T(t) => {
                    out.insert(*t);
                    return false;
                }
                SymbolID::N(n) => {
                    out.union_with(&self.first[n.index()]);
                    if !self.nullable[n.index()] {
                        return false;
                    }
                }
            }
        }
        true
    }

    pub fn theads(&self, symbols: &[SymbolID]) -> (TerminalSet, bool) {
        let mut out = TerminalSet::default();
        let vanishable = self.theads_into(symbols, &mut out);
        (out, vanishable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{SymbolID::*, TerminalID};

    #[test]
    fn theads_through_nullables() {
        // S -> A B c ; A -> a | %empty ; B -> A b | %empty
        let grammar = Grammar::define(|g| {
            let a = g.terminal("a", None)?;
            let b = g.terminal("b", None)?;
            let c = g.terminal("c", None)?;
            let s = g.nonterminal("S")?;
            let a_ = g.nonterminal("A")?;
            let b_ = g.nonterminal("B")?;
            g.rule(s, [N(a_), N(b_), T(c)], None)?;
            g.rule(a_, [T(a)], None)?;
            g.rule(a_, [], None)?;
            g.rule(b_, [N(a_), T(b)], None)?;
            g.rule(b_, [], None)?;
            Ok(())
        })
        .unwrap();
        let first = FirstSets::new(&grammar);

        let t = |name| grammar.terminal_by_name(name).unwrap();
        let n = |name| N(grammar.nonterminal_by_name(name).unwrap());

        let (set, vanish) = first.theads(&[n("S")]);
        assert!(!vanish);
        assert_eq!(set, [t("a"), t("b"), t("c")].into_iter().collect());

        let (set, vanish) = first.theads(&[n("A"), n("B")]);
        assert!(vanish);
        assert_eq!(set, [t("a"), t("b")].into_iter().collect());

        let (set, vanish) = first.theads(&[]);
        assert!(vanish);
        assert!(set.is_empty());
        assert!(!set.contains(TerminalID::EOI));
    }
}
