//! Construction of the state graph.

use super::{
    close, compare, merge_into, successor_cores, transition_symbols, Automaton, Compatibility,
    Configuration, Core, MergeMode, Registry, StateID,
};
use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, RuleID, TerminalID},
    terminal_set::TerminalSet,
    types::Queue,
};
use bit_vec::BitVec;

/// Build the automaton of `g`, merging isocore states according to `mode`.
///
/// Successors of a state are computed one symbol at a time from its
/// current contexts. When merging grows the contexts of a state that has
/// already been expanded, the state is expanded again.
#[tracing::instrument(skip_all, fields(mode = ?mode))]
pub fn build(g: &Grammar, first: &FirstSets, mode: MergeMode) -> Automaton {
    let contexts = mode != MergeMode::LR0;

    let mut automaton = Automaton::default();
    let mut registry = Registry::default();
    let mut expanded = BitVec::new();

    let goal_context: TerminalSet = if contexts {
        [TerminalID::EOI].into_iter().collect()
    } else {
        TerminalSet::default()
    };
    let goal = Configuration::new(
        Core {
            rule: RuleID::ACCEPT,
            marker: 0,
        },
        goal_context,
        true,
    );
    let start = automaton.push_state(None, vec![goal]);
    close(g, first, automaton.state_mut(start), contexts);
    registry.insert(automaton.state(start));
    expanded.push(false);

    let mut queue = Queue::default();
    queue.push(start);

    while let Some(id) = queue.pop() {
        expanded.set(id.index(), true);

        for symbol in transition_symbols(g, automaton.state(id)) {
            let cores = successor_cores(g, automaton.state(id), symbol, contexts);

            let target = match find_isocore(mode, &automaton, &registry, &cores) {
                Some((target, Compatibility::Same)) => target,

                Some((target, _)) => {
                    let changed = merge_into(g, first, &mut automaton, target, &cores);
                    if changed && expanded[target.index()] {
                        queue.push(target);
                    }
                    target
                }

                None => {
                    let target = automaton.push_state(Some(symbol), cores);
                    close(g, first, automaton.state_mut(target), contexts);
                    registry.insert(automaton.state(target));
                    expanded.push(false);
                    queue.push(target);
                    tracing::trace!("new state {} from {} on {:?}", target, id, symbol);
                    target
                }
            };

            automaton.relink(id, symbol, target);
        }
    }

    automaton.detach_unreachable();

    tracing::debug!("built {} states", automaton.len());
    automaton
}

/// Look for a registered state that `cores` may be routed to. A state
/// with identical contexts wins over a merely compatible one.
fn find_isocore(
    mode: MergeMode,
    automaton: &Automaton,
    registry: &Registry,
    cores: &[Configuration],
) -> Option<(StateID, Compatibility)> {
    let mut compatible = None;
    for id in registry.isocores(automaton, cores) {
        match compare(mode, automaton.state(id), cores) {
            Compatibility::Same => return Some((id, Compatibility::Same)),
            Compatibility::Compatible if compatible.is_none() => compatible = Some(id),
            _ => {}
        }
    }
    compatible.map(|id| (id, Compatibility::Compatible))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{automaton::propagate_all, grammar::SymbolID::*};

    // S -> a E c | a F d | b F c | b E d ; E -> e ; F -> e
    fn non_lalr() -> Grammar {
        Grammar::define(|g| {
            let a = g.terminal("a", None)?;
            let b = g.terminal("b", None)?;
            let c = g.terminal("c", None)?;
            let d = g.terminal("d", None)?;
            let e = g.terminal("e", None)?;
            let s = g.nonterminal("S")?;
            let ne = g.nonterminal("E")?;
            let nf = g.nonterminal("F")?;
            g.rule(s, [T(a), N(ne), T(c)], None)?;
            g.rule(s, [T(a), N(nf), T(d)], None)?;
            g.rule(s, [T(b), N(nf), T(c)], None)?;
            g.rule(s, [T(b), N(ne), T(d)], None)?;
            g.rule(ne, [T(e)], None)?;
            g.rule(nf, [T(e)], None)?;
            Ok(())
        })
        .unwrap()
    }

    fn count_reachable(automaton: &Automaton) -> usize {
        automaton.reachable().iter().filter(|b| *b).count()
    }

    #[test]
    fn lr0_and_lalr_share_the_state_graph() {
        let g = non_lalr();
        let first = FirstSets::new(&g);
        let lr0 = build(&g, &first, MergeMode::LR0);
        let lalr = build(&g, &first, MergeMode::LALR);
        assert_eq!(count_reachable(&lr0), count_reachable(&lalr));
        assert!(lr0
            .states()
            .iter()
            .flat_map(|s| &s.configs)
            .all(|c| c.context.is_empty()));
    }

    #[test]
    fn canonical_splits_what_lalr_merges() {
        let g = non_lalr();
        let first = FirstSets::new(&g);
        let lalr = build(&g, &first, MergeMode::LALR);
        let pgm = build(&g, &first, MergeMode::PGM);
        let canonical = build(&g, &first, MergeMode::Canonical);

        // the state after `a e` and `b e` cannot be shared without an R/R conflict.
        assert_eq!(count_reachable(&pgm), count_reachable(&lalr) + 1);
        assert_eq!(count_reachable(&canonical), count_reachable(&pgm));
    }

    #[test]
    fn merged_contexts_are_propagated() {
        let g = non_lalr();
        let first = FirstSets::new(&g);
        let mut lalr = build(&g, &first, MergeMode::LALR);
        assert_eq!(propagate_all(&g, &first, &mut lalr).unwrap(), 0);

        // The merged final state of `E -> e .` and `F -> e .` sees all of c, d.
        let e = g.nonterminal_by_name("E").unwrap();
        let rule = g.rules_of(e)[0];
        let core = Core { rule, marker: 1 };
        let state = lalr
            .states()
            .iter()
            .find(|s| s.find_core(core).is_some())
            .unwrap();
        let config = &state.configs[state.find_core(core).unwrap()];
        assert_eq!(config.context.len(), 2);
    }
}
