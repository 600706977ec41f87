//! Closure and transition of states.

use super::{Configuration, Core, State};
use crate::{
    first_sets::FirstSets,
    grammar::{Grammar, SymbolID},
    terminal_set::TerminalSet,
    types::Queue,
};

/// Expand `state` to its closure.
///
/// With `contexts`, each added configuration receives `THEADS` of the
/// symbols following the scanned nonterminal, plus the context of the
/// expanded configuration when those symbols can vanish. Runs until no
/// configuration is added and no context grows; returns whether anything
/// changed.
pub fn close(g: &Grammar, first: &FirstSets, state: &mut State, contexts: bool) -> bool {
    let mut changed = false;
    let mut queue: Queue<usize> = (0..state.configs.len()).collect();
    let mut generated = TerminalSet::default();

    while let Some(i) = queue.pop() {
        let core = state.configs[i].core;
        let (n, tail) = match &g.rule(core.rule).right()[core.marker..] {
            [SymbolID::N(n), tail @ ..] => (*n, tail),
            _ => continue,
        };

        generated.clear();
        if contexts && first.theads_into(tail, &mut generated) {
            generated.union_with(&state.configs[i].context);
        }

        for &rule in g.rules_of(n) {
            let core = Core { rule, marker: 0 };
            let (j, added) = match state.find(core) {
                Some(j) => (j, false),
                None => {
                    state
                        .configs
                        .push(Configuration::new(core, TerminalSet::default(), false));
                    (state.configs.len() - 1, true)
                }
            };

            let config = &mut state.configs[j];
            if !config.originators.contains(&i) {
                config.originators.push(i);
            }
            let grown = contexts && config.context.union_with(&generated);
            if added || grown {
                changed = true;
                queue.push(j);
            }
        }
    }

    changed
}

/// The symbols on which `state` has a transition, in order of appearance.
pub fn transition_symbols(g: &Grammar, state: &State) -> Vec<SymbolID> {
    let mut symbols = vec![];
    for config in &state.configs {
        if let Some(symbol) = config.core.scanned(g) {
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
    }
    symbols
}

/// The core configurations of the successor of `state` on `symbol`,
/// sorted by core.
pub fn successor_cores(
    g: &Grammar,
    state: &State,
    symbol: SymbolID,
    contexts: bool,
) -> Vec<Configuration> {
    let mut cores: Vec<_> = state
        .configs
        .iter()
        .filter(|config| config.core.scanned(g) == Some(symbol))
        .map(|config| {
            let context = if contexts {
                config.context.clone()
            } else {
                TerminalSet::default()
            };
            Configuration::new(config.core.advance(), context, true)
        })
        .collect();
    cores.sort_by_key(|c| c.core);
    cores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        automaton::{Automaton, StateID},
        grammar::{RuleID, SymbolID::*, TerminalID},
    };

    fn expr_grammar() -> Grammar {
        // E -> E + T | T ; T -> ( E ) | n
        Grammar::define(|g| {
            let plus = g.quoted_terminal("+", None)?;
            let lparen = g.quoted_terminal("(", None)?;
            let rparen = g.quoted_terminal(")", None)?;
            let num = g.terminal("n", None)?;
            let e = g.nonterminal("E")?;
            let t = g.nonterminal("T")?;
            g.rule(e, [N(e), T(plus), N(t)], None)?;
            g.rule(e, [N(t)], None)?;
            g.rule(t, [T(lparen), N(e), T(rparen)], None)?;
            g.rule(t, [T(num)], None)?;
            Ok(())
        })
        .unwrap()
    }

    fn start_state(g: &Grammar, first: &FirstSets) -> Automaton {
        let mut automaton = Automaton::default();
        let goal = Configuration::new(
            Core {
                rule: RuleID::ACCEPT,
                marker: 0,
            },
            [TerminalID::EOI].into_iter().collect(),
            true,
        );
        let id = automaton.push_state(None, vec![goal]);
        close(g, first, automaton.state_mut(id), true);
        automaton
    }

    #[test]
    fn closure_is_idempotent() {
        let g = expr_grammar();
        let first = FirstSets::new(&g);
        let mut automaton = start_state(&g, &first);
        let state = automaton.state_mut(StateID::START);
        assert_eq!(state.configs.len(), 5);

        let before: Vec<_> = state
            .configs
            .iter()
            .map(|c| (c.core, c.context.clone()))
            .collect();
        assert!(!close(&g, &first, state, true));
        let after: Vec<_> = state
            .configs
            .iter()
            .map(|c| (c.core, c.context.clone()))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn closure_contexts_and_originators() {
        let g = expr_grammar();
        let first = FirstSets::new(&g);
        let automaton = start_state(&g, &first);
        let state = automaton.state(StateID::START);

        let plus = g.terminal_by_name("+").unwrap();
        let e = g.nonterminal_by_name("E").unwrap();
        let t = g.nonterminal_by_name("T").unwrap();

        // E -> . E + T is generated both from the goal and from itself.
        let e_rule = g.rules_of(e)[0];
        let i = state.find(Core { rule: e_rule, marker: 0 }).unwrap();
        let config = &state.configs[i];
        assert_eq!(
            config.context,
            [TerminalID::EOI, plus].into_iter().collect()
        );
        assert!(config.originators.contains(&0));
        assert!(config.originators.contains(&i));

        let t_rule = g.rules_of(t)[1];
        let j = state.find(Core { rule: t_rule, marker: 0 }).unwrap();
        assert_eq!(
            state.configs[j].context,
            [TerminalID::EOI, plus].into_iter().collect()
        );
    }

    #[test]
    fn successors_advance_marker() {
        let g = expr_grammar();
        let first = FirstSets::new(&g);
        let automaton = start_state(&g, &first);
        let state = automaton.state(StateID::START);

        let symbols = transition_symbols(&g, state);
        let e = g.nonterminal_by_name("E").unwrap();
        assert_eq!(symbols[0], N(e));

        let cores = successor_cores(&g, state, N(e), true);
        assert_eq!(cores.len(), 2);
        assert!(cores.iter().all(|c| c.core.marker == 1 && c.is_core));
        assert_eq!(cores[0].core.rule, RuleID::ACCEPT);
    }
}
