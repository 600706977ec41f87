//! Context regeneration after the lanes have been split.

use crate::{
    automaton::{close, propagate_all, Automaton, Core, State, StateID},
    first_sets::FirstSets,
    generate::ConstructionError,
    grammar::{Grammar, RuleID, TerminalID},
    types::Set,
};

/// Drop every context of `state` and rebuild those generated inside it.
pub(super) fn reset_contexts(g: &Grammar, first: &FirstSets, state: &mut State) {
    let goal = Core {
        rule: RuleID::ACCEPT,
        marker: 0,
    };
    for config in &mut state.configs {
        config.context.clear();
        if config.core == goal {
            config.context.insert(TerminalID::EOI);
        }
    }
    close(g, first, state, true);
}

/// Recompute the contexts of `family` from the current transitions.
///
/// States that became unreachable are cut off first so that they no
/// longer feed their successors. Returns the number of state updates made
/// by propagation.
#[tracing::instrument(skip_all)]
pub(crate) fn regenerate(
    g: &Grammar,
    first: &FirstSets,
    automaton: &mut Automaton,
    family: &Set<StateID>,
) -> Result<usize, ConstructionError> {
    automaton.detach_unreachable();
    for &id in family {
        reset_contexts(g, first, automaton.state_mut(id));
    }
    let updates = propagate_all(g, first, automaton)?;
    tracing::debug!("regenerated {} states ({} updates)", family.len(), updates);
    Ok(updates)
}
