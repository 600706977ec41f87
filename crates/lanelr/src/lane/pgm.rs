//! Phase 2 by Pager's weak compatibility.

use super::{clone_cleared, is_covered, regen::reset_contexts, Families, Region, SplitStats};
use crate::{
    automaton::{is_weakly_compatible, merge_into, successor_cores, Automaton, StateID},
    first_sets::FirstSets,
    generate::ConstructionError,
    grammar::{Grammar, SymbolID},
    types::Queue,
};

/// Recompute the successors on the region from its predecessors onward.
///
/// Each edge into the region is routed to a copy of its target that
/// already covers the incoming contexts, else to the first weakly
/// compatible copy, else to a new clone.
pub(super) fn run(
    g: &Grammar,
    first: &FirstSets,
    automaton: &mut Automaton,
    region: &Region,
    families: &mut Families,
) -> Result<SplitStats, ConstructionError> {
    let mut stats = SplitStats::default();
    let mut queue = Queue::default();

    for &id in region.filter.keys() {
        reset_contexts(g, first, automaton.state_mut(id));
    }
    for &id in region.filter.keys() {
        for &parent in &automaton.state(id).parents {
            queue.push(parent);
        }
    }
    for &id in region.filter.keys() {
        queue.push(id);
    }

    while let Some(id) = queue.pop() {
        let state = automaton.state(id);
        if id != StateID::START && state.parents.is_empty() {
            // orphaned by an earlier split.
            continue;
        }

        let edges: Vec<(SymbolID, StateID)> = state
            .successors
            .iter()
            .filter(|(_, target)| region.contains(automaton.state(**target).original()))
            .map(|(symbol, target)| (*symbol, *target))
            .collect();

        for (symbol, current) in edges {
            let original = automaton.state(current).original();
            let incoming = successor_cores(g, automaton.state(id), symbol, true);

            if is_covered(automaton.state(current), &incoming) {
                continue;
            }

            let covering = families
                .of(original)
                .iter()
                .copied()
                .find(|c| is_covered(automaton.state(*c), &incoming));

            let target = match covering {
                Some(target) => target,
                None => {
                    let incoming_contexts: Vec<_> = incoming.iter().map(|c| &c.context).collect();
                    let compatible = std::iter::once(current)
                        .chain(families.of(original).iter().copied())
                        .find(|c| {
                            is_weakly_compatible(
                                &automaton.state(*c).core_contexts(),
                                &incoming_contexts,
                            )
                        });
                    match compatible {
                        Some(target) => {
                            stats.merges += 1;
                            target
                        }
                        None => {
                            stats.clones += 1;
                            clone_cleared(g, first, automaton, families, original)
                        }
                    }
                }
            };

            if merge_into(g, first, automaton, target, &incoming) {
                queue.push(target);
            }
            if target != current {
                automaton.relink(id, symbol, target);
                queue.push(target);
            }
        }
    }

    Ok(stats)
}
