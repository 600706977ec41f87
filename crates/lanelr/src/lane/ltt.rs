//! Phase 2 by lane-table clusters.

use super::{clone_cleared, is_covered, regen::reset_contexts, Families, Region, SplitStats};
use crate::{
    automaton::{close, merge_into, successor_cores, Automaton, Configuration, StateID},
    first_sets::FirstSets,
    generate::ConstructionError,
    grammar::Grammar,
    terminal_set::TerminalSet,
    types::{Map, Queue, Set},
};

#[derive(Debug)]
struct LtTblEntry {
    /// The core contexts found by Phase 1.
    contexts: Vec<TerminalSet>,
    /// Successors on a conflict lane.
    to_states: Set<StateID>,
    /// The conflicting tokens whose lanes pass through this state.
    filter: TerminalSet,
    processed: bool,
}

#[derive(Debug)]
struct LtTable {
    entries: Map<StateID, LtTblEntry>,
}

impl LtTable {
    fn new(automaton: &Automaton, region: &Region) -> Self {
        let entries = region
            .filter
            .iter()
            .map(|(id, filter)| {
                let entry = LtTblEntry {
                    contexts: automaton
                        .state(*id)
                        .cores()
                        .iter()
                        .map(|c| c.context.clone())
                        .collect(),
                    to_states: region.to_states.get(id).cloned().unwrap_or_default(),
                    filter: filter.clone(),
                    processed: false,
                };
                (*id, entry)
            })
            .collect();
        Self { entries }
    }
}

/// States grown from the head of a lane, keyed by the state they were
/// derived from.
#[derive(Debug, Default)]
struct LtCluster {
    states: Map<StateID, StateID>,
}

/// Whether merging `incoming` into `existing` creates no overlap between
/// two core contexts on `filter` beyond what either side already has.
fn absorbs(existing: &[&TerminalSet], incoming: &[&TerminalSet], filter: &TerminalSet) -> bool {
    debug_assert_eq!(existing.len(), incoming.len());
    let merged: Vec<TerminalSet> = existing
        .iter()
        .zip(incoming)
        .map(|(a, b)| {
            let mut m = (*a).clone();
            m.union_with(b);
            m.intersect_with(filter);
            m
        })
        .collect();

    for i in 0..merged.len() {
        for j in i + 1..merged.len() {
            let overlap = merged[i].intersection(&merged[j]);
            if overlap.is_empty() {
                continue;
            }
            let mut allowed = existing[i].intersection(existing[j]);
            allowed.union_with(&incoming[i].intersection(incoming[j]));
            if !overlap.is_subset(&allowed) {
                return false;
            }
        }
    }
    true
}

fn absorbs_into(
    automaton: &Automaton,
    target: StateID,
    incoming: &[Configuration],
    filter: &TerminalSet,
) -> bool {
    let incoming: Vec<_> = incoming.iter().map(|c| &c.context).collect();
    absorbs(&automaton.state(target).core_contexts(), &incoming, filter)
}

/// Walk the lanes from each unprocessed head, growing one cluster per head.
///
/// Along a lane, a state already in the cluster absorbs what arrives when
/// the result stays disjoint on the conflicting tokens. Otherwise the
/// edge goes to a copy that covers the incoming contexts, a copy that is
/// still unclaimed or absorbs them, or a new clone.
pub(super) fn run(
    g: &Grammar,
    first: &FirstSets,
    automaton: &mut Automaton,
    region: &Region,
    families: &mut Families,
) -> Result<SplitStats, ConstructionError> {
    let mut table = LtTable::new(automaton, region);
    let mut stats = SplitStats::default();

    for (id, entry) in &table.entries {
        let state = automaton.state_mut(*id);
        reset_contexts(g, first, state);
        if region.heads.contains(id) {
            for (config, context) in state.configs.iter_mut().zip(&entry.contexts) {
                config.context.union_with(context);
            }
            close(g, first, state, true);
        }
    }

    let mut owner: Map<StateID, usize> = Map::default();
    let mut clusters: Vec<LtCluster> = vec![];

    for &head in &region.heads {
        if table.entries.get(&head).map_or(true, |e| e.processed) {
            continue;
        }

        let index = clusters.len();
        let mut cluster = LtCluster::default();
        cluster.states.insert(head, head);
        owner.entry(head).or_insert(index);

        let mut queue = Queue::default();
        queue.push(head);

        while let Some(actual) = queue.pop() {
            let original = automaton.state(actual).original();
            let Some(entry) = table.entries.get_mut(&original) else { continue };
            entry.processed = true;
            let to_states: Vec<StateID> = entry.to_states.iter().copied().collect();

            for next in to_states {
                let Some(symbol) = automaton.state(next).symbol else { continue };
                let Some(&current) = automaton.state(actual).successors.get(&symbol) else { continue };
                let Some(filter) = table.entries.get(&next).map(|e| e.filter.clone()) else { continue };
                let incoming = successor_cores(g, automaton.state(actual), symbol, true);

                let in_cluster = cluster
                    .states
                    .get(&next)
                    .copied()
                    .filter(|c| absorbs_into(automaton, *c, &incoming, &filter));

                let target = match in_cluster {
                    Some(target) => target,
                    None => {
                        let copies = families.of(next);
                        let reusable = copies
                            .iter()
                            .copied()
                            .find(|c| is_covered(automaton.state(*c), &incoming))
                            .or_else(|| {
                                copies.iter().copied().find(|c| {
                                    !owner.contains_key(c)
                                        || absorbs_into(automaton, *c, &incoming, &filter)
                                })
                            });
                        match reusable {
                            Some(target) => target,
                            None => {
                                stats.clones += 1;
                                clone_cleared(g, first, automaton, families, next)
                            }
                        }
                    }
                };

                if merge_into(g, first, automaton, target, &incoming) {
                    stats.merges += 1;
                    queue.push(target);
                }
                if target != current {
                    automaton.relink(actual, symbol, target);
                    queue.push(target);
                }
                cluster.states.insert(next, target);
                owner.entry(target).or_insert(index);
            }
        }

        tracing::trace!("cluster {} from head {}: {:?}", index, head, cluster.states);
        clusters.push(cluster);
    }

    tracing::debug!("{} clusters", clusters.len());
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::TerminalID;

    fn set(raw: &[usize]) -> TerminalSet {
        raw.iter()
            .filter_map(|&i| TerminalID::from_index(i))
            .collect()
    }

    #[test]
    fn absorbs_only_without_new_overlap() {
        let filter = set(&[2, 3]);
        let c = set(&[2]);
        let d = set(&[3]);
        let empty = TerminalSet::default();

        assert!(absorbs(&[&c, &d], &[&c, &d], &filter));
        assert!(absorbs(&[&empty, &empty], &[&d, &c], &filter));
        assert!(!absorbs(&[&c, &d], &[&d, &c], &filter));

        // tokens outside the filter never matter.
        let other = set(&[4]);
        assert!(absorbs(&[&other, &c], &[&d, &other], &filter));
    }
}
