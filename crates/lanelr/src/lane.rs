//! Lane tracing.
//!
//! Phase 1 computes the contexts of an LR(0) automaton by tracing lanes
//! backward from its reductions, which yields LALR(1) precision. Phase 2
//! splits the states on the lanes of the remaining reduce/reduce
//! conflicts, either with Pager's weak compatibility ([`Phase2::PGM`]) or
//! by growing clusters of states along each lane ([`Phase2::LTT`]), and
//! then regenerates their contexts.

mod ltt;
mod phase1;
mod pgm;
mod regen;

pub use self::phase1::Ambiguity;
pub(crate) use self::{phase1::trace_all, regen::regenerate};

use crate::{
    automaton::{Automaton, ConfigRef, Configuration, Core, StateID},
    first_sets::FirstSets,
    generate::ConstructionError,
    grammar::{Grammar, RuleID, TerminalID},
    table::{Action, ConflictKind, ConflictLog},
    terminal_set::TerminalSet,
    types::{Map, Set},
};
use std::collections::VecDeque;

/// The strategy used to split states in Phase 2.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Phase2 {
    /// Recompute successors along the lanes and clone the states that are
    /// not weakly compatible with what arrives.
    PGM,
    /// Grow a cluster from the head of each lane and clone the states whose
    /// contexts would overlap on the conflicting tokens.
    LTT,
}

/// The states on the lanes of the conflicts that Phase 2 works on.
#[derive(Debug, Default)]
pub(crate) struct Region {
    /// The conflicting tokens whose lanes pass through each state.
    pub filter: Map<StateID, TerminalSet>,
    /// States in which a conflicting token is generated.
    pub heads: Set<StateID>,
    /// Lane edges from a state to its successors on the region.
    pub to_states: Map<StateID, Set<StateID>>,
}

impl Region {
    pub fn is_empty(&self) -> bool {
        self.filter.is_empty()
    }

    pub fn contains(&self, id: StateID) -> bool {
        self.filter.contains_key(&id)
    }
}

/// Mark the configurations on the lanes of every unresolved
/// reduce/reduce conflict in `log`.
///
/// From each conflicting reduction, lanes are followed backward only
/// through configurations whose context holds the conflicting token.
#[tracing::instrument(skip_all)]
pub(crate) fn mark_conflict_lanes(
    g: &Grammar,
    first: &FirstSets,
    automaton: &mut Automaton,
    log: &ConflictLog,
) -> Region {
    let mut region = Region::default();

    let mut visited: Set<(ConfigRef, TerminalID)> = Set::default();
    let mut queue = VecDeque::new();

    for conflict in &log.conflicts {
        if conflict.by_precedence || conflict.kind() != ConflictKind::ReduceReduce {
            continue;
        }
        let Action::Reduce(other) = conflict.other else { continue };
        let t = conflict.lookahead;
        let state = automaton.state(conflict.state);
        for index in state.final_configs(g) {
            let config = &state.configs[index];
            let rule = config.core.rule;
            if (rule == conflict.reduce || rule == other) && config.context.contains(t) {
                queue.push_back((
                    ConfigRef {
                        state: conflict.state,
                        index,
                    },
                    t,
                ));
            }
        }
    }

    while let Some((r, t)) = queue.pop_front() {
        if !visited.insert((r, t)) {
            continue;
        }
        automaton.config_mut(r).flags.lane_con = true;
        region.filter.entry(r.state).or_default().insert(t);

        let config = automaton.config(r);
        if config.core
            == (Core {
                rule: RuleID::ACCEPT,
                marker: 0,
            })
        {
            region.heads.insert(r.state);
            continue;
        }

        if config.core.marker > 0 {
            for &transitor in &config.transitors {
                if automaton.config(transitor).context.contains(t) {
                    region
                        .to_states
                        .entry(transitor.state)
                        .or_default()
                        .insert(r.state);
                    queue.push_back((transitor, t));
                }
            }
        } else {
            for &index in &config.originators {
                let originator = ConfigRef {
                    state: r.state,
                    index,
                };
                let o = automaton.config(originator);
                let (heads, vanishable) = first.theads(o.core.tail(g));
                if heads.contains(t) {
                    region.heads.insert(r.state);
                }
                if vanishable && o.context.contains(t) {
                    queue.push_back((originator, t));
                }
            }
        }
    }

    tracing::debug!(
        "{} states on conflict lanes, {} heads",
        region.filter.len(),
        region.heads.len()
    );
    region
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) struct SplitStats {
    pub clones: usize,
    pub merges: usize,
}

/// The copies of each state of the region, original first.
#[derive(Debug, Default)]
struct Families {
    copies: Map<StateID, Vec<StateID>>,
}

impl Families {
    fn new(automaton: &Automaton, region: &Region) -> Self {
        let mut copies: Map<StateID, Vec<StateID>> = Map::default();
        for state in automaton.states() {
            let original = state.original();
            if region.contains(original) {
                copies.entry(original).or_default().push(state.id);
            }
        }
        Self { copies }
    }

    fn of(&self, original: StateID) -> &[StateID] {
        self.copies.get(&original).map_or(&[], |c| &c[..])
    }

    fn add(&mut self, original: StateID, copy: StateID) {
        self.copies.entry(original).or_default().push(copy);
    }

    fn all(&self) -> Set<StateID> {
        self.copies.values().flatten().copied().collect()
    }
}

/// Whether every context of `incoming` is already in the isocore `state`.
fn is_covered(state: &crate::automaton::State, incoming: &[Configuration]) -> bool {
    state
        .cores()
        .iter()
        .zip(incoming)
        .all(|(a, b)| b.context.is_subset(&a.context))
}

/// Append a copy of `original` with its contexts cleared.
fn clone_cleared(
    g: &Grammar,
    first: &FirstSets,
    automaton: &mut Automaton,
    families: &mut Families,
    original: StateID,
) -> StateID {
    let id = automaton.clone_state(original);
    regen::reset_contexts(g, first, automaton.state_mut(id));
    families.add(original, id);
    tracing::debug!("state {} split from {}", id, original);
    id
}

/// Run Phase 2 on `region` and regenerate the contexts of every state
/// derived from it.
#[tracing::instrument(skip_all, fields(strategy = ?strategy))]
pub(crate) fn split(
    g: &Grammar,
    first: &FirstSets,
    automaton: &mut Automaton,
    region: &Region,
    strategy: Phase2,
) -> Result<SplitStats, ConstructionError> {
    let mut families = Families::new(automaton, region);
    let stats = match strategy {
        Phase2::PGM => pgm::run(g, first, automaton, region, &mut families)?,
        Phase2::LTT => ltt::run(g, first, automaton, region, &mut families)?,
    };
    regenerate(g, first, automaton, &families.all())?;
    tracing::debug!("{} clones, {} merges", stats.clones, stats.merges);
    Ok(stats)
}
