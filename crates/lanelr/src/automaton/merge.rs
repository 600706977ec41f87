//! State compatibility, merging, and context propagation.

use super::{close, successor_cores, Automaton, Configuration, State, StateID};
use crate::{
    first_sets::FirstSets, generate::ConstructionError, grammar::Grammar,
    terminal_set::TerminalSet, types::Queue,
};

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum MergeMode {
    /// Pure LR(0) item sets; contexts are not tracked.
    LR0,

    /// Items are equivalent in the sense of Knuth's canonical LR(1) method,
    /// that is, each item sets have the same LR(0) cores and their contexts
    /// are also equal.
    Canonical,

    /// Items are weakly compatible in the sense of Pager's Practical General Method (PGM).
    PGM,

    /// Every isocore state is merged, as in LALR(1).
    LALR,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Compatibility {
    Same,
    Compatible,
    Incompatible,
}

/// Compare `incoming` against the isocore state `existing`.
pub fn compare(mode: MergeMode, existing: &State, incoming: &[Configuration]) -> Compatibility {
    debug_assert!(existing.has_same_cores(incoming));

    let same = existing
        .cores()
        .iter()
        .zip(incoming)
        .all(|(a, b)| a.context == b.context);
    if same || mode == MergeMode::LR0 {
        return Compatibility::Same;
    }

    match mode {
        MergeMode::LALR => Compatibility::Compatible,
        MergeMode::PGM => {
            let a = existing.core_contexts();
            let b: Vec<_> = incoming.iter().map(|c| &c.context).collect();
            if is_weakly_compatible(&a, &b) {
                Compatibility::Compatible
            } else {
                Compatibility::Incompatible
            }
        }
        _ => Compatibility::Incompatible,
    }
}

/// Pager's weak compatibility of two isocore context vectors.
///
/// For every pair `i != j`, merging must not make `i` and `j` overlap
/// unless they already overlap within `a` or within `b`.
pub fn is_weakly_compatible(a: &[&TerminalSet], b: &[&TerminalSet]) -> bool {
    debug_assert_eq!(a.len(), b.len());
    for i in 0..a.len() {
        for j in i + 1..a.len() {
            let crossed = !a[i].is_disjoint(b[j]) || !a[j].is_disjoint(b[i]);
            if crossed && a[i].is_disjoint(a[j]) && b[i].is_disjoint(b[j]) {
                return false;
            }
        }
    }
    true
}

/// Merge the contexts of `incoming` into the isocore state `target` and
/// re-close it. Successors are left untouched.
///
/// Returns whether the contexts of `target` grew.
pub fn merge_into(
    g: &Grammar,
    first: &FirstSets,
    automaton: &mut Automaton,
    target: StateID,
    incoming: &[Configuration],
) -> bool {
    let state = automaton.state_mut(target);
    let mut changed = false;
    for (config, added) in state.configs.iter_mut().zip(incoming) {
        debug_assert_eq!(config.core, added.core);
        changed |= config.context.union_with(&added.context);
    }

    if changed {
        tracing::trace!("merged contexts into state {}", target);
        close(g, first, state, true);
    }

    changed
}

/// Push contexts forward along the existing transitions until no state
/// changes. Returns the number of state updates.
pub fn propagate_all(
    g: &Grammar,
    first: &FirstSets,
    automaton: &mut Automaton,
) -> Result<usize, ConstructionError> {
    let queue = automaton.state_ids().collect();
    drain(g, first, automaton, queue)
}

fn drain(
    g: &Grammar,
    first: &FirstSets,
    automaton: &mut Automaton,
    mut queue: Queue<StateID>,
) -> Result<usize, ConstructionError> {
    let mut updates = 0;
    while let Some(id) = queue.pop() {
        let edges: Vec<_> = automaton
            .state(id)
            .successors
            .iter()
            .map(|(symbol, target)| (*symbol, *target))
            .collect();

        for (symbol, target) in edges {
            let incoming = successor_cores(g, automaton.state(id), symbol, true);
            let state = automaton.state_mut(target);

            let mut changed = false;
            for config in &incoming {
                let k = state
                    .find_core(config.core)
                    .ok_or(ConstructionError::MissingCoreConfig {
                        state: target,
                        rule: config.core.rule,
                        marker: config.core.marker,
                    })?;
                changed |= state.configs[k].context.union_with(&config.context);
            }

            if changed {
                close(g, first, state, true);
                queue.push(target);
                updates += 1;
            }
        }
    }
    Ok(updates)
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
    fn weak_compatibility() {
        let c = set(&[2]);
        let d = set(&[3]);
        let cd = set(&[2, 3]);
        let empty = TerminalSet::default();

        // {c},{d} + {d},{c}: the merge creates an overlap on both tokens.
        assert!(!is_weakly_compatible(&[&c, &d], &[&d, &c]));

        // identical and disjoint contexts merge.
        assert!(is_weakly_compatible(&[&c, &d], &[&c, &d]));
        assert!(is_weakly_compatible(&[&c, &empty], &[&empty, &d]));

        // the overlap already exists within one side.
        assert!(is_weakly_compatible(&[&cd, &cd], &[&d, &c]));

        // a single configuration is always compatible.
        assert!(is_weakly_compatible(&[&c], &[&d]));
    }

    #[test]
    fn subset_is_always_compatible() {
        let a = [set(&[2, 3]), set(&[3, 4]), set(&[5])];
        let b = [set(&[2]), set(&[4]), set(&[])];
        let a: Vec<_> = a.iter().collect();
        let b: Vec<_> = b.iter().collect();
        assert!(is_weakly_compatible(&a, &b));
    }
}
