//! Index of states by their core configurations.

use super::{Automaton, Configuration, State, StateID};
use crate::types::Map;
use rustc_hash::FxHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Default)]
pub struct Registry {
    buckets: Map<u64, Vec<StateID>>,
}

impl Registry {
    fn key(cores: &[Configuration]) -> u64 {
        let mut hasher = FxHasher::default();
        for (position, config) in cores.iter().enumerate() {
            (config.core.rule, config.core.marker, position).hash(&mut hasher);
        }
        hasher.finish()
    }

    pub fn insert(&mut self, state: &State) {
        self.buckets
            .entry(Self::key(state.cores()))
            .or_default()
            .push(state.id);
    }

    /// The registered states whose cores equal those of `cores`, oldest first.
    pub fn isocores<'a>(
        &'a self,
        automaton: &'a Automaton,
        cores: &'a [Configuration],
    ) -> impl Iterator<Item = StateID> + 'a {
        self.buckets
            .get(&Self::key(cores))
            .into_iter()
            .flatten()
            .copied()
            .filter(move |id| automaton.state(*id).has_same_cores(cores))
    }
}
