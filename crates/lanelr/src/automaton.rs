//! The LR automaton: configurations, states and the state graph.

mod builder;
mod closure;
mod merge;
mod registry;

pub(crate) use self::{
    builder::build,
    closure::{close, successor_cores, transition_symbols},
    merge::{compare, is_weakly_compatible, merge_into, propagate_all, Compatibility},
    registry::Registry,
};
pub use self::merge::MergeMode;

use crate::{
    grammar::{Grammar, RuleID, SymbolID},
    terminal_set::TerminalSet,
    types::{Map, Set},
    util::display_fn,
};
use bit_vec::BitVec;
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct StateID {
    raw: u32,
}

impl StateID {
    pub const START: Self = Self::new(0);

    const fn new(raw: u32) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        u32::try_from(index).ok().map(Self::new)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// Index-based reference to a configuration owned by a state.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConfigRef {
    pub state: StateID,
    pub index: usize,
}

/// The position of a configuration: a rule and the dot (marker) within it.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Core {
    pub rule: RuleID,
    pub marker: usize,
}

impl Core {
    /// The symbol immediately after the marker.
    pub fn scanned(self, g: &Grammar) -> Option<SymbolID> {
        g.rule(self.rule).right().get(self.marker).copied()
    }

    pub fn is_final(self, g: &Grammar) -> bool {
        self.marker >= g.rule(self.rule).right().len()
    }

    /// The symbols following the scanned symbol.
    pub fn tail(self, g: &Grammar) -> &[SymbolID] {
        g.rule(self.rule).right().get(self.marker + 1..).unwrap_or(&[])
    }

    pub fn advance(self) -> Self {
        Self {
            rule: self.rule,
            marker: self.marker + 1,
        }
    }

    pub fn display(self, g: &Grammar) -> impl fmt::Display + '_ {
        display_fn(move |f| {
            let rule = g.rule(self.rule);
            write!(f, "({} :=", g.nonterminals[&rule.left()])?;
            for (i, symbol) in rule.right().iter().enumerate() {
                if i == self.marker {
                    f.write_str(" .")?;
                }
                write!(f, " {}", g.display_symbol(*symbol))?;
            }
            if self.marker == rule.right().len() {
                f.write_str(" .")?;
            }
            f.write_str(")")
        })
    }
}

/// Per-configuration marks used while tracing lanes.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct LaneFlags {
    /// Currently on the lane being traced.
    pub in_lane: bool,
    /// The context is final.
    pub complete: bool,
    /// A definite context was generated here.
    pub lane_end: bool,
    /// On a lane leading to an unresolved conflict.
    pub lane_con: bool,
}

#[derive(Debug, Clone)]
pub struct Configuration {
    pub core: Core,
    pub context: TerminalSet,
    pub is_core: bool,
    /// Indices of the configurations in the same state whose scanned
    /// nonterminal produced this one.
    pub originators: Vec<usize>,
    /// The configurations in parent states whose shift produced this one.
    pub transitors: Vec<ConfigRef>,
    pub flags: LaneFlags,
}

impl Configuration {
    pub fn new(core: Core, context: TerminalSet, is_core: bool) -> Self {
        Self {
            core,
            context,
            is_core,
            originators: vec![],
            transitors: vec![],
            flags: LaneFlags::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct State {
    pub id: StateID,
    /// The symbol on which this state is entered.
    pub symbol: Option<SymbolID>,
    /// Core configurations first, sorted by core, then the closure.
    pub configs: Vec<Configuration>,
    pub num_cores: usize,
    pub successors: Map<SymbolID, StateID>,
    pub parents: Set<StateID>,
    /// The state this one was split from by lane tracing.
    pub clone_of: Option<StateID>,
}

impl State {
    pub fn cores(&self) -> &[Configuration] {
        &self.configs[..self.num_cores]
    }

    /// The position of `core` among all configurations.
    pub fn find(&self, core: Core) -> Option<usize> {
        self.configs.iter().position(|c| c.core == core)
    }

    /// The position of `core` among the core configurations.
    pub fn find_core(&self, core: Core) -> Option<usize> {
        self.cores().binary_search_by_key(&core, |c| c.core).ok()
    }

    pub fn has_same_cores(&self, cores: &[Configuration]) -> bool {
        self.num_cores == cores.len()
            && self.cores().iter().zip(cores).all(|(a, b)| a.core == b.core)
    }

    pub fn core_contexts(&self) -> Vec<&TerminalSet> {
        self.cores().iter().map(|c| &c.context).collect()
    }

    /// Indices of the configurations whose marker reached the end.
    pub fn final_configs<'a>(&'a self, g: &'a Grammar) -> impl Iterator<Item = usize> + 'a {
        self.configs
            .iter()
            .enumerate()
            .filter(move |(_, c)| c.core.is_final(g))
            .map(|(i, _)| i)
    }

    /// The original state this one was (transitively) cloned from.
    pub fn original(&self) -> StateID {
        self.clone_of.unwrap_or(self.id)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "#### State {:02}", self.id)?;
            if let Some(symbol) = self.symbol {
                write!(f, " (on {})", g.display_symbol(symbol))?;
            }
            if let Some(orig) = self.clone_of {
                write!(f, " (split from {:02})", orig)?;
            }
            writeln!(f)?;

            writeln!(f, "## configurations")?;
            for config in &self.configs {
                write!(f, "- {}  {}", config.core.display(g), config.context.display(g))?;
                if !config.is_core {
                    f.write_str(" (closure)")?;
                }
                writeln!(f)?;
            }

            writeln!(f, "## successors")?;
            for (symbol, target) in &self.successors {
                writeln!(f, "- {} => {:02}", g.display_symbol(*symbol), target)?;
            }
            Ok(())
        })
    }
}

/// The state graph. States are addressed by index and never removed.
#[derive(Debug, Default, Clone)]
pub struct Automaton {
    states: Vec<State>,
}

impl Automaton {
    pub fn states(&self) -> &[State] {
        &self.states[..]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.index()]
    }

    pub(crate) fn state_mut(&mut self, id: StateID) -> &mut State {
        &mut self.states[id.index()]
    }

    pub fn config(&self, r: ConfigRef) -> &Configuration {
        &self.states[r.state.index()].configs[r.index]
    }

    pub(crate) fn config_mut(&mut self, r: ConfigRef) -> &mut Configuration {
        &mut self.states[r.state.index()].configs[r.index]
    }

    pub fn state_ids(&self) -> impl Iterator<Item = StateID> + '_ {
        self.states.iter().map(|s| s.id)
    }

    /// Register a new state made of `cores`, sorted and deduplicated. The
    /// state is not closed.
    pub(crate) fn push_state(
        &mut self,
        symbol: Option<SymbolID>,
        mut cores: Vec<Configuration>,
    ) -> StateID {
        cores.sort_by_key(|c| c.core);
        let mut configs: Vec<Configuration> = Vec::with_capacity(cores.len());
        for config in cores {
            match configs.last_mut() {
                Some(last) if last.core == config.core => {
                    last.context.union_with(&config.context);
                }
                _ => configs.push(config),
            }
        }
        for config in &mut configs {
            config.is_core = true;
        }

        let id = StateID::new(self.states.len() as u32);
        self.states.push(State {
            id,
            symbol,
            num_cores: configs.len(),
            configs,
            successors: Map::default(),
            parents: Set::default(),
            clone_of: None,
        });
        id
    }

    /// Add the transition `from --symbol--> to` and record the transitors of
    /// the core configurations of `to`.
    pub(crate) fn link(&mut self, from: StateID, symbol: SymbolID, to: StateID) {
        self.state_mut(from).successors.insert(symbol, to);
        self.state_mut(to).parents.insert(from);

        let n = self.state(to).num_cores;
        for k in 0..n {
            let core = self.state(to).configs[k].core;
            let Some(marker) = core.marker.checked_sub(1) else { continue };
            let prev = Core {
                rule: core.rule,
                marker,
            };
            if let Some(index) = self.state(from).find(prev) {
                let transitor = ConfigRef { state: from, index };
                let transitors = &mut self.state_mut(to).configs[k].transitors;
                if !transitors.contains(&transitor) {
                    transitors.push(transitor);
                }
            }
        }
    }

    /// Redirect the transition of `from` on `symbol` to `to`.
    pub(crate) fn relink(&mut self, from: StateID, symbol: SymbolID, to: StateID) {
        if let Some(&old) = self.state(from).successors.get(&symbol) {
            if old == to {
                return;
            }
            let old_state = self.state_mut(old);
            old_state.parents.shift_remove(&from);
            for config in &mut old_state.configs[..old_state.num_cores] {
                config.transitors.retain(|t| t.state != from);
            }
        }
        self.link(from, symbol, to);
    }

    /// Append a copy of `id` with the same configurations and successors but
    /// no predecessors.
    pub(crate) fn clone_state(&mut self, id: StateID) -> StateID {
        let source = self.state(id);
        let new_id = StateID::new(self.states.len() as u32);
        let successors: Vec<_> = source.successors.iter().map(|(s, t)| (*s, *t)).collect();
        let mut configs = source.configs.clone();
        for config in &mut configs {
            config.transitors.clear();
            config.flags = LaneFlags::default();
        }
        let state = State {
            id: new_id,
            symbol: source.symbol,
            configs,
            num_cores: source.num_cores,
            successors: Map::default(),
            parents: Set::default(),
            clone_of: Some(source.original()),
        };
        self.states.push(state);
        for (symbol, target) in successors {
            self.link(new_id, symbol, target);
        }
        new_id
    }

    /// The states reachable from the start state.
    pub fn reachable(&self) -> BitVec {
        let mut reached = BitVec::from_elem(self.states.len(), false);
        if self.states.is_empty() {
            return reached;
        }
        let mut stack = vec![StateID::START];
        reached.set(StateID::START.index(), true);
        while let Some(id) = stack.pop() {
            for &next in self.state(id).successors.values() {
                if !reached.get(next.index()).unwrap_or(true) {
                    reached.set(next.index(), true);
                    stack.push(next);
                }
            }
        }
        reached
    }

    /// Cut every unreachable state out of the graph. The states keep their
    /// IDs and configurations but lose all transitions.
    pub(crate) fn detach_unreachable(&mut self) {
        let reachable = self.reachable();
        for (i, is_reachable) in reachable.iter().enumerate() {
            if is_reachable {
                continue;
            }
            let id = self.states[i].id;
            let successors: Vec<_> = self.states[i].successors.drain(..).map(|(_, t)| t).collect();
            self.states[i].parents.clear();
            for target in successors {
                let state = self.state_mut(target);
                state.parents.shift_remove(&id);
                for config in &mut state.configs[..state.num_cores] {
                    config.transitors.retain(|t| t.state != id);
                }
            }
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, state) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                write!(f, "{}", state.display(g))?;
            }
            Ok(())
        })
    }
}
