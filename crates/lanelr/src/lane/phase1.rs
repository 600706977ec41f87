//! Phase 1: tracing reduction lanes backward to compute contexts.
//!
//! The context of a configuration is the union of
//!
//! * the contexts of its transitors when the marker is past the start, or
//! * `THEADS` of the tail of each originator, plus the context of that
//!   originator when the tail can vanish.
//!
//! The lanes form a graph over configurations which may contain cycles, so
//! the walk is Tarjan's SCC algorithm driven by two explicit stacks: `lane`
//! holds the configurations being traced and `stack` the pending edges
//! together with the markers that close each configuration.

use crate::{
    automaton::{Automaton, ConfigRef, Core, State},
    first_sets::FirstSets,
    grammar::{Grammar, NonterminalID, RuleID, SymbolID, TerminalID},
    terminal_set::TerminalSet,
    types::{Map, Set},
    util::display_fn,
};
use std::fmt;

/// A nonterminal that derives itself through vanishable symbols only,
/// found while tracing the lanes of a state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ambiguity {
    pub state: crate::automaton::StateID,
    pub nonterminal: NonterminalID,
    pub rule: RuleID,
}

impl Ambiguity {
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(
                f,
                "state {:02}: {} derives itself through ({})",
                self.state,
                g.nonterminals[&self.nonterminal],
                g.rule(self.rule).display(g),
            )
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum EdgeKind {
    Transitor,
    Originator,
}

#[derive(Debug, Copy, Clone)]
struct Edge {
    from: ConfigRef,
    to: ConfigRef,
    kind: EdgeKind,
}

#[derive(Debug)]
enum Frame {
    /// Closes `config` once every edge pushed after it has been followed.
    Marker {
        config: ConfigRef,
        parent: Option<ConfigRef>,
    },
    Pending(Edge),
}

const GOAL: Core = Core {
    rule: RuleID::ACCEPT,
    marker: 0,
};

pub(crate) struct Tracer<'a> {
    g: &'a Grammar,
    first: &'a FirstSets,
    automaton: &'a mut Automaton,
    lane: Vec<ConfigRef>,
    stack: Vec<Frame>,
    index: Map<ConfigRef, usize>,
    low: Map<ConfigRef, usize>,
    /// The number of transitor edges between the root and each configuration.
    transits: Map<ConfigRef, usize>,
    /// Configurations whose marker is still on `stack`.
    active: Set<ConfigRef>,
    ambiguities: Vec<Ambiguity>,
    traced: usize,
}

impl<'a> Tracer<'a> {
    pub fn new(g: &'a Grammar, first: &'a FirstSets, automaton: &'a mut Automaton) -> Self {
        Self {
            g,
            first,
            automaton,
            lane: vec![],
            stack: vec![],
            index: Map::default(),
            low: Map::default(),
            transits: Map::default(),
            active: Set::default(),
            ambiguities: vec![],
            traced: 0,
        }
    }

    /// Compute the context of `root` and of every configuration on its lanes.
    pub fn trace(&mut self, root: ConfigRef) {
        if self.automaton.config(root).flags.complete {
            return;
        }
        debug_assert!(self.lane.is_empty() && self.stack.is_empty());

        self.visit(root, None, 0);
        while let Some(frame) = self.stack.pop() {
            match frame {
                Frame::Pending(edge) => self.follow(edge),
                Frame::Marker { config, parent } => self.finish(config, parent),
            }
        }
    }

    /// Trace every configuration of every reachable state.
    pub fn complete_all(&mut self) {
        let reachable = self.automaton.reachable();
        let refs: Vec<ConfigRef> = self
            .automaton
            .states()
            .iter()
            .filter(|s| reachable.get(s.id.index()).unwrap_or(false))
            .flat_map(|s| (0..s.configs.len()).map(move |index| ConfigRef { state: s.id, index }))
            .collect();
        for r in refs {
            self.trace(r);
        }
    }

    fn visit(&mut self, r: ConfigRef, parent: Option<ConfigRef>, transits: usize) {
        let n = self.index.len();
        self.index.insert(r, n);
        self.low.insert(r, n);
        self.transits.insert(r, transits);
        self.active.insert(r);
        self.lane.push(r);
        self.traced += 1;
        self.automaton.config_mut(r).flags.in_lane = true;
        self.stack.push(Frame::Marker { config: r, parent });

        let config = self.automaton.config(r);
        let core = config.core;

        if core == GOAL {
            let end: TerminalSet = [TerminalID::EOI].into_iter().collect();
            self.generate(r, &end);
            return;
        }

        let mut edges = vec![];
        if core.marker > 0 {
            for &to in &config.transitors {
                edges.push(Edge {
                    from: r,
                    to,
                    kind: EdgeKind::Transitor,
                });
            }
        } else {
            let originators = config.originators.clone();
            for index in originators {
                let to = ConfigRef {
                    state: r.state,
                    index,
                };
                let tail = self.automaton.config(to).core.tail(self.g);
                let (heads, vanishable) = self.first.theads(tail);
                if !heads.is_empty() {
                    self.generate(r, &heads);
                }
                if vanishable {
                    edges.push(Edge {
                        from: r,
                        to,
                        kind: EdgeKind::Originator,
                    });
                }
            }
        }

        // pop in declaration order.
        self.stack.extend(edges.into_iter().rev().map(Frame::Pending));
    }

    fn follow(&mut self, edge: Edge) {
        if self.automaton.config(edge.to).flags.complete {
            self.inherit(edge.from, edge.to);
            return;
        }

        let Some(&index) = self.index.get(&edge.to) else {
            let transits = self.transits[&edge.from] + (edge.kind == EdgeKind::Transitor) as usize;
            self.visit(edge.to, Some(edge.from), transits);
            return;
        };

        // `edge.to` is still on the lane: this closes a cycle.
        if edge.kind == EdgeKind::Originator
            && self.active.contains(&edge.to)
            && self.transits[&edge.to] == self.transits[&edge.from]
        {
            self.record_ambiguity(edge.to);
        }
        let low = self.low[&edge.from].min(index);
        self.low.insert(edge.from, low);
        self.inherit(edge.from, edge.to);
    }

    fn finish(&mut self, r: ConfigRef, parent: Option<ConfigRef>) {
        self.active.swap_remove(&r);

        if self.low[&r] == self.index[&r] {
            let context = self.automaton.config(r).context.clone();
            while let Some(member) = self.lane.pop() {
                let config = self.automaton.config_mut(member);
                config.context.union_with(&context);
                config.flags.in_lane = false;
                config.flags.complete = true;
                self.share_with_siblings(member);
                if member == r {
                    break;
                }
            }
        }

        if let Some(p) = parent {
            let low = self.low[&p].min(self.low[&r]);
            self.low.insert(p, low);
            self.inherit(p, r);
        }
    }

    /// Closure configurations of the same state with the same left-hand
    /// side share their originators, hence their context.
    fn share_with_siblings(&mut self, r: ConfigRef) {
        let g = self.g;
        let state: &mut State = self.automaton.state_mut(r.state);
        let core = state.configs[r.index].core;
        if core.marker > 0 || core == GOAL {
            return;
        }
        let left = g.rule(core.rule).left();
        let context = state.configs[r.index].context.clone();
        for config in &mut state.configs {
            if config.core.marker == 0
                && g.rule(config.core.rule).left() == left
                && !config.flags.in_lane
                && !config.flags.complete
            {
                config.context = context.clone();
                config.flags.complete = true;
            }
        }
    }

    fn generate(&mut self, r: ConfigRef, heads: &TerminalSet) {
        let config = self.automaton.config_mut(r);
        config.context.union_with(heads);
        config.flags.lane_end = true;
    }

    fn inherit(&mut self, to: ConfigRef, from: ConfigRef) {
        if to == from {
            return;
        }
        let context = self.automaton.config(from).context.clone();
        self.automaton.config_mut(to).context.union_with(&context);
    }

    fn record_ambiguity(&mut self, r: ConfigRef) {
        let rule = self.automaton.config(r).core.rule;
        let nonterminal = self.g.rule(rule).left();
        let ambiguity = Ambiguity {
            state: r.state,
            nonterminal,
            rule,
        };
        if !self.ambiguities.contains(&ambiguity) {
            tracing::warn!("grammar is ambiguous: {}", ambiguity.display(self.g));
            self.ambiguities.push(ambiguity);
        }
    }

    pub fn finish_tracing(self) -> (Vec<Ambiguity>, usize) {
        (self.ambiguities, self.traced)
    }
}

/// A state with a reduction that competes with another action, judged
/// without lookahead.
fn is_lr0_inadequate(g: &Grammar, state: &State) -> bool {
    let mut reduces = 0;
    let mut shifts = false;
    for config in &state.configs {
        match config.core.scanned(g) {
            None if config.core.rule != RuleID::ACCEPT => reduces += 1,
            Some(SymbolID::T(..)) => shifts = true,
            _ => {}
        }
    }
    reduces > 1 || (reduces == 1 && shifts)
}

/// Run Phase 1 over the whole automaton, whose contexts must be empty.
///
/// The final configurations of inadequate states are traced first, then
/// the remaining final configurations, then everything else. Returns the
/// ambiguities found and the number of traced configurations.
#[tracing::instrument(skip_all)]
pub(crate) fn trace_all(
    g: &Grammar,
    first: &FirstSets,
    automaton: &mut Automaton,
) -> (Vec<Ambiguity>, usize) {
    let reachable = automaton.reachable();
    let mut inadequate = vec![];
    let mut adequate = vec![];
    for state in automaton.states() {
        if !reachable.get(state.id.index()).unwrap_or(false) {
            continue;
        }
        let finals = state.final_configs(g).map(|index| ConfigRef {
            state: state.id,
            index,
        });
        if is_lr0_inadequate(g, state) {
            inadequate.extend(finals);
        } else {
            adequate.extend(finals);
        }
    }
    tracing::debug!(
        "{} final configurations in inadequate states",
        inadequate.len()
    );

    let mut tracer = Tracer::new(g, first, automaton);
    for r in inadequate.into_iter().chain(adequate) {
        tracer.trace(r);
    }
    tracer.complete_all();

    let (ambiguities, traced) = tracer.finish_tracing();
    tracing::debug!("traced {} configurations", traced);
    (ambiguities, traced)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        automaton::{build, MergeMode},
        grammar::SymbolID::*,
    };

    #[test]
    fn vanishing_cycle_is_ambiguous() {
        // S -> A | x ; A -> B ; B -> A
        let g = Grammar::define(|g| {
            let x = g.terminal("x", None)?;
            let s = g.nonterminal("S")?;
            let a = g.nonterminal("A")?;
            let b = g.nonterminal("B")?;
            g.rule(s, [N(a)], None)?;
            g.rule(s, [T(x)], None)?;
            g.rule(a, [N(b)], None)?;
            g.rule(b, [N(a)], None)?;
            Ok(())
        })
        .unwrap();
        let first = FirstSets::new(&g);
        let mut automaton = build(&g, &first, MergeMode::LR0);
        let (ambiguities, _) = trace_all(&g, &first, &mut automaton);

        assert!(!ambiguities.is_empty());
        let names: Vec<_> = ambiguities
            .iter()
            .map(|a| g.nonterminals[&a.nonterminal].name().to_owned())
            .collect();
        assert!(names.iter().all(|n| n == "A" || n == "B"));

        let end: TerminalSet = [TerminalID::EOI].into_iter().collect();
        for state in automaton.states() {
            for config in &state.configs {
                assert!(config.flags.complete);
                assert_eq!(config.context, end);
            }
        }
    }

    #[test]
    fn cycle_through_transitions_is_not_ambiguous() {
        // S -> a S | b
        let g = Grammar::define(|g| {
            let a = g.terminal("a", None)?;
            let b = g.terminal("b", None)?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a), N(s)], None)?;
            g.rule(s, [T(b)], None)?;
            Ok(())
        })
        .unwrap();
        let first = FirstSets::new(&g);
        let mut automaton = build(&g, &first, MergeMode::LR0);
        let (ambiguities, traced) = trace_all(&g, &first, &mut automaton);

        assert!(ambiguities.is_empty());
        assert!(traced > 0);
        let end: TerminalSet = [TerminalID::EOI].into_iter().collect();
        for state in automaton.states() {
            for config in &state.configs {
                assert_eq!(config.context, end);
                assert!(!config.flags.in_lane);
            }
        }
    }
}
