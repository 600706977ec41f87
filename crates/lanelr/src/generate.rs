//! Construction options and the driver.

use crate::{
    automaton::{build, Automaton, MergeMode, StateID},
    first_sets::FirstSets,
    grammar::{Grammar, RuleID},
    lane::{self, Ambiguity, Phase2},
    report::{Reporter, TracingReporter},
    table::ParsingTable,
};

#[derive(Debug, thiserror::Error)]
pub enum ConstructionError {
    #[error("state {state}: no core configuration for rule {rule} at marker {marker}")]
    MissingCoreConfig {
        state: StateID,
        rule: RuleID,
        marker: usize,
    },

    #[error("state {state}: accept clashes with the reduction by rule {rule}")]
    AcceptReduceClash { state: StateID, rule: RuleID },

    #[error(
        "expected {expected} shift/reduce conflicts, found {shift_reduce} shift/reduce \
         and {reduce_reduce} reduce/reduce"
    )]
    ExpectMismatch {
        expected: usize,
        shift_reduce: usize,
        reduce_reduce: usize,
    },
}

/// The kind of automaton to construct.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Mode {
    /// Plain LR(0); reductions are entered regardless of lookahead.
    LR0,

    /// LR(0) states with contexts computed by lane tracing.
    LALR,

    /// LR(1), either canonical or merged by Pager's weak compatibility.
    LR1,

    /// LALR(1) followed by state splitting on the lanes of reduce/reduce
    /// conflicts.
    LaneTracing(Phase2),
}

#[derive(Debug, Clone)]
pub struct Options {
    mode: Mode,
    combine_compatible_states: bool,
    strict_expect: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

impl Options {
    pub const fn new() -> Self {
        Self {
            mode: Mode::LR1,
            combine_compatible_states: true,
            strict_expect: false,
        }
    }

    pub fn use_lr0(&mut self) -> &mut Self {
        self.mode = Mode::LR0;
        self
    }

    pub fn use_lalr(&mut self) -> &mut Self {
        self.mode = Mode::LALR;
        self
    }

    /// Construct LR(1) states, merged according to
    /// [`use_canonical`](Self::use_canonical) or [`use_pgm`](Self::use_pgm).
    pub fn use_lr1(&mut self) -> &mut Self {
        self.mode = Mode::LR1;
        self
    }

    /// Set the merge strategy of states to match Knuth's canonical LR(1) method.
    pub fn use_canonical(&mut self) -> &mut Self {
        self.mode = Mode::LR1;
        self.combine_compatible_states = false;
        self
    }

    /// Set the merge strategy of states to match Pager's Practical General Method (PGM).
    ///
    /// By default, this strategy is selected due to the trade-off between
    /// reducing the number of states and avoiding reduce/reduce conflicts.
    pub fn use_pgm(&mut self) -> &mut Self {
        self.mode = Mode::LR1;
        self.combine_compatible_states = true;
        self
    }

    pub fn use_lane_tracing(&mut self, phase2: Phase2) -> &mut Self {
        self.mode = Mode::LaneTracing(phase2);
        self
    }

    /// Fail when the conflicts differ from the `%expect` declaration of the
    /// grammar (no declaration means none are expected).
    pub fn strict_expect(&mut self, enabled: bool) -> &mut Self {
        self.strict_expect = enabled;
        self
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn generate(&self, g: &Grammar) -> Result<Output, ConstructionError> {
        generate(g, self)
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Stats {
    /// Reachable states of the LR(0) automaton, when one was built.
    pub lr0_states: usize,
    /// Reachable states of the final automaton.
    pub states: usize,
    pub final_states: usize,
    pub clones: usize,
    pub merges: usize,
    pub traced_configs: usize,
}

#[derive(Debug)]
pub struct Output {
    pub automaton: Automaton,
    pub table: ParsingTable,
    pub ambiguities: Vec<Ambiguity>,
    pub stats: Stats,
}

pub fn generate(g: &Grammar, options: &Options) -> Result<Output, ConstructionError> {
    generate_with_reporter(g, options, &mut TracingReporter)
}

#[tracing::instrument(skip_all, fields(mode = ?options.mode))]
pub fn generate_with_reporter(
    g: &Grammar,
    options: &Options,
    reporter: &mut dyn Reporter,
) -> Result<Output, ConstructionError> {
    let first = FirstSets::new(g);
    let mut stats = Stats::default();
    let mut ambiguities = vec![];

    let (automaton, table) = match options.mode {
        Mode::LR0 => {
            let automaton = build(g, &first, MergeMode::LR0);
            stats.lr0_states = count_reachable(&automaton);
            let table = ParsingTable::build(g, &automaton, true)?;
            (automaton, table)
        }

        Mode::LR1 => {
            let merge = if options.combine_compatible_states {
                MergeMode::PGM
            } else {
                MergeMode::Canonical
            };
            let automaton = build(g, &first, merge);
            let table = ParsingTable::build(g, &automaton, false)?;
            (automaton, table)
        }

        Mode::LALR | Mode::LaneTracing(..) => {
            let mut automaton = build(g, &first, MergeMode::LR0);
            stats.lr0_states = count_reachable(&automaton);

            let (found, traced) = lane::trace_all(g, &first, &mut automaton);
            ambiguities = found;
            stats.traced_configs = traced;

            let mut table = ParsingTable::build(g, &automaton, false)?;

            if let Mode::LaneTracing(phase2) = options.mode {
                if table.conflicts().reduce_reduce > 0 {
                    let region =
                        lane::mark_conflict_lanes(g, &first, &mut automaton, table.conflicts());
                    if !region.is_empty() {
                        let split = lane::split(g, &first, &mut automaton, &region, phase2)?;
                        stats.clones = split.clones;
                        stats.merges = split.merges;
                        table = ParsingTable::build(g, &automaton, false)?;
                    }
                }
            }

            (automaton, table)
        }
    };

    stats.states = count_reachable(&automaton);
    stats.final_states = table.final_states().len();

    let reachable = automaton.reachable();
    for state in automaton.states() {
        if reachable.get(state.id.index()).unwrap_or(false) {
            reporter.state(g, state, &table);
        }
    }
    for ambiguity in &ambiguities {
        reporter.ambiguity(g, ambiguity);
    }
    let log = table.conflicts();
    reporter.conflict_summary(g, log);
    if log.shift_shift > 0 {
        reporter.shift_shift(log.shift_shift);
    }

    if options.strict_expect {
        let expected = g.expect.unwrap_or(0);
        if log.shift_reduce != expected || log.reduce_reduce != 0 {
            return Err(ConstructionError::ExpectMismatch {
                expected,
                shift_reduce: log.shift_reduce,
                reduce_reduce: log.reduce_reduce,
            });
        }
    }

    tracing::debug!("{:?}", stats);
    Ok(Output {
        automaton,
        table,
        ambiguities,
        stats,
    })
}

fn count_reachable(automaton: &Automaton) -> usize {
    automaton.reachable().iter().filter(|b| *b).count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        grammar::{Assoc, SymbolID::*},
        report::CollectingReporter,
    };

    // S -> if E then S | if E then S else S | x ; E -> c
    fn dangling_else(expect: Option<usize>) -> Grammar {
        Grammar::define(|g| {
            let if_ = g.terminal("if", None)?;
            let then = g.terminal("then", None)?;
            let else_ = g.terminal("else", None)?;
            let x = g.terminal("x", None)?;
            let c = g.terminal("c", None)?;
            let s = g.nonterminal("S")?;
            let e = g.nonterminal("E")?;
            g.rule(s, [T(if_), N(e), T(then), N(s)], None)?;
            g.rule(s, [T(if_), N(e), T(then), N(s), T(else_), N(s)], None)?;
            g.rule(s, [T(x)], None)?;
            g.rule(e, [T(c)], None)?;
            if let Some(n) = expect {
                g.expect(n);
            }
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn every_mode_builds() -> anyhow::Result<()> {
        let g = dangling_else(None);
        for options in [
            Options::new().use_lr0().clone(),
            Options::new().use_lalr().clone(),
            Options::new().use_canonical().clone(),
            Options::new().use_pgm().clone(),
            Options::new().use_lane_tracing(Phase2::PGM).clone(),
            Options::new().use_lane_tracing(Phase2::LTT).clone(),
        ] {
            let output = options.generate(&g)?;
            assert_eq!(output.table.num_states(), output.automaton.len());
            assert!(output.stats.states > 0);
        }
        Ok(())
    }

    #[test]
    fn strict_expect() {
        let g = dangling_else(None);
        let err = Options::new()
            .use_lalr()
            .strict_expect(true)
            .generate(&g)
            .unwrap_err();
        assert!(matches!(
            err,
            ConstructionError::ExpectMismatch {
                expected: 0,
                shift_reduce: 1,
                reduce_reduce: 0
            }
        ));

        let g = dangling_else(Some(1));
        let output = Options::new()
            .use_lalr()
            .strict_expect(true)
            .generate(&g)
            .unwrap();
        assert_eq!(output.table.conflicts().shift_reduce, 1);
    }

    #[test]
    fn reporter_receives_listing() {
        let g = Grammar::define(|g| {
            let prec = g.precedence(Assoc::Left);
            let plus = g.quoted_terminal("+", Some(prec))?;
            let n = g.terminal("n", None)?;
            let e = g.nonterminal("E")?;
            g.rule(e, [N(e), T(plus), N(e)], None)?;
            g.rule(e, [T(n)], None)?;
            Ok(())
        })
        .unwrap();

        let mut reporter = CollectingReporter::default();
        let output = generate_with_reporter(&g, &Options::new(), &mut reporter).unwrap();
        assert_eq!(output.table.conflicts().unresolved(), 0);
        assert!(reporter.text.contains("#### State 00"));
        assert!(reporter.text.contains("(by precedence)"));
        assert!(reporter
            .text
            .contains("0 shift/reduce, 0 reduce/reduce conflicts"));
    }
}
