//! Diagnostic sink.

use crate::{
    automaton::State,
    grammar::Grammar,
    lane::Ambiguity,
    table::{ConflictLog, ParsingTable},
    util::display_fn,
};
use std::fmt::{self, Write as _};

/// Receives the diagnostics of a construction run.
pub trait Reporter {
    /// Called for every reachable state after the final table is built.
    fn state(&mut self, g: &Grammar, state: &State, table: &ParsingTable);

    fn ambiguity(&mut self, g: &Grammar, ambiguity: &Ambiguity);

    fn conflict_summary(&mut self, g: &Grammar, log: &ConflictLog);

    fn shift_shift(&mut self, count: usize);
}

/// The listing of `state` with the conflicts the table recorded for it.
pub fn display_state<'a>(
    g: &'a Grammar,
    state: &'a State,
    table: &'a ParsingTable,
) -> impl fmt::Display + 'a {
    display_fn(move |f| {
        write!(f, "{}", state.display(g))?;
        let mut conflicts = table.conflicts().of_state(state.id).peekable();
        if conflicts.peek().is_some() {
            writeln!(f, "## conflicts")?;
            for conflict in conflicts {
                writeln!(f, "- {}", conflict.display(g))?;
            }
        }
        Ok(())
    })
}

fn summary(g: &Grammar, log: &ConflictLog) -> String {
    let mut s = format!(
        "{} shift/reduce, {} reduce/reduce conflicts",
        log.shift_reduce, log.reduce_reduce
    );
    if let Some(expect) = g.expect {
        let _ = write!(s, " (expected {} shift/reduce)", expect);
    }
    s
}

/// Forwards every diagnostic to `tracing`.
#[derive(Debug, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn state(&mut self, g: &Grammar, state: &State, table: &ParsingTable) {
        tracing::trace!("\n{}", display_state(g, state, table));
    }

    fn ambiguity(&mut self, g: &Grammar, ambiguity: &Ambiguity) {
        tracing::warn!("ambiguous grammar: {}", ambiguity.display(g));
    }

    fn conflict_summary(&mut self, g: &Grammar, log: &ConflictLog) {
        let matches_expect = match g.expect {
            Some(expect) => expect == log.shift_reduce && log.reduce_reduce == 0,
            None => log.unresolved() == 0,
        };
        if matches_expect {
            tracing::debug!("{}", summary(g, log));
        } else {
            tracing::warn!("{}", summary(g, log));
        }
    }

    fn shift_shift(&mut self, count: usize) {
        tracing::warn!("{} shift/shift conflicts", count);
    }
}

/// Keeps a plain-text report in memory.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    pub text: String,
    pub ambiguities: usize,
}

impl Reporter for CollectingReporter {
    fn state(&mut self, g: &Grammar, state: &State, table: &ParsingTable) {
        let _ = writeln!(self.text, "{}", display_state(g, state, table));
    }

    fn ambiguity(&mut self, g: &Grammar, ambiguity: &Ambiguity) {
        self.ambiguities += 1;
        let _ = writeln!(self.text, "ambiguity: {}", ambiguity.display(g));
    }

    fn conflict_summary(&mut self, g: &Grammar, log: &ConflictLog) {
        let _ = writeln!(self.text, "{}", summary(g, log));
    }

    fn shift_shift(&mut self, count: usize) {
        let _ = writeln!(self.text, "{} shift/shift conflicts", count);
    }
}
