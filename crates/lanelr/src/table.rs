//! The dense action/goto table and the conflict resolver.

use crate::{
    automaton::{Automaton, State, StateID},
    generate::ConstructionError,
    grammar::{Assoc, Grammar, RuleID, SymbolID, TerminalID},
    types::Set,
    util::display_fn,
};
use lanelr_runtime::{ParseAction, ParseTable};
use std::{cmp::Ordering, fmt, str::FromStr};

const ACCEPT: i32 = i32::MIN;

/// The decoded content of a table cell.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    Shift(StateID),
    Reduce(RuleID),
    Goto(StateID),
    Accept,
    Error,
}

impl Action {
    /// Encode into a cell: positive for a target state, negative for a
    /// rule, `i32::MIN` for accept and zero for error.
    ///
    /// The start state has no incoming transition, so a target is never zero.
    fn encode(self) -> i32 {
        match self {
            Self::Shift(s) | Self::Goto(s) => s.index() as i32,
            Self::Reduce(r) => -(r.index() as i32),
            Self::Accept => ACCEPT,
            Self::Error => 0,
        }
    }

    fn decode(raw: i32, column: usize, num_terminals: usize) -> Self {
        match raw {
            0 => Self::Error,
            ACCEPT => Self::Accept,
            raw if raw < 0 => match RuleID::from_index(raw.unsigned_abs() as usize) {
                Some(rule) => Self::Reduce(rule),
                None => Self::Error,
            },
            raw => match StateID::from_index(raw as usize) {
                Some(s) if column < num_terminals => Self::Shift(s),
                Some(s) => Self::Goto(s),
                None => Self::Error,
            },
        }
    }

    fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| match self {
            Self::Shift(s) => write!(f, "shift({:02})", s),
            Self::Goto(s) => write!(f, "goto({:02})", s),
            Self::Reduce(r) => write!(f, "reduce({})", g.rule(*r).display(g)),
            Self::Accept => f.write_str("accept"),
            Self::Error => f.write_str("error"),
        })
    }
}

/// Per-rule data consumed by the driver and the code emitter.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RuleInfo {
    /// The column of the left-hand side. `None` for the goal rule.
    pub lhs_column: Option<usize>,
    pub rhs_len: usize,
    pub has_code: bool,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
    /// A reduction on `$end` in the accepting state. LR(0) only.
    AcceptReduce,
}

/// A cell on which a reduction competed with another action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub lookahead: TerminalID,
    pub reduce: RuleID,
    /// The action that was in the cell before the reduction arrived.
    pub other: Action,
    pub decision: Action,
    /// Settled by precedence/associativity. Such conflicts are not counted.
    pub by_precedence: bool,
}

impl Conflict {
    pub fn kind(&self) -> ConflictKind {
        match self.other {
            Action::Shift(..) => ConflictKind::ShiftReduce,
            Action::Accept => ConflictKind::AcceptReduce,
            _ => ConflictKind::ReduceReduce,
        }
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let kind = match self.kind() {
                ConflictKind::ShiftReduce => "shift/reduce",
                ConflictKind::ReduceReduce => "reduce/reduce",
                ConflictKind::AcceptReduce => "accept/reduce",
            };
            write!(
                f,
                "{} conflict on {}: {} vs {} => {}",
                kind,
                g.terminals[&self.lookahead],
                Action::Reduce(self.reduce).display(g),
                self.other.display(g),
                self.decision.display(g),
            )?;
            if self.by_precedence {
                f.write_str(" (by precedence)")?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConflictLog {
    pub conflicts: Vec<Conflict>,
    pub shift_reduce: usize,
    pub reduce_reduce: usize,
    pub shift_shift: usize,
    /// States with at least one conflict not settled by precedence.
    pub inadequate: Set<StateID>,
}

impl ConflictLog {
    pub fn of_state(&self, state: StateID) -> impl Iterator<Item = &Conflict> + '_ {
        self.conflicts.iter().filter(move |c| c.state == state)
    }

    /// The number of shift/reduce and reduce/reduce conflicts that were not
    /// settled by precedence.
    pub fn unresolved(&self) -> usize {
        self.shift_reduce + self.reduce_reduce
    }

    fn record(&mut self, conflict: Conflict) {
        if !conflict.by_precedence {
            match conflict.kind() {
                ConflictKind::ShiftReduce => self.shift_reduce += 1,
                ConflictKind::ReduceReduce => self.reduce_reduce += 1,
                ConflictKind::AcceptReduce => {}
            }
            self.inadequate.insert(conflict.state);
        }
        self.conflicts.push(conflict);
    }
}

/// The parsing table: one row per state, one column per symbol
/// (`$end`, the terminals, then the nonterminals).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsingTable {
    columns: Vec<String>,
    num_terminals: usize,
    rules: Vec<RuleInfo>,
    num_states: usize,
    cells: Vec<i32>,
    /// States whose only action is a single reduction, with that rule.
    final_states: Vec<(StateID, RuleID)>,
    conflicts: ConflictLog,
}

impl ParsingTable {
    fn empty(g: &Grammar) -> Self {
        let columns = g
            .columns()
            .into_iter()
            .map(|symbol| g.display_symbol(symbol).to_string())
            .collect();
        let rules = g
            .rules
            .values()
            .map(|rule| RuleInfo {
                lhs_column: g.column_of(SymbolID::N(rule.left())),
                rhs_len: rule.right().len(),
                has_code: rule.has_code(),
            })
            .collect();
        Self {
            columns,
            num_terminals: g.num_terminals(),
            rules,
            num_states: 0,
            cells: vec![],
            final_states: vec![],
            conflicts: ConflictLog::default(),
        }
    }

    /// Fill the table from the state graph.
    ///
    /// Unreachable states keep an empty row. With `lr0`, reductions are
    /// entered on every terminal regardless of context.
    #[tracing::instrument(skip_all)]
    pub fn build(g: &Grammar, automaton: &Automaton, lr0: bool) -> Result<Self, ConstructionError> {
        let mut table = Self::empty(g);
        table.grow(automaton.len());

        let reachable = automaton.reachable();
        for state in automaton.states() {
            if !reachable.get(state.id.index()).unwrap_or(false) {
                continue;
            }
            table.fill_row(g, state, lr0)?;
        }

        table.collect_final_states(&reachable);

        tracing::debug!(
            "{} states, {} shift/reduce, {} reduce/reduce",
            automaton.len(),
            table.conflicts.shift_reduce,
            table.conflicts.reduce_reduce,
        );
        Ok(table)
    }

    /// Make room for `num_states` rows, doubling the storage as needed.
    fn grow(&mut self, num_states: usize) {
        if num_states <= self.num_states {
            return;
        }
        let width = self.columns.len();
        let mut capacity = self.cells.capacity().max(width);
        while capacity < num_states * width {
            capacity *= 2;
        }
        self.cells.reserve_exact(capacity - self.cells.len());
        self.cells.resize(num_states * width, 0);
        self.num_states = num_states;
    }

    fn fill_row(&mut self, g: &Grammar, state: &State, lr0: bool) -> Result<(), ConstructionError> {
        for (symbol, target) in &state.successors {
            let Some(column) = g.column_of(*symbol) else { continue };
            let action = if column < self.num_terminals {
                Action::Shift(*target)
            } else {
                Action::Goto(*target)
            };
            let current = self.get(state.id, column);
            if current != Action::Error && current != action {
                tracing::warn!(
                    "shift/shift conflict in state {} on {}: {:?} vs {:?}",
                    state.id,
                    g.display_symbol(*symbol),
                    current,
                    action
                );
                self.conflicts.shift_shift += 1;
                continue;
            }
            self.set(state.id, column, action);
        }

        for i in state.final_configs(g) {
            let config = &state.configs[i];
            let rule = config.core.rule;
            let lookaheads: Vec<TerminalID> = if lr0 {
                g.terminals.keys().copied().collect()
            } else {
                config.context.iter().collect()
            };

            if rule == RuleID::ACCEPT {
                if lr0 || config.context.contains(TerminalID::EOI) {
                    self.insert_accept(state.id, lr0)?;
                }
                continue;
            }

            for t in lookaheads {
                self.insert_reduce(g, state.id, t, rule, lr0)?;
            }
        }

        Ok(())
    }

    fn insert_accept(&mut self, state: StateID, lr0: bool) -> Result<(), ConstructionError> {
        let column = TerminalID::EOI.index();
        match self.get(state, column) {
            Action::Reduce(rule) if lr0 => {
                self.conflicts.record(Conflict {
                    state,
                    lookahead: TerminalID::EOI,
                    reduce: rule,
                    other: Action::Accept,
                    decision: Action::Accept,
                    by_precedence: false,
                });
                self.set(state, column, Action::Accept);
                Ok(())
            }
            Action::Reduce(rule) => Err(ConstructionError::AcceptReduceClash { state, rule }),
            _ => {
                self.set(state, column, Action::Accept);
                Ok(())
            }
        }
    }

    fn insert_reduce(
        &mut self,
        g: &Grammar,
        state: StateID,
        t: TerminalID,
        rule: RuleID,
        lr0: bool,
    ) -> Result<(), ConstructionError> {
        let column = t.index();
        let current = self.get(state, column);
        let (decision, by_precedence) = match current {
            Action::Error => {
                self.set(state, column, Action::Reduce(rule));
                return Ok(());
            }
            Action::Reduce(other) if other == rule => return Ok(()),

            Action::Accept if lr0 => (Action::Accept, false),
            Action::Accept => return Err(ConstructionError::AcceptReduceClash { state, rule }),

            // the earlier declared rule wins.
            Action::Reduce(other) => (Action::Reduce(other.min(rule)), false),

            Action::Shift(..) => match resolve_shift_reduce(g, t, rule) {
                Some(Resolution::Reduce) => (Action::Reduce(rule), true),
                Some(Resolution::Shift) => (current, true),
                None => (current, false),
            },

            Action::Goto(..) => return Ok(()),
        };

        let conflict = Conflict {
            state,
            lookahead: t,
            reduce: rule,
            other: current,
            decision,
            by_precedence,
        };
        tracing::trace!("state {}: {}", state, conflict.display(g));
        self.conflicts.record(conflict);
        self.set(state, column, decision);
        Ok(())
    }

    fn collect_final_states(&mut self, reachable: &bit_vec::BitVec) {
        self.final_states.clear();
        for index in 0..self.num_states {
            if !reachable.get(index).unwrap_or(false) {
                continue;
            }
            let row = &self.cells[index * self.columns.len()..][..self.columns.len()];
            if row[self.num_terminals..].iter().any(|&c| c != 0) {
                continue;
            }
            let mut reduces = row[..self.num_terminals].iter().filter(|&&c| c != 0);
            let Some(&first) = reduces.next() else { continue };
            if first < 0 && first != ACCEPT && reduces.all(|&c| c == first) {
                if let (Some(state), Some(rule)) = (
                    StateID::from_index(index),
                    RuleID::from_index(first.unsigned_abs() as usize),
                ) {
                    self.final_states.push((state, rule));
                }
            }
        }
    }

    pub fn num_states(&self) -> usize {
        self.num_states
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn num_terminals(&self) -> usize {
        self.num_terminals
    }

    /// Column headers in column order.
    pub fn columns(&self) -> &[String] {
        &self.columns[..]
    }

    pub fn column_by_name(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Indexed by `RuleID::index`.
    pub fn rules(&self) -> &[RuleInfo] {
        &self.rules[..]
    }

    pub fn final_states(&self) -> &[(StateID, RuleID)] {
        &self.final_states[..]
    }

    pub fn conflicts(&self) -> &ConflictLog {
        &self.conflicts
    }

    /// The raw cells of the row of `state`.
    pub fn row(&self, state: StateID) -> &[i32] {
        let width = self.columns.len();
        &self.cells[state.index() * width..][..width]
    }

    pub fn get(&self, state: StateID, column: usize) -> Action {
        let raw = self.cells[state.index() * self.columns.len() + column];
        Action::decode(raw, column, self.num_terminals)
    }

    fn set(&mut self, state: StateID, column: usize, action: Action) {
        let width = self.columns.len();
        self.cells[state.index() * width + column] = action.encode();
    }

    /// States reachable from the start state through shift and goto cells.
    fn reachable_rows(&self) -> Vec<bool> {
        let mut reached = vec![false; self.num_states];
        if self.num_states == 0 {
            return reached;
        }
        reached[0] = true;
        let mut stack = vec![0];
        while let Some(index) = stack.pop() {
            let width = self.columns.len();
            for &cell in &self.cells[index * width..][..width] {
                if cell > 0 && !reached[cell as usize] {
                    reached[cell as usize] = true;
                    stack.push(cell as usize);
                }
            }
        }
        reached
    }

    /// Drop the rows of unreachable states and renumber the rest densely.
    pub fn compact_unreachable(&self) -> (Self, StateRemap) {
        let reached = self.reachable_rows();

        let mut to_virtual = vec![None; self.num_states];
        let mut to_actual = vec![];
        for (index, _) in reached.iter().enumerate().filter(|(_, r)| **r) {
            let Some(actual) = StateID::from_index(index) else { continue };
            to_virtual[index] = StateID::from_index(to_actual.len());
            to_actual.push(actual);
        }
        let remap = StateRemap {
            to_virtual,
            to_actual,
        };

        let width = self.columns.len();
        let mut cells = Vec::with_capacity(remap.to_actual.len() * width);
        for actual in &remap.to_actual {
            cells.extend(self.row(*actual).iter().map(|&cell| match cell {
                cell if cell > 0 => remap.raw(cell),
                cell => cell,
            }));
        }

        let map_action = |action: Action| match action {
            Action::Shift(s) => remap.virtual_of(s).map_or(Action::Error, Action::Shift),
            Action::Goto(s) => remap.virtual_of(s).map_or(Action::Error, Action::Goto),
            action => action,
        };

        let mut conflicts = ConflictLog {
            shift_shift: self.conflicts.shift_shift,
            ..ConflictLog::default()
        };
        for conflict in &self.conflicts.conflicts {
            let Some(state) = remap.virtual_of(conflict.state) else { continue };
            conflicts.record(Conflict {
                state,
                other: map_action(conflict.other),
                decision: map_action(conflict.decision),
                ..conflict.clone()
            });
        }

        let final_states = self
            .final_states
            .iter()
            .filter_map(|(s, r)| Some((remap.virtual_of(*s)?, *r)))
            .collect();

        let table = Self {
            columns: self.columns.clone(),
            num_terminals: self.num_terminals,
            rules: self.rules.clone(),
            num_states: remap.to_actual.len(),
            cells,
            final_states,
            conflicts,
        };
        (table, remap)
    }

    /// Serialize the table into the line-oriented text format read by
    /// [`ParsingTable::parse`].
    pub fn dump(&self) -> String {
        self.to_string()
    }

    /// Read a table written by [`ParsingTable::dump`].
    pub fn parse(text: &str) -> Result<Self, TableFormatError> {
        let mut r = Reader {
            lines: text.lines(),
            line: 0,
        };

        let [num_columns, num_terminals] = r.header("%columns")?;
        if num_terminals > num_columns {
            return Err(r.error("more terminals than columns"));
        }
        // header counts are untrusted; vectors grow with the lines actually read.
        let mut columns = vec![];
        for _ in 0..num_columns {
            columns.push(r.next_line()?.to_owned());
        }

        let [num_rules] = r.header("%rules")?;
        let mut rules = vec![];
        for _ in 0..num_rules {
            let line = r.next_line()?;
            let fields: Vec<&str> = line.split_whitespace().collect();
            let [lhs, rhs_len, has_code] = fields[..] else {
                return Err(r.error("expected `<lhs> <rhs_len> <has_code>`"));
            };
            let lhs_column = match lhs {
                "-" => None,
                lhs => Some(r.number::<usize>(lhs)?),
            };
            rules.push(RuleInfo {
                lhs_column,
                rhs_len: r.number(rhs_len)?,
                has_code: r.number::<u8>(has_code)? != 0,
            });
        }

        let [num_states] = r.header("%states")?;
        if StateID::from_index(num_states).is_none()
            || num_states.checked_mul(num_columns).is_none()
        {
            return Err(r.error("too many states"));
        }
        let mut cells = vec![];
        for _ in 0..num_states {
            let line = r.next_line()?;
            let row: Vec<i32> = r.numbers(line)?;
            if row.len() != num_columns {
                return Err(r.error("wrong number of cells"));
            }
            for &cell in &row {
                match cell {
                    0 | ACCEPT => {}
                    cell if cell > 0 => {
                        r.state(cell as usize, num_states)?;
                    }
                    cell => {
                        r.rule(cell.unsigned_abs() as usize, num_rules)?;
                    }
                }
            }
            cells.extend(row);
        }

        let [num_final] = r.header("%final")?;
        let mut final_states = vec![];
        for _ in 0..num_final {
            let [state, rule] = r.fixed::<2>()?;
            final_states.push((r.state(state, num_states)?, r.rule(rule, num_rules)?));
        }

        let [num_conflicts, shift_reduce, reduce_reduce, shift_shift] = r.header("%conflicts")?;
        let mut conflict_list = vec![];
        for _ in 0..num_conflicts {
            let line = r.next_line()?;
            let fields: Vec<i64> = r.numbers(line)?;
            let [state, lookahead, reduce, other, decision, by_precedence] = fields[..] else {
                return Err(r.error("expected six fields in a conflict"));
            };
            let column = usize::try_from(lookahead).map_err(|_| r.error("bad lookahead"))?;
            let lookahead = TerminalID::from_index(column)
                .filter(|_| column < num_terminals)
                .ok_or_else(|| r.error("bad lookahead"))?;
            let other = i32::try_from(other).map_err(|_| r.error("bad action"))?;
            let decision = i32::try_from(decision).map_err(|_| r.error("bad action"))?;
            conflict_list.push(Conflict {
                state: r.state(
                    usize::try_from(state).map_err(|_| r.error("bad state"))?,
                    num_states,
                )?,
                lookahead,
                reduce: r.rule(
                    usize::try_from(reduce).map_err(|_| r.error("bad rule"))?,
                    num_rules,
                )?,
                other: Action::decode(other, column, num_terminals),
                decision: Action::decode(decision, column, num_terminals),
                by_precedence: by_precedence != 0,
            });
        }

        let [num_inadequate] = r.header("%inadequate")?;
        let mut inadequate = Set::default();
        for _ in 0..num_inadequate {
            let [state] = r.fixed::<1>()?;
            inadequate.insert(r.state(state, num_states)?);
        }

        Ok(Self {
            columns,
            num_terminals,
            rules,
            num_states,
            cells,
            final_states,
            conflicts: ConflictLog {
                conflicts: conflict_list,
                shift_reduce,
                reduce_reduce,
                shift_shift,
                inadequate,
            },
        })
    }
}

impl fmt::Display for ParsingTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "%columns {} {}", self.columns.len(), self.num_terminals)?;
        for column in &self.columns {
            writeln!(f, "{}", column)?;
        }

        writeln!(f, "%rules {}", self.rules.len())?;
        for rule in &self.rules {
            match rule.lhs_column {
                Some(column) => write!(f, "{}", column)?,
                None => f.write_str("-")?,
            }
            writeln!(f, " {} {}", rule.rhs_len, rule.has_code as u8)?;
        }

        writeln!(f, "%states {}", self.num_states)?;
        for index in 0..self.num_states {
            let width = self.columns.len();
            let row = &self.cells[index * width..][..width];
            for (i, cell) in row.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{}", cell)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "%final {}", self.final_states.len())?;
        for (state, rule) in &self.final_states {
            writeln!(f, "{} {}", state, rule)?;
        }

        let log = &self.conflicts;
        writeln!(
            f,
            "%conflicts {} {} {} {}",
            log.conflicts.len(),
            log.shift_reduce,
            log.reduce_reduce,
            log.shift_shift
        )?;
        for c in &log.conflicts {
            writeln!(
                f,
                "{} {} {} {} {} {}",
                c.state,
                c.lookahead.index(),
                c.reduce,
                c.other.encode(),
                c.decision.encode(),
                c.by_precedence as u8
            )?;
        }

        writeln!(f, "%inadequate {}", log.inadequate.len())?;
        for state in &log.inadequate {
            writeln!(f, "{}", state)?;
        }
        Ok(())
    }
}

impl ParseTable for ParsingTable {
    type State = StateID;
    type Symbol = usize;
    type Rule = RuleID;

    fn initial_state(&self) -> Self::State {
        StateID::START
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> ParseAction<Self::State, Self::Symbol, Self::Rule> {
        let column = lookahead.unwrap_or(TerminalID::EOI.index());
        if current.index() >= self.num_states || column >= self.num_terminals {
            return ParseAction::Error;
        }

        match self.get(current, column) {
            Action::Shift(next) => ParseAction::Shift(next),
            Action::Reduce(rule) => match self.rules.get(rule.index()) {
                Some(RuleInfo {
                    lhs_column: Some(lhs),
                    rhs_len,
                    ..
                }) => ParseAction::Reduce {
                    rule,
                    lhs: *lhs,
                    len: *rhs_len,
                },
                _ => ParseAction::Error,
            },
            Action::Accept => ParseAction::Accept,
            Action::Goto(..) | Action::Error => ParseAction::Error,
        }
    }

    fn goto(&self, current: Self::State, lhs: Self::Symbol) -> Option<Self::State> {
        if current.index() >= self.num_states || lhs >= self.columns.len() {
            return None;
        }
        match self.get(current, lhs) {
            Action::Goto(next) => Some(next),
            _ => None,
        }
    }
}

/// Mapping between actual state numbers (automaton indices) and the dense
/// virtual numbers of a compacted table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateRemap {
    to_virtual: Vec<Option<StateID>>,
    to_actual: Vec<StateID>,
}

impl StateRemap {
    pub fn virtual_of(&self, actual: StateID) -> Option<StateID> {
        self.to_virtual.get(actual.index()).copied().flatten()
    }

    pub fn actual_of(&self, virtual_: StateID) -> Option<StateID> {
        self.to_actual.get(virtual_.index()).copied()
    }

    fn raw(&self, cell: i32) -> i32 {
        self.to_virtual
            .get(cell as usize)
            .copied()
            .flatten()
            .map_or(0, |s| s.index() as i32)
    }
}

#[derive(Debug, thiserror::Error)]
#[error("line {line}: {reason}")]
pub struct TableFormatError {
    pub line: usize,
    pub reason: String,
}

struct Reader<'a> {
    lines: std::str::Lines<'a>,
    line: usize,
}

impl<'a> Reader<'a> {
    fn error(&self, reason: &str) -> TableFormatError {
        TableFormatError {
            line: self.line,
            reason: reason.into(),
        }
    }

    fn next_line(&mut self) -> Result<&'a str, TableFormatError> {
        self.line += 1;
        self.lines
            .next()
            .ok_or_else(|| self.error("unexpected end of input"))
    }

    fn number<T: FromStr>(&self, s: &str) -> Result<T, TableFormatError> {
        s.parse().map_err(|_| self.error("invalid number"))
    }

    fn numbers<T: FromStr>(&self, line: &str) -> Result<Vec<T>, TableFormatError> {
        line.split_whitespace().map(|s| self.number(s)).collect()
    }

    fn fixed<const N: usize>(&mut self) -> Result<[usize; N], TableFormatError> {
        let line = self.next_line()?;
        let values: Vec<usize> = self.numbers(line)?;
        <[usize; N]>::try_from(values).map_err(|_| self.error("wrong number of fields"))
    }

    fn header<const N: usize>(&mut self, tag: &str) -> Result<[usize; N], TableFormatError> {
        let line = self.next_line()?;
        let rest = line
            .strip_prefix(tag)
            .ok_or_else(|| self.error(&format!("expected `{}`", tag)))?;
        let values: Vec<usize> = self.numbers(rest)?;
        <[usize; N]>::try_from(values).map_err(|_| self.error("wrong number of fields"))
    }

    fn state(&self, index: usize, num_states: usize) -> Result<StateID, TableFormatError> {
        StateID::from_index(index)
            .filter(|_| index < num_states)
            .ok_or_else(|| self.error("state out of range"))
    }

    fn rule(&self, index: usize, num_rules: usize) -> Result<RuleID, TableFormatError> {
        RuleID::from_index(index)
            .filter(|_| index < num_rules)
            .ok_or_else(|| self.error("rule out of range"))
    }
}

enum Resolution {
    Shift,
    Reduce,
}

/// Settle a shift/reduce conflict on `t` against `rule` by precedence.
/// `None` when either side has no precedence.
fn resolve_shift_reduce(g: &Grammar, t: TerminalID, rule: RuleID) -> Option<Resolution> {
    let shift_prec = g.terminals[&t].precedence()?;
    let reduce_prec = g.rule(rule).precedence(g)?;
    match Ord::cmp(&reduce_prec.priority, &shift_prec.priority) {
        Ordering::Greater => Some(Resolution::Reduce),
        Ordering::Less => Some(Resolution::Shift),
        Ordering::Equal => match shift_prec.assoc {
            Assoc::Left => Some(Resolution::Reduce),
            Assoc::Right | Assoc::Nonassoc => Some(Resolution::Shift),
        },
    }
}
