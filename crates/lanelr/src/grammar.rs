//! Grammar types.

use crate::{types::Map, util::display_fn};
use bit_vec::BitVec;
use std::{fmt, marker::PhantomData};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}
impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::new(0);

    /// Reserved symbol used as an error token.
    pub const ERROR: Self = Self::new(1);

    const OFFSET: u16 = 2;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    /// The dense index of this terminal, which is also its table column.
    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        u16::try_from(index).ok().map(Self::new)
    }
}

#[derive(Debug)]
pub struct Terminal {
    id: TerminalID,
    name: String,
    precedence: Option<Precedence>,
    quoted: bool,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn precedence(&self) -> Option<Precedence> {
        self.precedence
    }

    /// Whether the terminal was declared as a quoted literal such as `'+'`.
    pub fn is_quoted(&self) -> bool {
        self.quoted
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quoted {
            write!(f, "'{}'", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}
impl NonterminalID {
    /// The synthetic goal symbol `$accept`.
    pub const START: Self = Self::new(0);
    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

#[derive(Debug)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct RuleID {
    raw: u16,
}

impl RuleID {
    /// The synthetic goal rule `$accept -> Start`.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.raw as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        u16::try_from(index).ok().map(Self::new)
    }
}

impl fmt::Display for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug)]
pub struct Rule {
    id: RuleID,
    left: NonterminalID,
    right: Vec<SymbolID>,
    prec: Option<TerminalID>,
    has_code: bool,
}
impl Rule {
    pub fn id(&self) -> RuleID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    /// The terminal whose precedence this rule takes: the `%prec` override,
    /// or else the last terminal of the right-hand side.
    pub fn precedence_terminal(&self) -> Option<TerminalID> {
        self.prec.or_else(|| {
            self.right.iter().rev().find_map(|symbol| match symbol {
                SymbolID::T(t) => Some(*t),
                SymbolID::N(..) => None,
            })
        })
    }

    pub fn precedence(&self, g: &Grammar) -> Option<Precedence> {
        self.precedence_terminal()
            .and_then(|t| g.terminals[&t].precedence())
    }

    /// Whether a semantic action is attached to this rule.
    pub fn has_code(&self) -> bool {
        self.has_code
    }

    /// `A -> B` without a semantic action.
    pub fn is_unit_production(&self) -> bool {
        self.id != RuleID::ACCEPT
            && !self.has_code
            && matches!(self.right[..], [SymbolID::N(..)])
    }

    // `"LHS := R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} :=", g.nonterminals[&self.left()])?;
            if self.right.is_empty() {
                f.write_str(" %empty")?;
            }
            for symbol in self.right() {
                write!(f, " {}", g.display_symbol(*symbol))?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Precedence {
    pub priority: u16,
    pub assoc: Assoc,
}

impl Precedence {
    pub const fn new(priority: u16, assoc: Assoc) -> Self {
        Self { priority, assoc }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Assoc {
    Left,
    Right,
    Nonassoc,
}

impl fmt::Display for Assoc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
            Self::Nonassoc => write!(f, "nonassoc"),
        }
    }
}

/// The grammar from which the automaton is constructed. Immutable once defined.
#[derive(Debug)]
#[non_exhaustive]
pub struct Grammar {
    pub terminals: Map<TerminalID, Terminal>,
    pub nonterminals: Map<NonterminalID, Nonterminal>,
    pub rules: Map<RuleID, Rule>,
    pub start_symbol: NonterminalID,
    /// The number of tolerated shift/reduce conflicts (`%expect`).
    pub expect: Option<usize>,
    nullables: BitVec,
    rules_by_lhs: Map<NonterminalID, Vec<RuleID>>,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.terminals.values() {
            write!(f, "{}", terminal)?;
            if let Some(prec) = terminal.precedence() {
                write!(f, " (priority={}, assoc={})", prec.priority, prec.assoc)?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            if self.is_nullable(nonterminal.id()) {
                write!(f, " (nullable)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## rules:")?;
        for rule in self.rules.values() {
            write!(f, "{}: {}", rule.id(), rule.display(self))?;
            if let Some(prec) = rule.prec {
                write!(f, " %prec {}", self.terminals[&prec])?;
            }
            writeln!(f)?;
        }

        if let Some(expect) = self.expect {
            writeln!(f, "\n%expect {}", expect)?;
        }

        Ok(())
    }
}

impl Grammar {
    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef<'_>) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            rules: Map::default(),
            start: None,
            expect: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: NonterminalID::OFFSET,
            next_rule_id: RuleID::OFFSET,
            next_priority: 0,
            _marker: PhantomData,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: "$end".into(),
                precedence: None,
                quoted: false,
            },
        );
        def.terminals.insert(
            TerminalID::ERROR,
            Terminal {
                id: TerminalID::ERROR,
                name: "error".into(),
                precedence: None,
                quoted: false,
            },
        );
        def.nonterminals.insert(
            NonterminalID::START,
            Nonterminal {
                id: NonterminalID::START,
                name: "$accept".into(),
            },
        );

        f(&mut def)?;

        def.end()
    }

    pub fn rule(&self, id: RuleID) -> &Rule {
        &self.rules[&id]
    }

    /// The production rules whose left-hand side is `n`, in declaration order.
    pub fn rules_of(&self, n: NonterminalID) -> &[RuleID] {
        self.rules_by_lhs.get(&n).map_or(&[], |rules| &rules[..])
    }

    /// Whether `n` derives the empty string.
    pub fn is_nullable(&self, n: NonterminalID) -> bool {
        self.nullables.get(n.index()).unwrap_or(false)
    }

    pub fn terminal_by_name(&self, name: &str) -> Option<TerminalID> {
        self.terminals
            .values()
            .find(|t| t.name == name)
            .map(Terminal::id)
    }

    pub fn nonterminal_by_name(&self, name: &str) -> Option<NonterminalID> {
        self.nonterminals
            .values()
            .find(|n| n.name == name)
            .map(Nonterminal::id)
    }

    /// The number of terminal columns, including `$end` and `error`.
    pub fn num_terminals(&self) -> usize {
        self.terminals.len()
    }

    /// The number of table columns: terminals followed by nonterminals other than `$accept`.
    pub fn num_columns(&self) -> usize {
        self.terminals.len() + self.nonterminals.len() - 1
    }

    /// The column headers of the parsing table.
    pub fn columns(&self) -> Vec<SymbolID> {
        let terminals = self.terminals.keys().map(|t| SymbolID::T(*t));
        let nonterminals = self
            .nonterminals
            .keys()
            .filter(|n| **n != NonterminalID::START)
            .map(|n| SymbolID::N(*n));
        terminals.chain(nonterminals).collect()
    }

    /// The table column of `symbol`. `$accept` has no column.
    pub fn column_of(&self, symbol: SymbolID) -> Option<usize> {
        match symbol {
            SymbolID::T(t) => Some(t.index()),
            SymbolID::N(NonterminalID::START) => None,
            SymbolID::N(n) => Some(self.terminals.len() + n.index() - 1),
        }
    }

    pub fn display_symbol(&self, symbol: SymbolID) -> impl fmt::Display + '_ {
        display_fn(move |f| match symbol {
            SymbolID::T(t) => write!(f, "{}", self.terminals[&t]),
            SymbolID::N(n) => write!(f, "{}", self.nonterminals[&n]),
        })
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef<'def> {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    rules: Map<RuleID, Rule>,
    start: Option<NonterminalID>,
    expect: Option<usize>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
    next_rule_id: u16,
    next_priority: u16,
    _marker: PhantomData<&'def mut ()>,
}

impl<'def> GrammarDef<'def> {
    /// Allocate a new precedence level, higher than every level allocated before.
    pub fn precedence(&mut self, assoc: Assoc) -> Precedence {
        let prec = Precedence::new(self.next_priority, assoc);
        self.next_priority = self.next_priority.saturating_add(1);
        prec
    }

    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(
        &mut self,
        name: &str,
        precedence: Option<Precedence>,
    ) -> Result<TerminalID, GrammarError> {
        if !verify_ident(name) {
            return Err(GrammarError::InvalidName { name: name.into() });
        }
        self.add_terminal(name, precedence, false)
    }

    /// Declare a quoted literal token such as `'+'`.
    pub fn quoted_terminal(
        &mut self,
        literal: &str,
        precedence: Option<Precedence>,
    ) -> Result<TerminalID, GrammarError> {
        if literal.is_empty() {
            return Err(GrammarError::EmptyQuotedToken);
        }
        self.add_terminal(literal, precedence, true)
    }

    fn add_terminal(
        &mut self,
        name: &str,
        precedence: Option<Precedence>,
        quoted: bool,
    ) -> Result<TerminalID, GrammarError> {
        self.check_unique(name)?;

        let id = TerminalID::new(self.next_terminal_id);
        self.next_terminal_id = self
            .next_terminal_id
            .checked_add(1)
            .ok_or(GrammarError::TooManySymbols { kind: "terminals" })?;

        self.terminals.insert(
            id,
            Terminal {
                id,
                name: name.to_owned(),
                precedence,
                quoted,
            },
        );

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarError> {
        if !verify_ident(name) {
            return Err(GrammarError::InvalidName { name: name.into() });
        }
        self.check_unique(name)?;

        let id = NonterminalID::new(self.next_nonterminal_id);
        self.next_nonterminal_id = self
            .next_nonterminal_id
            .checked_add(1)
            .ok_or(GrammarError::TooManySymbols {
                kind: "nonterminals",
            })?;

        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.to_owned(),
            },
        );

        Ok(id)
    }

    fn check_unique(&self, name: &str) -> Result<(), GrammarError> {
        let terminals = self.terminals.values().map(Terminal::name);
        let nonterminals = self.nonterminals.values().map(Nonterminal::name);
        if terminals.chain(nonterminals).any(|n| n == name) {
            return Err(GrammarError::DuplicateSymbol { name: name.into() });
        }
        Ok(())
    }

    /// Specify a production rule into this grammer.
    ///
    /// `prec` names the terminal whose precedence overrides the default
    /// one (`%prec`).
    pub fn rule<I>(
        &mut self,
        left: NonterminalID,
        right: I,
        prec: Option<&str>,
    ) -> Result<RuleID, GrammarError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let right: Vec<_> = right.into_iter().collect();

        let prec = match prec {
            Some(name) => Some(
                self.terminals
                    .values()
                    .find(|t| t.name == name)
                    .map(Terminal::id)
                    .ok_or_else(|| GrammarError::UndeclaredPrecSymbol { name: name.into() })?,
            ),
            None => None,
        };

        for rule in self.rules.values() {
            if rule.left == left && rule.right == right {
                let mut text = self.nonterminals[&left].name.clone();
                for symbol in &right {
                    text.push(' ');
                    text.push_str(&self.symbol_name(*symbol));
                }
                return Err(GrammarError::DuplicateRule { rule: text });
            }
        }

        let id = RuleID::new(self.next_rule_id);
        self.next_rule_id = self
            .next_rule_id
            .checked_add(1)
            .ok_or(GrammarError::TooManySymbols { kind: "rules" })?;
        self.rules.insert(
            id,
            Rule {
                id,
                left,
                right,
                prec,
                has_code: false,
            },
        );

        Ok(id)
    }

    /// Mark that a semantic action is attached to `rule`.
    pub fn set_has_code(&mut self, rule: RuleID) {
        if let Some(rule) = self.rules.get_mut(&rule) {
            rule.has_code = true;
        }
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarError> {
        self.start.replace(symbol);
        Ok(())
    }

    /// Declare the number of tolerated shift/reduce conflicts.
    pub fn expect(&mut self, shift_reduce: usize) {
        self.expect = Some(shift_reduce);
    }

    fn symbol_name(&self, symbol: SymbolID) -> String {
        match symbol {
            SymbolID::T(t) => self.terminals[&t].to_string(),
            SymbolID::N(n) => self.nonterminals[&n].to_string(),
        }
    }

    fn end(mut self) -> Result<Grammar, GrammarError> {
        // fall back to the first declared nonterminal.
        let start = match self.start.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::START)
                .copied()
                .ok_or(GrammarError::NoNonterminals)?,
        };

        self.rules.insert(
            RuleID::ACCEPT,
            Rule {
                id: RuleID::ACCEPT,
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
                prec: None,
                has_code: false,
            },
        );
        self.rules.sort_unstable_keys();

        let mut rules_by_lhs = Map::<NonterminalID, Vec<RuleID>>::default();
        for rule in self.rules.values() {
            rules_by_lhs.entry(rule.left).or_default().push(rule.id);
        }

        // every nonterminal that is referenced must have a production.
        for rule in self.rules.values() {
            for symbol in &rule.right {
                if let SymbolID::N(n) = symbol {
                    if !rules_by_lhs.contains_key(n) {
                        return Err(GrammarError::UndefinedNonterminal {
                            name: self.nonterminals[n].name.clone(),
                        });
                    }
                }
            }
        }

        let nullables = nullables(&self.nonterminals, &self.rules);
        let productive = productives(&self.nonterminals, &self.rules);
        if !productive.get(start.index()).unwrap_or(false) {
            return Err(GrammarError::UnproductiveStart {
                name: self.nonterminals[&start].name.clone(),
            });
        }
        for nonterminal in self.nonterminals.values() {
            if rules_by_lhs.contains_key(&nonterminal.id)
                && !productive.get(nonterminal.id.index()).unwrap_or(false)
            {
                tracing::warn!(
                    "the nonterminal `{}' derives no terminal string",
                    nonterminal
                );
            }
        }

        let grammar = Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            rules: self.rules,
            start_symbol: start,
            expect: self.expect,
            nullables,
            rules_by_lhs,
        };
        warn_unused_symbols(&grammar);

        Ok(grammar)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("invalid symbol name: `{name}'")]
    InvalidName { name: String },

    #[error("the symbol `{name}' has already been declared")]
    DuplicateSymbol { name: String },

    #[error("empty quoted token")]
    EmptyQuotedToken,

    #[error("undeclared %prec symbol: `{name}'")]
    UndeclaredPrecSymbol { name: String },

    #[error("the nonterminal `{name}' is never defined as a left-hand side")]
    UndefinedNonterminal { name: String },

    #[error("duplicate production rule: `{rule}'")]
    DuplicateRule { rule: String },

    #[error("no nonterminal symbols are declared")]
    NoNonterminals,

    #[error("the start symbol `{name}' derives no terminal string")]
    UnproductiveStart { name: String },

    #[error("too many {kind}")]
    TooManySymbols { kind: &'static str },
}

/// Calculate the set of nullable symbols in this grammar.
fn nullables(nonterminals: &Map<NonterminalID, Nonterminal>, rules: &Map<RuleID, Rule>) -> BitVec {
    let mut nulls = BitVec::from_elem(nonterminals.len(), false);
    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules.values() {
            if nulls.get(rule.left.index()).unwrap_or(false) {
                continue;
            }
            let is_rhs_nullable = rule
                .right
                .iter()
                .all(|symbol| matches!(symbol, SymbolID::N(n) if nulls.get(n.index()).unwrap_or(false)));
            if is_rhs_nullable {
                nulls.set(rule.left.index(), true);
                changed = true;
            }
        }
    }
    nulls
}

/// Calculate the set of nonterminals deriving at least one terminal string.
fn productives(
    nonterminals: &Map<NonterminalID, Nonterminal>,
    rules: &Map<RuleID, Rule>,
) -> BitVec {
    let mut productive = BitVec::from_elem(nonterminals.len(), false);
    let mut changed = true;
    while changed {
        changed = false;
        for rule in rules.values() {
            if productive.get(rule.left.index()).unwrap_or(false) {
                continue;
            }
            let derives = rule.right.iter().all(|symbol| match symbol {
                SymbolID::T(..) => true,
                SymbolID::N(n) => productive.get(n.index()).unwrap_or(false),
            });
            if derives {
                productive.set(rule.left.index(), true);
                changed = true;
            }
        }
    }
    productive
}

fn warn_unused_symbols(g: &Grammar) {
    let mut used_terminals = BitVec::from_elem(g.terminals.len(), false);
    let mut used_nonterminals = BitVec::from_elem(g.nonterminals.len(), false);
    used_terminals.set(TerminalID::EOI.index(), true);
    used_terminals.set(TerminalID::ERROR.index(), true);
    used_nonterminals.set(NonterminalID::START.index(), true);

    let mut stack = vec![NonterminalID::START];
    while let Some(n) = stack.pop() {
        for rule in g.rules_of(n) {
            for symbol in g.rule(*rule).right() {
                match symbol {
                    SymbolID::T(t) => used_terminals.set(t.index(), true),
                    SymbolID::N(n) => {
                        if !used_nonterminals.get(n.index()).unwrap_or(true) {
                            used_nonterminals.set(n.index(), true);
                            stack.push(*n);
                        }
                    }
                }
            }
        }
    }

    for terminal in g.terminals.values() {
        if !used_terminals.get(terminal.id.index()).unwrap_or(true) {
            tracing::warn!("the terminal `{}' is not used", terminal);
        }
    }
    for nonterminal in g.nonterminals.values() {
        if !used_nonterminals.get(nonterminal.id.index()).unwrap_or(true) {
            tracing::warn!("the nonterminal `{}' is not reachable", nonterminal);
        }
    }
}

fn verify_ident(s: &str) -> bool {
    let mut chars = s.chars();
    let Some(first) = chars.next() else {
        // The identifier must not be empty.
        return false;
    };
    if !(first == '_' || unicode_ident::is_xid_start(first)) {
        return false;
    }
    chars.all(|ch| ch == '.' || unicode_ident::is_xid_continue(ch))
}

#[cfg(test)]
mod tests {
    use super::*;
    use SymbolID::*;

    #[test]
    fn columns_skip_accept() {
        let grammar = Grammar::define(|g| {
            let plus = g.quoted_terminal("+", None)?;
            let num = g.terminal("NUM", None)?;
            let e = g.nonterminal("E")?;
            g.rule(e, [N(e), T(plus), T(num)], None)?;
            g.rule(e, [T(num)], None)?;
            Ok(())
        })
        .unwrap();

        let columns = grammar.columns();
        assert_eq!(columns.len(), grammar.num_columns());
        assert_eq!(columns[0], T(TerminalID::EOI));
        let e = grammar.nonterminal_by_name("E").unwrap();
        assert_eq!(grammar.column_of(N(e)), Some(4));
        assert_eq!(columns[4], N(e));
        assert_eq!(grammar.column_of(N(NonterminalID::START)), None);
        assert_eq!(grammar.rule(RuleID::ACCEPT).right(), [N(e)]);
        assert_eq!(grammar.start_symbol, e);
    }

    #[test]
    fn nullable_and_prec_terminal() {
        let grammar = Grammar::define(|g| {
            let minus = g.terminal("MINUS", None)?;
            g.terminal("UMINUS", None)?;
            let num = g.terminal("NUM", None)?;
            let e = g.nonterminal("E")?;
            let opt = g.nonterminal("OPT")?;
            g.rule(e, [T(minus), N(e)], Some("UMINUS"))?;
            g.rule(e, [N(opt), T(num)], None)?;
            g.rule(opt, [], None)?;
            g.rule(opt, [T(minus)], None)?;
            Ok(())
        })
        .unwrap();

        let e = grammar.nonterminal_by_name("E").unwrap();
        let opt = grammar.nonterminal_by_name("OPT").unwrap();
        assert!(grammar.is_nullable(opt));
        assert!(!grammar.is_nullable(e));

        let uminus = grammar.terminal_by_name("UMINUS").unwrap();
        let num = grammar.terminal_by_name("NUM").unwrap();
        let rules = grammar.rules_of(e);
        assert_eq!(grammar.rule(rules[0]).precedence_terminal(), Some(uminus));
        assert_eq!(grammar.rule(rules[1]).precedence_terminal(), Some(num));
    }

    #[test]
    fn rejects_malformed_grammars() {
        let err = Grammar::define(|g| {
            let a = g.terminal("A", None)?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a)], Some("B"))?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::UndeclaredPrecSymbol { .. }));

        let err = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            let x = g.nonterminal("X")?;
            g.rule(s, [N(x)], None)?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::UndefinedNonterminal { name } if name == "X"));

        let err = Grammar::define(|g| {
            g.quoted_terminal("", None)?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::EmptyQuotedToken));

        let err = Grammar::define(|g| {
            g.terminal("A", None)?;
            g.nonterminal("A")?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::DuplicateSymbol { .. }));

        let err = Grammar::define(|g| {
            let a = g.terminal("A", None)?;
            let s = g.nonterminal("S")?;
            g.rule(s, [T(a)], None)?;
            g.rule(s, [T(a)], None)?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::DuplicateRule { .. }));

        let err = Grammar::define(|_| Ok(())).unwrap_err();
        assert!(matches!(err, GrammarError::NoNonterminals));
    }

    #[test]
    fn rejects_unproductive_start() {
        let err = Grammar::define(|g| {
            let a = g.nonterminal("A")?;
            let b = g.nonterminal("B")?;
            g.rule(a, [N(b)], None)?;
            g.rule(b, [N(a)], None)?;
            Ok(())
        })
        .unwrap_err();
        assert!(matches!(err, GrammarError::UnproductiveStart { name } if name == "A"));
    }

    #[test]
    fn unit_productions() {
        let grammar = Grammar::define(|g| {
            let a = g.terminal("A", None)?;
            let s = g.nonterminal("S")?;
            let t = g.nonterminal("T")?;
            g.rule(s, [N(t)], None)?;
            let coded = g.rule(s, [N(t), N(t)], None)?;
            g.set_has_code(coded);
            g.rule(t, [T(a)], None)?;
            Ok(())
        })
        .unwrap();
        let flags: Vec<_> = grammar
            .rules
            .values()
            .map(|rule| (rule.is_unit_production(), rule.has_code()))
            .collect();
        assert_eq!(
            flags,
            [(false, false), (true, false), (false, true), (false, false)]
        );
    }
}
