//! The interface between a parsing table and the driver.

/// A constructed LR parsing table, as seen by [`Parser`](crate::Parser).
pub trait ParseTable {
    /// The number to identify the state of the LR automaton.
    type State: Copy;

    /// The column of a terminal or nonterminal symbol.
    type Symbol: Copy;

    /// The identifier of a production rule.
    type Rule: Copy;

    fn initial_state(&self) -> Self::State;

    /// The action of `current` on `lookahead`. The end of input is `None`.
    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> ParseAction<Self::State, Self::Symbol, Self::Rule>;

    /// The state entered from `current` after reducing to `lhs`.
    fn goto(&self, current: Self::State, lhs: Self::Symbol) -> Option<Self::State>;
}

impl<T: ?Sized> ParseTable for &T
where
    T: ParseTable,
{
    type State = T::State;
    type Symbol = T::Symbol;
    type Rule = T::Rule;

    fn initial_state(&self) -> Self::State {
        (**self).initial_state()
    }

    fn action(
        &self,
        current: Self::State,
        lookahead: Option<Self::Symbol>,
    ) -> ParseAction<Self::State, Self::Symbol, Self::Rule> {
        (**self).action(current, lookahead)
    }

    fn goto(&self, current: Self::State, lhs: Self::Symbol) -> Option<Self::State> {
        (**self).goto(current, lhs)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseAction<TState, TSymbol, TRule> {
    Shift(TState),

    /// Pop `len` states, then go to the successor on `lhs`.
    Reduce {
        rule: TRule,
        lhs: TSymbol,
        len: usize,
    },

    Accept,

    /// No action; the lookahead is a syntax error.
    Error,
}
