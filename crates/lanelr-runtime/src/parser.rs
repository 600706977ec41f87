//! Table-driven LR parser.

use crate::definition::{ParseAction, ParseTable};
use std::fmt;

/// A trait for abstracting token symbols.
pub trait Token<TSym> {
    fn as_symbol(&self) -> TSym;
}

impl<T: Copy> Token<T> for T {
    fn as_symbol(&self) -> T {
        *self
    }
}

/// What a single [`Parser::step`] did.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ParseEvent<TState, TRule> {
    /// The lookahead was consumed.
    Shift(TState),
    Reduce(TRule),
    Accept,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StepError {
    #[error("syntax error")]
    Syntax,

    #[error("cannot pop {len} states from a stack of depth {depth}")]
    StackUnderflow { len: usize, depth: usize },

    #[error("no goto entry after the reduction")]
    MissingGoto,

    #[error("the input has already been accepted")]
    AlreadyAccepted,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError<L: fmt::Display> {
    #[error("from lexer: {}", _0)]
    Lexer(L),

    #[error("after {consumed} tokens: {error}")]
    Step { consumed: usize, error: StepError },
}

/// The parser driven by a parsing table. Only the state stack is kept;
/// semantic values are left to the caller.
#[derive(Debug)]
pub struct Parser<TDef: ParseTable> {
    definition: TDef,
    stack: Vec<TDef::State>,
    accepted: bool,
}

impl<TDef: ParseTable> Parser<TDef> {
    pub fn new(definition: TDef) -> Self {
        let initial = definition.initial_state();
        Self {
            definition,
            stack: vec![initial],
            accepted: false,
        }
    }

    /// The state stack, bottom first.
    pub fn stack(&self) -> &[TDef::State] {
        &self.stack
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted
    }

    /// Take one action on `lookahead`. Only [`ParseEvent::Shift`] consumes it.
    pub fn step(
        &mut self,
        lookahead: Option<TDef::Symbol>,
    ) -> Result<ParseEvent<TDef::State, TDef::Rule>, StepError> {
        if self.accepted {
            return Err(StepError::AlreadyAccepted);
        }
        let depth = self.stack.len();
        let current = *self.stack.last().ok_or(StepError::StackUnderflow { len: 1, depth })?;

        match self.definition.action(current, lookahead) {
            ParseAction::Shift(next) => {
                self.stack.push(next);
                Ok(ParseEvent::Shift(next))
            }

            ParseAction::Reduce { rule, lhs, len } => {
                // the start state always stays on the stack.
                if len >= depth {
                    return Err(StepError::StackUnderflow { len, depth });
                }
                self.stack.truncate(depth - len);
                let top = *self.stack.last().ok_or(StepError::StackUnderflow { len, depth })?;
                let next = self
                    .definition
                    .goto(top, lhs)
                    .ok_or(StepError::MissingGoto)?;
                self.stack.push(next);
                Ok(ParseEvent::Reduce(rule))
            }

            ParseAction::Accept => {
                self.accepted = true;
                Ok(ParseEvent::Accept)
            }

            ParseAction::Error => Err(StepError::Syntax),
        }
    }

    /// Drive the parser over all of `tokens` and return the matched rules
    /// in reduction order.
    pub fn parse_all<I, T, E>(mut self, tokens: I) -> Result<Vec<TDef::Rule>, ParseError<E>>
    where
        I: IntoIterator<Item = Result<T, E>>,
        T: Token<TDef::Symbol>,
        E: fmt::Display,
    {
        let mut tokens = tokens.into_iter();
        let mut consumed = 0;
        let mut lookahead = tokens.next().transpose().map_err(ParseError::Lexer)?;
        let mut reduces = vec![];

        loop {
            let event = self
                .step(lookahead.as_ref().map(|t| t.as_symbol()))
                .map_err(|error| ParseError::Step { consumed, error })?;
            match event {
                ParseEvent::Shift(..) => {
                    consumed += 1;
                    lookahead = tokens.next().transpose().map_err(ParseError::Lexer)?;
                }
                ParseEvent::Reduce(rule) => reduces.push(rule),
                ParseEvent::Accept => return Ok(reduces),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    // S -> a S | b
    // columns: 0 = $end, 1 = a, 2 = b, 3 = S
    struct Table;

    impl ParseTable for Table {
        type State = u8;
        type Symbol = u8;
        type Rule = u8;

        fn initial_state(&self) -> u8 {
            0
        }

        fn action(&self, current: u8, lookahead: Option<u8>) -> ParseAction<u8, u8, u8> {
            match (current, lookahead.unwrap_or(0)) {
                (0 | 2, 1) => ParseAction::Shift(2),
                (0 | 2, 2) => ParseAction::Shift(3),
                (1, 0) => ParseAction::Accept,
                (3, 0) => ParseAction::Reduce {
                    rule: 2,
                    lhs: 3,
                    len: 1,
                },
                (4, 0) => ParseAction::Reduce {
                    rule: 1,
                    lhs: 3,
                    len: 2,
                },
                _ => ParseAction::Error,
            }
        }

        fn goto(&self, current: u8, lhs: u8) -> Option<u8> {
            match (current, lhs) {
                (0, 3) => Some(1),
                (2, 3) => Some(4),
                _ => None,
            }
        }
    }

    #[test]
    fn reduces_in_order() {
        let tokens = [1u8, 1, 2].map(Ok::<_, Infallible>);
        let reduces = Parser::new(Table).parse_all(tokens).unwrap();
        assert_eq!(reduces, [2, 1, 1]);
    }

    #[test]
    fn rejects_incomplete_input() {
        let tokens = [1u8, 1].map(Ok::<_, Infallible>);
        let err = Parser::new(Table).parse_all(tokens).unwrap_err();
        assert!(matches!(
            err,
            ParseError::Step {
                consumed: 2,
                error: StepError::Syntax
            }
        ));
    }

    #[test]
    fn accept_is_final() {
        let mut parser = Parser::new(Table);
        assert_eq!(parser.step(Some(2)), Ok(ParseEvent::Shift(3)));
        assert_eq!(parser.step(None), Ok(ParseEvent::Reduce(2)));
        assert_eq!(parser.stack(), [0, 1]);
        assert_eq!(parser.step(None), Ok(ParseEvent::Accept));
        assert!(parser.is_accepted());
        assert_eq!(parser.step(None), Err(StepError::AlreadyAccepted));
    }
}
