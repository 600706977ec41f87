//! Shared fixtures for the integration tests.

pub mod grammars;

use lanelr::{
    grammar::{Grammar, RuleID, SymbolID, TerminalID},
    table::ParsingTable,
    types::Set,
};
use lanelr_runtime::{ParseError, Parser};
use std::{collections::VecDeque, convert::Infallible};

/// Route `tracing` output to the test harness. `RUST_LOG` selects the level.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Sentences of `g` with at most `max_len` tokens, as terminal columns,
/// found by expanding the leftmost nonterminal breadth first.
pub fn sentences(g: &Grammar, max_len: usize) -> Vec<Vec<usize>> {
    let max_form = 2 * max_len + 2;

    let mut seen: Set<Vec<SymbolID>> = Set::default();
    let mut queue = VecDeque::new();
    let start = vec![SymbolID::N(g.start_symbol)];
    seen.insert(start.clone());
    queue.push_back(start);

    let mut found = vec![];
    while let Some(form) = queue.pop_front() {
        let position = form.iter().position(|s| matches!(s, SymbolID::N(..)));
        let Some(position) = position else {
            found.push(
                form.iter()
                    .filter_map(|s| match s {
                        SymbolID::T(t) => Some(t.index()),
                        SymbolID::N(..) => None,
                    })
                    .collect(),
            );
            continue;
        };
        let SymbolID::N(n) = form[position] else { continue };

        for &rule in g.rules_of(n) {
            let mut next = form[..position].to_vec();
            next.extend_from_slice(g.rule(rule).right());
            next.extend_from_slice(&form[position + 1..]);

            // every symbol but a nullable one yields at least one token.
            let weight = next
                .iter()
                .filter(|s| match s {
                    SymbolID::T(..) => true,
                    SymbolID::N(n) => !g.is_nullable(*n),
                })
                .count();
            if weight > max_len || next.len() > max_form {
                continue;
            }
            if seen.insert(next.clone()) {
                queue.push_back(next);
            }
        }
    }

    found.sort();
    found.dedup();
    found
}

/// Every token string over the declared terminals of `g` up to `max_len`
/// tokens, sentences or not.
pub fn token_strings(g: &Grammar, max_len: usize) -> Vec<Vec<usize>> {
    let alphabet: Vec<usize> = g
        .terminals
        .keys()
        .filter(|t| **t != TerminalID::EOI && **t != TerminalID::ERROR)
        .map(|t| t.index())
        .collect();

    let mut strings = vec![vec![]];
    let mut frontier: Vec<Vec<usize>> = vec![vec![]];
    for _ in 0..max_len {
        let mut next = vec![];
        for prefix in &frontier {
            for &t in &alphabet {
                let mut s = prefix.clone();
                s.push(t);
                next.push(s);
            }
        }
        strings.extend(next.iter().cloned());
        frontier = next;
    }
    strings
}

/// Run the runtime parser over `tokens`, returning the reductions in order.
pub fn parse(
    table: &ParsingTable,
    tokens: &[usize],
) -> Result<Vec<RuleID>, ParseError<Infallible>> {
    Parser::new(table).parse_all(tokens.iter().map(|t| Ok(*t)))
}
