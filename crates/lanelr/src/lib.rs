//! LR(0), LALR(1) and LR(1) automaton construction with lane tracing.

pub mod automaton;
pub mod first_sets;
pub mod generate;
pub mod grammar;
pub mod lane;
pub mod report;
pub mod table;
pub mod terminal_set;
pub mod types;

mod digraph;
mod util;

pub use crate::{
    generate::{generate, generate_with_reporter, ConstructionError, Mode, Options, Output, Stats},
    lane::Phase2,
};
