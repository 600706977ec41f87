//! Runtime support for driving the parsing tables built by `lanelr`.

pub mod definition;
pub mod parser;

pub use crate::{
    definition::{ParseAction, ParseTable},
    parser::{ParseError, ParseEvent, Parser, StepError, Token},
};
