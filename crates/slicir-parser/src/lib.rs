/*! Parse program-facts text into structured programs.
 *
 * Facts files record the statements, flow edges, and def-use pairs of an already analyzed
 * program. This parser reads them back into memory so the dependence builders can work from
 * declared flow instead of re-deriving it from source.
 */

#![allow(unreachable_patterns)]

use pest::Parser;
use pest_derive::Parser;
use std::path::Path;

pub mod lower;

pub use lower::{load_path, parse_facts, FactsError, Lowerer, ParsedFacts};

#[derive(Parser)]
#[grammar = "grammar.pest"]
pub struct FactsParser;

pub type ParseResult<T> = Result<T, Box<pest::error::Error<Rule>>>;

pub fn parse(input: &str) -> ParseResult<pest::iterators::Pairs<'_, Rule>> {
    FactsParser::parse(Rule::facts, input).map_err(|e| Box::new(e))
}

pub fn parse_file<P: AsRef<Path>>(path: P) -> ParseResult<String> {
    std::fs::read_to_string(path).map_err(|e| {
        Box::new(pest::error::Error::new_from_pos(
            pest::error::ErrorVariant::CustomError {
                message: format!("Failed to read file: {}", e),
            },
            pest::Position::from_start(""),
        ))
    })
}

pub fn check(input: &str) -> bool {
    parse(input).is_ok()
}
