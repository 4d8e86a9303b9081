//! The toolchain language: its grammar and the process-wide parser built
//! from it.

use std::sync::OnceLock;
use log::debug;
use crate::bnf::Bnf;
use crate::error::GrammarError;
use crate::grammar::*;
use crate::parser::{Lookahead, Options, Parser};

pub const START: &str = "program";

/// ```text
/// program = stmt*
/// stmt    = Let Ident Assign expr Semi | Print expr Semi | expr Semi
/// expr    = expr (Plus | Minus) term | term
/// term    = term (Star | Slash) factor | factor
/// factor  = Number | Ident | LParen expr RParen | Minus factor
/// ```
pub fn definition() -> Grammar {
  grammar(&[START], &[
    ("program", many(sym("stmt"))),
    ("stmt",
      seq([sym("Let"), sym("Ident"), sym("Assign"), sym("expr"), sym("Semi")])
      | seq([sym("Print"), sym("expr"), sym("Semi")])
      | seq([sym("expr"), sym("Semi")])),
    ("expr",
      seq([sym("expr"), sym("Plus"), sym("term")])
      | seq([sym("expr"), sym("Minus"), sym("term")])
      | sym("term")),
    ("term",
      seq([sym("term"), sym("Star"), sym("factor")])
      | seq([sym("term"), sym("Slash"), sym("factor")])
      | sym("factor")),
    ("factor",
      sym("Number")
      | sym("Ident")
      | seq([sym("LParen"), sym("expr"), sym("RParen")])
      | seq([sym("Minus"), sym("factor")])),
  ]).nullable(&["program"])
}

static PARSER: OnceLock<Result<Parser, GrammarError>> = OnceLock::new();

/// The language parser. Built at most once, on first use from any thread;
/// a construction error is kept and returned to every caller.
pub fn parser() -> Result<&'static Parser, GrammarError> {
  PARSER
    .get_or_init(|| {
      debug!("building the {} grammar", START);
      Parser::new(definition(), Options { lookahead: Lookahead::Slr })
    })
    .as_ref()
    .map_err(Clone::clone)
}

pub fn bnf() -> Result<&'static Bnf, GrammarError> {
  parser().map(Parser::bnf)
}
