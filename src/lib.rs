//! FIRST sets and LR automata for context-free grammars.

pub mod grammar;
pub mod lang;
pub mod parser;
mod bnf;
mod error;
mod symbol;
mod token;

pub use bnf::{Bnf, ProdId, Production};
pub use error::GrammarError;
pub use grammar::Grammar;
pub use parser::{
  Action, Automaton, Item, Lookahead, Options, ParseError, Parser, State, StateId,
};
pub use symbol::{Symbol, EOF};
pub use token::{Token, TokenSource, TokenStream};

pub fn build(grammar: Grammar, options: Options) -> Result<Parser, GrammarError> {
  Parser::new(grammar, options)
}

/// Builds the LR(0) automaton of a declared start symbol. Its root is the
/// state holding `start' -> . start`.
pub fn build_automaton(bnf: &Bnf, start: &Symbol) -> Result<Automaton, GrammarError> {
  Automaton::build(bnf, start, &Options::default())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::grammar::*;
  use pretty_assertions::assert_eq;

  #[test]
  fn build_and_walk() {
    let bnf = Bnf::new(grammar(&["s"], &[
      ("s", sym("a")),
      ("a", seq([sym("X"), sym("a")]) | eps()),
    ]).nullable(&["a"])).unwrap();

    let automaton = build_automaton(&bnf, &Symbol::new("s")).unwrap();
    let root = automaton.root().unwrap();
    assert_eq!(root.id().number(), 1);
    assert_eq!(root.reached_from(), None);
    assert_eq!(automaton.len(), 5);
  }

  #[test]
  fn undefined_start_never_yields_a_root() {
    let bnf = Bnf::new(grammar(&["s"], &[("s", sym("X"))])).unwrap();
    assert_eq!(
      build_automaton(&bnf, &Symbol::new("q")).err(),
      Some(GrammarError::UndefinedStart("q".to_owned())));

    let err = build(grammar(&["q"], &[("s", sym("X"))]), Options::default())
      .err();
    assert_eq!(err, Some(GrammarError::UndefinedStart("q".to_owned())));
  }
}
