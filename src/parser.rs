use crate::bnf::{Bnf, ProdId};
use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::symbol::Symbol;
use crate::token::TokenSource;

mod action;
mod driver;
mod sets;
mod state;
mod token_set;

pub use action::{Action, Conflict, ConflictKind, Lookahead, Options};
pub use driver::ParseError;
pub use sets::{FirstSets, FollowSets};
pub use state::{
  closure, goto, Automaton, AutomatonDisplay, Item, ItemDisplay, State, StateId,
};

/// A grammar registry together with the automaton built from it.
#[derive(Debug)]
pub struct Parser {
  bnf: Bnf,
  automaton: Automaton,
}

impl Parser {
  pub(crate) fn new(grammar: Grammar, options: Options) -> Result<Self, GrammarError> {
    let bnf = Bnf::new(grammar)?;
    let automaton = Automaton::build_all(&bnf, &options)?;
    Ok(Parser {
      bnf,
      automaton,
    })
  }

  pub fn bnf(&self) -> &Bnf {
    &self.bnf
  }

  pub fn automaton(&self) -> &Automaton {
    &self.automaton
  }

  pub fn action_for(&self, state: StateId, lookahead: &Symbol) -> Option<Action> {
    self.automaton.action_for(state, lookahead)
  }

  /// Parses a token stream from a declared start symbol and returns the
  /// productions reduced, in order.
  pub fn parse<S: TokenSource + ?Sized>(
    &self,
    start: &Symbol,
    source: &mut S,
  ) -> Result<Vec<ProdId>, ParseError> {
    driver::parse(&self.bnf, &self.automaton, start, source)
  }
}
