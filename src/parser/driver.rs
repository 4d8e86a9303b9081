use log::trace;
use thiserror::Error;
use crate::bnf::{Bnf, ProdId};
use crate::error::GrammarError;
use crate::symbol::Symbol;
use crate::token::{Token, TokenSource};
use super::action::Action;
use super::state::{Automaton, StateId};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error(transparent)]
  Grammar(#[from] GrammarError),

  /// Neither a shift nor a reduce exists for the token.
  #[error("unexpected {} `{}` in state {}", .token.symbol, .token.text, .state)]
  UnrecognizedInput {
    token: Token,
    state: StateId,
  },

  /// Reductions on the token would never consume it.
  #[error("reductions on {} `{}` loop forever from state {}", .token.symbol, .token.text, .state)]
  ReduceLoop {
    token: Token,
    state: StateId,
  },
}

/// States that were on top of the stack since the last shift.
///
/// A visit stays comparable while the stack below it is untouched. Seeing
/// its state on top again means the reductions will repeat forever: at the
/// same depth the whole stack is the same, and higher up the run that got
/// there starts over from the same state.
struct Visits {
  visits: Vec<Visit>,
}

struct Visit {
  state: StateId,
  depth: usize,
  /// lowest stack length the visit has seen truncated to
  floor: usize,
}

impl Visits {
  fn new(state: StateId, depth: usize) -> Self {
    let mut visits = Visits { visits: vec![] };
    visits.reset(state, depth);
    visits
  }

  fn reset(&mut self, state: StateId, depth: usize) {
    self.visits.clear();
    self.visits.push(Visit { state, depth, floor: depth });
  }

  fn truncated(&mut self, len: usize) {
    for visit in &mut self.visits {
      visit.floor = visit.floor.min(len);
    }
    self.visits.retain(|visit| visit.floor + 1 >= visit.depth);
  }

  /// Records a goto target; returns whether it repeats an earlier visit.
  fn pushed(&mut self, state: StateId, depth: usize) -> bool {
    let repeats = self.visits.iter().any(|visit| {
      visit.state == state
        && (visit.depth == depth || visit.floor >= visit.depth)
    });
    self.visits.push(Visit { state, depth, floor: depth });
    repeats
  }
}

/// Runs the shift/reduce stack machine from the start state of `start`.
/// Returns the reduced productions in order; reducing the augmented start
/// production accepts.
pub(super) fn parse<S: TokenSource + ?Sized>(
  bnf: &Bnf,
  automaton: &Automaton,
  start: &Symbol,
  source: &mut S,
) -> Result<Vec<ProdId>, ParseError> {
  let root = match automaton.start(start) {
    Some(root) => root,
    None if bnf.is_defined(start) => {
      return Err(GrammarError::UndeclaredStart(start.to_string()).into());
    }
    None => return Err(GrammarError::UndefinedStart(start.to_string()).into()),
  };

  let mut stack = vec![root];
  let mut visits = Visits::new(root, stack.len());
  let mut reductions = vec![];
  let mut token = source.next_token();

  loop {
    let top = match stack.last() {
      Some(&top) => top,
      None => return Err(ParseError::UnrecognizedInput { token, state: root }),
    };

    match automaton.action_for(top, &token.symbol) {
      Some(Action::Shift(next)) => {
        trace!("shift {} `{}` to {}", token.symbol, token.text, next);
        stack.push(next);
        visits.reset(next, stack.len());
        token = source.next_token();
      }
      Some(Action::Reduce(id)) if bnf.is_start_production(id) => {
        return Ok(reductions);
      }
      Some(Action::Reduce(id)) => {
        let prod = bnf.production(id);
        trace!("reduce {}", prod);
        stack.truncate(stack.len().saturating_sub(prod.rhs().len()));
        visits.truncated(stack.len());
        reductions.push(id);
        let next = match stack.last().and_then(|&top| automaton.goto(top, prod.lhs())) {
          Some(next) => next,
          None => return Err(ParseError::UnrecognizedInput { token, state: top }),
        };
        stack.push(next);
        if visits.pushed(next, stack.len()) {
          return Err(ParseError::ReduceLoop { token, state: next });
        }
      }
      None => return Err(ParseError::UnrecognizedInput { token, state: top }),
    }
  }
}
