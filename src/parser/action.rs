use indexmap::IndexMap;
use log::debug;
use crate::bnf::{Bnf, ProdId};
use crate::symbol::Symbol;
use super::state::{State, StateId};

/// A parse table cell.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Action {
  Shift(StateId),
  Reduce(ProdId),
}

/// Which lookaheads a completed item reduces on.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Lookahead {
  /// every terminal
  Lr0,
  /// terminals in FOLLOW of the production's left-hand side
  Slr,
}

impl Default for Lookahead {
  fn default() -> Self {
    Lookahead::Lr0
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct Options {
  pub lookahead: Lookahead,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ConflictKind {
  ShiftReduce,
  ReduceReduce,
}

/// A table cell with more than one candidate action. The candidate whose
/// production was registered first is chosen; a shift ranks by the earliest
/// production among the items it advances, and wins an exact tie.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Conflict {
  pub state: StateId,
  pub lookahead: Symbol,
  pub kind: ConflictKind,
  pub chosen: Action,
  pub rejected: Vec<Action>,
}

/// Derives the action of every terminal in `state`.
pub(super) fn gen_actions(
  bnf: &Bnf,
  state: &State,
  options: &Options,
) -> (IndexMap<Symbol, Action>, Vec<Conflict>) {
  let mut actions = IndexMap::new();
  let mut conflicts = vec![];

  for (t, terminal) in bnf.terminals().enumerate() {
    let mut candidates = vec![];

    if let Some(&target) = state.transitions.get(terminal) {
      let rank = state.items.iter()
        .filter(|item| item.next_symbol(bnf) == Some(terminal))
        .map(|item| item.production())
        .min();
      if let Some(rank) = rank {
        candidates.push((rank, Action::Shift(target)));
      }
    }

    for item in &state.items {
      let prod = item.production();
      if item.is_complete(bnf)
        && reduces_on(bnf, prod, terminal, t as u32, options.lookahead)
      {
        candidates.push((prod, Action::Reduce(prod)));
      }
    }

    // stable, so a shift stays ahead of a reduce of the same rank
    candidates.sort_by_key(|&(rank, _)| rank);
    let mut candidates = candidates.into_iter().map(|(_, action)| action);
    let chosen = match candidates.next() {
      Some(action) => action,
      None => continue,
    };
    let rejected = candidates.collect::<Vec<_>>();

    if !rejected.is_empty() {
      let kind = if is_shift(chosen) || rejected.iter().copied().any(is_shift) {
        ConflictKind::ShiftReduce
      } else {
        ConflictKind::ReduceReduce
      };
      debug!("{:?} conflict in state {} on {}: {} over {}",
        kind, state.id, terminal,
        describe(bnf, chosen),
        rejected.iter()
          .map(|&action| describe(bnf, action))
          .collect::<Vec<_>>()
          .join(", "));
      conflicts.push(Conflict {
        state: state.id,
        lookahead: terminal.clone(),
        kind,
        chosen,
        rejected,
      });
    }

    actions.insert(terminal.clone(), chosen);
  }

  (actions, conflicts)
}

/// The augmented start production only reduces on `Eof`.
fn reduces_on(
  bnf: &Bnf,
  prod: ProdId,
  terminal: &Symbol,
  t: u32,
  lookahead: Lookahead,
) -> bool {
  if bnf.is_start_production(prod) {
    return terminal.is_eof();
  }
  match lookahead {
    Lookahead::Lr0 => true,
    Lookahead::Slr => bnf.follow_sets().follows(bnf.production(prod).lhs(), t),
  }
}

fn is_shift(action: Action) -> bool {
  matches!(action, Action::Shift(_))
}

fn describe(bnf: &Bnf, action: Action) -> String {
  match action {
    Action::Shift(target) => format!("shift {}", target),
    Action::Reduce(prod) => format!("reduce {}", bnf.production(prod)),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use pretty_assertions::assert_eq;
  use crate::grammar::*;
  use crate::parser::state::Automaton;

  fn dangling_else() -> Bnf {
    Bnf::new(grammar(&["stmt"], &[
      ("stmt",
        seq([sym("If"), sym("stmt")])
        | seq([sym("If"), sym("stmt"), sym("Else"), sym("stmt")])
        | sym("Other")),
    ])).unwrap()
  }

  #[test]
  fn default_is_lr0() {
    assert_eq!(Options::default().lookahead, Lookahead::Lr0);
  }

  #[test]
  fn earlier_reduce_beats_later_shift() {
    let bnf = dangling_else();
    let automaton = Automaton::build(&bnf, &Symbol::new("stmt"), &Options {
      lookahead: Lookahead::Slr,
    }).unwrap();

    let conflict = automaton.conflicts().iter()
      .find(|c| c.lookahead == Symbol::new("Else"))
      .unwrap();
    assert_eq!(conflict.kind, ConflictKind::ShiftReduce);

    // `stmt -> If stmt` is registered before `stmt -> If stmt Else stmt`
    let short = bnf.productions_for(&Symbol::new("stmt")).next().unwrap().id();
    assert_eq!(conflict.chosen, Action::Reduce(short));
    assert_eq!(
      automaton.action_for(conflict.state, &Symbol::new("Else")),
      Some(Action::Reduce(short)));
    assert!(matches!(conflict.rejected.as_slice(), [Action::Shift(_)]));
  }

  #[test]
  fn slr_limits_reduces_to_follow() {
    let bnf = dangling_else();
    let automaton = Automaton::build(&bnf, &Symbol::new("stmt"), &Options {
      lookahead: Lookahead::Slr,
    }).unwrap();
    let root = automaton.root().unwrap().id();
    let other = automaton.goto(root, &Symbol::new("Other")).unwrap();

    assert!(matches!(
      automaton.action_for(other, &Symbol::eof()),
      Some(Action::Reduce(_))));
    assert!(matches!(
      automaton.action_for(other, &Symbol::new("Else")),
      Some(Action::Reduce(_))));
    assert_eq!(automaton.action_for(other, &Symbol::new("If")), None);
  }
}
