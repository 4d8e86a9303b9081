use std::collections::VecDeque;
use std::fmt::{self, Display, Formatter};
use indexmap::{IndexMap, IndexSet};
use log::{debug, trace};
use crate::bnf::{Bnf, ProdId};
use crate::error::GrammarError;
use crate::symbol::Symbol;
use super::action::{self, Action, Conflict, Options};

/// A production with a dot marking how much of it has been matched.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Item {
  prod: ProdId,
  dot: u32,
}

impl Item {
  pub fn new(prod: ProdId, dot: u32) -> Self {
    Item { prod, dot }
  }

  pub fn production(self) -> ProdId {
    self.prod
  }

  pub fn dot(self) -> usize {
    self.dot as usize
  }

  /// The same production with the dot one symbol further. Only meaningful
  /// while [`next_symbol`](Item::next_symbol) is `Some`.
  pub fn dot_forward(self) -> Item {
    Item {
      prod: self.prod,
      dot: self.dot + 1,
    }
  }

  /// The symbol right after the dot.
  pub fn next_symbol(self, bnf: &Bnf) -> Option<&Symbol> {
    bnf.production(self.prod).rhs().get(self.dot())
  }

  pub fn is_complete(self, bnf: &Bnf) -> bool {
    self.dot() >= bnf.production(self.prod).rhs().len()
  }

  pub fn display(self, bnf: &Bnf) -> ItemDisplay<'_> {
    ItemDisplay { item: self, bnf }
  }
}

pub struct ItemDisplay<'a> {
  item: Item,
  bnf: &'a Bnf,
}

impl Display for ItemDisplay<'_> {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    let prod = self.bnf.production(self.item.prod);
    write!(f, "{} ->", prod.lhs())?;
    for (i, sym) in prod.rhs().iter().enumerate() {
      if i == self.item.dot() {
        f.write_str(" .")?;
      }
      write!(f, " {}", sym)?;
    }
    if self.item.is_complete(self.bnf) {
      f.write_str(" .")?;
    }
    Ok(())
  }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct StateId(pub(crate) u32);

impl StateId {
  pub fn index(self) -> usize {
    self.0 as usize
  }

  /// State numbers start at 1.
  pub fn number(self) -> u32 {
    self.0 + 1
  }
}

impl Display for StateId {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{}", self.number())
  }
}

#[derive(Debug)]
pub struct State {
  pub(crate) id: StateId,
  /// kernel items first, then the ones added by closure
  pub(crate) items: Vec<Item>,
  pub(crate) kernel_len: usize,
  /// symbol -> target state
  pub(crate) transitions: IndexMap<Symbol, StateId>,
  /// terminal -> action
  pub(crate) actions: IndexMap<Symbol, Action>,
  pub(crate) reached_from: Option<(StateId, Symbol)>,
}

impl State {
  pub fn id(&self) -> StateId {
    self.id
  }

  pub fn items(&self) -> &[Item] {
    &self.items
  }

  pub fn kernel(&self) -> &[Item] {
    &self.items[..self.kernel_len]
  }

  pub fn transitions(&self) -> &IndexMap<Symbol, StateId> {
    &self.transitions
  }

  pub fn actions(&self) -> &IndexMap<Symbol, Action> {
    &self.actions
  }

  /// The state and symbol of the edge this state was first reached by.
  /// `None` for start states.
  pub fn reached_from(&self) -> Option<(StateId, &Symbol)> {
    self.reached_from.as_ref().map(|(id, sym)| (*id, sym))
  }
}

/// Closed item sets, sorted.
type StateKey = Vec<Item>;

/// The canonical collection of LR states, immutable once built.
#[derive(Debug)]
pub struct Automaton {
  states: IndexMap<StateKey, State>,
  /// start symbol -> start state
  starts: IndexMap<Symbol, StateId>,
  conflicts: Vec<Conflict>,
}

impl Automaton {
  pub fn build(
    bnf: &Bnf,
    start: &Symbol,
    options: &Options,
  ) -> Result<Automaton, GrammarError> {
    Automaton::build_for(bnf, std::slice::from_ref(start), options)
  }

  /// Builds one automaton shared by every declared start symbol.
  pub fn build_all(
    bnf: &Bnf,
    options: &Options,
  ) -> Result<Automaton, GrammarError> {
    let starts = bnf.starts().cloned().collect::<Vec<_>>();
    Automaton::build_for(bnf, &starts, options)
  }

  fn build_for(
    bnf: &Bnf,
    starts: &[Symbol],
    options: &Options,
  ) -> Result<Automaton, GrammarError> {
    let mut states = IndexMap::new();
    let mut start_states = IndexMap::new();

    for start in starts {
      let prod = match bnf.start_production(start) {
        Some(prod) => prod,
        None if bnf.is_defined(start) => {
          return Err(GrammarError::UndeclaredStart(start.to_string()));
        }
        None => return Err(GrammarError::UndefinedStart(start.to_string())),
      };
      let id = gen_states_for_start(bnf, &mut states, prod);
      start_states.insert(start.clone(), id);
    }

    let mut conflicts = vec![];
    for state in states.values_mut() {
      let (actions, found) = action::gen_actions(bnf, state, options);
      state.actions = actions;
      conflicts.extend(found);
    }

    debug!("built {} states for {:?} ({:?}), {} conflicts",
      states.len(), starts, options.lookahead, conflicts.len());

    Ok(Automaton {
      states,
      starts: start_states,
      conflicts,
    })
  }

  /// The start state of the first start symbol.
  pub fn root(&self) -> Option<&State> {
    self.starts.values().next().map(|&id| self.state(id))
  }

  pub fn start(&self, start: &Symbol) -> Option<StateId> {
    self.starts.get(start).copied()
  }

  /// Panics if `id` does not belong to this automaton; see
  /// [`get_state`](Automaton::get_state).
  pub fn state(&self, id: StateId) -> &State {
    &self.states[id.index()]
  }

  pub fn get_state(&self, id: StateId) -> Option<&State> {
    self.states.get_index(id.index()).map(|(_, state)| state)
  }

  pub fn states(&self) -> impl Iterator<Item = &State> {
    self.states.values()
  }

  pub fn len(&self) -> usize {
    self.states.len()
  }

  pub fn is_empty(&self) -> bool {
    self.states.is_empty()
  }

  pub fn goto(&self, from: StateId, sym: &Symbol) -> Option<StateId> {
    self.get_state(from)
      .and_then(|state| state.transitions.get(sym))
      .copied()
  }

  /// `None` when the lookahead can be neither shifted nor reduced on.
  pub fn action_for(&self, state: StateId, lookahead: &Symbol) -> Option<Action> {
    self.get_state(state)
      .and_then(|state| state.actions.get(lookahead))
      .copied()
  }

  pub fn conflicts(&self) -> &[Conflict] {
    &self.conflicts
  }

  pub fn display<'a>(&'a self, bnf: &'a Bnf) -> AutomatonDisplay<'a> {
    AutomatonDisplay { automaton: self, bnf }
  }
}

pub struct AutomatonDisplay<'a> {
  automaton: &'a Automaton,
  bnf: &'a Bnf,
}

impl Display for AutomatonDisplay<'_> {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    for (i, state) in self.automaton.states().enumerate() {
      if i > 0 {
        f.write_str("\n")?;
      }
      write!(f, "state {}", state.id)?;
      for item in &state.items {
        write!(f, "\n  {}", item.display(self.bnf))?;
      }
      for (sym, target) in &state.transitions {
        write!(f, "\n  {} => {}", sym, target)?;
      }
    }
    Ok(())
  }
}

/// Adds `(production, 0)` for every production of every nonterminal found
/// right after a dot, until nothing new is added. Kernel items keep their
/// order at the front.
pub fn closure(
  bnf: &Bnf,
  kernel: impl IntoIterator<Item = Item>,
) -> Vec<Item> {
  let mut items = kernel.into_iter().collect::<IndexSet<_>>();

  let mut i = 0;
  while let Some(&item) = items.get_index(i) {
    if let Some(sym) = item.next_symbol(bnf) {
      if sym.is_nonterminal() {
        for prod in bnf.productions_for(sym) {
          items.insert(Item::new(prod.id(), 0));
        }
      }
    }
    i += 1;
  }

  items.into_iter().collect()
}

/// The closed item set reached from `items` on `sym`; empty when no item
/// expects `sym`.
pub fn goto(bnf: &Bnf, items: &[Item], sym: &Symbol) -> Vec<Item> {
  let kernel = items.iter()
    .filter(|item| item.next_symbol(bnf) == Some(sym))
    .map(|item| item.dot_forward())
    .collect::<Vec<_>>();
  if kernel.is_empty() {
    return kernel;
  }
  closure(bnf, kernel)
}

/// Groups the advanced items of a state by the symbol they advance over,
/// in order of first appearance.
fn goto_kernels(bnf: &Bnf, items: &[Item]) -> IndexMap<Symbol, Vec<Item>> {
  let mut kernels = IndexMap::<Symbol, Vec<Item>>::new();
  for &item in items {
    if let Some(sym) = item.next_symbol(bnf) {
      kernels.entry(sym.clone()).or_default().push(item.dot_forward());
    }
  }
  kernels
}

/// Returns the state for the closure of `kernel`, and whether it is new.
fn intern_state(
  bnf: &Bnf,
  states: &mut IndexMap<StateKey, State>,
  kernel: Vec<Item>,
  reached_from: Option<(StateId, Symbol)>,
) -> (StateId, bool) {
  let kernel_len = kernel.len();
  let items = closure(bnf, kernel);
  let mut key = items.clone();
  key.sort_unstable();

  if let Some(index) = states.get_index_of(&key) {
    return (StateId(index as u32), false);
  }

  let id = StateId(states.len() as u32);
  trace!("state {} from {:?}", id, reached_from);
  states.insert(key, State {
    id,
    items,
    kernel_len,
    transitions: IndexMap::new(),
    actions: IndexMap::new(),
    reached_from,
  });
  (id, true)
}

/// Generates states reachable from a start production, breadth first.
fn gen_states_for_start(
  bnf: &Bnf,
  states: &mut IndexMap<StateKey, State>,
  start: ProdId,
) -> StateId {
  let (root, _) = intern_state(bnf, states, vec![Item::new(start, 0)], None);

  let mut queue = VecDeque::new();
  queue.push_back(root);
  while let Some(id) = queue.pop_front() {
    let kernels = goto_kernels(bnf, &states[id.index()].items);
    for (sym, kernel) in kernels {
      let (target, created) =
        intern_state(bnf, states, kernel, Some((id, sym.clone())));
      if created {
        queue.push_back(target);
      }
      states[id.index()].transitions.insert(sym, target);
    }
  }

  root
}

#[cfg(test)]
mod tests {
  use super::*;
  use insta::assert_snapshot;
  use pretty_assertions::assert_eq;
  use crate::grammar::*;
  use crate::parser::action::{ConflictKind, Lookahead};

  /// s -> a ; a -> X a | ε
  fn scenario() -> Bnf {
    Bnf::new(grammar(&["s"], &[
      ("s", sym("a")),
      ("a", seq([sym("X"), sym("a")]) | eps()),
    ]).nullable(&["a"])).unwrap()
  }

  fn expr() -> Bnf {
    Bnf::new(grammar(&["e"], &[
      ("e", seq([sym("e"), sym("Plus"), sym("t")]) | sym("t")),
      ("t", seq([sym("t"), sym("Star"), sym("f")]) | sym("f")),
      ("f", seq([sym("LParen"), sym("e"), sym("RParen")]) | sym("Id")),
    ])).unwrap()
  }

  fn build(bnf: &Bnf, start: &str) -> Automaton {
    Automaton::build(bnf, &Symbol::new(start), &Options::default()).unwrap()
  }

  fn items(bnf: &Bnf, state: &State) -> Vec<String> {
    state.items().iter().map(|item| item.display(bnf).to_string()).collect()
  }

  #[test]
  fn item_advances_without_mutating() {
    let bnf = scenario();
    let item = Item::new(ProdId(2), 0);
    let next = item.dot_forward();

    assert_eq!(item.dot(), 0);
    assert_eq!(next.dot(), 1);
    assert_eq!(item.next_symbol(&bnf), Some(&Symbol::new("X")));
    assert_eq!(next.next_symbol(&bnf), Some(&Symbol::new("a")));
    assert!(next.dot_forward().is_complete(&bnf));
    assert!(Item::new(ProdId(3), 0).is_complete(&bnf));
    assert_eq!(next.display(&bnf).to_string(), "a -> X . a");
  }

  #[test]
  fn start_state_closure() {
    let bnf = scenario();
    let automaton = build(&bnf, "s");
    let root = automaton.root().unwrap();

    assert_eq!(root.id().number(), 1);
    assert_eq!(root.kernel().len(), 1);
    assert_eq!(items(&bnf, root), vec![
      "s' -> . s",
      "s -> . a",
      "a -> . X a",
      "a -> .",
    ]);
  }

  #[test]
  fn loop_on_terminal_with_epsilon_reduce() {
    let bnf = scenario();
    let automaton = build(&bnf, "s");
    let x = Symbol::new("X");

    let root = automaton.root().unwrap().id();
    let after_x = automaton.goto(root, &x).unwrap();
    assert_eq!(automaton.goto(after_x, &x), Some(after_x));
    assert_eq!(
      automaton.state(after_x).reached_from(),
      Some((root, &x)));

    let epsilon = bnf.productions_for(&Symbol::new("a"))
      .find(|p| p.is_epsilon())
      .unwrap()
      .id();
    assert_eq!(
      automaton.action_for(after_x, &Symbol::eof()),
      Some(Action::Reduce(epsilon)));
    assert_eq!(
      automaton.action_for(after_x, &x),
      Some(Action::Shift(after_x)));
  }

  #[test]
  fn render_scenario() {
    let bnf = scenario();
    let automaton = build(&bnf, "s");

    assert_snapshot!(automaton.display(&bnf).to_string(), @r###"
    state 1
      s' -> . s
      s -> . a
      a -> . X a
      a -> .
      s => 2
      a => 3
      X => 4
    state 2
      s' -> s .
    state 3
      s -> a .
    state 4
      a -> X . a
      a -> . X a
      a -> .
      a => 5
      X => 4
    state 5
      a -> X a .
    "###);
  }

  #[test]
  fn lr0_conflicts_resolve_by_registration_order() {
    let bnf = scenario();
    let automaton = build(&bnf, "s");

    let conflicts = automaton.conflicts();
    assert_eq!(conflicts.len(), 2);
    for conflict in conflicts {
      assert_eq!(conflict.kind, ConflictKind::ShiftReduce);
      assert_eq!(conflict.lookahead, Symbol::new("X"));
      assert!(matches!(conflict.chosen, Action::Shift(_)));
      assert_eq!(conflict.rejected, vec![Action::Reduce(ProdId(3))]);
    }

    let slr = Automaton::build(&bnf, &Symbol::new("s"), &Options {
      lookahead: Lookahead::Slr,
    }).unwrap();
    assert!(slr.conflicts().is_empty());
  }

  #[test]
  fn reduce_reduce_prefers_first_registered() {
    let bnf = Bnf::new(grammar(&["s"], &[
      ("s", sym("a") | sym("b")),
      ("a", sym("X")),
      ("b", sym("X")),
    ])).unwrap();
    let automaton = build(&bnf, "s");
    let x = Symbol::new("X");

    let state = automaton.goto(automaton.root().unwrap().id(), &x).unwrap();
    let a = bnf.productions_for(&Symbol::new("a")).next().unwrap().id();
    let b = bnf.productions_for(&Symbol::new("b")).next().unwrap().id();

    assert_eq!(
      automaton.action_for(state, &Symbol::eof()),
      Some(Action::Reduce(a)));
    let conflict = automaton.conflicts().iter()
      .find(|c| c.state == state && c.lookahead.is_eof())
      .unwrap();
    assert_eq!(conflict.kind, ConflictKind::ReduceReduce);
    assert_eq!(conflict.rejected, vec![Action::Reduce(b)]);
  }

  #[test]
  fn accept_only_on_eof() {
    let bnf = scenario();
    let automaton = build(&bnf, "s");
    let root = automaton.root().unwrap().id();
    let accept = automaton.goto(root, &Symbol::new("s")).unwrap();

    assert_eq!(
      automaton.action_for(accept, &Symbol::eof()),
      Some(Action::Reduce(ProdId(0))));
    assert_eq!(automaton.action_for(accept, &Symbol::new("X")), None);
    assert_eq!(automaton.action_for(accept, &Symbol::new("Unknown")), None);
  }

  #[test]
  fn identical_item_sets_share_a_state() {
    let bnf = expr();
    let automaton = build(&bnf, "e");
    let lparen = Symbol::new("LParen");

    let root = automaton.root().unwrap().id();
    let once = automaton.goto(root, &lparen).unwrap();
    let twice = automaton.goto(once, &lparen).unwrap();
    assert_eq!(once, twice);
    assert!(std::ptr::eq(automaton.state(once), automaton.state(twice)));

    let id = Symbol::new("Id");
    assert_eq!(automaton.goto(root, &id), automaton.goto(once, &id));
  }

  #[test]
  fn no_two_states_share_an_item_set() {
    let bnf = expr();
    let automaton = build(&bnf, "e");

    let mut seen = std::collections::HashSet::new();
    for state in automaton.states() {
      let mut key = state.items().to_vec();
      key.sort();
      assert!(seen.insert(key), "duplicate state {}", state.id());
    }
    assert_eq!(automaton.len(), 12);
  }

  #[test]
  fn closure_is_complete() {
    let bnf = expr();
    let automaton = build(&bnf, "e");

    for state in automaton.states() {
      for item in state.items() {
        let sym = match item.next_symbol(&bnf) {
          Some(sym) if sym.is_nonterminal() => sym,
          _ => continue,
        };
        for prod in bnf.productions_for(sym) {
          assert!(
            state.items().contains(&Item::new(prod.id(), 0)),
            "state {} misses {}", state.id(), prod);
        }
      }
    }
  }

  #[test]
  fn transitions_agree_with_goto() {
    let bnf = expr();
    let automaton = build(&bnf, "e");

    for state in automaton.states() {
      for (sym, &target) in state.transitions() {
        let mut expected = goto(&bnf, state.items(), sym);
        let mut actual = automaton.state(target).items().to_vec();
        expected.sort();
        actual.sort();
        assert_eq!(actual, expected);
      }
    }
    let root = automaton.root().unwrap();
    assert!(goto(&bnf, root.items(), &Symbol::new("RParen")).is_empty());
  }

  #[test]
  fn construction_is_deterministic() {
    let bnf = expr();
    let first = build(&bnf, "e").display(&bnf).to_string();
    let second = build(&bnf, "e").display(&bnf).to_string();
    assert_eq!(first, second);
  }

  #[test]
  fn closure_keeps_kernel_first() {
    let bnf = expr();
    let kernel = Item::new(bnf.start_production(&Symbol::new("e")).unwrap(), 0);
    let items = closure(&bnf, vec![kernel]);

    assert_eq!(items[0], kernel);
    assert_eq!(items.len(), 7);
  }

  #[test]
  fn bad_start_symbols() {
    let bnf = scenario();
    let options = Options::default();

    assert_eq!(
      Automaton::build(&bnf, &Symbol::new("nope"), &options).err(),
      Some(GrammarError::UndefinedStart("nope".to_owned())));
    assert_eq!(
      Automaton::build(&bnf, &Symbol::new("a"), &options).err(),
      Some(GrammarError::UndeclaredStart("a".to_owned())));
  }

  #[test]
  fn dot_past_u16() {
    let item = Item::new(ProdId(0), u16::MAX as u32).dot_forward();
    assert_eq!(item.dot(), u16::MAX as usize + 1);
  }

  #[test]
  fn foreign_state_ids() {
    let bnf = scenario();
    let automaton = build(&bnf, "s");
    let foreign = StateId(automaton.len() as u32);

    assert!(automaton.get_state(foreign).is_none());
    assert_eq!(automaton.goto(foreign, &Symbol::new("X")), None);
    assert_eq!(automaton.action_for(foreign, &Symbol::eof()), None);
  }

  #[test]
  #[should_panic]
  fn state_panics_on_foreign_id() {
    let bnf = scenario();
    let automaton = build(&bnf, "s");
    automaton.state(StateId(automaton.len() as u32));
  }
}
