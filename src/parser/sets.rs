use std::collections::{BTreeSet, HashSet};
use indexmap::{IndexMap, IndexSet};
use crate::bnf::{ProdId, Production};
use crate::symbol::Symbol;
use super::token_set::TokenSet;

/// FIRST sets and nullability of every grammar symbol.
///
/// Terminals occupy the first entries, in the registry's terminal order, so
/// a terminal's entry index is also its bit in every [`TokenSet`].
#[derive(Clone, Debug)]
pub struct FirstSets {
  entries: IndexMap<Symbol, SymbolFirst>,
  num_terminals: usize,
}

#[derive(Clone, Debug)]
struct SymbolFirst {
  /// right-hand sides as entry indices
  rhs: Vec<Vec<usize>>,
  nullable: bool,
  first: TokenSet,
}

impl FirstSets {
  pub(crate) fn solve(
    terminals: &IndexSet<Symbol>,
    rules: &IndexMap<Symbol, Vec<ProdId>>,
    prods: &[Production],
    nullable: &HashSet<Symbol>,
  ) -> FirstSets {
    let num_terminals = terminals.len();
    let mut entries = IndexMap::with_capacity(num_terminals + rules.len());

    for (i, terminal) in terminals.iter().enumerate() {
      entries.insert(terminal.clone(), SymbolFirst {
        rhs: vec![],
        nullable: false,
        first: TokenSet::from_token(num_terminals, i as u32),
      });
    }
    for nonterm in rules.keys() {
      entries.insert(nonterm.clone(), SymbolFirst {
        rhs: vec![],
        nullable: nullable.contains(nonterm),
        first: TokenSet::new(num_terminals),
      });
    }

    for (nonterm, ids) in rules {
      let rhs = ids.iter()
        .map(|id| {
          prods[id.index()].rhs().iter()
            .filter_map(|sym| entries.get_index_of(sym))
            .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();
      if let Some(entry) = entries.get_mut(nonterm) {
        entry.rhs = rhs;
      }
    }

    let mut sets = FirstSets {
      entries,
      num_terminals,
    };
    while sets.pass() {}
    sets
  }

  /// One full pass over every nonterminal. Returns whether any FIRST set
  /// grew.
  pub(crate) fn pass(&mut self) -> bool {
    let mut changed = false;
    let mut buf = TokenSet::new(self.num_terminals);

    for ix in self.num_terminals..self.entries.len() {
      buf.clear();
      for rhs in &self.entries[ix].rhs {
        for &sym in rhs {
          let entry = &self.entries[sym];
          buf.union_with(&entry.first);
          if !entry.nullable {
            break;
          }
        }
      }
      changed |= self.entries[ix].first.union_with(&buf);
    }

    changed
  }

  /// Terminals that can begin a string derived from `sym`.
  pub fn first_set_of(&self, sym: &Symbol) -> BTreeSet<Symbol> {
    match self.entries.get(sym) {
      Some(entry) => self.to_symbols(&entry.first),
      None if sym.is_terminal() => Some(sym.clone()).into_iter().collect(),
      None => BTreeSet::new(),
    }
  }

  /// Unknown symbols are never nullable.
  pub fn is_nullable(&self, sym: &Symbol) -> bool {
    self.entries.get(sym).map_or(false, |entry| entry.nullable)
  }

  pub(crate) fn first_bits(&self, sym: &Symbol) -> Option<&TokenSet> {
    self.entries.get(sym).map(|entry| &entry.first)
  }

  pub(crate) fn num_terminals(&self) -> usize {
    self.num_terminals
  }

  pub(crate) fn terminal(&self, t: u32) -> Option<&Symbol> {
    self.entries.get_index(t as usize)
      .filter(|_| (t as usize) < self.num_terminals)
      .map(|(sym, _)| sym)
  }

  fn to_symbols(&self, set: &TokenSet) -> BTreeSet<Symbol> {
    set.iter()
      .filter_map(|t| self.terminal(t).cloned())
      .collect()
  }
}

/// FOLLOW sets of every nonterminal.
#[derive(Debug)]
pub struct FollowSets {
  follow: IndexMap<Symbol, TokenSet>,
  terminals: Vec<Symbol>,
}

impl FollowSets {
  /// `augmented` start nonterminals are followed by `Eof`, terminal 0.
  pub(crate) fn solve(
    first: &FirstSets,
    prods: &[Production],
    augmented: impl IntoIterator<Item = Symbol>,
  ) -> FollowSets {
    let n = first.num_terminals();
    let mut follow = IndexMap::new();
    for prod in prods {
      follow.entry(prod.lhs().clone()).or_insert_with(|| TokenSet::new(n));
    }
    for start in augmented {
      if let Some(set) = follow.get_mut(&start) {
        set.insert(0);
      }
    }

    loop {
      let mut changed = false;
      for prod in prods {
        let mut trailer = match follow.get(prod.lhs()) {
          Some(set) => set.clone(),
          None => continue,
        };
        for sym in prod.rhs().iter().rev() {
          let sym_first = match first.first_bits(sym) {
            Some(set) => set,
            None => continue,
          };
          if sym.is_terminal() {
            trailer = sym_first.clone();
            continue;
          }
          if let Some(set) = follow.get_mut(sym) {
            changed |= set.union_with(&trailer);
          }
          if first.is_nullable(sym) {
            trailer.union_with(sym_first);
          } else {
            trailer = sym_first.clone();
          }
        }
      }
      if !changed {
        break;
      }
    }

    let terminals = (0..n as u32)
      .filter_map(|t| first.terminal(t).cloned())
      .collect();

    FollowSets {
      follow,
      terminals,
    }
  }

  pub fn follow_set_of(&self, nonterm: &Symbol) -> BTreeSet<Symbol> {
    self.follow.get(nonterm)
      .map(|set| {
        set.iter()
          .filter_map(|t| self.terminals.get(t as usize).cloned())
          .collect()
      })
      .unwrap_or_default()
  }

  pub(crate) fn follows(&self, nonterm: &Symbol, terminal: u32) -> bool {
    self.follow.get(nonterm).map_or(false, |set| set.contains(terminal))
  }
}
