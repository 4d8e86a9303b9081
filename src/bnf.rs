use std::collections::{BTreeSet, HashMap, HashSet};
use std::convert::TryFrom;
use std::fmt::{self, Display, Formatter};
use indexmap::{IndexMap, IndexSet};
use log::debug;
use crate::error::GrammarError;
use crate::grammar::*;
use crate::parser::{FirstSets, FollowSets};
use crate::symbol::{self, Symbol};

/// Index of a production in registration order.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct ProdId(pub(crate) u32);

impl ProdId {
  pub fn index(self) -> usize {
    self.0 as usize
  }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Production {
  id: ProdId,
  lhs: Symbol,
  /// empty for an epsilon production
  rhs: Vec<Symbol>,
}

impl Production {
  pub fn id(&self) -> ProdId {
    self.id
  }

  pub fn lhs(&self) -> &Symbol {
    &self.lhs
  }

  pub fn rhs(&self) -> &[Symbol] {
    &self.rhs
  }

  pub fn is_epsilon(&self) -> bool {
    self.rhs.is_empty()
  }
}

impl Display for Production {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    write!(f, "{} ->", self.lhs)?;
    if self.rhs.is_empty() {
      return f.write_str(" ε");
    }
    for sym in &self.rhs {
      write!(f, " {}", sym)?;
    }
    Ok(())
  }
}

/// The grammar registry: every nonterminal with its productions, in
/// registration order, together with the FIRST and FOLLOW sets computed
/// against it. Read-only once built.
#[derive(Debug)]
pub struct Bnf {
  prods: Vec<Production>,
  rules: IndexMap<Symbol, Vec<ProdId>>,
  /// `Eof` always has index 0
  terminals: IndexSet<Symbol>,
  /// declared by the author or by the lowering
  declared_nullable: HashSet<Symbol>,
  /// declared start symbol -> augmented start production
  starts: IndexMap<Symbol, ProdId>,
  first: FirstSets,
  follow: FollowSets,
}

impl Bnf {
  pub fn new(grammar: Grammar) -> Result<Bnf, GrammarError> {
    let Grammar { start, rules, nullable } = grammar;

    let mut defined = IndexSet::new();
    for (name, _) in &rules {
      symbol::check_name(name)?;
      let lhs = Symbol::new(name);
      if lhs.is_terminal() {
        return Err(GrammarError::TerminalRule(name.clone()));
      }
      if !defined.insert(lhs) {
        return Err(GrammarError::DuplicateRule(name.clone()));
      }
    }

    let mut lowering = Lowering::default();
    lowering.terminals.insert(Symbol::eof());

    let mut starts = IndexMap::new();
    for name in &start {
      symbol::check_name(name)?;
      let start = Symbol::new(name);
      if !defined.contains(&start) {
        return Err(GrammarError::UndefinedStart(name.clone()));
      }
      if starts.contains_key(&start) {
        continue;
      }
      let augmented = Symbol::new(format!("{}'", start));
      let id = lowering.push(augmented, vec![start.clone()]);
      starts.insert(start, id);
    }

    for (name, rule) in &rules {
      lowering.lower_rule(name, &Symbol::new(name), rule)?;
    }

    let Lowering { prods, rules, terminals, .. } = lowering;

    for prod in &prods {
      for sym in &prod.rhs {
        if sym.is_nonterminal() && !rules.contains_key(sym) {
          return Err(GrammarError::UndefinedNonterminal {
            name: sym.to_string(),
            referenced_by: prod.lhs.to_string(),
          });
        }
      }
    }

    let mut declared = HashSet::new();
    for name in &nullable {
      symbol::check_name(name)?;
      let sym = Symbol::new(name);
      if !defined.contains(&sym) {
        return Err(GrammarError::UnknownNullable(name.clone()));
      }
      declared.insert(sym);
    }

    // owners of empty productions are the author's to declare; generated
    // helpers are declared by the lowering
    for prod in prods.iter().filter(|prod| prod.is_epsilon()) {
      if declared.contains(&prod.lhs) {
        continue;
      }
      if defined.contains(&prod.lhs) {
        return Err(GrammarError::UndeclaredNullable(prod.lhs.to_string()));
      }
      declared.insert(prod.lhs.clone());
    }

    let derived = gen_nullable(&prods);
    for name in &nullable {
      if !derived.contains(&Symbol::new(name)) {
        return Err(GrammarError::SpuriousNullable(name.clone()));
      }
    }

    let first = FirstSets::solve(&terminals, &rules, &prods, &derived);
    let augmented = starts.values().map(|id: &ProdId| prods[id.index()].lhs.clone());
    let follow = FollowSets::solve(&first, &prods, augmented);

    debug!("registered {} productions over {} nonterminals and {} terminals",
      prods.len(), rules.len(), terminals.len());

    Ok(Bnf {
      prods,
      rules,
      terminals,
      declared_nullable: declared,
      starts,
      first,
      follow,
    })
  }

  /// Productions of `nonterm` in registration order; empty for terminals and
  /// unknown symbols.
  pub fn productions_for<'a>(
    &'a self,
    nonterm: &Symbol,
  ) -> impl Iterator<Item = &'a Production> + 'a {
    self.rules.get(nonterm)
      .into_iter()
      .flatten()
      .map(move |id| &self.prods[id.index()])
  }

  /// Panics if `id` does not belong to this registry; see
  /// [`get_production`](Bnf::get_production).
  pub fn production(&self, id: ProdId) -> &Production {
    &self.prods[id.index()]
  }

  pub fn get_production(&self, id: ProdId) -> Option<&Production> {
    self.prods.get(id.index())
  }

  pub fn productions(&self) -> &[Production] {
    &self.prods
  }

  pub fn nonterminals(&self) -> impl Iterator<Item = &Symbol> {
    self.rules.keys()
  }

  pub fn terminals(&self) -> impl Iterator<Item = &Symbol> {
    self.terminals.iter()
  }

  pub fn is_defined(&self, nonterm: &Symbol) -> bool {
    self.rules.contains_key(nonterm)
  }

  pub fn starts(&self) -> impl Iterator<Item = &Symbol> {
    self.starts.keys()
  }

  /// The augmented production `start' -> start` of a declared start symbol.
  pub fn start_production(&self, start: &Symbol) -> Option<ProdId> {
    self.starts.get(start).copied()
  }

  pub fn is_start_production(&self, id: ProdId) -> bool {
    self.starts.values().any(|&start| start == id)
  }

  pub fn is_declared_nullable(&self, nonterm: &Symbol) -> bool {
    self.declared_nullable.contains(nonterm)
  }

  /// The solver that was run against this registry.
  pub fn first_sets(&self) -> &FirstSets {
    &self.first
  }

  pub fn follow_sets(&self) -> &FollowSets {
    &self.follow
  }

  pub fn first_set_of(&self, sym: &Symbol) -> BTreeSet<Symbol> {
    self.first.first_set_of(sym)
  }

  pub fn is_nullable(&self, sym: &Symbol) -> bool {
    self.first.is_nullable(sym)
  }

  pub fn follow_set_of(&self, nonterm: &Symbol) -> BTreeSet<Symbol> {
    self.follow.follow_set_of(nonterm)
  }
}

impl TryFrom<Grammar> for Bnf {
  type Error = GrammarError;

  fn try_from(grammar: Grammar) -> Result<Bnf, GrammarError> {
    Bnf::new(grammar)
  }
}

#[derive(Default)]
struct Lowering {
  prods: Vec<Production>,
  rules: IndexMap<Symbol, Vec<ProdId>>,
  terminals: IndexSet<Symbol>,
  /// owner -> number of helpers generated for it
  helpers: HashMap<String, u32>,
}

impl Lowering {
  fn push(&mut self, lhs: Symbol, rhs: Vec<Symbol>) -> ProdId {
    let id = ProdId(self.prods.len() as u32);
    self.rules.entry(lhs.clone()).or_default().push(id);
    self.prods.push(Production { id, lhs, rhs });
    id
  }

  fn helper(&mut self, owner: &str) -> Symbol {
    let n = self.helpers.entry(owner.to_owned()).or_insert(0);
    *n += 1;
    Symbol::new(format!("{}~{}", owner, n))
  }

  fn lower_rule(
    &mut self,
    owner: &str,
    lhs: &Symbol,
    rule: &Rule,
  ) -> Result<(), GrammarError> {
    match &rule.0 {
      RuleInner::Or(rules) => {
        for rule in rules {
          let rhs = self.lower_seq(owner, rule)?;
          self.push(lhs.clone(), rhs);
        }
      }
      _ => {
        let rhs = self.lower_seq(owner, rule)?;
        self.push(lhs.clone(), rhs);
      }
    }
    Ok(())
  }

  fn lower_seq(
    &mut self,
    owner: &str,
    rule: &Rule,
  ) -> Result<Vec<Symbol>, GrammarError> {
    let mut symbols = vec![];
    self.lower_seq_into(owner, rule, &mut symbols)?;
    Ok(symbols)
  }

  fn lower_seq_into(
    &mut self,
    owner: &str,
    rule: &Rule,
    symbols: &mut Vec<Symbol>,
  ) -> Result<(), GrammarError> {
    match &rule.0 {
      RuleInner::Seq(rules) => {
        for rule in rules {
          self.lower_seq_into(owner, rule, symbols)?;
        }
      }
      _ => symbols.push(self.lower_sym(owner, rule)?),
    }
    Ok(())
  }

  fn lower_sym(
    &mut self,
    owner: &str,
    rule: &Rule,
  ) -> Result<Symbol, GrammarError> {
    match &rule.0 {
      RuleInner::Sym(name) => {
        symbol::check_name(name)?;
        let sym = Symbol::new(name);
        if sym.is_terminal() {
          self.terminals.insert(sym.clone());
        }
        Ok(sym)
      }
      RuleInner::Seq(_) | RuleInner::Or(_) => {
        let helper = self.helper(owner);
        self.lower_rule(owner, &helper, rule)?;
        Ok(helper)
      }
      RuleInner::Many(rule) => {
        let helper = self.helper(owner);
        let body = self.lower_seq(owner, rule)?;
        self.push(helper.clone(), prepend(&helper, body));
        self.push(helper.clone(), vec![]);
        Ok(helper)
      }
      RuleInner::Some(rule) => {
        let helper = self.helper(owner);
        let body = self.lower_seq(owner, rule)?;
        self.push(helper.clone(), prepend(&helper, body.clone()));
        self.push(helper.clone(), body);
        Ok(helper)
      }
      RuleInner::Option(rule) => {
        let helper = self.helper(owner);
        let body = self.lower_seq(owner, rule)?;
        self.push(helper.clone(), body);
        self.push(helper.clone(), vec![]);
        Ok(helper)
      }
      RuleInner::SepBy1(sep_by) => {
        let helper = self.helper(owner);
        self.lower_sep_by1(owner, &helper, sep_by)?;
        Ok(helper)
      }
      RuleInner::SepBy(sep_by) => {
        let helper = self.helper(owner);
        let inner = self.helper(owner);
        self.lower_sep_by1(owner, &inner, sep_by)?;
        self.push(helper.clone(), vec![inner]);
        self.push(helper.clone(), vec![]);
        Ok(helper)
      }
    }
  }

  fn lower_sep_by1(
    &mut self,
    owner: &str,
    helper: &Symbol,
    sep_by: &RuleSepBy,
  ) -> Result<(), GrammarError> {
    let sep = self.lower_seq(owner, &sep_by.sep)?;
    let body = self.lower_seq(owner, &sep_by.rule)?;
    let mut repeated = prepend(helper, sep);
    repeated.extend(body.iter().cloned());
    self.push(helper.clone(), repeated);
    self.push(helper.clone(), body);
    Ok(())
  }
}

fn prepend(head: &Symbol, tail: Vec<Symbol>) -> Vec<Symbol> {
  let mut symbols = Vec::with_capacity(tail.len() + 1);
  symbols.push(head.clone());
  symbols.extend(tail);
  symbols
}

/// Nonterminals that derive the empty string: the owners of empty
/// productions, propagated through right-hand sides that are all nullable.
fn gen_nullable(prods: &[Production]) -> HashSet<Symbol> {
  let mut nullable = HashSet::new();

  loop {
    let mut changed = false;
    for prod in prods {
      if !nullable.contains(&prod.lhs)
        && prod.rhs.iter().all(|sym| nullable.contains(sym))
      {
        nullable.insert(prod.lhs.clone());
        changed = true;
      }
    }
    if !changed {
      break;
    }
  }

  nullable
}
