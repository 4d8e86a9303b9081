use std::ops::BitOr;

/// A grammar as written by its author, before lowering into productions.
#[derive(Debug, Clone)]
pub struct Grammar {
  pub(crate) start: Vec<String>,
  pub(crate) rules: Vec<(String, Rule)>,
  pub(crate) nullable: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct Rule(pub(crate) RuleInner);

#[derive(Debug, Clone)]
pub(crate) enum RuleInner {
  Sym(String),
  Seq(Vec<Rule>),
  Or(Vec<Rule>),
  Many(Box<Rule>),
  Some(Box<Rule>),
  Option(Box<Rule>),
  SepBy(Box<RuleSepBy>),
  SepBy1(Box<RuleSepBy>),
}

#[derive(Debug, Clone)]
pub(crate) struct RuleSepBy {
  pub(crate) sep: Rule,
  pub(crate) rule: Rule,
}

pub fn sym(
  sym: impl Into<String>,
) -> Rule {
  Rule(RuleInner::Sym(sym.into()))
}

pub fn seq<const N: usize>(
  rules: [Rule; N],
) -> Rule {
  Rule(RuleInner::Seq(rules.to_vec()))
}

/// The empty sequence. Its owner must be declared nullable.
pub fn eps() -> Rule {
  Rule(RuleInner::Seq(vec![]))
}

pub fn many(
  rule: Rule,
) -> Rule {
  Rule(RuleInner::Many(Box::new(rule)))
}

pub fn some(
  rule: Rule,
) -> Rule {
  Rule(RuleInner::Some(Box::new(rule)))
}

pub fn option(
  rule: Rule,
) -> Rule {
  Rule(RuleInner::Option(Box::new(rule)))
}

pub fn sep_by(
  sep: Rule,
  rule: Rule,
) -> Rule {
  Rule(RuleInner::SepBy(Box::new(RuleSepBy {
    sep,
    rule,
  })))
}

pub fn sep_by1(
  sep: Rule,
  rule: Rule,
) -> Rule {
  Rule(RuleInner::SepBy1(Box::new(RuleSepBy {
    sep,
    rule,
  })))
}

impl BitOr for Rule {
  type Output = Rule;

  fn bitor(self, rhs: Rule) -> Rule {
    match (self.0, rhs.0) {
      (RuleInner::Or(mut x), RuleInner::Or(mut y)) => {
        x.append(&mut y);
        Rule(RuleInner::Or(x))
      }
      (RuleInner::Or(mut x), y) => {
        x.push(Rule(y));
        Rule(RuleInner::Or(x))
      }
      (x, RuleInner::Or(mut y)) => {
        y.insert(0, Rule(x));
        Rule(RuleInner::Or(y))
      }
      (x, y) => {
        Rule(RuleInner::Or(vec![Rule(x), Rule(y)]))
      }
    }
  }
}

/// Rules keep their declaration order, which is also the order productions
/// are registered in.
pub fn grammar(
  start: &[&str],
  rules: &[(&str, Rule)],
) -> Grammar {
  Grammar {
    start: start.iter().map(|&s| s.to_owned()).collect(),
    rules: rules.iter()
      .map(|(name, rule)| ((*name).to_owned(), rule.clone()))
      .collect(),
    nullable: vec![],
  }
}

impl Grammar {
  /// Declares nonterminals that derive the empty string.
  pub fn nullable(mut self, names: &[&str]) -> Self {
    self.nullable.extend(names.iter().map(|&s| s.to_owned()));
    self
  }
}
