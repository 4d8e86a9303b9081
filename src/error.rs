use thiserror::Error;

/// Raised while a grammar is being registered or its automaton built.
/// Always fatal: nothing partially constructed is ever handed out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
  #[error("symbol name must not be empty")]
  EmptySymbolName,

  #[error("symbol name `{0}` must start with an uppercase or lowercase letter")]
  AmbiguousSymbolName(String),

  #[error("symbol name `{0}` is reserved")]
  ReservedSymbol(String),

  #[error("`{0}` is a terminal and cannot have productions")]
  TerminalRule(String),

  #[error("nonterminal `{0}` is defined more than once")]
  DuplicateRule(String),

  #[error("start symbol `{0}` has no productions")]
  UndefinedStart(String),

  #[error("`{0}` is not a declared start symbol")]
  UndeclaredStart(String),

  #[error("nonterminal `{name}` is referenced by `{referenced_by}` but has no productions")]
  UndefinedNonterminal {
    name: String,
    referenced_by: String,
  },

  #[error("nullable declaration names unknown nonterminal `{0}`")]
  UnknownNullable(String),

  #[error("nonterminal `{0}` has an empty production but is not declared nullable")]
  UndeclaredNullable(String),

  #[error("nonterminal `{0}` is declared nullable but cannot derive the empty string")]
  SpuriousNullable(String),
}
