use std::fmt::{self, Debug, Display, Formatter};
use std::sync::Arc;
use crate::error::GrammarError;

/// Name of the terminal that marks the end of input.
pub const EOF: &str = "Eof";

/// Characters reserved for generated nonterminals.
const RESERVED_CHARS: [char; 2] = ['\'', '~'];

/// A grammar vocabulary element, compared and hashed by name.
///
/// Whether a symbol is a terminal is a function of its name: names starting
/// with an uppercase letter are terminals, all others are nonterminals.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Arc<str>);

impl Symbol {
  /// Panics if `name` is empty.
  pub fn new(name: impl AsRef<str>) -> Self {
    let name = name.as_ref();
    assert!(!name.is_empty(), "symbol name must not be empty");
    Symbol(name.into())
  }

  pub fn eof() -> Self {
    Symbol::new(EOF)
  }

  pub fn name(&self) -> &str {
    &self.0
  }

  pub fn is_terminal(&self) -> bool {
    self.0.chars().next().map_or(false, char::is_uppercase)
  }

  pub fn is_nonterminal(&self) -> bool {
    !self.is_terminal()
  }

  pub fn is_eof(&self) -> bool {
    &*self.0 == EOF
  }
}

/// Checks a user-supplied symbol name.
pub(crate) fn check_name(name: &str) -> Result<(), GrammarError> {
  let first = match name.chars().next() {
    Some(c) => c,
    None => return Err(GrammarError::EmptySymbolName),
  };
  if !first.is_uppercase() && !first.is_lowercase() {
    return Err(GrammarError::AmbiguousSymbolName(name.to_owned()));
  }
  if name == EOF || name.contains(&RESERVED_CHARS[..]) {
    return Err(GrammarError::ReservedSymbol(name.to_owned()));
  }
  Ok(())
}

impl Debug for Symbol {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl Display for Symbol {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    f.write_str(&self.0)
  }
}
