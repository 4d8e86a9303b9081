use crate::symbol::Symbol;

/// A scanned token: the terminal it belongs to and its source text.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Token {
  pub symbol: Symbol,
  pub text: String,
}

impl Token {
  pub fn new(symbol: Symbol, text: impl Into<String>) -> Self {
    Token {
      symbol,
      text: text.into(),
    }
  }

  pub fn eof() -> Self {
    Token::new(Symbol::eof(), "")
  }
}

/// Pull-based supply of tokens. End of input is an `Eof` token, repeated
/// for as long as the caller keeps asking.
pub trait TokenSource {
  fn next_token(&mut self) -> Token;
}

/// Tokens scanned ahead of time.
pub struct TokenStream {
  tokens: std::vec::IntoIter<Token>,
}

impl TokenStream {
  pub fn new(tokens: Vec<Token>) -> Self {
    TokenStream {
      tokens: tokens.into_iter(),
    }
  }
}

impl From<Vec<Token>> for TokenStream {
  fn from(tokens: Vec<Token>) -> Self {
    TokenStream::new(tokens)
  }
}

impl TokenSource for TokenStream {
  fn next_token(&mut self) -> Token {
    self.tokens.next().unwrap_or_else(Token::eof)
  }
}
