use std::fmt::{self, Debug, Formatter};

type BitBlock = u64;

const BLOCK_NBITS: usize = std::mem::size_of::<BitBlock>() * 8;

/// A set of terminals, keyed by their index in the grammar registry.
#[derive(Clone, PartialEq, Eq, Hash)]
pub(crate) struct TokenSet {
  slice: Box<[BitBlock]>,
}

impl TokenSet {
  pub(crate) fn new(num_tokens: usize) -> Self {
    let len = (num_tokens + BLOCK_NBITS - 1) / BLOCK_NBITS;
    Self {
      slice: vec![0; len].into_boxed_slice(),
    }
  }

  pub(crate) fn from_token(num_tokens: usize, token: u32) -> Self {
    let mut s = Self::new(num_tokens);
    s.insert(token);
    s
  }

  pub(crate) fn clear(&mut self) {
    for x in self.slice.iter_mut() {
      *x = 0;
    }
  }

  pub(crate) fn insert(&mut self, token: u32) {
    self.slice[token as usize / BLOCK_NBITS] |= mask(token);
  }

  pub(crate) fn contains(&self, token: u32) -> bool {
    self.slice.get(token as usize / BLOCK_NBITS)
      .map_or(false, |block| block & mask(token) != 0)
  }

  /// Returns whether the set has changed.
  pub(crate) fn union_with(&mut self, other: &TokenSet) -> bool {
    let mut changed = false;
    for (x, y) in self.slice.iter_mut().zip(other.slice.iter()) {
      let old = *x;
      *x |= *y;
      changed |= old != *x;
    }
    changed
  }

  pub(crate) fn iter(&self) -> Iter {
    Iter {
      slice: &self.slice,
      bit: 0,
      index: 0,
    }
  }
}

fn mask(token: u32) -> BitBlock {
  1 << (token as usize % BLOCK_NBITS)
}

pub(crate) struct Iter<'a> {
  slice: &'a [BitBlock],
  bit: usize,
  index: usize,
}

impl<'a> Iterator for Iter<'a> {
  type Item = u32;

  fn next(&mut self) -> Option<u32> {
    while self.index < self.slice.len() {
      if self.bit < BLOCK_NBITS {
        let bit = (self.slice[self.index] & !((1 << self.bit) - 1))
          .trailing_zeros() as usize;
        if bit < BLOCK_NBITS {
          self.bit = bit + 1;
          return Some((self.index * BLOCK_NBITS + bit) as u32);
        }
      }

      self.index += 1;
      self.bit = 0;
    }
    None
  }
}

impl Debug for TokenSet {
  fn fmt(&self, f: &mut Formatter) -> fmt::Result {
    f.debug_set().entries(self.iter()).finish()
  }
}

#[cfg(test)]
mod tests {
  use super::TokenSet;
  use pretty_assertions::assert_eq;

  #[test]
  fn insert() {
    let mut set = TokenSet::new(15);

    set.insert(7);
    set.insert(3);
    set.insert(7);
    set.insert(14);

    let vec = set.iter().collect::<Vec<_>>();

    assert_eq!(vec, vec![3, 7, 14]);
    assert!(set.contains(3));
    assert!(!set.contains(4));
  }

  #[test]
  fn union_reports_growth() {
    let mut a = TokenSet::from_token(130, 1);
    let b = TokenSet::from_token(130, 129);

    assert!(a.union_with(&b));
    assert!(!a.union_with(&b));
    assert_eq!(a.iter().collect::<Vec<_>>(), vec![1, 129]);

    a.clear();
    assert_eq!(a.iter().next(), None);
  }
}
