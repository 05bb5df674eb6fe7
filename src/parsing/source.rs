
use std::fmt::{self, Display, Formatter};
use std::ops::{Add, AddAssign};

/// A byte position in the input expression. Carried on tokens and
/// errors so failures can point at the offending spot.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SourceOffset(pub usize);

/// A half-open range of the input: `start` is included, `end` is
/// excluded. Besides error reporting, spans carry the adjacency
/// information the parser uses to tell `m2` from `m 2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
  pub start: SourceOffset,
  pub end: SourceOffset,
}

impl Span {
  pub fn new(start: SourceOffset, end: SourceOffset) -> Self {
    Self { start, end }
  }
}

impl Display for SourceOffset {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

impl Add<usize> for SourceOffset {
  type Output = Self;

  fn add(self, rhs: usize) -> Self::Output {
    Self(self.0 + rhs)
  }
}

impl AddAssign<usize> for SourceOffset {
  fn add_assign(&mut self, rhs: usize) {
    self.0 += rhs
  }
}

impl Display for Span {
  fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
    write!(f, "{}-{}", self.start, self.end)
  }
}
