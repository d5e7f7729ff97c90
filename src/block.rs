/// Label carried by every block on the free list.
pub const FREE_LABEL: &str = "free";

/// A contiguous extent `[offset, offset + size)` of the pool.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Block {
  pub label: String,
  pub size: usize,
  pub offset: usize,
}

impl Block {
  pub fn new(
    label: impl Into<String>,
    size: usize,
    offset: usize,
  ) -> Self {
    Self {
      label: label.into(),
      size,
      offset,
    }
  }

  /// An unlabelled extent destined for the free list.
  pub fn free(
    size: usize,
    offset: usize,
  ) -> Self {
    Self::new(FREE_LABEL, size, offset)
  }

  /// One past the last address covered by this block.
  pub fn end(&self) -> usize {
    self.offset + self.size
  }

  /// True iff one block ends exactly where the other begins.
  ///
  /// ```text
  ///   adjacent:      [ a )[ b )        [ b )[ a )
  ///   not adjacent:  [ a )  [ b )      [ a [ b ) )
  /// ```
  pub fn is_adjacent(
    &self,
    other: &Block,
  ) -> bool {
    self.end() == other.offset || other.end() == self.offset
  }

  pub fn overlaps(
    &self,
    other: &Block,
  ) -> bool {
    self.offset < other.end() && other.offset < self.end()
  }
}
