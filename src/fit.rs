use std::{fmt, str::FromStr};

use rand::{Rng, seq::SliceRandom};

use crate::{block::Block, error::ParseStrategyError};

/// Placement policy used to pick a free block for a request.
///
/// ```text
///   free set (by offset):   [ 50 ]  [ 20 ]  [ 30 ]      request = 25
///
///   FirstFit   ──► [ 50 ]   lowest offset that fits
///   BestFit    ──► [ 30 ]   smallest that fits
///   WorstFit   ──► [ 50 ]   largest
///   NextFit    ──► first fit at or after the cursor, wrapping
///   RandomFit  ──► first fit after a shuffle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FitStrategy {
  FirstFit,
  BestFit,
  WorstFit,
  NextFit,
  RandomFit,
}

/// Outcome of a single scan over the free set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
  /// Index into the free set of the chosen block, if any qualified.
  pub index: Option<usize>,
  /// Next-fit cursor to carry into the following call.
  pub cursor: usize,
}

impl FitStrategy {
  pub const ALL: [FitStrategy; 5] = [
    FitStrategy::FirstFit,
    FitStrategy::BestFit,
    FitStrategy::WorstFit,
    FitStrategy::NextFit,
    FitStrategy::RandomFit,
  ];

  /// Name used for this strategy in trace files.
  pub fn name(self) -> &'static str {
    match self {
      FitStrategy::FirstFit => "first",
      FitStrategy::BestFit => "best",
      FitStrategy::WorstFit => "worst",
      FitStrategy::NextFit => "next",
      FitStrategy::RandomFit => "rand",
    }
  }

  /// Puts the free set into the order this strategy scans it in.
  ///
  /// The order is left in place afterwards; only `RandomFit` consumes
  /// randomness.
  pub fn arrange<R: Rng + ?Sized>(
    self,
    free: &mut [Block],
    rng: &mut R,
  ) {
    match self {
      FitStrategy::FirstFit => free.sort_by_key(|block| block.offset),
      FitStrategy::BestFit => free.sort_by_key(|block| block.size),
      FitStrategy::WorstFit => free.sort_by(|a, b| b.size.cmp(&a.size)),
      FitStrategy::NextFit => {}
      FitStrategy::RandomFit => free.shuffle(rng),
    }
  }

  /// Picks a block of at least `size` bytes from an arranged free set.
  ///
  /// `cursor` is only read and advanced by `NextFit`; every other strategy
  /// hands it back untouched.
  pub fn select(
    self,
    free: &[Block],
    size: usize,
    cursor: usize,
  ) -> Selection {
    match self {
      FitStrategy::NextFit => next_fit(free, size, cursor),
      FitStrategy::FirstFit
      | FitStrategy::BestFit
      | FitStrategy::WorstFit
      | FitStrategy::RandomFit => Selection {
        index: free.iter().position(|block| block.size >= size),
        cursor,
      },
    }
  }
}

/// Index the next-fit scan starts from: the lowest free block that ends
/// past `cursor`, or the lowest free block overall once the cursor has run
/// off the top of the pool.
fn resolve_cursor(
  free: &[Block],
  cursor: usize,
) -> Option<usize> {
  let after = free
    .iter()
    .enumerate()
    .filter(|(_, block)| block.end() > cursor)
    .min_by_key(|(_, block)| block.offset);
  let lowest = free.iter().enumerate().min_by_key(|(_, block)| block.offset);

  after.or(lowest).map(|(index, _)| index)
}

fn next_fit(
  free: &[Block],
  size: usize,
  cursor: usize,
) -> Selection {
  let Some(start) = resolve_cursor(free, cursor) else {
    return Selection {
      index: None,
      cursor,
    };
  };

  let len = free.len();
  let found = (0..len)
    .map(|step| (start + step) % len)
    .find(|&index| free[index].size >= size);

  match found {
    Some(index) => Selection {
      index: Some(index),
      cursor: free[index].offset + size,
    },
    None => Selection {
      index: None,
      cursor,
    },
  }
}

impl fmt::Display for FitStrategy {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    f.write_str(self.name())
  }
}

impl FromStr for FitStrategy {
  type Err = ParseStrategyError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "first" => Ok(FitStrategy::FirstFit),
      "best" => Ok(FitStrategy::BestFit),
      "worst" => Ok(FitStrategy::WorstFit),
      "next" => Ok(FitStrategy::NextFit),
      "rand" | "random" => Ok(FitStrategy::RandomFit),
      other => Err(ParseStrategyError(other.to_string())),
    }
  }
}
