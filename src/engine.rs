use std::{collections::HashSet, fmt};

use log::{debug, info, warn};
use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{
  block::Block,
  error::{AllocError, InvariantViolation},
  fit::FitStrategy,
  report::Report,
};

/// Running counters for one simulation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AllocStats {
  pub allocations: usize,
  pub failures: usize,
  pub frees: usize,
  pub free_misses: usize,
}

impl fmt::Display for AllocStats {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(
      f,
      "Allocations: {} (failed: {}) Frees: {} (missed: {})",
      self.allocations, self.failures, self.frees, self.free_misses
    )
  }
}

/// Simulated allocator over a pool of `capacity` bytes.
///
/// The pool is always partitioned between the free and used sets:
///
/// ```text
///   offset 0                                                   capacity
///   ┌────────┬──────────┬────────────┬──────┬─────────────────────┐
///   │ used A │   free   │   used B   │ free │       used C        │
///   └────────┴──────────┴────────────┴──────┴─────────────────────┘
/// ```
///
/// Allocation carves the request off the front of the chosen free block.
/// Freeing returns the block to the free set and immediately merges it with
/// its free neighbours.
///
/// `R` is the randomness source for [`FitStrategy::RandomFit`]; seed it to
/// make runs reproducible.
pub struct Allocator<R = StdRng> {
  capacity: usize,
  strategy: FitStrategy,
  free: Vec<Block>,
  used: Vec<Block>,
  cursor: usize,
  rng: R,
  stats: AllocStats,
}

impl Allocator<StdRng> {
  /// Creates an allocator whose random source is seeded from the OS.
  pub fn new(
    capacity: usize,
    strategy: FitStrategy,
  ) -> Result<Self, AllocError> {
    Self::with_rng(capacity, strategy, StdRng::from_os_rng())
  }

  pub fn seeded(
    capacity: usize,
    strategy: FitStrategy,
    seed: u64,
  ) -> Result<Self, AllocError> {
    Self::with_rng(capacity, strategy, StdRng::seed_from_u64(seed))
  }
}

impl<R: Rng> Allocator<R> {
  /// Starts a pool holding a single free block `[0, capacity)`.
  ///
  /// # Errors
  ///
  /// Returns [`AllocError::EmptyPool`] when `capacity` is zero.
  pub fn with_rng(
    capacity: usize,
    strategy: FitStrategy,
    rng: R,
  ) -> Result<Self, AllocError> {
    if capacity == 0 {
      return Err(AllocError::EmptyPool);
    }

    info!("pool started: {capacity} bytes, {strategy} fit");

    Ok(Self {
      capacity,
      strategy,
      free: vec![Block::free(capacity, 0)],
      used: Vec::new(),
      cursor: 0,
      rng,
      stats: AllocStats::default(),
    })
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }

  pub fn strategy(&self) -> FitStrategy {
    self.strategy
  }

  /// Address the next next-fit scan starts from.
  pub fn cursor(&self) -> usize {
    self.cursor
  }

  pub fn set_cursor(
    &mut self,
    cursor: usize,
  ) {
    self.cursor = cursor;
  }

  /// Free blocks, in whatever order the last operation left them.
  pub fn free_blocks(&self) -> &[Block] {
    &self.free
  }

  /// Used blocks, in allocation order.
  pub fn used_blocks(&self) -> &[Block] {
    &self.used
  }

  pub fn stats(&self) -> AllocStats {
    self.stats
  }

  pub fn snapshot(&self) -> Report {
    Report::new(self.capacity, &self.free, &self.used, self.stats)
  }

  /// Allocates `size` bytes under `label` and returns the new used block.
  ///
  /// # Errors
  ///
  /// - [`AllocError::ZeroSize`] when `size` is zero.
  /// - [`AllocError::DuplicateLabel`] when `label` is still allocated.
  /// - [`AllocError::AllocationFailure`] when no free block is large enough.
  ///
  /// The free and used sets are unchanged on error.
  pub fn allocate(
    &mut self,
    label: &str,
    size: usize,
  ) -> Result<Block, AllocError> {
    if size == 0 {
      return Err(self.fail(AllocError::ZeroSize {
        label: label.to_string(),
      }));
    }

    if self.used.iter().any(|block| block.label == label) {
      return Err(self.fail(AllocError::DuplicateLabel {
        label: label.to_string(),
      }));
    }

    self.strategy.arrange(&mut self.free, &mut self.rng);
    let selection = self.strategy.select(&self.free, size, self.cursor);
    self.cursor = selection.cursor;

    let Some(index) = selection.index else {
      return Err(self.fail(AllocError::AllocationFailure {
        label: label.to_string(),
        size,
      }));
    };

    let block = self.split(index, label, size);
    self.stats.allocations += 1;

    Ok(block)
  }

  /// Carves `size` bytes off the front of free block `index`.
  ///
  /// ```text
  ///   before:  [ free: offset o, size s                  ]
  ///   after:   [ used: o, size ][ free: o + size, s - size ]
  /// ```
  ///
  /// An exact fit removes the free block instead of leaving a zero-size
  /// remainder.
  fn split(
    &mut self,
    index: usize,
    label: &str,
    size: usize,
  ) -> Block {
    let chosen = &mut self.free[index];
    let used = Block::new(label, size, chosen.offset);

    if chosen.size == size {
      self.free.remove(index);
    } else {
      chosen.offset += size;
      chosen.size -= size;
    }

    debug!(
      "allocated {} at {} ({} bytes), {} free blocks left",
      used.label,
      used.offset,
      used.size,
      self.free.len()
    );

    self.used.push(used.clone());
    used
  }

  /// Releases the block allocated under `label` and returns its extent.
  ///
  /// Coalescing runs whether or not the label was found.
  ///
  /// # Errors
  ///
  /// Returns [`AllocError::FreeNotFound`] if no used block carries `label`,
  /// including labels that were already freed.
  pub fn free(
    &mut self,
    label: &str,
  ) -> Result<Block, AllocError> {
    let released = self
      .used
      .iter()
      .position(|block| block.label == label)
      .map(|index| self.used.remove(index));

    if let Some(block) = &released {
      self.free.push(Block::free(block.size, block.offset));
      self.stats.frees += 1;
      debug!("freed {} at {} ({} bytes)", block.label, block.offset, block.size);
    }

    self.coalesce();

    match released {
      Some(block) => Ok(block),
      None => {
        self.stats.free_misses += 1;
        let err = AllocError::FreeNotFound {
          label: label.to_string(),
        };
        warn!("{err}");
        Err(err)
      }
    }
  }

  /// Rebuilds the free set so that no two entries are adjacent.
  ///
  /// The set is sorted by offset and swept once, growing an accumulator
  /// while the next block touches it. The last accumulator is always kept.
  pub fn coalesce(&mut self) {
    self.free.sort_by_key(|block| block.offset);

    let before = self.free.len();
    let mut merged: Vec<Block> = Vec::with_capacity(before);
    let mut blocks = std::mem::take(&mut self.free).into_iter();

    if let Some(mut accum) = blocks.next() {
      for block in blocks {
        if accum.is_adjacent(&block) {
          accum.size += block.size;
        } else {
          merged.push(accum);
          accum = block;
        }
      }
      merged.push(accum);
    }

    if merged.len() != before {
      debug!("coalesced {before} free blocks into {}", merged.len());
    }

    self.free = merged;
  }

  /// Verifies that the free and used sets still partition the pool.
  pub fn check_invariants(&self) -> Result<(), InvariantViolation> {
    let actual: usize = self.free.iter().chain(&self.used).map(|block| block.size).sum();
    if actual != self.capacity {
      return Err(InvariantViolation::SizeMismatch {
        expected: self.capacity,
        actual,
      });
    }

    if let Some(block) = self.free.iter().find(|block| block.size == 0) {
      return Err(InvariantViolation::ZeroSizeFree {
        offset: block.offset,
      });
    }

    let mut labels = HashSet::new();
    if let Some(block) = self.used.iter().find(|block| !labels.insert(block.label.as_str())) {
      return Err(InvariantViolation::DuplicateLabel {
        label: block.label.clone(),
      });
    }

    let mut all: Vec<&Block> = self.free.iter().chain(&self.used).collect();
    all.sort_by_key(|block| block.offset);
    for pair in all.windows(2) {
      if pair[0].overlaps(pair[1]) {
        return Err(InvariantViolation::Overlap {
          first: pair[0].label.clone(),
          first_offset: pair[0].offset,
          second: pair[1].label.clone(),
          second_offset: pair[1].offset,
        });
      }
    }

    let mut free: Vec<&Block> = self.free.iter().collect();
    free.sort_by_key(|block| block.offset);
    for pair in free.windows(2) {
      if pair[0].is_adjacent(pair[1]) {
        return Err(InvariantViolation::AdjacentFree {
          left: pair[0].offset,
          right: pair[1].offset,
        });
      }
    }

    Ok(())
  }

  fn fail(
    &mut self,
    err: AllocError,
  ) -> AllocError {
    self.stats.failures += 1;
    warn!("{err}");
    err
  }
}

impl<R> fmt::Debug for Allocator<R> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    write!(
      f,
      "Allocator {{ capacity: {}, strategy: {}, free: {}, used: {}, cursor: {} }}",
      self.capacity,
      self.strategy,
      self.free.len(),
      self.used.len(),
      self.cursor
    )
  }
}
