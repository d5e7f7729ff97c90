use std::fmt;

use crate::{block::Block, engine::AllocStats};

/// Read-only view of the pool at one point in a simulation.
///
/// Both lists are sorted by offset. Rendering it produces the per-step
/// listing printed by the trace interpreter:
///
/// ```text
///   Free List
///   Name: free Offset: 70 Size: 30
///   Used List
///   Name: X Offset: 0 Size: 40
///   Name: Y Offset: 40 Size: 30
///   Percentage of memory free: 30.00
///   Percentage of memory used: 70.00
///   Fragmentation: 0.00
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
  pub capacity: usize,
  pub free: Vec<Block>,
  pub used: Vec<Block>,
  pub stats: AllocStats,
}

impl Report {
  pub fn new(
    capacity: usize,
    free: &[Block],
    used: &[Block],
    stats: AllocStats,
  ) -> Self {
    let mut free = free.to_vec();
    let mut used = used.to_vec();
    free.sort_by_key(|block| block.offset);
    used.sort_by_key(|block| block.offset);

    Self {
      capacity,
      free,
      used,
      stats,
    }
  }

  pub fn free_total(&self) -> usize {
    self.free.iter().map(|block| block.size).sum()
  }

  pub fn used_total(&self) -> usize {
    self.used.iter().map(|block| block.size).sum()
  }

  /// Share of the pool that is free, in `[0, 1]`.
  pub fn free_fraction(&self) -> f64 {
    self.free_total() as f64 / self.capacity as f64
  }

  pub fn used_fraction(&self) -> f64 {
    self.used_total() as f64 / self.capacity as f64
  }

  pub fn largest_free(&self) -> usize {
    self.free.iter().map(|block| block.size).max().unwrap_or(0)
  }

  /// External fragmentation: `1 - largest_free / total_free`.
  ///
  /// Zero when nothing is free or all free space is one block; approaches
  /// one as free space scatters into many small holes.
  pub fn fragmentation(&self) -> f64 {
    let total = self.free_total();
    if total == 0 {
      return 0.0;
    }

    (1.0 - self.largest_free() as f64 / total as f64).clamp(0.0, 1.0)
  }
}

impl fmt::Display for Report {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "Free List")?;
    for block in &self.free {
      writeln!(f, "Name: {} Offset: {} Size: {}", block.label, block.offset, block.size)?;
    }

    writeln!(f, "Used List")?;
    for block in &self.used {
      writeln!(f, "Name: {} Offset: {} Size: {}", block.label, block.offset, block.size)?;
    }

    writeln!(f, "Percentage of memory free: {:.2}", self.free_fraction() * 100.0)?;
    writeln!(f, "Percentage of memory used: {:.2}", self.used_fraction() * 100.0)?;
    writeln!(f, "Fragmentation: {:.2}", self.fragmentation())
  }
}
