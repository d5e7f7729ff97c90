use thiserror::Error;

/// Non-fatal allocator failures.
///
/// Every variant leaves the free and used sets exactly as they were before
/// the call that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocError {
  #[error("pool capacity must be greater than zero")]
  EmptyPool,

  #[error("allocation failed for {label} (requested: {size} bytes)")]
  AllocationFailure { label: String, size: usize },

  #[error("the name {label} doesn't exist, cannot be freed")]
  FreeNotFound { label: String },

  #[error("the name {label} is already allocated")]
  DuplicateLabel { label: String },

  #[error("cannot allocate zero bytes for {label}")]
  ZeroSize { label: String },
}

/// A broken partition of the pool, reported by
/// [`Allocator::check_invariants`](crate::Allocator::check_invariants).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
  #[error("blocks cover {actual} bytes, pool holds {expected}")]
  SizeMismatch { expected: usize, actual: usize },

  #[error("{first} at {first_offset} overlaps {second} at {second_offset}")]
  Overlap {
    first: String,
    first_offset: usize,
    second: String,
    second_offset: usize,
  },

  #[error("zero-size free block at {offset}")]
  ZeroSizeFree { offset: usize },

  #[error("label {label} is used by more than one block")]
  DuplicateLabel { label: String },

  #[error("free blocks at {left} and {right} were not coalesced")]
  AdjacentFree { left: usize, right: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown fit algorithm `{0}` (expected first, best, worst, next or rand)")]
pub struct ParseStrategyError(pub String);

/// Fatal trace errors. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum TraceError {
  #[error("need input file on command line")]
  MissingArgument,

  #[error("invalid file line {line}: {text}")]
  InvalidTraceLine { line: usize, text: String },

  #[error("line {line}: `{token}` is not a positive size")]
  InvalidSize { line: usize, token: String },

  #[error("line {line}: {source}")]
  UnknownAlgorithm {
    line: usize,
    source: ParseStrategyError,
  },

  #[error("line {line}: no `pool` line precedes this command")]
  MissingPool { line: usize },

  #[error("line {line}: the pool was already started")]
  DuplicatePool { line: usize },

  #[error(transparent)]
  Io(#[from] std::io::Error),
}
