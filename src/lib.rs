//! # memfit - A Placement Policy Simulator
//!
//! This crate simulates a contiguous pool of memory managed with a
//! **free list**, and replays scripted allocate/free traces against it to
//! compare classic placement heuristics and the fragmentation they cause.
//!
//! ## Overview
//!
//! The pool is split between a free set and a used set. Every byte belongs
//! to exactly one block in one of the two sets:
//!
//! ```text
//!   Pool of N bytes:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │ 0                                                                  N │
//!   │   ┌──────┬───────────┬──────────┬──────┬──────────────────────────┐  │
//!   │   │  A   │   free    │    B     │ free │           free?          │  │
//!   │   └──────┴───────────┴──────────┴──────┴──────────────────────────┘  │
//!   │                                                                      │
//!   │   used set: A, B            free set: every gap between them         │
//!   │                                                                      │
//!   └──────────────────────────────────────────────────────────────────────┘
//!
//!   Adjacent free blocks never coexist: freeing merges them at once.
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   memfit
//!   ├── block      - Block extent and adjacency
//!   ├── fit        - FitStrategy: first, best, worst, next, rand
//!   ├── engine     - Allocator: split on allocate, coalesce on free
//!   ├── report     - Report snapshots, utilization and fragmentation
//!   ├── trace      - Trace file parsing and replay
//!   └── error      - AllocError, TraceError, InvariantViolation
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use memfit::{Allocator, FitStrategy};
//!
//! let mut allocator = Allocator::seeded(100, FitStrategy::BestFit, 7).unwrap();
//!
//! let x = allocator.allocate("X", 40).unwrap();
//! assert_eq!(x.offset, 0);
//!
//! allocator.allocate("Y", 30).unwrap();
//! allocator.free("X").unwrap();
//! allocator.free("Y").unwrap();
//!
//! // Everything merged back into one block.
//! assert_eq!(allocator.free_blocks().len(), 1);
//! println!("{}", allocator.snapshot());
//! ```
//!
//! ## How It Works
//!
//! Allocation asks the strategy for a free block at least as large as the
//! request, then splits it:
//!
//! ```text
//!   alloc C 15
//!
//!   before:  ┌──────────── free (offset 50, size 50) ────────────┐
//!   after:   ┌── C (50, 15) ──┬──────── free (65, 35) ───────────┐
//! ```
//!
//! Freeing puts the block back and sweeps the free set in offset order,
//! merging runs of touching blocks:
//!
//! ```text
//!   free B
//!
//!   before:  [ free 0..20 ][ B 20..50 ][ free 50..100 ]
//!   after:   [ free 0..100                            ]
//! ```
//!
//! ## Trace Format
//!
//! ```text
//!   pool <first|best|worst|next|rand> <size>
//!   alloc <name> <size>
//!   free <name>
//! ```
//!
//! A blank line ends the trace. See [`trace`] for error behaviour.
//!
//! ## Limitations
//!
//! - **Single-threaded only**: commands are applied strictly in order
//! - **No alignment**: requests are carved at byte granularity
//! - **In-memory only**: nothing survives the process

mod block;
mod engine;
mod error;
mod fit;
mod report;
pub mod trace;

pub use block::{Block, FREE_LABEL};
pub use engine::{AllocStats, Allocator};
pub use error::{AllocError, InvariantViolation, ParseStrategyError, TraceError};
pub use fit::{FitStrategy, Selection};
pub use report::Report;
pub use trace::{Command, TraceOptions};
