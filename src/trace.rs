//! Trace interpreter: replays a script of pool commands against an
//! [`Allocator`].
//!
//! ```text
//!   pool first 100      start a 100 byte pool using first fit
//!   alloc X 40          allocate 40 bytes labelled X, then report
//!   free X              release X and coalesce
//!                       a blank line ends the trace
//! ```

use std::io::Write;

use log::{debug, info};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
  engine::Allocator,
  error::{AllocError, TraceError},
  fit::FitStrategy,
};

/// One parsed trace line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
  Pool { strategy: FitStrategy, size: usize },
  Alloc { label: String, size: usize },
  Free { label: String },
}

impl Command {
  /// Parses a non-blank trace line. `line` is the 1-based line number used
  /// in errors.
  pub fn parse(
    line: usize,
    text: &str,
  ) -> Result<Self, TraceError> {
    let tokens: Vec<&str> = text.split_whitespace().collect();

    match tokens.as_slice() {
      ["pool", algorithm, size] => Ok(Command::Pool {
        strategy: algorithm
          .parse()
          .map_err(|source| TraceError::UnknownAlgorithm { line, source })?,
        size: parse_size(line, size)?,
      }),
      ["alloc", label, size] => Ok(Command::Alloc {
        label: label.to_string(),
        size: parse_size(line, size)?,
      }),
      ["free", label] => Ok(Command::Free {
        label: label.to_string(),
      }),
      _ => Err(TraceError::InvalidTraceLine {
        line,
        text: text.to_string(),
      }),
    }
  }
}

fn parse_size(
  line: usize,
  token: &str,
) -> Result<usize, TraceError> {
  match token.parse::<usize>() {
    Ok(size) if size > 0 => Ok(size),
    _ => Err(TraceError::InvalidSize {
      line,
      token: token.to_string(),
    }),
  }
}

/// Yields `(line number, command)` pairs up to the first blank line.
///
/// Lines after a blank line are never parsed.
pub fn commands(source: &str) -> impl Iterator<Item = Result<(usize, Command), TraceError>> + '_ {
  source
    .lines()
    .enumerate()
    .map(|(index, text)| (index + 1, text))
    .take_while(|(_, text)| !text.trim().is_empty())
    .map(|(line, text)| Command::parse(line, text).map(|command| (line, command)))
}

/// Knobs the command line can set on top of a trace.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceOptions {
  /// Replaces the algorithm named on the `pool` line.
  pub strategy: Option<FitStrategy>,
  /// Seed for random fit; the OS seeds it when absent.
  pub seed: Option<u64>,
}

/// Runs `source` to completion, writing a report after every `alloc` and
/// once more at the end.
///
/// Allocation and free failures are written to `out` and the run continues.
/// Any [`TraceError`] stops the run; output already written stays written.
pub fn run<W: Write>(
  source: &str,
  options: &TraceOptions,
  out: &mut W,
) -> Result<Allocator, TraceError> {
  let mut allocator: Option<Allocator> = None;
  let mut last_line = 0;

  for entry in commands(source) {
    let (line, command) = entry?;
    last_line = line;
    debug!("line {line}: {command:?}");

    match command {
      Command::Pool { strategy, size } => {
        if allocator.is_some() {
          return Err(TraceError::DuplicatePool { line });
        }

        let strategy = options.strategy.unwrap_or(strategy);
        let rng = match options.seed {
          Some(seed) => StdRng::seed_from_u64(seed),
          None => StdRng::from_os_rng(),
        };
        let pool = Allocator::with_rng(size, strategy, rng).map_err(|_| TraceError::InvalidSize {
          line,
          token: size.to_string(),
        })?;
        allocator = Some(pool);
      }
      Command::Alloc { label, size } => {
        let pool = allocator.as_mut().ok_or(TraceError::MissingPool { line })?;

        match pool.allocate(&label, size) {
          Ok(_) => {}
          Err(AllocError::AllocationFailure { label, .. }) => {
            writeln!(out, "Error: Allocation failed for {label}")?;
          }
          Err(err) => writeln!(out, "Error: {err}")?,
        }
        write!(out, "{}", pool.snapshot())?;
      }
      Command::Free { label } => {
        let pool = allocator.as_mut().ok_or(TraceError::MissingPool { line })?;

        if let Err(AllocError::FreeNotFound { label }) = pool.free(&label) {
          writeln!(out, "Oops - the name {label} doesn't exist, cannot be freed!")?;
        }
      }
    }
  }

  let pool = allocator.ok_or(TraceError::MissingPool { line: last_line + 1 })?;
  let report = pool.snapshot();
  write!(out, "{report}")?;
  writeln!(out, "{}", report.stats)?;
  info!("trace finished after {last_line} lines: {}", report.stats);

  Ok(pool)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::block::Block;

  const COALESCE: &str = include_str!("../traces/coalesce.txt");
  const NEXT_FIT: &str = include_str!("../traces/next_fit.txt");
  const FRAGMENTATION: &str = include_str!("../traces/fragmentation.txt");
  const FAILURE: &str = include_str!("../traces/failure.txt");

  fn replay(source: &str) -> (Result<Allocator, TraceError>, String) {
    let mut out = Vec::new();
    let options = TraceOptions {
      seed: Some(1),
      ..TraceOptions::default()
    };
    let result = run(source, &options, &mut out);
    (result, String::from_utf8(out).unwrap())
  }

  #[test]
  fn test_parse_commands() {
    assert_eq!(
      Command::parse(1, "pool best 64").unwrap(),
      Command::Pool {
        strategy: FitStrategy::BestFit,
        size: 64
      }
    );
    assert_eq!(
      Command::parse(2, "alloc A 8").unwrap(),
      Command::Alloc {
        label: "A".to_string(),
        size: 8
      }
    );
    assert_eq!(
      Command::parse(3, "free A").unwrap(),
      Command::Free {
        label: "A".to_string()
      }
    );
  }

  #[test]
  fn test_parse_rejects_bad_lines() {
    assert!(matches!(
      Command::parse(4, "grow A 8"),
      Err(TraceError::InvalidTraceLine { line: 4, .. })
    ));
    assert!(matches!(
      Command::parse(5, "alloc A"),
      Err(TraceError::InvalidTraceLine { line: 5, .. })
    ));
    assert!(matches!(
      Command::parse(6, "alloc A zero"),
      Err(TraceError::InvalidSize { line: 6, .. })
    ));
    assert!(matches!(
      Command::parse(7, "alloc A 0"),
      Err(TraceError::InvalidSize { line: 7, .. })
    ));
    assert!(matches!(
      Command::parse(8, "pool buddy 64"),
      Err(TraceError::UnknownAlgorithm { line: 8, .. })
    ));
  }

  #[test]
  fn test_blank_line_ends_trace() {
    let source = "pool first 10\nalloc A 5\n\nthis line is never parsed\n";

    let (result, _) = replay(source);

    let pool = result.unwrap();
    assert_eq!(pool.used_blocks(), &[Block::new("A", 5, 0)]);
  }

  #[test]
  fn test_coalesce_trace() {
    let (result, output) = replay(COALESCE);

    let pool = result.unwrap();
    assert_eq!(pool.free_blocks(), &[Block::free(100, 0)]);
    assert!(pool.used_blocks().is_empty());
    assert!(output.ends_with(
      "Percentage of memory free: 100.00\n\
       Percentage of memory used: 0.00\n\
       Fragmentation: 0.00\n\
       Allocations: 2 (failed: 0) Frees: 2 (missed: 0)\n"
    ));
  }

  #[test]
  fn test_next_fit_trace() {
    let (result, _) = replay(NEXT_FIT);

    let pool = result.unwrap();
    let c = pool.used_blocks().iter().find(|b| b.label == "C").unwrap();
    assert_eq!(c.offset, 50);
  }

  #[test]
  fn test_reports_after_each_alloc_and_at_end() {
    let (result, output) = replay(COALESCE);

    result.unwrap();
    assert_eq!(output.matches("Free List").count(), 3);
  }

  #[test]
  fn test_allocation_failure_is_reported() {
    let (result, output) = replay("pool first 10\nalloc A 20\n");

    let pool = result.unwrap();
    assert!(output.starts_with(
      "Error: Allocation failed for A\nFree List\nName: free Offset: 0 Size: 10\n"
    ));
    assert!(pool.used_blocks().is_empty());
    assert_eq!(pool.free_blocks(), &[Block::free(10, 0)]);
  }

  #[test]
  fn test_failure_trace_counts_both_misses() {
    let (result, output) = replay(FAILURE);

    let pool = result.unwrap();
    assert!(output.contains("Error: Allocation failed for A\n"));
    assert!(output.contains("Oops - the name A doesn't exist, cannot be freed!\n"));
    assert!(output.ends_with("Allocations: 0 (failed: 1) Frees: 0 (missed: 1)\n"));
    assert_eq!(pool.free_blocks(), &[Block::free(10, 0)]);
  }

  #[test]
  fn test_free_not_found_is_reported() {
    let (result, output) = replay("pool first 10\nfree ghost\n");

    result.unwrap();
    assert!(output.starts_with("Oops - the name ghost doesn't exist, cannot be freed!\n"));
  }

  #[test]
  fn test_invalid_line_aborts_after_earlier_output() {
    let (result, output) = replay("pool first 10\nalloc A 5\nresize A 8\nalloc B 1\n");

    assert!(matches!(result, Err(TraceError::InvalidTraceLine { line: 3, .. })));
    assert_eq!(output.matches("Free List").count(), 1);
  }

  #[test]
  fn test_pool_must_come_first_and_once() {
    let (result, _) = replay("alloc A 5\n");
    assert!(matches!(result, Err(TraceError::MissingPool { line: 1 })));

    let (result, _) = replay("pool first 10\npool best 10\n");
    assert!(matches!(result, Err(TraceError::DuplicatePool { line: 2 })));

    let (result, _) = replay("");
    assert!(matches!(result, Err(TraceError::MissingPool { line: 1 })));
  }

  #[test]
  fn test_strategy_override() {
    let mut out = Vec::new();
    let options = TraceOptions {
      strategy: Some(FitStrategy::FirstFit),
      seed: None,
    };

    let pool = run(NEXT_FIT, &options, &mut out).unwrap();

    assert_eq!(pool.strategy(), FitStrategy::FirstFit);
    let c = pool.used_blocks().iter().find(|b| b.label == "C").unwrap();
    assert_eq!(c.offset, 0);
  }

  #[test]
  fn test_every_strategy_keeps_invariants() {
    for strategy in FitStrategy::ALL {
      let mut out = Vec::new();
      let options = TraceOptions {
        strategy: Some(strategy),
        seed: Some(3),
      };

      let pool = run(FRAGMENTATION, &options, &mut out).unwrap();

      pool.check_invariants().unwrap();
      assert_eq!(pool.capacity(), 1000);
    }
  }

  #[test]
  fn test_seeded_random_runs_match() {
    let options = TraceOptions {
      strategy: Some(FitStrategy::RandomFit),
      seed: Some(42),
    };
    let mut first = Vec::new();
    let mut second = Vec::new();

    run(FRAGMENTATION, &options, &mut first).unwrap();
    run(FRAGMENTATION, &options, &mut second).unwrap();

    assert_eq!(first, second);
  }
}
