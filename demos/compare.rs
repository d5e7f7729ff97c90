use std::{env, fs, io};

use memfit::{FitStrategy, TraceOptions, trace};

const DEFAULT_TRACE: &str = include_str!("../traces/fragmentation.txt");

/// Replays one trace under every placement policy and prints how each one
/// leaves the pool.
///
/// Pass a trace path to use your own script; otherwise the bundled
/// `traces/fragmentation.txt` is used. The per-step listings are discarded so
/// only the comparison table is printed.
fn main() -> anyhow::Result<()> {
  let source = match env::args().nth(1) {
    Some(path) => fs::read_to_string(path)?,
    None => DEFAULT_TRACE.to_string(),
  };

  println!(
    "{:<8} {:>8} {:>8} {:>8} {:>12} {:>14}",
    "policy", "free %", "holes", "largest", "failed", "fragmentation"
  );

  for strategy in FitStrategy::ALL {
    let options = TraceOptions {
      strategy: Some(strategy),
      // Fixed seed so `rand` rows are comparable across runs.
      seed: Some(0x42),
    };

    let pool = trace::run(&source, &options, &mut io::sink())?;
    let report = pool.snapshot();

    println!(
      "{:<8} {:>8.2} {:>8} {:>8} {:>12} {:>14.3}",
      strategy.name(),
      report.free_fraction() * 100.0,
      report.free.len(),
      report.largest_free(),
      report.stats.failures,
      report.fragmentation()
    );
  }

  Ok(())
}
