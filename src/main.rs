//! memfit - replay an allocation trace and print the pool after each step.
//!
//! Usage:
//!   memfit traces/coalesce.txt
//!   memfit --algorithm worst --seed 7 traces/fragmentation.txt

use std::{fs, io, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use memfit::{FitStrategy, TraceError, TraceOptions, trace};

#[derive(Parser, Debug)]
#[command(name = "memfit", version)]
#[command(about = "Simulate free-list placement policies over an allocation trace")]
struct Args {
  /// Trace file to replay
  trace: Option<PathBuf>,

  /// Override the algorithm named on the trace's `pool` line
  #[arg(short, long)]
  algorithm: Option<FitStrategy>,

  /// Seed for random fit (defaults to OS entropy)
  #[arg(long)]
  seed: Option<u64>,
}

fn main() -> Result<()> {
  env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

  let args = Args::parse();
  let path = args.trace.ok_or(TraceError::MissingArgument)?;

  let source = fs::read_to_string(&path)
    .with_context(|| format!("failed to read trace {}", path.display()))?;

  let options = TraceOptions {
    strategy: args.algorithm,
    seed: args.seed,
  };

  let stdout = io::stdout();
  let mut out = stdout.lock();
  trace::run(&source, &options, &mut out)
    .with_context(|| format!("while replaying {}", path.display()))?;

  Ok(())
}
