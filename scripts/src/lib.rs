//! Shared plumbing for the benchmark binaries
use std::io;

use clap::Args;
use rangesort::{DistributionMode, TrialConfig, TrialReport};
use tracing_subscriber::EnvFilter;

/// Trial parameters common to every runner
#[derive(Args, Debug)]
pub struct TrialArgs {
    /// Identifier written as the first column of the result line
    #[arg(long, default_value_t = String::from("x"))]
    pub id: String,

    /// Number of values generated on the root
    #[arg(long, default_value_t = 1_000_000)]
    pub n_numbers: usize,

    /// Generator seed, 0 picks one from the clock
    #[arg(long, default_value_t = 0)]
    pub seed: u64,

    /// Significant low order bits per value, 0 or more than 64 falls back to 32
    #[arg(long, default_value_t = 32)]
    pub bits: u32,

    /// Distribution protocol, 'batched' or 'streaming'
    #[arg(long, default_value_t = DistributionMode::Batched)]
    pub mode: DistributionMode,

    /// Maximum number of values a single growable buffer may hold
    #[arg(long)]
    pub buffer_limit: Option<usize>,

    /// Omit the header line
    #[arg(long, default_value_t = false)]
    pub no_header: bool,
}

impl TrialArgs {
    /// Trial configuration described by the arguments
    pub fn config(&self) -> TrialConfig {
        TrialConfig::new(self.n_numbers, self.seed, self.bits)
            .with_mode(self.mode)
            .with_buffer_limit(self.buffer_limit)
    }
}

/// Install a formatting subscriber, `RUST_LOG` overrides the default `info` level.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

/// Write the report as one tab separated record to stdout, optionally preceded by a header.
pub fn write_report(id: &str, report: &TrialReport, header: bool) -> Result<(), csv::Error> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b'\t')
        .from_writer(io::stdout());

    if header {
        writer.write_record(std::iter::once("id").chain(TrialReport::header()))?;
    }
    writer.write_record(std::iter::once(id.to_string()).chain(report.record()))?;
    writer.flush()?;
    Ok(())
}
