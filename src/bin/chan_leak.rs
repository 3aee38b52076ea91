use anyhow::{Context, Result};

use leakwatch::leak::{self, LeakConfig};
use leakwatch::logging;

fn main() -> Result<()> {
    logging::init();

    let report = leak::run_harness(&LeakConfig::default()).context("leak harness failed")?;
    tracing::info!(
        winner = ?report.winner,
        completion = ?report.completion,
        blocked = report.leaked.is_blocked(),
        "leak harness done"
    );
    // Exiting with the worker still parked mirrors the leak.
    report.leaked.abandon();
    Ok(())
}
