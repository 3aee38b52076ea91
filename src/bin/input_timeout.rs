use std::io::{self, BufReader, Write};
use std::time::Duration;

use anyhow::{Context, Result};

use leakwatch::logging;
use leakwatch::timed_read::read_line_with_timeout;
use leakwatch::Deadline;

const INPUT_TIMEOUT: Duration = Duration::from_secs(2);

fn main() -> Result<()> {
    logging::init();

    let deadline = Deadline::after(INPUT_TIMEOUT);
    print!("What is your name? ({}s)>> ", INPUT_TIMEOUT.as_secs());
    io::stdout().flush().context("failed to flush prompt")?;

    match read_line_with_timeout(deadline, BufReader::new(io::stdin())) {
        Ok(name) => println!("got '{name}'"),
        // The reader may still be blocked on stdin; it goes away with the process.
        Err(err) if err.is_end_of_input() || err.is_deadline_exceeded() => {
            tracing::debug!(%err, "no input");
            println!();
            println!("got nothing");
        }
        Err(err) => {
            println!();
            tracing::error!(%err, "failed to read input");
            return Err(err).context("failed to read input");
        }
    }
    Ok(())
}
