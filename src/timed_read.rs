//! A deadline imposed on a blocking, non-cancellable line read.
//!
//! The read runs on its own thread and delivers its outcome into a
//! single-slot channel, so the delivery never blocks even after the caller
//! has given up. The caller races that channel against the deadline. When the
//! deadline wins the reader thread is abandoned: it stays blocked on its
//! source until input arrives or the process exits.

use std::error::Error as StdError;
use std::io::{self, ErrorKind};
use std::thread;

use crossbeam_channel::{bounded, select};
use thiserror::Error;
use tracing::debug;

use crate::{Deadline, LineSource};

#[derive(Debug, Error)]
pub enum ReadError {
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("failed to read: {0}")]
    Read(#[source] io::Error),
    #[error("failed to spawn reader thread")]
    Spawn(#[source] io::Error),
}

impl ReadError {
    pub fn is_end_of_input(&self) -> bool {
        is_end_of_input(self)
    }

    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, ReadError::DeadlineExceeded)
    }
}

/// Returns `true` if `err`, or anything in its source chain, is an
/// end-of-input I/O error.
pub fn is_end_of_input(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(err) = current {
        if let Some(io) = err.downcast_ref::<io::Error>() {
            if io.kind() == ErrorKind::UnexpectedEof {
                return true;
            }
        }
        current = err.source();
    }
    false
}

/// Terminal state of one timed read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    Completed,
    Failed,
    TimedOut,
}

impl ReadOutcome {
    pub fn of(result: &Result<String, ReadError>) -> Self {
        match result {
            Ok(_) => ReadOutcome::Completed,
            Err(ReadError::DeadlineExceeded) => ReadOutcome::TimedOut,
            Err(_) => ReadOutcome::Failed,
        }
    }
}

/// Reads one line from `source`, giving up once `deadline` elapses.
///
/// The returned line has leading and trailing whitespace removed.
pub fn read_line_with_timeout<S>(deadline: Deadline, mut source: S) -> Result<String, ReadError>
where
    S: LineSource,
{
    let (tx, rx) = bounded(1);
    thread::Builder::new()
        .name("timed-read".into())
        .spawn(move || {
            let res = source
                .read_line()
                .map(|line| line.trim().to_owned())
                .map_err(ReadError::Read);
            // Never blocks: the slot is free and this is the only send.
            if tx.send(res).is_err() {
                debug!("reader finished after the caller gave up");
            }
        })
        .map_err(ReadError::Spawn)?;

    let res = select! {
        recv(rx) -> res => match res {
            Ok(res) => res,
            // The worker only exits without sending if it panicked.
            Err(_) => Err(ReadError::Read(io::Error::other(
                "reader thread exited without a result",
            ))),
        },
        recv(deadline.elapsed()) -> _ => Err(ReadError::DeadlineExceeded),
    };
    debug!(outcome = ?ReadOutcome::of(&res), "timed read done");
    res
}
