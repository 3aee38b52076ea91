//! Blocking-send leak on a zero-capacity channel.
//!
//! Two workers sleep, then each hands a [`Signal`] to its own channel. The
//! buffered channel has a free slot so its worker finishes; the unbuffered
//! one has no slot and nobody ever receives from it, so its worker blocks
//! forever. The harness proves both facts after a fixed observation window.
//!
//! The checks depend on timing alone (`race_timeout < worker_delay <
//! observation`), not on an explicit rendezvous, so they are not hermetic.

use std::fmt;
use std::io;
use std::mem;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{after, bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{report, Signal};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lane {
    Buffered,
    Unbuffered,
}

impl Lane {
    pub fn label(self) -> &'static str {
        match self {
            Lane::Buffered => "buffered",
            Lane::Unbuffered => "unbuffered",
        }
    }

    /// Channel capacity the lane is built with.
    pub fn capacity(self) -> usize {
        match self {
            Lane::Buffered => 1,
            Lane::Unbuffered => 0,
        }
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Completion flags, only ever touched under the harness lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Completion {
    pub buffered: bool,
    pub unbuffered: bool,
}

impl Completion {
    fn flag_mut(&mut self, lane: Lane) -> &mut bool {
        match lane {
            Lane::Buffered => &mut self.buffered,
            Lane::Unbuffered => &mut self.unbuffered,
        }
    }
}

/// Branch of the first race that became ready first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arm {
    Timer,
    Channel(Lane),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeakConfig {
    /// How long each worker sleeps before sending.
    pub worker_delay: Duration,
    /// Timer raced against both channels; must fire before any worker sends.
    pub race_timeout: Duration,
    /// Wait after the race before the flags are inspected.
    pub observation: Duration,
}

impl Default for LeakConfig {
    fn default() -> Self {
        LeakConfig {
            worker_delay: Duration::from_millis(200),
            race_timeout: Duration::from_millis(100),
            observation: Duration::from_millis(500),
        }
    }
}

impl LeakConfig {
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.race_timeout < self.worker_delay && self.worker_delay < self.observation {
            Ok(())
        } else {
            Err(HarnessError::InvalidTiming {
                race_timeout: self.race_timeout,
                worker_delay: self.worker_delay,
                observation: self.observation,
            })
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("{0} channel won the race against the timer")]
    RaceLost(Lane),
    #[error("buffered worker did not finish")]
    BufferedNotFinished,
    #[error("unbuffered worker finished")]
    UnbufferedFinished,
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error(
        "invalid timing: need race timeout ({race_timeout:?}) < worker delay ({worker_delay:?}) < observation ({observation:?})"
    )]
    InvalidTiming {
        race_timeout: Duration,
        worker_delay: Duration,
        observation: Duration,
    },
    #[error("failed to spawn {lane} worker")]
    Spawn {
        lane: Lane,
        #[source]
        source: io::Error,
    },
    #[error("reached unreachable code: {0}")]
    Unreachable(#[from] Violation),
}

/// A worker abandoned in its send. It is never joined.
///
/// The receiver is held so the send stays blocked; once every receiver is
/// gone the send fails and the worker returns without setting its flag.
#[derive(Debug)]
pub struct LeakedWorker {
    lane: Lane,
    handle: JoinHandle<()>,
    _rx: Receiver<Signal>,
}

impl LeakedWorker {
    pub fn lane(&self) -> Lane {
        self.lane
    }

    /// Whether the worker thread is still parked in its send.
    pub fn is_blocked(&self) -> bool {
        !self.handle.is_finished()
    }

    /// Gives up on the worker for good: it stays blocked until the process exits.
    pub fn abandon(self) {
        debug!(lane = %self.lane, "abandoning blocked worker");
        mem::forget(self);
    }
}

#[derive(Debug)]
pub struct LeakReport {
    pub winner: Arm,
    pub completion: Completion,
    pub leaked: LeakedWorker,
}

/// Sleeps `delay`, sends one [`Signal`] on `tx`, then flips the lane's flag.
///
/// Blocks forever if `tx` has no free slot and no receiver ever shows up.
pub fn run_worker(
    lane: Lane,
    delay: Duration,
    tx: Sender<Signal>,
    completion: Arc<Mutex<Completion>>,
) {
    let label = lane.label();
    report(label, "started");
    thread::sleep(delay);
    report(label, "will send");
    if tx.send(Signal).is_err() {
        debug!(%lane, "all receivers dropped, send abandoned");
        report(label, "send abandoned");
        return;
    }
    report(label, "sent!");

    *completion.lock().flag_mut(lane) = true;
    report(label, "finished");
}

fn spawn_worker(
    lane: Lane,
    delay: Duration,
    tx: Sender<Signal>,
    completion: &Arc<Mutex<Completion>>,
) -> Result<JoinHandle<()>, HarnessError> {
    let completion = Arc::clone(completion);
    thread::Builder::new()
        .name(format!("leak-{lane}"))
        .spawn(move || run_worker(lane, delay, tx, completion))
        .map_err(|source| HarnessError::Spawn { lane, source })
}

/// Runs both workers, races a short timer against their channels, then
/// checks that only the buffered worker finished.
pub fn run_harness(config: &LeakConfig) -> Result<LeakReport, HarnessError> {
    config.validate()?;
    debug!(?config, "starting leak harness");

    let completion = Arc::new(Mutex::new(Completion::default()));
    let (buffered_tx, buffered_rx) = bounded(Lane::Buffered.capacity());
    let (unbuffered_tx, unbuffered_rx) = bounded(Lane::Unbuffered.capacity());

    // The buffered worker always finishes on its own.
    drop(spawn_worker(
        Lane::Buffered,
        config.worker_delay,
        buffered_tx,
        &completion,
    )?);
    let handle = spawn_worker(
        Lane::Unbuffered,
        config.worker_delay,
        unbuffered_tx,
        &completion,
    )?;

    let winner = select! {
        recv(after(config.race_timeout)) -> _ => Arm::Timer,
        recv(buffered_rx) -> _ => Arm::Channel(Lane::Buffered),
        recv(unbuffered_rx) -> _ => Arm::Channel(Lane::Unbuffered),
    };
    if let Arm::Channel(lane) = winner {
        warn!(%lane, "channel arm beat the timer");
        return Err(Violation::RaceLost(lane).into());
    }
    report("main", "first arm finished");

    thread::sleep(config.observation);

    let observed = *completion.lock();
    debug!(?observed, "observation window over");
    if !observed.buffered {
        warn!("buffered worker never finished");
        return Err(Violation::BufferedNotFinished.into());
    }
    report("main", "buffered finished?= true");
    if observed.unbuffered {
        warn!("unbuffered worker finished");
        return Err(Violation::UnbufferedFinished.into());
    }
    report("main", "unbuffered finished?= false");

    Ok(LeakReport {
        winner,
        completion: observed,
        leaked: LeakedWorker {
            lane: Lane::Unbuffered,
            handle,
            _rx: unbuffered_rx,
        },
    })
}
