//! The polling loop.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use next_action_app::{ChangeSink, Config, SyncService};
use time::OffsetDateTime;
use tracing::{debug, error, info};

/// When cycles run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Pause between cycles.
    pub delay: Duration,
    /// Stop after the first cycle.
    pub onetime: bool,
}

impl From<&Config> for Schedule {
    fn from(config: &Config) -> Self {
        Self {
            delay: config.delay(),
            onetime: config.onetime,
        }
    }
}

/// Run cycles until `shutdown` fires, or once when `schedule.onetime` is set.
///
/// In the loop, failed cycles are logged and the next one runs after the
/// usual delay. A single `onetime` cycle reports its failure to the caller.
///
/// # Errors
/// Returns the cycle error of a failed `onetime` run.
pub fn run<S: ChangeSink>(service: &mut SyncService<S>, schedule: Schedule, shutdown: &Receiver<()>) -> Result<u64> {
    let mut cycles = 0;
    loop {
        cycles += 1;
        match service.run_cycle(OffsetDateTime::now_utc()) {
            Ok(report) => debug!(
                managed = report.managed_projects,
                staged = report.staged,
                committed = report.committed,
                skipped = report.skipped,
                "Cycle finished"
            ),
            Err(err) if schedule.onetime => return Err(err.into()),
            Err(err) => error!(error = %err, "Cycle failed"),
        }
        if schedule.onetime {
            return Ok(cycles);
        }

        debug!(seconds = schedule.delay.as_secs(), "Sleeping");
        match shutdown.recv_timeout(schedule.delay) {
            Ok(()) => {
                info!(cycles, "Shutting down");
                return Ok(cycles);
            }
            Err(RecvTimeoutError::Timeout) => {}
            // No handler is listening any more; keep polling on the plain delay.
            Err(RecvTimeoutError::Disconnected) => thread::sleep(schedule.delay),
        }
    }
}
