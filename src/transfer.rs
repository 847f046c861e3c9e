//! Driving a non-blocking transfer to completion with progress reports.
//!
//! The engine starts a transfer on a [`Transport`] and then polls
//! `continue_transfer` until it reports a terminal status. Between polls the
//! wall clock is checked and the progress callback runs once for every whole
//! elapsed second that is a multiple of the configured interval.
//!
//! There is no cancellation and no timeout here: the transport's socket
//! timeouts bound each poll.

use std::path::Path;
use std::time::{Duration, Instant};

use super::transport::{TransferDirection, TransferRequest, TransferStatus, Transport};
use super::types::{FileType, FtpError, Result};

/// Source of elapsed time for the engine.
pub trait Clock {
    /// Time since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> Duration {
        (**self).now()
    }
}

/// Monotonic clock backed by `Instant`.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        SystemClock { origin: Instant::now() }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Snapshot handed to the progress callback.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferProgress {
    /// Average speed since the transfer started, in kilobytes per second,
    /// rounded to two decimals.
    pub speed_kbps: f64,
    /// Share of the total size reached, truncated. Can go past 100 when the
    /// total was measured before the file grew.
    pub percentage: u64,
    /// Kilobytes moved since the previous snapshot, truncated.
    pub transferred_delta_kb: u64,
    /// Whole seconds since the start, rounded up.
    pub elapsed_seconds: u64,
}

impl TransferProgress {
    fn measure(position: u64, previous: u64, offset: u64, total: u64, elapsed_seconds: u64) -> TransferProgress {
        let moved = position.saturating_sub(offset) as f64;
        let speed = moved / elapsed_seconds as f64 / 1000.0;
        let percentage = if total == 0 {
            100
        } else {
            (u128::from(position) * 100 / u128::from(total)) as u64
        };
        TransferProgress {
            speed_kbps: (speed * 100.0).round() / 100.0,
            percentage,
            transferred_delta_kb: position.saturating_sub(previous) / 1000,
            elapsed_seconds,
        }
    }
}

/// One transfer to run.
#[derive(Debug, Clone)]
pub struct TransferJob<'a> {
    pub direction: TransferDirection,
    pub local: &'a Path,
    pub remote: &'a str,
    pub file_type: FileType,
    /// Bytes already present at the destination. The caller measures them.
    pub resume_offset: u64,
    /// Full size of the file, used for the percentage.
    pub total_bytes: u64,
}

/// Polls a transfer to the end, reporting progress every `interval` seconds.
#[derive(Debug, Clone)]
pub struct TransferEngine<C: Clock = SystemClock> {
    clock: C,
    interval: u64,
}

impl TransferEngine<SystemClock> {
    pub fn new(interval_seconds: u64) -> Self {
        TransferEngine::with_clock(interval_seconds, SystemClock::new())
    }
}

impl<C: Clock> TransferEngine<C> {
    /// An interval of `0` is treated as `1`.
    pub fn with_clock(interval_seconds: u64, clock: C) -> Self {
        TransferEngine {
            clock,
            interval: interval_seconds.max(1),
        }
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    /// Runs `job` on `transport` and returns the number of bytes moved.
    ///
    /// A transfer the server does not confirm ends with
    /// [`FtpError::TransferFailed`]. Whatever reached the destination stays
    /// there and can be resumed from.
    pub fn run<T, F>(&self, transport: &mut T, job: TransferJob, mut on_progress: F) -> Result<u64>
    where
        T: Transport + ?Sized,
        F: FnMut(&TransferProgress),
    {
        info!(
            "{:?} of {} started at offset {} ({} bytes)",
            job.direction, job.remote, job.resume_offset, job.total_bytes
        );
        let started = self.clock.now();
        let mut status = transport.start_transfer(TransferRequest {
            direction: job.direction,
            local: job.local.to_path_buf(),
            remote: job.remote.to_string(),
            file_type: job.file_type.clone(),
            offset: job.resume_offset,
        })?;

        let mut last_elapsed = 0;
        let mut previous_position = job.resume_offset;
        while status == TransferStatus::MoreData {
            status = transport.continue_transfer()?;

            let elapsed = ceil_seconds(self.clock.now().saturating_sub(started));
            if elapsed == last_elapsed {
                continue;
            }
            last_elapsed = elapsed;
            if elapsed % self.interval == 0 {
                let position = transport.transfer_position();
                let progress = TransferProgress::measure(
                    position,
                    previous_position,
                    job.resume_offset,
                    job.total_bytes,
                    elapsed,
                );
                debug!("{}: {:?}", job.remote, progress);
                on_progress(&progress);
                previous_position = position;
            }
        }

        let moved = transport.transfer_position().saturating_sub(job.resume_offset);
        match status {
            TransferStatus::Failed(reason) => {
                warn!("{:?} of {} failed: {}", job.direction, job.remote, reason);
                Err(FtpError::TransferFailed(reason))
            }
            _ => {
                info!("{:?} of {} finished, {} bytes", job.direction, job.remote, moved);
                Ok(moved)
            }
        }
    }
}

fn ceil_seconds(elapsed: Duration) -> u64 {
    elapsed.as_secs() + u64::from(elapsed.subsec_nanos() > 0)
}
