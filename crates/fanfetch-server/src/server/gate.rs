//! Process-wide admission control for batch requests.
//!
//! [`AdmissionGate`] bounds how many batches are processed at the same time.
//! Admission is a single compare-and-increment on an atomic counter, so the
//! bound holds under any interleaving of concurrent requests. Every admitted
//! batch holds an [`AdmissionPermit`]; dropping the permit releases the slot,
//! whether the batch succeeded, failed, or its handler future was dropped.
//!
//! The gate also drives shutdown: once [`AdmissionGate::close`] is called no
//! further batches are admitted and [`AdmissionGate::drain`] waits for the
//! admitted ones to finish.

use crate::server::telemetry::{decrement_batches_inflight, increment_batches_inflight};
use core::time::Duration;
use fanfetch_core::Error;
use portable_atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, timeout};

/// Interval at which [`AdmissionGate::drain`] re-checks the in-flight count.
const DRAIN_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Bounded counter of batches currently being processed.
pub struct AdmissionGate {
    in_flight: AtomicUsize,
    max_in_flight: usize,
    closed: AtomicBool,
}

impl AdmissionGate {
    /// Creates a gate that admits at most `max_in_flight` concurrent batches.
    pub const fn new(max_in_flight: usize) -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            max_in_flight,
            closed: AtomicBool::new(false),
        }
    }

    /// Attempts to admit one batch.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceShutdown`] if the gate has been closed.
    /// - [`Error::CapacityExceeded`] if `max_in_flight` batches are already
    ///   admitted.
    pub fn try_admit(self: &Arc<Self>) -> Result<AdmissionPermit, Error> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::ServiceShutdown);
        }

        self.in_flight
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < self.max_in_flight).then_some(current + 1)
            })
            .map_err(|_| Error::CapacityExceeded)?;

        increment_batches_inflight();
        Ok(AdmissionPermit {
            gate: Arc::clone(self),
        })
    }

    /// Number of batches currently admitted.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    /// The admission bound this gate was built with.
    pub const fn max_in_flight(&self) -> usize {
        self.max_in_flight
    }

    /// Stops admitting new batches. Already admitted batches are unaffected.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Waits until no batch is in flight, or `limit` elapses.
    ///
    /// Returns `true` if the gate drained completely.
    pub async fn drain(&self, limit: Duration) -> bool {
        timeout(limit, async {
            while self.in_flight() > 0 {
                sleep(DRAIN_POLL_INTERVAL).await;
            }
        })
        .await
        .is_ok()
    }

    fn release(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        decrement_batches_inflight();
    }
}

/// Proof of admission for one batch. Releases its slot on drop.
#[must_use = "dropping the permit immediately releases the admission slot"]
pub struct AdmissionPermit {
    gate: Arc<AdmissionGate>,
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
