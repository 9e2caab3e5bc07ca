//! Bounded-concurrency admission for ledger operations.
//!
//! The gate caps how many balance-mutating operations run at once,
//! independently of how many callers are waiting.  It knows nothing about
//! balances; it only hands out and takes back slots.
//!
//! Waiters are served in arrival order: the gate is backed by
//! [`tokio::sync::Semaphore`], which queues waiters FIFO.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("no admission slot became free within {0:?}")]
    TimedOut(Duration),

    #[error("admission gate is closed")]
    Closed,
}

#[derive(Debug)]
struct GateInner {
    semaphore: Arc<Semaphore>,
    limit: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

#[derive(Debug, Clone)]
pub struct AdmissionGate {
    inner: Arc<GateInner>,
}

impl AdmissionGate {
    /// Create a gate admitting at most `limit` operations at once.
    ///
    /// A limit of zero would block every caller forever, so it is raised
    /// to one.
    pub fn new(limit: usize) -> Self {
        let limit = if limit == 0 {
            warn!("admission limit of 0 requested, using 1");
            1
        } else {
            limit.min(Semaphore::MAX_PERMITS)
        };

        Self {
            inner: Arc::new(GateInner {
                semaphore: Arc::new(Semaphore::new(limit)),
                limit,
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }),
        }
    }

    /// Wait, without deadline, until a slot is free.
    pub async fn acquire(&self) -> Result<AdmissionPermit, AdmissionError> {
        let permit = self
            .inner
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| AdmissionError::Closed)?;
        Ok(self.admit(permit))
    }

    /// Wait at most `deadline` for a slot.
    pub async fn acquire_timeout(
        &self,
        deadline: Duration,
    ) -> Result<AdmissionPermit, AdmissionError> {
        match tokio::time::timeout(deadline, self.acquire()).await {
            Ok(result) => result,
            Err(_) => {
                debug!(?deadline, in_flight = self.in_flight(), "admission timed out");
                Err(AdmissionError::TimedOut(deadline))
            }
        }
    }

    /// Refuse all future acquisitions and wake every queued waiter with
    /// [`AdmissionError::Closed`].  Permits already handed out stay valid.
    pub fn close(&self) {
        self.inner.semaphore.close();
    }

    pub fn limit(&self) -> usize {
        self.inner.limit
    }

    /// Operations currently holding a slot.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneously held slots since creation.
    pub fn peak_in_flight(&self) -> usize {
        self.inner.peak.load(Ordering::SeqCst)
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> AdmissionPermit {
        let now = self.inner.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.inner.peak.fetch_max(now, Ordering::SeqCst);
        AdmissionPermit {
            inner: self.inner.clone(),
            _permit: permit,
        }
    }
}

/// A held admission slot.  The slot is returned exactly once, when the
/// permit is dropped or passed to [`AdmissionPermit::release`].
#[derive(Debug)]
pub struct AdmissionPermit {
    inner: Arc<GateInner>,
    // Dropped after `Drop::drop` has run, so the in-flight count is
    // decremented before the slot becomes available again.
    _permit: OwnedSemaphorePermit,
}

impl AdmissionPermit {
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.inner.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
