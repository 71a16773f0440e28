// src/sequencer.rs
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

use crate::models::VerificationResult;

/// Identifies one verification run. Later runs get larger tickets.
pub type Ticket = u64;

/// Holds the most recent verification result.
///
/// Every run takes a ticket before it starts. When it finishes it may only
/// commit if no newer run has been started since, so a slow, stale response
/// can never overwrite the outcome of a later request.
#[derive(Debug, Default)]
pub struct ResultSlot {
    issued: AtomicU64,
    latest: RwLock<Option<(Ticket, VerificationResult)>>,
}

impl ResultSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next ticket, starting at 1.
    pub fn issue(&self) -> Ticket {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn current(&self) -> Ticket {
        self.issued.load(Ordering::SeqCst)
    }

    /// Stores `result` if `ticket` is still the newest issued ticket.
    /// Returns whether it was stored.
    pub async fn commit(&self, ticket: Ticket, result: VerificationResult) -> bool {
        let mut slot = self.latest.write().await;
        // Checked under the write lock so two finishing runs cannot interleave.
        if ticket != self.current() {
            log::debug!("Discarding stale result #{} (latest is #{})", ticket, self.current());
            return false;
        }
        if matches!(&*slot, Some((stored, _)) if *stored >= ticket) {
            return false;
        }
        *slot = Some((ticket, result));
        true
    }

    pub async fn latest(&self) -> Option<(Ticket, VerificationResult)> {
        self.latest.read().await.clone()
    }
}
