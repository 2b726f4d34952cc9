//! Cooperative cancellation token.

use logtriage_core::CancelReason;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

const NOT_CANCELLED: u8 = 0;

fn encode(reason: CancelReason) -> u8 {
    match reason {
        CancelReason::Requested => 1,
        CancelReason::ByteBudget => 2,
        CancelReason::Deadline => 3,
    }
}

fn decode(state: u8) -> Option<CancelReason> {
    match state {
        1 => Some(CancelReason::Requested),
        2 => Some(CancelReason::ByteBudget),
        3 => Some(CancelReason::Deadline),
        _ => None,
    }
}

/// Cancellation token checked by scans once per line.
///
/// Clones share state. A [`child`](CancellationToken::child) token is
/// cancelled when its parent is, but cancelling the child leaves the parent
/// untouched. The first reason recorded wins.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    state: Arc<AtomicU8>,
    parent: Option<Arc<AtomicU8>>,
}

impl CancellationToken {
    /// Create a new cancellation token (not cancelled).
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(NOT_CANCELLED)),
            parent: None,
        }
    }

    /// A token that also observes this token's cancellation.
    pub fn child(&self) -> Self {
        Self {
            state: Arc::new(AtomicU8::new(NOT_CANCELLED)),
            parent: Some(Arc::clone(&self.state)),
        }
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancel_with(CancelReason::Requested);
    }

    pub fn cancel_with(&self, reason: CancelReason) {
        let _ = self.state.compare_exchange(
            NOT_CANCELLED,
            encode(reason),
            Ordering::Relaxed,
            Ordering::Relaxed,
        );
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    /// Why the token was cancelled, own reason first.
    pub fn reason(&self) -> Option<CancelReason> {
        decode(self.state.load(Ordering::Relaxed)).or_else(|| {
            self.parent
                .as_ref()
                .and_then(|parent| decode(parent.load(Ordering::Relaxed)))
        })
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
