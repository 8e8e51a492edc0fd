use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Cooperative cancellation token with an optional deadline.
///
/// One token is supplied to a scan; the orchestrator derives a child per
/// collector, bounded by that collector's timeout. Children share the
/// parent's cancellation flag, so cancelling the scan reaches every
/// collector; deadlines are per-child.
///
/// Collectors are expected to call [`CancelToken::is_cancelled`] at
/// suspension points (per file, per parsed line) and return a
/// cancellation error promptly when it fires.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel the whole token tree.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once cancelled or past the deadline.
    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        matches!(self.deadline, Some(d) if Instant::now() >= d)
    }

    /// Derive a child token bounded by `timeout` (`None` means no new
    /// deadline). The tighter of the parent's and the child's deadline
    /// wins.
    pub fn child_with_timeout(&self, timeout: Option<Duration>) -> CancelToken {
        let child_deadline = timeout.map(|t| Instant::now() + t);
        let deadline = match (self.deadline, child_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        CancelToken {
            flag: Arc::clone(&self.flag),
            deadline,
        }
    }
}
