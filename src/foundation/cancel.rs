use crate::foundation::error::{FilmError, FilmResult};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Cooperative cancellation signal shared between a caller and an in-flight render.
///
/// Checked at every suspension point (decode, upload, mutex wait, between passes).
#[derive(Clone, Debug, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create an un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Return [`FilmError::Abort`] if cancelled.
    pub fn check(&self) -> FilmResult<()> {
        if self.is_cancelled() {
            Err(FilmError::Abort)
        } else {
            Ok(())
        }
    }
}
