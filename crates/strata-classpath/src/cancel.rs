use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{ClasspathError, Result};

/// Cooperative cancellation flag shared between the caller and a running
/// walk. The walker checks it at every I/O boundary; once tripped, the walk
/// unwinds with [`ClasspathError::Cancelled`] and publishes nothing.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(ClasspathError::Cancelled)
        } else {
            Ok(())
        }
    }
}
