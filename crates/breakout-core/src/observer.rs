use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Position of a run, reported as entities are picked up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(current: usize, total: usize) -> Self {
        Self { current, total }
    }

    /// Fraction complete in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        (self.current.min(self.total) as f64) / (self.total as f64)
    }
}

/// Receives progress and user-facing error messages from a run.
///
/// This is the only channel through which recoverable failures leave the
/// pipeline; the presentation layer decides how to show them.
#[async_trait]
pub trait RunObserver: Send + Sync {
    async fn progress(&self, progress: Progress);
    async fn error(&self, message: String);
}

/// Observer for headless callers: everything goes to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

#[async_trait]
impl RunObserver for TracingObserver {
    async fn progress(&self, progress: Progress) {
        tracing::info!(
            current = progress.current,
            total = progress.total,
            fraction = progress.fraction(),
            "Run progress"
        );
    }

    async fn error(&self, message: String) {
        tracing::warn!(%message, "Run reported an error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_fraction() {
        assert_eq!(Progress::new(1, 4).fraction(), 0.25);
        assert_eq!(Progress::new(4, 4).fraction(), 1.0);
        assert_eq!(Progress::new(9, 4).fraction(), 1.0);
        assert_eq!(Progress::new(0, 0).fraction(), 1.0);
    }
}
