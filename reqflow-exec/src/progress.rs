use tokio_util::sync::CancellationToken;

/// Cooperative cancellation handle shared by one top-level run.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    token: CancellationToken,
}

impl Progress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Resolves once the run is cancelled.
    pub async fn cancelled(&self) {
        self.token.cancelled().await;
    }
}
