use std::future::Future;
use std::time::Duration;
use tokio::signal;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};

/// Graceful shutdown coordinator
///
/// Holds the root cancellation token that in-flight provider calls race
/// against, and tracks spawned login tasks so shutdown can wait for them.
#[derive(Clone, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    tasks: TaskTracker,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token cancelled once shutdown starts
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Token for one unit of work; cancelled with the root token
    pub fn child_token(&self) -> CancellationToken {
        self.token.child_token()
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn initiate_shutdown(&self) {
        if !self.token.is_cancelled() {
            info!("Initiating graceful shutdown...");
            self.token.cancel();
        }
    }

    /// Run `task` on the runtime and count it as in flight until it ends
    pub fn spawn<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.tasks.spawn(task)
    }

    /// Wait for tracked tasks, at most `limit`
    pub async fn drain(&self, limit: Duration) {
        self.tasks.close();
        if tokio::time::timeout(limit, self.tasks.wait()).await.is_err() {
            warn!(
                remaining = self.tasks.len(),
                "In-flight logins did not finish before the shutdown timeout"
            );
        } else {
            info!("All in-flight logins finished");
        }
    }

    /// Wait for SIGINT or SIGTERM, then cancel the root token
    pub async fn wait_for_shutdown_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut stream) => {
                    stream.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C signal"),
            _ = terminate => info!("Received terminate signal"),
            _ = self.token.cancelled() => {}
        }

        self.initiate_shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn test_child_tokens_follow_root() {
        let coordinator = ShutdownCoordinator::new();
        let child = coordinator.child_token();
        assert!(!coordinator.is_shutdown_requested());

        coordinator.initiate_shutdown();
        assert!(coordinator.is_shutdown_requested());
        assert!(child.is_cancelled());

        // Repeated calls are harmless
        coordinator.initiate_shutdown();
    }

    #[tokio::test]
    async fn test_cancelling_child_leaves_root_alone() {
        let coordinator = ShutdownCoordinator::new();
        let child = coordinator.child_token();
        child.cancel();
        assert!(!coordinator.is_shutdown_requested());
    }

    #[tokio::test]
    async fn test_drain_waits_for_tracked_tasks() {
        let coordinator = ShutdownCoordinator::new();
        let finished = Arc::new(AtomicBool::new(false));

        let flag = finished.clone();
        coordinator.spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });

        coordinator.drain(Duration::from_secs(5)).await;
        assert!(finished.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_drain_gives_up_after_limit() {
        let coordinator = ShutdownCoordinator::new();
        coordinator.spawn(async {
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let started = std::time::Instant::now();
        coordinator.drain(Duration::from_millis(50)).await;
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_signal_wait_returns_on_manual_shutdown() {
        let coordinator = ShutdownCoordinator::new();
        let waiter = coordinator.clone();
        let handle = tokio::spawn(async move { waiter.wait_for_shutdown_signal().await });

        coordinator.initiate_shutdown();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
