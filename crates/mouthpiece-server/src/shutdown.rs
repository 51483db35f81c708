//! Shutdown sequencing for the listener and live viewer sessions.
//!
//! Viewer sessions run on tasks axum spawns after the upgrade, outside the
//! serve loop, so `with_graceful_shutdown` does not wait for them. Each session
//! holds a [`TaskTrackerToken`] from the coordinator instead; [`drain`] cancels
//! the token and waits for the listener task and every outstanding session.
//!
//! [`drain`]: ShutdownCoordinator::drain

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::task_tracker::TaskTrackerToken;
use tokio_util::task::TaskTracker;
use tracing::{info, warn};

const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, Default)]
pub struct ShutdownCoordinator {
    token: CancellationToken,
    sessions: TaskTracker,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Token observed by the serve loop and every viewer writer.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Reserve a slot for one viewer session. [`drain`](Self::drain) waits until
    /// the returned guard is dropped.
    pub fn session_guard(&self) -> TaskTrackerToken {
        self.sessions.token()
    }

    /// Viewer sessions still holding a guard.
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Cancel, then wait for `server` and all viewer sessions to finish.
    ///
    /// Returns `false` if `timeout` (default 10s) elapsed first.
    pub async fn drain(&self, server: JoinHandle<()>, timeout: Option<Duration>) -> bool {
        let timeout = timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT);

        self.token.cancel();
        self.sessions.close();
        info!(
            sessions = self.sessions.len(),
            timeout_ms = timeout.as_millis() as u64,
            "draining viewer sessions"
        );

        let sessions = self.sessions.clone();
        let drained = tokio::time::timeout(timeout, async move {
            if let Err(e) = server.await {
                warn!(error = %e, "server task ended abnormally");
            }
            sessions.wait().await;
        })
        .await
        .is_ok();

        if !drained {
            warn!(
                remaining = self.sessions.len(),
                "shutdown timed out with viewer sessions still open"
            );
        }
        drained
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn idle_server() -> JoinHandle<()> {
        tokio::spawn(async {})
    }

    #[tokio::test]
    async fn drain_cancels_the_token() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        assert!(!coord.is_shutting_down());

        assert!(coord.drain(idle_server(), None).await);
        assert!(token.is_cancelled());
        assert!(coord.is_shutting_down());
    }

    #[tokio::test]
    async fn drain_waits_for_session_cleanup() {
        let coord = ShutdownCoordinator::new();
        let cleaned_up = Arc::new(AtomicBool::new(false));

        let guard = coord.session_guard();
        let token = coord.token();
        let flag = Arc::clone(&cleaned_up);
        tokio::spawn(async move {
            token.cancelled().await;
            tokio::time::sleep(Duration::from_millis(20)).await;
            flag.store(true, Ordering::SeqCst);
            drop(guard);
        });
        assert_eq!(coord.active_sessions(), 1);

        assert!(coord.drain(idle_server(), Some(Duration::from_secs(2))).await);
        assert!(cleaned_up.load(Ordering::SeqCst));
        assert_eq!(coord.active_sessions(), 0);
    }

    #[tokio::test]
    async fn drain_waits_for_server_task() {
        let coord = ShutdownCoordinator::new();
        let token = coord.token();
        let server = tokio::spawn(async move { token.cancelled().await });

        assert!(coord.drain(server, Some(Duration::from_secs(1))).await);
    }

    #[tokio::test(start_paused = true)]
    async fn drain_gives_up_on_stuck_session() {
        let coord = ShutdownCoordinator::new();
        let _stuck = coord.session_guard();

        assert!(!coord.drain(idle_server(), Some(Duration::from_millis(50))).await);
        assert_eq!(coord.active_sessions(), 1);
    }

    #[tokio::test]
    async fn clones_share_sessions() {
        let coord = ShutdownCoordinator::new();
        let guard = coord.clone().session_guard();
        assert_eq!(coord.active_sessions(), 1);
        drop(guard);
        assert_eq!(coord.active_sessions(), 0);
    }
}
