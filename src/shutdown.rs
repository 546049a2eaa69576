use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::signal;
use tokio::sync::Notify;

/// Cloneable handle shared by the orchestrator and every stage task.
///
/// Signalling is idempotent; all waiters wake once.
#[derive(Clone, Default)]
pub struct ShutdownHandle {
    shutdown: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Returns `true` if this call initiated the shutdown.
    pub fn signal(&self) -> bool {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            tracing::debug!("shutdown signalled");
            self.notify.notify_waiters();
            return true;
        }
        false
    }

    pub async fn wait(&self) {
        // Subscribe before checking the flag, otherwise a signal() landing
        // between the check and the await is lost.
        let notified = self.notify.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();
        if self.is_shutting_down() {
            return;
        }
        notified.await;
    }
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
pub async fn interrupted() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut sigterm = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            res = signal::ctrl_c() => res?,
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await?;
    }

    Ok(())
}

/// Spawn a task that signals `handle` when the operator interrupts.
pub fn forward_interrupts(handle: ShutdownHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match interrupted().await {
            Ok(()) => {
                tracing::info!("interrupt received, stopping all processes");
                handle.signal();
            }
            Err(e) => tracing::warn!("failed to listen for interrupts: {}", e),
        }
    })
}
