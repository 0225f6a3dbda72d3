//! Cooperative shutdown flag and signal listener

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Shared, monotonic "please stop" flag
///
/// Set once by a signal (or a test) and never cleared. Readers poll it at
/// their own checkpoints; setting it never interrupts work in flight.
#[derive(Debug, Clone, Default)]
pub struct ShutdownFlag {
    requested: Arc<AtomicBool>,
}

impl ShutdownFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks shutdown as requested
    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}

/// Spawns a task that sets `flag` on SIGINT (Ctrl+C) or, on unix, SIGTERM
///
/// The task does nothing else: winding down happens on the crawl loop's next
/// checkpoint. Must be called from within a tokio runtime.
pub fn listen_for_signals(flag: ShutdownFlag) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};

            let mut terminate = match signal(SignalKind::terminate()) {
                Ok(stream) => stream,
                Err(e) => {
                    tracing::warn!("Could not install SIGTERM listener: {}", e);
                    wait_for_ctrl_c(flag).await;
                    return;
                }
            };

            loop {
                tokio::select! {
                    result = tokio::signal::ctrl_c() => {
                        if result.is_err() {
                            break;
                        }
                    }
                    received = terminate.recv() => {
                        if received.is_none() {
                            break;
                        }
                    }
                }
                flag.request();
            }
        }

        #[cfg(not(unix))]
        wait_for_ctrl_c(flag).await;
    })
}

async fn wait_for_ctrl_c(flag: ShutdownFlag) {
    while tokio::signal::ctrl_c().await.is_ok() {
        flag.request();
    }
}
