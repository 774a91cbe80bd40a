//! Fatal Error Handling
//!
//! Components report unrecoverable failures here. The first fatal error
//! is recorded and the shutdown signal is raised; the process is
//! expected to terminate after best-effort cleanup.

use std::sync::Mutex;

use tokio::sync::watch;

use crate::error::Error;

/// First recorded fatal failure
#[derive(Debug, Clone)]
pub struct FatalError {
    pub component: String,
    pub message: String,
}

/// Shared sink for unrecoverable component failures
pub struct ErrorHandler {
    fatal: Mutex<Option<FatalError>>,
    shutdown: watch::Sender<bool>,
}

impl ErrorHandler {
    pub fn new() -> Self {
        let (shutdown, _) = watch::channel(false);
        Self {
            fatal: Mutex::new(None),
            shutdown,
        }
    }

    /// Record a fatal failure and raise the shutdown signal
    pub fn fatal(&self, component: &str, err: &Error) {
        tracing::error!("fatal error in {}: {}", component, err);

        if let Ok(mut guard) = self.fatal.lock() {
            if guard.is_none() {
                *guard = Some(FatalError {
                    component: component.to_string(),
                    message: err.to_string(),
                });
            }
        }

        let _ = self.shutdown.send(true);
    }

    /// The first fatal error, if any was recorded
    pub fn fatal_error(&self) -> Option<FatalError> {
        self.fatal.lock().ok().and_then(|guard| guard.clone())
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Subscribe to the shutdown signal
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }
}

impl Default for ErrorHandler {
    fn default() -> Self {
        Self::new()
    }
}
