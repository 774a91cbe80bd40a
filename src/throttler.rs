//! Write Throttling
//!
//! The binlog applier awaits a permit before each transaction. The
//! throttling policy itself lives outside the core; the pauser
//! implementation here covers manual pause/resume and is the default
//! when throttling is enabled.

use async_trait::async_trait;
use tokio::sync::watch;

/// Awaitable permit gate consulted before each applied transaction
#[async_trait]
pub trait Throttler: Send + Sync {
    async fn wait_for_permit(&self);
}

/// Throttler that never delays
pub struct NoopThrottler;

#[async_trait]
impl Throttler for NoopThrottler {
    async fn wait_for_permit(&self) {}
}

/// Manually pausable throttler
pub struct PauserThrottler {
    paused: watch::Sender<bool>,
}

impl PauserThrottler {
    pub fn new() -> Self {
        let (paused, _) = watch::channel(false);
        Self { paused }
    }

    pub fn set_paused(&self, paused: bool) {
        let _ = self.paused.send(paused);
    }

    pub fn is_paused(&self) -> bool {
        *self.paused.borrow()
    }
}

impl Default for PauserThrottler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Throttler for PauserThrottler {
    async fn wait_for_permit(&self) {
        let mut rx = self.paused.subscribe();
        loop {
            if !*rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_noop_never_blocks() {
        NoopThrottler.wait_for_permit().await;
    }

    #[tokio::test]
    async fn test_pauser_blocks_until_resumed() {
        let throttler = Arc::new(PauserThrottler::new());
        throttler.set_paused(true);

        let waiter = {
            let throttler = throttler.clone();
            tokio::spawn(async move {
                throttler.wait_for_permit().await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        throttler.set_paused(false);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should resume")
            .unwrap();
    }

    #[tokio::test]
    async fn test_pauser_unpaused_does_not_block() {
        let throttler = PauserThrottler::new();
        assert!(!throttler.is_paused());
        throttler.wait_for_permit().await;
    }
}
