//! Session expiry controller.
//!
//! Owns the clock side of the machine: the repeating countdown tick of a card
//! session and the one-shot delayed steps of a transaction. Every piece of
//! work is issued under the current [`SessionEpoch`] and tracked by its
//! [`AbortHandle`]. Advancing the epoch aborts all of it, and callbacks that
//! still get to run compare the epoch they captured against the live one.

use crate::domain::session::SessionEpoch;
use std::future::Future;
use std::time::Duration;
use tokio::task::AbortHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

#[derive(Debug, Default)]
pub struct SessionTimers {
    epoch: SessionEpoch,
    tick: Option<AbortHandle>,
    pending: Vec<AbortHandle>,
}

impl SessionTimers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn epoch(&self) -> SessionEpoch {
        self.epoch
    }

    /// Whether work issued under `epoch` may still act on the machine.
    pub fn is_current(&self, epoch: SessionEpoch) -> bool {
        self.epoch == epoch
    }

    /// Cancels the tick and every scheduled step, and opens a new epoch.
    pub fn advance(&mut self) -> SessionEpoch {
        self.cancel_all();
        self.epoch = self.epoch.next();
        debug!(epoch = self.epoch.value(), "session epoch advanced");
        self.epoch
    }

    pub fn is_ticking(&self) -> bool {
        self.tick.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Number of scheduled steps that have not fired yet.
    pub fn pending(&self) -> usize {
        self.pending.iter().filter(|h| !h.is_finished()).count()
    }

    /// Runs `step` once after `delay`, under the current epoch.
    pub fn schedule<F, Fut>(&mut self, delay: Duration, step: F)
    where
        F: FnOnce(SessionEpoch) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let epoch = self.epoch;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            step(epoch).await;
        });
        self.pending.retain(|h| !h.is_finished());
        self.pending.push(handle.abort_handle());
    }

    /// Starts the repeating tick, replacing any tick already running. The
    /// first tick fires one `period` from now; the tick stops as soon as
    /// `on_tick` returns `false`.
    pub fn start_tick<F, Fut>(&mut self, period: Duration, on_tick: F)
    where
        F: Fn(SessionEpoch) -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        self.cancel_tick();
        let epoch = self.epoch;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !on_tick(epoch).await {
                    break;
                }
            }
        });
        self.tick = Some(handle.abort_handle());
    }

    pub fn cancel_tick(&mut self) {
        if let Some(tick) = self.tick.take() {
            tick.abort();
        }
    }

    fn cancel_all(&mut self) {
        self.cancel_tick();
        for handle in self.pending.drain(..) {
            handle.abort();
        }
    }
}

impl Drop for SessionTimers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
