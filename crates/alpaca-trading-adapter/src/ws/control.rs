/*
[INPUT]:  Stop requests from any thread
[OUTPUT]: Single-slot stop signal consumed by the session driver
[POS]:    WebSocket layer - cross-thread control channel
[UPDATE]: When adding new control signals
*/

use std::sync::{Mutex, PoisonError};

use tokio::sync::Notify;

/// Signal delivered to the session driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlSignal {
    Stop,
}

/// Holds at most one pending signal
#[derive(Debug, Default)]
pub struct ControlChannel {
    slot: Mutex<Option<ControlSignal>>,
    notify: Notify,
}

impl ControlChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a stop unless one is already pending
    ///
    /// Returns whether a signal was enqueued.
    pub fn request_stop(&self) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.is_some() {
            return false;
        }
        *slot = Some(ControlSignal::Stop);
        drop(slot);
        self.notify.notify_one();
        true
    }

    /// Consume a pending stop without blocking
    pub fn poll_stop(&self) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        matches!(slot.take(), Some(ControlSignal::Stop))
    }

    /// True while a signal waits to be consumed
    pub fn is_pending(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Resolves once a signal has been requested
    ///
    /// Does not consume the signal; follow with `poll_stop`.
    pub async fn notified(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_pending() {
                return;
            }
            notified.await;
        }
    }
}
