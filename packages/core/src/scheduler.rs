//! Debounced scheduling
//!
//! [`Debouncer`] is the schedule-or-coalesce state machine the document uses
//! for layout: every trigger re-arms one deadline, and only the trailing call
//! fires. It takes `now` explicitly, so the owner decides where time comes
//! from.
//!
//! [`DebounceTimer`] drives a debouncer from a tokio task for hosts that want
//! a ready-made timer: triggers go in over a bounded channel, one tick comes
//! out per quiet window. The owning event loop receives ticks and calls back
//! into the document, so the tree is still only touched from one place.

use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

const TRIGGER_CHANNEL_CAPACITY: usize = 10;

#[derive(Debug, Clone)]
pub struct Debouncer {
    window: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Arm (or re-arm) the deadline at `now + window`. Returns true when a
    /// call was already pending and has been coalesced into this one.
    pub fn trigger(&mut self, now: Instant) -> bool {
        let coalesced = self.deadline.is_some();
        self.deadline = Some(now + self.window);
        if coalesced {
            debug!("Coalesced debounced trigger");
        }
        coalesced
    }

    /// Fire once the window has elapsed. Clears the pending state when it
    /// returns true.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Drop any pending call; returns whether one was pending
    pub fn cancel(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Change the window; an armed deadline keeps its current value
    pub fn set_window(&mut self, window: Duration) {
        self.window = window;
    }
}

/// Debounce timer running on a tokio task.
///
/// Dropping the timer (or calling [`shutdown`](Self::shutdown)) stops the
/// task; a pending tick is discarded.
pub struct DebounceTimer {
    trigger_tx: mpsc::Sender<()>,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl DebounceTimer {
    /// Spawn the timer task. Returns the timer and the tick receiver.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(window: Duration) -> (Self, mpsc::Receiver<()>) {
        let (trigger_tx, mut trigger_rx) = mpsc::channel::<()>(TRIGGER_CHANNEL_CAPACITY);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let (tick_tx, tick_rx) = mpsc::channel::<()>(1);

        let task = tokio::spawn(async move {
            let mut deadline: Option<tokio::time::Instant> = None;
            loop {
                let armed = deadline;
                let sleep = async move {
                    match armed {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending::<()>().await,
                    }
                };

                tokio::select! {
                    biased; // Check shutdown first

                    _ = shutdown_rx.recv() => {
                        debug!("DebounceTimer shutting down");
                        break;
                    }

                    trigger = trigger_rx.recv() => {
                        if trigger.is_none() {
                            break;
                        }
                        // Coalesce triggers that queued up while we were away
                        while trigger_rx.try_recv().is_ok() {}
                        deadline = Some(tokio::time::Instant::now() + window);
                    }

                    _ = sleep => {
                        deadline = None;
                        match tick_tx.try_send(()) {
                            Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
                            Err(mpsc::error::TrySendError::Closed(_)) => break,
                        }
                    }
                }
            }
        });

        (
            Self {
                trigger_tx,
                shutdown_tx,
                task,
            },
            tick_rx,
        )
    }

    /// Re-arm the timer. Never blocks; a full channel already means a
    /// trigger is queued.
    pub fn trigger(&self) {
        match self.trigger_tx.try_send(()) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("DebounceTimer already has pending triggers");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::warn!("DebounceTimer has shut down, trigger ignored");
            }
        }
    }

    /// Stop the task and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_after_window() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        assert!(!debouncer.trigger(start));
        assert!(debouncer.is_pending());

        assert!(!debouncer.fire_if_due(start + Duration::from_millis(50)));
        assert!(debouncer.fire_if_due(start + Duration::from_millis(100)));
        assert!(!debouncer.is_pending());
        assert!(!debouncer.fire_if_due(start + Duration::from_millis(500)));
    }

    #[test]
    fn test_retrigger_moves_deadline() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        debouncer.trigger(start);
        assert!(debouncer.trigger(start + Duration::from_millis(80)));

        assert!(!debouncer.fire_if_due(start + Duration::from_millis(120)));
        assert!(debouncer.fire_if_due(start + Duration::from_millis(180)));
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(10));
        debouncer.trigger(start);
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());
        assert!(!debouncer.fire_if_due(start + Duration::from_secs(1)));
    }

    #[tokio::test]
    async fn test_timer_coalesces_bursts() {
        let (timer, mut ticks) = DebounceTimer::spawn(Duration::from_millis(200));
        for _ in 0..5 {
            timer.trigger();
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        let tick = tokio::time::timeout(Duration::from_secs(2), ticks.recv()).await;
        assert_eq!(tick.unwrap(), Some(()));

        let extra = tokio::time::timeout(Duration::from_millis(300), ticks.recv()).await;
        assert!(extra.is_err(), "burst should produce exactly one tick");

        timer.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_closes_ticks() {
        let (timer, mut ticks) = DebounceTimer::spawn(Duration::from_millis(10));
        timer.shutdown().await;
        assert_eq!(ticks.recv().await, None);
    }

    #[tokio::test]
    async fn test_drop_stops_task() {
        let (timer, mut ticks) = DebounceTimer::spawn(Duration::from_millis(10));
        timer.trigger();
        drop(timer);
        let drained = tokio::time::timeout(Duration::from_secs(2), async {
            while ticks.recv().await.is_some() {}
        })
        .await;
        assert!(drained.is_ok(), "tick channel should close once the timer is dropped");
    }
}
