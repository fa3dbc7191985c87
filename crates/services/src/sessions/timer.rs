use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// One elapsed countdown period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerTick;

/// Receiving end of a running countdown.
pub type TimerTicks = mpsc::Receiver<TimerTick>;

/// Scheduled task delivering a bounded number of ticks at a fixed period.
///
/// Cancelling (or dropping) the handle aborts the task; the tick channel then
/// closes once any tick already buffered has been received.
#[derive(Debug)]
pub struct CountdownTimer {
    handle: JoinHandle<()>,
}

impl CountdownTimer {
    /// Spawn a countdown on the current tokio runtime.
    ///
    /// The first tick arrives one `period` after the call; at most `ticks`
    /// ticks are sent.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[must_use]
    pub fn spawn(period: Duration, ticks: u32) -> (Self, TimerTicks) {
        let (tx, rx) = mpsc::channel(1);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            for _ in 0..ticks {
                interval.tick().await;
                if tx.send(TimerTick).await.is_err() {
                    break;
                }
            }
        });
        (Self { handle }, rx)
    }

    pub fn cancel(&self) {
        self.handle.abort();
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for CountdownTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
