//! One-shot phase timers delivered as messages to an actor.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Which phase a timer closes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    Discussion,
    Results,
}

/// A single pending timer, identified by kind and game cycle.
///
/// Arming replaces whatever was pending; dropping the timer aborts it.
#[derive(Debug, Default)]
pub struct PhaseTimer {
    armed: Option<(TimerKind, u32)>,
    handle: Option<JoinHandle<()>>,
}

impl PhaseTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// What is currently armed, if anything
    pub fn armed(&self) -> Option<(TimerKind, u32)> {
        self.armed
    }

    pub fn is_armed_for(&self, kind: TimerKind, cycle: u32) -> bool {
        self.armed == Some((kind, cycle))
    }

    /// Deliver `msg` to `sender` after `after`, cancelling any pending timer
    pub fn arm<M: Send + 'static>(
        &mut self,
        kind: TimerKind,
        cycle: u32,
        after: Duration,
        sender: mpsc::Sender<M>,
        msg: M,
    ) {
        self.cancel();
        tracing::debug!("Arming {:?} timer for cycle {} ({:?})", kind, cycle, after);
        self.armed = Some((kind, cycle));
        self.handle = Some(tokio::spawn(async move {
            tokio::time::sleep(after).await;
            // Receiver gone means the actor already stopped
            let _ = sender.send(msg).await;
        }));
    }

    pub fn cancel(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
        self.armed = None;
    }
}

impl Drop for PhaseTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timer_fires_after_duration() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = PhaseTimer::new();
        timer.arm(TimerKind::Discussion, 1, Duration::from_secs(120), tx, 7u32);
        assert!(timer.is_armed_for(TimerKind::Discussion, 1));

        tokio::time::sleep(Duration::from_secs(119)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(rx.recv().await, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rearming_cancels_previous() {
        let (tx, mut rx) = mpsc::channel(4);
        let mut timer = PhaseTimer::new();
        timer.arm(TimerKind::Discussion, 1, Duration::from_secs(5), tx.clone(), "first");
        timer.arm(TimerKind::Results, 1, Duration::from_secs(10), tx, "second");
        assert_eq!(timer.armed(), Some((TimerKind::Results, 1)));

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(rx.recv().await, Some("second"));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_delivery() {
        let (tx, mut rx) = mpsc::channel::<u8>(4);
        let mut timer = PhaseTimer::new();
        timer.arm(TimerKind::Results, 3, Duration::from_secs(1), tx, 1);
        timer.cancel();
        assert!(timer.armed().is_none());

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }
}
