use std::num::Wrapping;
use std::time::Duration;

use system::SessionId;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

pub type EvictionGeneration = u64;
pub type EvictionRx = UnboundedReceiver<EvictionDue>;

/// Posted by a timer once its grace period has elapsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvictionDue {
    pub session_id: SessionId,
    pub generation: EvictionGeneration,
}

/// A pending eviction timer. Dropping the handle cancels the timer.
#[derive(Debug)]
pub struct EvictionHandle {
    generation: EvictionGeneration,
    task: JoinHandle<()>,
}

impl EvictionHandle {
    pub fn generation(&self) -> EvictionGeneration {
        self.generation
    }

    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for EvictionHandle {
    /// Aborts the timer, so a replaced or removed handle never reports.
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub struct EvictionScheduler {
    grace_period: Duration,
    generation_source: Wrapping<EvictionGeneration>,
    due_tx: UnboundedSender<EvictionDue>,
}

impl EvictionScheduler {
    pub fn new(grace_period: Duration) -> (Self, EvictionRx) {
        let (due_tx, due_rx) = unbounded_channel();
        (
            Self {
                grace_period,
                generation_source: Wrapping(0),
                due_tx,
            },
            due_rx,
        )
    }

    pub fn grace_period(&self) -> Duration {
        self.grace_period
    }

    /// Starts a one-shot timer for `session_id`. Must be called inside a tokio runtime.
    ///
    /// The timer only reports that it is due. Whoever owns the session decides whether the
    /// notice is still current by comparing generations, so a cancel that loses the race
    /// against the timer leaves a stale notice behind and nothing else.
    pub fn arm(&mut self, session_id: &SessionId) -> EvictionHandle {
        self.generation_source += Wrapping(1);
        let generation = self.generation_source.0;

        let due = EvictionDue {
            session_id: session_id.clone(),
            generation,
        };
        let due_tx = self.due_tx.clone();
        let grace_period = self.grace_period;

        let task = tokio::spawn(async move {
            tokio::time::sleep(grace_period).await;
            if due_tx.send(due).is_err() {
                log::debug!("eviction timer fired after the registry shut down");
            }
        });

        EvictionHandle { generation, task }
    }
}
