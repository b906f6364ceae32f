//! Action scheduler
//!
//! Resolves at most one queued action per tick. A `Delay` arms a deadline
//! that holds back the queue on later ticks; a `Press` is handed back to the
//! caller for transmission. Nothing here ever waits.

use embassy_time::Instant;

use crate::queue::{Action, ActionQueue, QueueFull};
use crate::rc5::ButtonIndex;

#[derive(Debug, Default)]
pub struct ActionScheduler {
    queue: ActionQueue,
    delay_until: Option<Instant>,
}

impl ActionScheduler {
    pub const fn new() -> Self {
        Self {
            queue: ActionQueue::new(),
            delay_until: None,
        }
    }

    pub fn enqueue(&mut self, action: Action) -> Result<(), QueueFull> {
        self.queue.push(action)
    }

    pub fn enqueue_all(&mut self, actions: &[Action]) -> Result<(), QueueFull> {
        self.queue.push_all(actions)
    }

    /// Advance by one step. Returns the button to press, if this tick
    /// resolved a `Press`.
    pub fn tick(&mut self, now: Instant) -> Option<ButtonIndex> {
        if let Some(deadline) = self.delay_until {
            if now < deadline {
                return None;
            }
            self.delay_until = None;
        }

        match self.queue.pop()? {
            Action::Delay(duration) => {
                self.delay_until = Some(now + duration);
                None
            }
            Action::Press(button) => Some(button),
        }
    }

    pub fn is_delaying(&self, now: Instant) -> bool {
        self.delay_until.is_some_and(|deadline| now < deadline)
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn free(&self) -> usize {
        self.queue.free()
    }
}
