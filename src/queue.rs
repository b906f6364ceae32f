//! Bounded FIFO of pending IR actions

use embassy_time::Duration;
use heapless::Deque;

use crate::config::ACTION_QUEUE_CAPACITY;
use crate::rc5::ButtonIndex;

/// One step of IR work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Transmit one button press
    Press(ButtonIndex),
    /// Hold off further actions for this long
    Delay(Duration),
}

/// Not enough free slots for the requested actions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueFull {
    pub needed: usize,
    pub free: usize,
}

/// Fixed-capacity action queue.
///
/// Multi-step sequences go in through [`ActionQueue::push_all`], which adds
/// all of them or none.
#[derive(Debug)]
pub struct ActionQueue {
    actions: Deque<Action, ACTION_QUEUE_CAPACITY>,
}

impl ActionQueue {
    pub const fn new() -> Self {
        Self {
            actions: Deque::new(),
        }
    }

    pub fn push(&mut self, action: Action) -> Result<(), QueueFull> {
        self.actions.push_back(action).map_err(|_| QueueFull {
            needed: 1,
            free: 0,
        })
    }

    /// Enqueue a whole sequence atomically
    pub fn push_all(&mut self, actions: &[Action]) -> Result<(), QueueFull> {
        let free = self.free();
        if actions.len() > free {
            return Err(QueueFull {
                needed: actions.len(),
                free,
            });
        }
        for action in actions {
            // Capacity checked above
            let _ = self.actions.push_back(*action);
        }
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Action> {
        self.actions.pop_front()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn free(&self) -> usize {
        ACTION_QUEUE_CAPACITY - self.actions.len()
    }
}

impl Default for ActionQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(index: u8) -> Action {
        Action::Press(ButtonIndex::new(index).unwrap())
    }

    #[test]
    fn fifo_order() {
        let mut queue = ActionQueue::new();
        queue.push(press(1)).unwrap();
        queue.push(Action::Delay(Duration::from_millis(10))).unwrap();
        queue.push(press(2)).unwrap();

        assert_eq!(queue.pop(), Some(press(1)));
        assert_eq!(queue.pop(), Some(Action::Delay(Duration::from_millis(10))));
        assert_eq!(queue.pop(), Some(press(2)));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn single_push_fails_when_full() {
        let mut queue = ActionQueue::new();
        for _ in 0..ACTION_QUEUE_CAPACITY {
            queue.push(press(0)).unwrap();
        }
        assert_eq!(queue.free(), 0);
        assert!(queue.push(press(0)).is_err());
        assert_eq!(queue.len(), ACTION_QUEUE_CAPACITY);
    }

    #[test]
    fn push_all_is_all_or_nothing() {
        let mut queue = ActionQueue::new();
        for _ in 0..ACTION_QUEUE_CAPACITY - 3 {
            queue.push(press(0)).unwrap();
        }

        let sequence = [press(1), press(2), press(3), press(4)];
        assert_eq!(
            queue.push_all(&sequence),
            Err(QueueFull { needed: 4, free: 3 })
        );
        assert_eq!(queue.len(), ACTION_QUEUE_CAPACITY - 3);

        queue.push_all(&sequence[..3]).unwrap();
        assert_eq!(queue.free(), 0);
    }
}
