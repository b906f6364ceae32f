//! Status LED: steady link level with activity bursts on top

use embassy_time::{Duration, Instant};

use crate::config::{ACTIVITY_BLINK_COUNT, ACTIVITY_BLINK_OFF, ACTIVITY_BLINK_ON};

#[derive(Debug, Clone, Copy)]
struct Burst {
    level: bool,
    next: Instant,
    toggles_left: u8,
}

/// Status LED state machine.
///
/// Outside a burst the LED mirrors the link (on while connected). A burst
/// starts dark and toggles `2 * ACTIVITY_BLINK_COUNT` times before handing
/// the LED back to the link level. Triggers during a burst are ignored.
#[derive(Debug)]
pub struct ActivityIndicator {
    burst: Option<Burst>,
    on_time: Duration,
    off_time: Duration,
    toggles: u8,
}

impl ActivityIndicator {
    pub const fn new() -> Self {
        Self {
            burst: None,
            on_time: ACTIVITY_BLINK_ON,
            off_time: ACTIVITY_BLINK_OFF,
            toggles: ACTIVITY_BLINK_COUNT * 2,
        }
    }

    /// Request a burst. Returns `false` if one is already running.
    pub fn trigger(&mut self, now: Instant) -> bool {
        if self.burst.is_some() {
            return false;
        }
        self.burst = Some(Burst {
            level: false,
            next: now + self.off_time,
            toggles_left: self.toggles,
        });
        true
    }

    /// LED level for this tick
    pub fn tick(&mut self, now: Instant, link_up: bool) -> bool {
        let Some(burst) = self.burst.as_mut() else {
            return link_up;
        };
        if now < burst.next {
            return burst.level;
        }

        burst.level = !burst.level;
        burst.toggles_left = burst.toggles_left.saturating_sub(1);
        if burst.toggles_left == 0 {
            self.burst = None;
            return link_up;
        }

        burst.next = now
            + if burst.level {
                self.on_time
            } else {
                self.off_time
            };
        burst.level
    }

    pub fn in_burst(&self) -> bool {
        self.burst.is_some()
    }
}

impl Default for ActivityIndicator {
    fn default() -> Self {
        Self::new()
    }
}
