//! OTA service gate
//!
//! A timed exclusive mode reserved for firmware updates. While the window is
//! open only the OTA-enter command is honoured; it re-arms the window from
//! the current time. The window closes on its own once the deadline passes.
//! Actions queued before the window opened are left alone.

use embassy_time::{Duration, Instant};

use crate::config::OTA_WINDOW;

#[derive(Debug)]
pub struct OtaGate {
    deadline: Option<Instant>,
    window: Duration,
    transport_started: bool,
}

impl OtaGate {
    pub const fn new() -> Self {
        Self::with_window(OTA_WINDOW)
    }

    pub const fn with_window(window: Duration) -> Self {
        Self {
            deadline: None,
            window,
            transport_started: false,
        }
    }

    /// Open or extend the window. Returns `true` the first time the gate is
    /// ever entered, when the update transport still has to be brought up.
    pub fn enter(&mut self, now: Instant) -> bool {
        self.deadline = Some(now + self.window);
        crate::log!(
            "[OTA] Service window open for {} s",
            self.window.as_secs()
        );
        !core::mem::replace(&mut self.transport_started, true)
    }

    /// Whether new commands are gated at `now`
    pub fn is_open(&self, now: Instant) -> bool {
        self.deadline.is_some_and(|deadline| now < deadline)
    }

    /// Close an expired window. Returns `true` when the update transport
    /// should be polled this tick.
    pub fn tick(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                crate::log!("[OTA] Service window closed");
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }
}

impl Default for OtaGate {
    fn default() -> Self {
        Self::new()
    }
}
