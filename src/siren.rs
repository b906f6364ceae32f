//! Siren engine
//!
//! Plays a short on/off pattern on the siren output without blocking. A
//! program has one to three phases, each an (on, off) pair; a new program
//! replaces whatever is sounding.

use embassy_time::{Duration, Instant};
use heapless::Vec;

/// Phases a siren command may carry
pub const MAX_SIREN_PHASES: usize = 3;

/// Phase slots kept by the engine
pub const SIREN_SLOTS: usize = 5;

/// One on/off pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SirenPhase {
    pub on: Duration,
    pub off: Duration,
}

/// Siren payload could not be decoded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SirenError {
    /// Phase count outside `1..=3`
    PhaseCount(u8),
    /// Payload length is not `1 + 4 * count`
    PayloadLength { expected: usize, actual: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SirenProgram {
    phases: Vec<SirenPhase, SIREN_SLOTS>,
}

impl SirenProgram {
    /// Build a program from explicit phases; `None` if the count is out of
    /// range.
    pub fn new(phases: &[SirenPhase]) -> Option<Self> {
        if phases.is_empty() || phases.len() > MAX_SIREN_PHASES {
            return None;
        }
        let phases = Vec::from_slice(phases).ok()?;
        Some(Self { phases })
    }

    /// Decode `[count][(on u16 LE, off u16 LE) x count]`
    pub fn decode(payload: &[u8]) -> Result<Self, SirenError> {
        let Some(&count) = payload.first() else {
            return Err(SirenError::PayloadLength {
                expected: 1,
                actual: 0,
            });
        };
        if count == 0 || count as usize > MAX_SIREN_PHASES {
            return Err(SirenError::PhaseCount(count));
        }

        let expected = 1 + 4 * count as usize;
        if payload.len() != expected {
            return Err(SirenError::PayloadLength {
                expected,
                actual: payload.len(),
            });
        }

        let mut phases = Vec::new();
        for chunk in payload[1..].chunks_exact(4) {
            let on = u16::from_le_bytes([chunk[0], chunk[1]]);
            let off = u16::from_le_bytes([chunk[2], chunk[3]]);
            // count <= MAX_SIREN_PHASES < SIREN_SLOTS
            let _ = phases.push(SirenPhase {
                on: Duration::from_millis(on as u64),
                off: Duration::from_millis(off as u64),
            });
        }

        Ok(Self { phases })
    }

    pub fn phases(&self) -> &[SirenPhase] {
        &self.phases
    }
}

#[derive(Debug)]
struct Running {
    program: SirenProgram,
    index: usize,
    on_phase: bool,
    next_deadline: Instant,
}

/// Siren phase scheduler. Each method returns the output level the caller
/// must apply when the level changes.
#[derive(Debug, Default)]
pub struct SirenEngine {
    running: Option<Running>,
}

impl SirenEngine {
    pub const fn new() -> Self {
        Self { running: None }
    }

    /// Start `program` now, cancelling any program in flight. The output
    /// goes on immediately.
    pub fn start(&mut self, program: SirenProgram, now: Instant) -> bool {
        let first_on = program.phases[0].on;
        self.running = Some(Running {
            program,
            index: 0,
            on_phase: true,
            next_deadline: now + first_on,
        });
        true
    }

    /// Stop immediately; the output must go off.
    pub fn stop(&mut self) -> bool {
        self.running = None;
        false
    }

    /// Advance the pattern. `Some(level)` when the output changes.
    pub fn tick(&mut self, now: Instant) -> Option<bool> {
        let running = self.running.as_mut()?;
        if now < running.next_deadline {
            return None;
        }

        if running.on_phase {
            running.on_phase = false;
            running.next_deadline = now + running.program.phases[running.index].off;
            return Some(false);
        }

        if running.index + 1 >= running.program.phases.len() {
            crate::log!("[SIREN] Program finished");
            return Some(self.stop());
        }

        running.index += 1;
        running.on_phase = true;
        running.next_deadline = now + running.program.phases[running.index].on;
        Some(true)
    }

    pub fn is_active(&self) -> bool {
        self.running.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_two_phases() {
        let program =
            SirenProgram::decode(&[0x02, 0x64, 0x00, 0x32, 0x00, 0xC8, 0x00, 0x50, 0x00]).unwrap();
        assert_eq!(
            program.phases(),
            &[
                SirenPhase {
                    on: Duration::from_millis(100),
                    off: Duration::from_millis(50),
                },
                SirenPhase {
                    on: Duration::from_millis(200),
                    off: Duration::from_millis(80),
                },
            ]
        );
    }

    #[test]
    fn rejects_bad_phase_counts() {
        assert_eq!(SirenProgram::decode(&[0x00]), Err(SirenError::PhaseCount(0)));
        assert_eq!(
            SirenProgram::decode(&[0x04; 17]),
            Err(SirenError::PhaseCount(4))
        );
    }

    #[test]
    fn rejects_wrong_lengths() {
        assert_eq!(
            SirenProgram::decode(&[]),
            Err(SirenError::PayloadLength {
                expected: 1,
                actual: 0
            })
        );
        assert_eq!(
            SirenProgram::decode(&[0x01, 0x64, 0x00]),
            Err(SirenError::PayloadLength {
                expected: 5,
                actual: 3
            })
        );
        // Trailing bytes are as wrong as missing ones
        assert_eq!(
            SirenProgram::decode(&[0x01, 0x64, 0x00, 0x32, 0x00, 0xFF]),
            Err(SirenError::PayloadLength {
                expected: 5,
                actual: 6
            })
        );
    }

    #[test]
    fn new_program_replaces_running_one() {
        let long = SirenProgram::new(&[SirenPhase {
            on: Duration::from_millis(1000),
            off: Duration::from_millis(1000),
        }])
        .unwrap();
        let short = SirenProgram::new(&[SirenPhase {
            on: Duration::from_millis(10),
            off: Duration::from_millis(10),
        }])
        .unwrap();

        let mut engine = SirenEngine::new();
        assert!(engine.start(long, Instant::from_millis(0)));
        assert!(engine.start(short, Instant::from_millis(5)));

        assert_eq!(engine.tick(Instant::from_millis(15)), Some(false));
        assert_eq!(engine.tick(Instant::from_millis(25)), Some(false));
        assert!(!engine.is_active());
    }
}
