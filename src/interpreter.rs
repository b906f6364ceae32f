//! Command interpreter
//!
//! Turns an accepted request's command byte and payload into a [`Command`].
//! Decoding is pure; the controller applies the result to the queue, the
//! siren or the OTA gate.

use crate::config::{IR_GAP, IR_GAP_MODE_SWITCH_END};
use crate::queue::Action;
use crate::rc5::{BUTTON_COUNT, ButtonIndex};
use crate::siren::{SirenError, SirenProgram};

/// First single-press command code (button index 0)
pub const CMD_PRESS_FIRST: u8 = 0x01;
/// Last single-press command code
pub const CMD_PRESS_LAST: u8 = CMD_PRESS_FIRST + BUTTON_COUNT as u8 - 1;
/// Three exits with spacing, then a settle gap
pub const CMD_MODE_SWITCH: u8 = 0x40;
/// Pause, then the triple-8 reset
pub const CMD_RESET_SCOREBOARD: u8 = 0x41;
pub const CMD_SIREN: u8 = 0x60;
pub const CMD_OTA_MODE: u8 = 0x70;

/// Leave the current scoreboard mode
pub static MODE_SWITCH_SEQUENCE: [Action; 6] = [
    Action::Press(ButtonIndex::EXIT),
    Action::Delay(IR_GAP),
    Action::Press(ButtonIndex::EXIT),
    Action::Delay(IR_GAP),
    Action::Press(ButtonIndex::EXIT),
    Action::Delay(IR_GAP_MODE_SWITCH_END),
];

/// Reset is only honoured from pause, so pause is always pressed first.
/// The scoreboard state is not checked.
pub static RESET_SCOREBOARD_SEQUENCE: [Action; 7] = [
    Action::Press(ButtonIndex::DIGIT_9),
    Action::Delay(IR_GAP),
    Action::Press(ButtonIndex::DIGIT_8),
    Action::Delay(IR_GAP),
    Action::Press(ButtonIndex::DIGIT_8),
    Action::Delay(IR_GAP),
    Action::Press(ButtonIndex::DIGIT_8),
];

/// Decoded command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Press(ButtonIndex),
    Sequence(&'static [Action]),
    Siren(SirenProgram),
    EnterService,
}

/// Why a well-formed request was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reject {
    /// The OTA window only accepts OTA-enter
    ServiceWindowActive,
    /// Command requires an empty payload
    UnexpectedPayload,
    /// Not enough free queue slots
    QueueFull,
    /// Siren payload is malformed
    Siren(SirenError),
    /// Command byte is not part of the protocol
    UnknownCommand(u8),
}

impl From<SirenError> for Reject {
    fn from(err: SirenError) -> Self {
        Reject::Siren(err)
    }
}

impl Command {
    /// Decode a command regardless of the service window
    pub fn decode(code: u8, payload: &[u8]) -> Result<Self, Reject> {
        match code {
            CMD_OTA_MODE => {
                if !payload.is_empty() {
                    return Err(Reject::UnexpectedPayload);
                }
                Ok(Command::EnterService)
            }
            CMD_PRESS_FIRST..=CMD_PRESS_LAST => ButtonIndex::new(code - CMD_PRESS_FIRST)
                .map(Command::Press)
                .ok_or(Reject::UnknownCommand(code)),
            CMD_MODE_SWITCH => Ok(Command::Sequence(&MODE_SWITCH_SEQUENCE)),
            CMD_RESET_SCOREBOARD => Ok(Command::Sequence(&RESET_SCOREBOARD_SEQUENCE)),
            CMD_SIREN => Ok(Command::Siren(SirenProgram::decode(payload)?)),
            _ => Err(Reject::UnknownCommand(code)),
        }
    }
}

/// Decode a command, applying the OTA gate first.
///
/// While the service window is open every command except OTA-enter is
/// rejected, even ones that would otherwise be valid.
pub fn interpret(code: u8, payload: &[u8], service_window_open: bool) -> Result<Command, Reject> {
    if service_window_open && code != CMD_OTA_MODE {
        return Err(Reject::ServiceWindowActive);
    }
    Command::decode(code, payload)
}
