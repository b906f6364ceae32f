//! RC5 transmitter on the RMT peripheral
//!
//! The RMT channel runs at 1 MHz with carrier modulation enabled, so one
//! pulse tick is one microsecond and a high level means "carrier on".

use crate::rc5::{CARRIER_HZ, Rc5Frame};
use crate::{BoardError, IrTransmitter};
use esp_hal::gpio::Level;
use esp_hal::rmt::{PulseCode, TxChannel, TxChannelConfig};
use heapless::Vec;

/// RMT tick rate the channel must be configured with
pub const RMT_TICK_HZ: u32 = 1_000_000;

/// Longest duration one pulse-code half can hold (15 bits)
const MAX_PULSE_TICKS: u32 = 0x7FFF;

/// Pulse codes for one frame: two segments per code, the trailing gap split
/// into several segments, plus the end marker.
const MAX_PULSE_CODES: usize = 24;

/// Carrier period in RMT ticks, 25 % duty like common IR blasters
const CARRIER_PERIOD_TICKS: u16 = (RMT_TICK_HZ / CARRIER_HZ) as u16;
const CARRIER_HIGH_TICKS: u16 = CARRIER_PERIOD_TICKS / 4;
const CARRIER_LOW_TICKS: u16 = CARRIER_PERIOD_TICKS - CARRIER_HIGH_TICKS;

/// Channel configuration for the IR LED
pub fn tx_config() -> TxChannelConfig {
    TxChannelConfig::default()
        .with_clk_divider(1)
        .with_idle_output_level(Level::Low)
        .with_idle_output(true)
        .with_carrier_modulation(true)
        .with_carrier_high(CARRIER_HIGH_TICKS)
        .with_carrier_low(CARRIER_LOW_TICKS)
        .with_carrier_level(Level::High)
}

/// IR LED driver
pub struct IrBlaster<TX>
where
    TX: TxChannel,
{
    channel: Option<TX>,
}

impl<TX> IrBlaster<TX>
where
    TX: TxChannel,
{
    pub fn new(channel: TX) -> Self {
        Self {
            channel: Some(channel),
        }
    }
}

impl<TX> IrTransmitter for IrBlaster<TX>
where
    TX: TxChannel,
{
    fn transmit(&mut self, frame: Rc5Frame) -> Result<(), BoardError> {
        let pulses = frame_to_pulses(&frame)?;

        let channel = self.channel.take().ok_or(BoardError::IrError)?;
        match channel.transmit(&pulses) {
            Ok(transaction) => match transaction.wait() {
                Ok(channel) => {
                    self.channel = Some(channel);
                    Ok(())
                }
                Err((_, channel)) => {
                    self.channel = Some(channel);
                    Err(BoardError::IrError)
                }
            },
            // The channel is consumed by a failed transmit
            Err(_) => Err(BoardError::IrError),
        }
    }
}

/// Convert a frame's mark/space runs into RMT pulse codes
fn frame_to_pulses(frame: &Rc5Frame) -> Result<Vec<u32, MAX_PULSE_CODES>, BoardError> {
    let mut pulses: Vec<u32, MAX_PULSE_CODES> = Vec::new();
    let mut pending: Option<(Level, u16)> = None;

    for run in frame.runs() {
        let level = if run.mark { Level::High } else { Level::Low };
        let mut remaining = run.micros;
        while remaining > 0 {
            let ticks = remaining.min(MAX_PULSE_TICKS);
            remaining -= ticks;
            let segment = (level, ticks as u16);

            match pending.take() {
                None => pending = Some(segment),
                Some((first_level, first_ticks)) => pulses
                    .push(PulseCode::new(first_level, first_ticks, segment.0, segment.1))
                    .map_err(|_| BoardError::IrError)?,
            }
        }
    }

    // A zero-length half ends the transmission
    let end = match pending {
        Some((level, ticks)) => PulseCode::new(level, ticks, Level::Low, 0),
        None => PulseCode::new(Level::Low, 0, Level::Low, 0),
    };
    pulses.push(end).map_err(|_| BoardError::IrError)?;

    Ok(pulses)
}
