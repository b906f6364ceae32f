//! RC5 button table, toggle-bit encoder and waveform builder
//!
//! The scoreboard receiver uses 12-bit RC5 words: toggle bit, 5 address bits
//! and 6 command bits. Bit 11 is the toggle. The encoder flips the toggle on
//! every press, so two presses of the same button in a row stay distinct.

use heapless::Vec;

/// Number of logical buttons on the emulated remote
pub const BUTTON_COUNT: usize = 27;

/// Toggle bit of a 12-bit RC5 word
pub const TOGGLE_MASK_12BIT: u16 = 0x800;

/// RC5 half-bit duration in microseconds
pub const HALF_BIT_US: u32 = 889;

/// Minimum period of one RC5 command, frame plus trailing gap
pub const MIN_COMMAND_US: u32 = 113_778;

/// Minimum trailing gap after a frame
pub const MIN_GAP_US: u32 = MIN_COMMAND_US - 14 * 2 * HALF_BIT_US;

/// Carrier frequency of the IR LED
pub const CARRIER_HZ: u32 = 36_000;

/// Upper bound on runs in one frame: 2 start bits and up to 12 data bits,
/// two halves each, plus the trailing gap.
pub const MAX_RUNS: usize = 2 * 14 + 1;

/// One row of the button table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rc5Entry {
    pub name: &'static str,
    pub bits: u8,
    pub code_t0: u16,
    pub code_t1: u16,
}

const fn entry(name: &'static str, code: u16) -> Rc5Entry {
    Rc5Entry {
        name,
        bits: 12,
        code_t0: code & !TOGGLE_MASK_12BIT,
        code_t1: code | TOGGLE_MASK_12BIT,
    }
}

/// Scoreboard remote, in command order `0x01..=0x1B`
static BUTTON_TABLE: [Rc5Entry; BUTTON_COUNT] = [
    entry("-bright", 0x8CA),
    entry("+bright", 0x0CB),
    entry("exit", 0x80C),
    entry("prev_time", 0x02F),
    entry("time", 0x838),
    entry("year", 0x021),
    entry("date", 0x820),
    entry("minus", 0x022),
    entry("prev_date", 0x0E6),
    entry("sec", 0x80D),
    entry("F", 0x011),
    entry("red", 0x810),
    entry("prev_tmp1", 0x02B),
    entry("0", 0x800),
    entry("1", 0x801),
    entry("2", 0x002),
    entry("3", 0x803),
    entry("prev_hum", 0x02E),
    entry("4", 0x804),
    entry("5", 0x005),
    entry("6", 0x806),
    entry("prev_press", 0x02C),
    entry("7", 0x807),
    entry("8", 0x008),
    entry("9", 0x809),
    entry("prev_rad", 0x029),
    entry("prev_tmp2", 0x80F),
];

/// Index into the button table, validated on construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct ButtonIndex(u8);

impl ButtonIndex {
    pub const EXIT: ButtonIndex = ButtonIndex(2);
    pub const DIGIT_8: ButtonIndex = ButtonIndex(23);
    /// Also acts as "pause" on the scoreboard
    pub const DIGIT_9: ButtonIndex = ButtonIndex(24);

    pub fn new(index: u8) -> Option<Self> {
        if (index as usize) < BUTTON_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn entry(self) -> &'static Rc5Entry {
        &BUTTON_TABLE[self.0 as usize]
    }
}

/// Code word ready for transmission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rc5Frame {
    pub code: u16,
    pub bits: u8,
}

/// One stretch of constant carrier state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    /// Carrier on
    pub mark: bool,
    pub micros: u32,
}

impl Rc5Frame {
    /// Mark/space runs of the whole command period, starting with the first
    /// mark. The leading space of the first start bit is idle time anyway.
    pub fn runs(&self) -> Vec<Run, MAX_RUNS> {
        let mut builder = RunBuilder::default();

        // Start bit and field bit; the field bit is 1 for plain RC5
        builder.bit(true);
        builder.bit(true);

        for shift in (0..self.bits.min(12)).rev() {
            builder.bit((self.code >> shift) & 1 == 1);
        }

        builder.finish()
    }
}

#[derive(Default)]
struct RunBuilder {
    runs: Vec<Run, MAX_RUNS>,
    elapsed: u32,
}

impl RunBuilder {
    fn half(&mut self, mark: bool, micros: u32) {
        if self.runs.is_empty() && !mark {
            return;
        }
        self.elapsed += micros;
        match self.runs.last_mut() {
            Some(last) if last.mark == mark => last.micros += micros,
            // MAX_RUNS covers the longest frame
            _ => {
                let _ = self.runs.push(Run { mark, micros });
            }
        }
    }

    /// Manchester: 1 is space then mark, 0 is mark then space
    fn bit(&mut self, one: bool) {
        self.half(!one, HALF_BIT_US);
        self.half(one, HALF_BIT_US);
    }

    fn finish(mut self) -> Vec<Run, MAX_RUNS> {
        let gap = MIN_GAP_US.max(MIN_COMMAND_US.saturating_sub(self.elapsed));
        self.half(false, gap);
        self.runs
    }
}

/// Holds the process-wide toggle bit
#[derive(Debug, Default)]
pub struct Rc5Encoder {
    toggle: bool,
}

impl Rc5Encoder {
    pub const fn new() -> Self {
        Self { toggle: false }
    }

    /// Flip the toggle and pick the matching code word for `button`
    pub fn encode_press(&mut self, button: ButtonIndex) -> Rc5Frame {
        self.toggle = !self.toggle;
        let entry = button.entry();
        Rc5Frame {
            code: if self.toggle {
                entry.code_t1
            } else {
                entry.code_t0
            },
            bits: entry.bits,
        }
    }

    pub fn toggle(&self) -> bool {
        self.toggle
    }
}
