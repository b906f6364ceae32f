//! Binary wire protocol
//!
//! Command datagram (little-endian):
//!
//! ```text
//! [0xA5][0x01][command][request id: u16][payload len: u8][payload ...]
//! ```
//!
//! Acknowledgement, always 7 bytes:
//!
//! ```text
//! [0xA5][0x01][0x7F][request id: u16][status: 0|1][0x00]
//! ```

/// First byte of every datagram
pub const MAGIC: u8 = 0xA5;

/// Protocol version byte
pub const VERSION: u8 = 0x01;

/// Command byte carried by acknowledgements
pub const CMD_ACK: u8 = 0x7F;

/// Fixed header length of a command datagram
pub const HEADER_LEN: usize = 6;

/// Acknowledgement datagram length
pub const ACK_LEN: usize = 7;

/// Largest datagram the protocol can describe (header + u8 payload length)
pub const MAX_DATAGRAM_LEN: usize = HEADER_LEN + u8::MAX as usize;

/// Why a datagram could not be turned into a [`Request`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    /// Fewer bytes than the fixed header
    TooShort(usize),
    /// First byte is not [`MAGIC`]
    BadMagic(u8),
    /// Second byte is not [`VERSION`]
    BadVersion(u8),
    /// Declared payload length disagrees with the datagram size.
    /// The header was readable, so the request id is known.
    LengthMismatch {
        request_id: u16,
        declared: u8,
        actual: usize,
    },
}

impl ParseError {
    /// Malformed datagrams are dropped without an acknowledgement; a length
    /// mismatch is the only parse failure that gets answered.
    pub fn is_silent(&self) -> bool {
        !matches!(self, ParseError::LengthMismatch { .. })
    }
}

/// A validated command datagram, borrowing its payload from the receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Request<'a> {
    pub command: u8,
    pub request_id: u16,
    pub payload: &'a [u8],
}

impl<'a> Request<'a> {
    /// Parse raw datagram bytes according to the wire format
    pub fn parse(data: &'a [u8]) -> Result<Self, ParseError> {
        if data.len() < HEADER_LEN {
            return Err(ParseError::TooShort(data.len()));
        }
        if data[0] != MAGIC {
            return Err(ParseError::BadMagic(data[0]));
        }
        if data[1] != VERSION {
            return Err(ParseError::BadVersion(data[1]));
        }

        let command = data[2];
        let request_id = read_u16_le(&data[3..5]);
        let declared = data[5];

        if HEADER_LEN + declared as usize != data.len() {
            return Err(ParseError::LengthMismatch {
                request_id,
                declared,
                actual: data.len(),
            });
        }

        Ok(Self {
            command,
            request_id,
            payload: &data[HEADER_LEN..],
        })
    }
}

/// Outcome reported back to the sender
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AckStatus {
    Rejected = 0,
    Accepted = 1,
}

impl From<bool> for AckStatus {
    fn from(accepted: bool) -> Self {
        if accepted {
            AckStatus::Accepted
        } else {
            AckStatus::Rejected
        }
    }
}

/// Acknowledgement for one request id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub request_id: u16,
    pub status: AckStatus,
}

impl Ack {
    pub fn new(request_id: u16, status: AckStatus) -> Self {
        Self { request_id, status }
    }

    /// Wire encoding. The trailing code byte is reserved and always zero.
    pub fn to_bytes(&self) -> [u8; ACK_LEN] {
        let id = self.request_id.to_le_bytes();
        [MAGIC, VERSION, CMD_ACK, id[0], id[1], self.status as u8, 0x00]
    }

    pub fn is_accepted(&self) -> bool {
        self.status == AckStatus::Accepted
    }
}

/// Read a little-endian `u16` from the first two bytes of `bytes`
pub fn read_u16_le(bytes: &[u8]) -> u16 {
    u16::from_le_bytes([bytes[0], bytes[1]])
}
