//! Dedup/ACK dispatcher
//!
//! Decides what happens to a raw datagram before any command logic runs:
//! drop it, replay the previous acknowledgement, reject it outright, or hand
//! a fresh request to the interpreter. Only the last processed request id is
//! remembered; the sender owns retry policy.

use crate::protocol::{Ack, AckStatus, ParseError, Request};

/// Last request id seen and the status it was answered with
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupState {
    last: Option<(u16, AckStatus)>,
}

impl DedupState {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// The acknowledgement previously sent for `request_id`, if it was the
    /// most recent id.
    pub fn replay(&self, request_id: u16) -> Option<Ack> {
        match self.last {
            Some((id, status)) if id == request_id => Some(Ack::new(id, status)),
            _ => None,
        }
    }

    pub fn record(&mut self, request_id: u16, status: AckStatus) {
        self.last = Some((request_id, status));
    }

    pub fn last_request_id(&self) -> Option<u16> {
        self.last.map(|(id, _)| id)
    }
}

/// What the caller must do with a datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound<'a> {
    /// Not ours or too short; no acknowledgement
    Dropped(ParseError),
    /// Answer with this acknowledgement and do nothing else
    Answer(Ack),
    /// New request: interpret it, then [`Dispatcher::settle`]
    Fresh(Request<'a>),
}

/// Dispatcher state machine around [`DedupState`]
#[derive(Debug, Default)]
pub struct Dispatcher {
    dedup: DedupState,
}

impl Dispatcher {
    pub const fn new() -> Self {
        Self {
            dedup: DedupState::new(),
        }
    }

    /// Classify one datagram.
    ///
    /// A length mismatch is rejected and recorded under its id before the
    /// duplicate check, so a retry of the same malformed id yields the same
    /// rejection.
    pub fn admit<'a>(&mut self, datagram: &'a [u8]) -> Inbound<'a> {
        let request = match Request::parse(datagram) {
            Ok(request) => request,
            Err(ParseError::LengthMismatch { request_id, .. }) => {
                self.dedup.record(request_id, AckStatus::Rejected);
                return Inbound::Answer(Ack::new(request_id, AckStatus::Rejected));
            }
            Err(err) => return Inbound::Dropped(err),
        };

        if let Some(ack) = self.dedup.replay(request.request_id) {
            return Inbound::Answer(ack);
        }

        Inbound::Fresh(request)
    }

    /// Record the interpreter outcome for a fresh request and build its
    /// acknowledgement.
    pub fn settle(&mut self, request_id: u16, status: AckStatus) -> Ack {
        self.dedup.record(request_id, status);
        Ack::new(request_id, status)
    }

    pub fn dedup_state(&self) -> &DedupState {
        &self.dedup
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_then_duplicate() {
        let mut dispatcher = Dispatcher::new();
        let datagram = [0xA5, 0x01, 0x01, 0x05, 0x00, 0x00];

        let Inbound::Fresh(request) = dispatcher.admit(&datagram) else {
            panic!("expected a fresh request");
        };
        let ack = dispatcher.settle(request.request_id, AckStatus::Accepted);

        assert_eq!(dispatcher.admit(&datagram), Inbound::Answer(ack));
    }

    #[test]
    fn rejected_ids_replay_as_rejected() {
        let mut dispatcher = Dispatcher::new();
        let datagram = [0xA5, 0x01, 0x33, 0x09, 0x00, 0x00];

        let Inbound::Fresh(request) = dispatcher.admit(&datagram) else {
            panic!("expected a fresh request");
        };
        dispatcher.settle(request.request_id, AckStatus::Rejected);

        assert_eq!(
            dispatcher.admit(&datagram),
            Inbound::Answer(Ack::new(9, AckStatus::Rejected))
        );
    }

    #[test]
    fn length_mismatch_overrides_previous_outcome() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.settle(7, AckStatus::Accepted);

        let truncated = [0xA5, 0x01, 0x01, 0x07, 0x00, 0x02];
        assert_eq!(
            dispatcher.admit(&truncated),
            Inbound::Answer(Ack::new(7, AckStatus::Rejected))
        );
        assert_eq!(
            dispatcher.dedup_state().replay(7),
            Some(Ack::new(7, AckStatus::Rejected))
        );
    }

    #[test]
    fn dropped_datagrams_leave_dedup_alone() {
        let mut dispatcher = Dispatcher::new();
        dispatcher.settle(3, AckStatus::Accepted);

        assert!(matches!(
            dispatcher.admit(&[0xA5, 0x01]),
            Inbound::Dropped(ParseError::TooShort(2))
        ));
        assert_eq!(dispatcher.dedup_state().last_request_id(), Some(3));
    }
}
