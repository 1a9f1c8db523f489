//! # Acknowledgement Tracking
//!
//! UBX acknowledgements carry only the class and id of the request they
//! answer, with no sequence number. The tracker therefore holds a single
//! in-flight request; issuing a new command replaces it.

use tracing::debug;

use super::packets::AckPayload;

/// Outcome of the in-flight request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AckOutcome {
    /// Nothing has been sent yet
    #[default]
    Idle,
    /// Sent, no answer yet
    Waiting,
    /// Receiver accepted the request
    Acked,
    /// Receiver rejected the request
    Nacked,
}

/// The one command awaiting an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InFlightRequest {
    pub class: u8,
    pub id: u8,
}

/// Single-slot acknowledgement tracker
#[derive(Debug, Clone, Default)]
pub struct AckTracker {
    in_flight: Option<InFlightRequest>,
    outcome: AckOutcome,
}

impl AckTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a freshly transmitted request
    ///
    /// Any previous request is dropped; a late answer to it is then ignored
    /// unless it shares the new request's id.
    pub fn begin(&mut self, class: u8, id: u8) {
        if let (Some(previous), AckOutcome::Waiting) = (self.in_flight, self.outcome) {
            debug!(
                "Superseding unanswered request 0x{:02X}/0x{:02X}",
                previous.class, previous.id
            );
        }
        self.in_flight = Some(InFlightRequest { class, id });
        self.outcome = AckOutcome::Waiting;
    }

    /// Handle an ACK-ACK packet
    pub fn on_ack(&mut self, ack: &AckPayload) {
        if self.matches(ack) {
            self.outcome = AckOutcome::Acked;
        }
    }

    /// Handle an ACK-NACK packet
    pub fn on_nack(&mut self, nack: &AckPayload) {
        if self.matches(nack) {
            self.outcome = AckOutcome::Nacked;
        }
    }

    /// Only a waiting request with the same message id is answered;
    /// stale or mismatched answers are ignored.
    fn matches(&self, answer: &AckPayload) -> bool {
        self.outcome == AckOutcome::Waiting
            && self.in_flight.map_or(false, |req| req.id == answer.id)
    }

    pub fn outcome(&self) -> AckOutcome {
        self.outcome
    }

    pub fn in_flight(&self) -> Option<InFlightRequest> {
        self.in_flight
    }

    /// Id of the request awaiting an answer
    pub fn awaited_id(&self) -> Option<u8> {
        self.in_flight.map(|req| req.id)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
