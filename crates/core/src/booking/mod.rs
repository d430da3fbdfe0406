//! Ticket purchase flows.

use std::fmt;

use serde::{Deserialize, Serialize};

mod control;
/// Payment modal state machine.
pub mod controller;
mod method;
/// Modal-less confirm-then-book flow.
pub mod quick;
/// Settlement capability and the simulated gateway.
pub mod settlement;

pub use control::ControlState;
pub use controller::{AttemptOutcome, BookingController, BookingState, ModalView, MethodView};
pub use method::{CardDetails, CardField, PaymentMethod};
pub use quick::{ConfirmPrompt, QuickBookingFlow};
pub use settlement::{
    Receipt, Settlement, SettlementFuture, SettlementKind, SettlementRequest, SimulatedGateway,
};

/// Identifier of one booking attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttemptId(pub u64);

impl fmt::Display for AttemptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Hands out increasing attempt ids.
#[derive(Debug, Default)]
pub(crate) struct AttemptCounter {
    last: u64,
}

impl AttemptCounter {
    pub(crate) fn next(&mut self) -> AttemptId {
        self.last += 1;
        AttemptId(self.last)
    }
}
