use std::collections::HashMap;

use tracing::{error, info, warn};

use super::{
    control::ControlState,
    settlement::{Receipt, SettlementKind, SettlementRequest},
    AttemptCounter, AttemptId,
};
use crate::{
    error::{BookingError, SettlementFailure},
    models::EventListing,
    notice::Notice,
};

const BOOK_LABEL: &str = "Book Now";
const PROCESSING_LABEL: &str = "Processing...";

/// A booking waiting for the user to say yes or no.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmPrompt {
    /// Event the prompt is for.
    pub event_id: String,
    /// Event headline.
    pub title: String,
    /// Event date.
    pub date: String,
}

impl ConfirmPrompt {
    /// Prompt text, one fact per line.
    pub fn message(&self) -> String {
        format!("Confirm booking for:\n{}\n{}", self.title, self.date)
    }
}

/// Confirm → process → notify booking without the payment modal.
///
/// Each event has its own book control; a control that is busy refuses
/// new requests until its settlement finishes.
#[derive(Debug, Default)]
pub struct QuickBookingFlow {
    controls: HashMap<String, ControlState>,
    prompt: Option<ConfirmPrompt>,
    in_flight: HashMap<AttemptId, String>,
    attempts: AttemptCounter,
}

impl QuickBookingFlow {
    /// Create a flow with no controls busy.
    pub fn new() -> Self {
        Self::default()
    }

    /// The book control for `event_id`.
    pub fn control(&self, event_id: &str) -> ControlState {
        self.controls
            .get(event_id)
            .cloned()
            .unwrap_or_else(|| ControlState::new(BOOK_LABEL))
    }

    /// Whether `event_id`'s booking is in flight.
    pub fn is_busy(&self, event_id: &str) -> bool {
        self.controls
            .get(event_id)
            .map(ControlState::is_busy)
            .unwrap_or(false)
    }

    /// Pending confirmation, if any.
    pub fn prompt(&self) -> Option<&ConfirmPrompt> {
        self.prompt.as_ref()
    }

    /// Ask the user to confirm booking `event`.
    pub fn request(&mut self, event: &EventListing) -> Result<&ConfirmPrompt, BookingError> {
        if self.is_busy(&event.id) {
            warn!(event_id = %event.id, "Book pressed while booking is processing");
            return Err(BookingError::AlreadyProcessing);
        }
        Ok(self.prompt.insert(ConfirmPrompt {
            event_id: event.id.clone(),
            title: event.title.clone(),
            date: event.date.clone(),
        }))
    }

    /// The user declined; nothing happens.
    pub fn decline(&mut self) {
        if let Some(prompt) = self.prompt.take() {
            info!(event_id = %prompt.event_id, "Booking declined");
        }
    }

    /// The user confirmed; disable the event's control and hand back the request to settle.
    pub fn accept(&mut self) -> Result<SettlementRequest, BookingError> {
        let prompt = self
            .prompt
            .take()
            .ok_or(BookingError::NoPendingConfirmation)?;
        let control = self
            .controls
            .entry(prompt.event_id.clone())
            .or_insert_with(|| ControlState::new(BOOK_LABEL));
        if !control.begin(PROCESSING_LABEL) {
            warn!(event_id = %prompt.event_id, "Booking already processing");
            return Err(BookingError::AlreadyProcessing);
        }

        let attempt = self.attempts.next();
        self.in_flight.insert(attempt, prompt.event_id.clone());
        let request = SettlementRequest {
            attempt,
            kind: SettlementKind::Reservation {
                event_id: prompt.event_id,
                title: prompt.title,
                date: prompt.date,
            },
        };
        info!(%attempt, "Booking processing");
        Ok(request)
    }

    /// Restore the control of the event booked by `attempt` and report the result.
    ///
    /// Fails with [`BookingError::StaleSettlement`] when `attempt` is not in flight.
    pub fn finish(
        &mut self,
        attempt: AttemptId,
        result: Result<Receipt, SettlementFailure>,
    ) -> Result<Notice, BookingError> {
        let Some(event_id) = self.in_flight.remove(&attempt) else {
            warn!(%attempt, "Booking result for an attempt that is not in flight");
            return Err(BookingError::StaleSettlement(attempt));
        };
        if let Some(control) = self.controls.get_mut(&event_id) {
            control.finish();
        }
        let notice = match result {
            Ok(receipt) => {
                info!(%event_id, reference = %receipt.reference, "Booking confirmed");
                Notice::success("Booking successful! Check your email for confirmation.")
            }
            Err(failure) => {
                error!(%event_id, reason = %failure.reason, "Booking error");
                Notice::failure("Booking failed. Please try again.")
            }
        };
        Ok(notice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notice::NoticeKind;

    fn event(id: &str) -> EventListing {
        EventListing {
            id: id.to_string(),
            title: format!("{id} live"),
            date: "Sat, 15 Nov 2025".to_string(),
            time: "21:00".to_string(),
            location: "Zamalek".to_string(),
            summary: None,
            tickets: Vec::new(),
        }
    }

    #[test]
    fn prompt_names_event_and_date() {
        let mut flow = QuickBookingFlow::new();
        let prompt = flow.request(&event("cairokee")).unwrap();
        assert_eq!(
            prompt.message(),
            "Confirm booking for:\ncairokee live\nSat, 15 Nov 2025"
        );
    }

    #[test]
    fn decline_starts_nothing() {
        let mut flow = QuickBookingFlow::new();
        flow.request(&event("a")).unwrap();
        flow.decline();
        assert!(flow.prompt().is_none());
        assert!(!flow.is_busy("a"));
        assert_eq!(flow.accept(), Err(BookingError::NoPendingConfirmation));
    }

    #[test]
    fn busy_control_rejects_same_event_only() {
        let mut flow = QuickBookingFlow::new();
        flow.request(&event("a")).unwrap();
        let first = flow.accept().unwrap();
        let control = flow.control("a");
        assert!(!control.is_enabled());
        assert_eq!(control.label(), "Processing...");

        assert_eq!(
            flow.request(&event("a")).err(),
            Some(BookingError::AlreadyProcessing)
        );

        flow.request(&event("b")).unwrap();
        let second = flow.accept().unwrap();
        assert_ne!(first.attempt, second.attempt);
        assert!(flow.is_busy("a") && flow.is_busy("b"));
    }

    #[test]
    fn finish_restores_control_on_both_outcomes() {
        let mut flow = QuickBookingFlow::new();
        flow.request(&event("a")).unwrap();
        let request = flow.accept().unwrap();
        let notice = flow
            .finish(request.attempt, Ok(Receipt::for_request(&request)))
            .unwrap();
        assert_eq!(notice.kind, NoticeKind::Success);
        assert_eq!(
            notice.message,
            "Booking successful! Check your email for confirmation."
        );
        assert_eq!(flow.control("a").label(), "Book Now");

        flow.request(&event("a")).unwrap();
        let retry = flow.accept().unwrap();
        let notice = flow
            .finish(retry.attempt, Err(SettlementFailure::new("timeout")))
            .unwrap();
        assert_eq!(notice.message, "Booking failed. Please try again.");
        assert!(flow.control("a").is_enabled());
    }

    #[test]
    fn finish_rejects_attempts_not_in_flight() {
        let mut flow = QuickBookingFlow::new();
        let unknown = AttemptId(42);
        let receipt = Receipt::for_request(&SettlementRequest {
            attempt: unknown,
            kind: SettlementKind::Reservation {
                event_id: "never-booked".to_string(),
                title: "never-booked live".to_string(),
                date: "Sat, 15 Nov 2025".to_string(),
            },
        });
        assert_eq!(
            flow.finish(unknown, Ok(receipt)),
            Err(BookingError::StaleSettlement(unknown))
        );

        flow.request(&event("a")).unwrap();
        let request = flow.accept().unwrap();
        flow.finish(request.attempt, Err(SettlementFailure::new("timeout")))
            .unwrap();
        assert_eq!(
            flow.finish(request.attempt, Err(SettlementFailure::new("timeout"))),
            Err(BookingError::StaleSettlement(request.attempt))
        );
        assert!(!flow.is_busy("a"));
    }
}
