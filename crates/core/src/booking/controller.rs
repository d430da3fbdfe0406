#![allow(missing_docs)]

use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use super::{
    control::ControlState,
    method::{CardDetails, CardField, PaymentMethod},
    settlement::{Receipt, Settlement, SettlementKind, SettlementRequest},
    AttemptCounter, AttemptId,
};
use crate::{
    error::{BookingError, ParseError, SettlementFailure, ValidationError},
    models::{EventMetadata, TicketListing, TicketOffer},
    notice::{self, Notice, DEFAULT_NOTICE_DURATION},
    pricing::FeeBreakdown,
};

const CONFIRM_LABEL: &str = "Confirm Payment";
const PROCESSING_LABEL: &str = "Processing...";

/// Where the controller is in the purchase lifecycle.
///
/// Settled and Failed are passed through inside [`BookingController::complete_settlement`]
/// and always land back on `Idle`; the outcome is reported as an [`AttemptOutcome`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingState {
    /// No settlement in flight.
    Idle,
    /// Waiting on the settlement for this attempt.
    Processing(AttemptId),
}

/// How a finished attempt ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Gateway approved; the modal has been closed.
    Settled(Receipt),
    /// Gateway declined; the modal stays open for a retry.
    Failed(SettlementFailure),
}

#[derive(Debug, Clone)]
struct PaymentModal {
    ticket: TicketOffer,
    event: EventMetadata,
    breakdown: FeeBreakdown,
    method: Option<PaymentMethod>,
    card: CardDetails,
}

/// One row in the payment method list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodView {
    /// The method.
    pub method: PaymentMethod,
    /// Whether it carries the selected state.
    pub selected: bool,
}

/// Render-ready projection of the controller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModalView {
    pub visible: bool,
    pub ticket_title: String,
    pub event: EventMetadata,
    /// Ticket price, service fee, VAT and total, formatted.
    pub breakdown: Vec<(&'static str, String)>,
    pub methods: Vec<MethodView>,
    pub card_fields_visible: bool,
    pub card: CardDetails,
    pub confirm_label: String,
    pub confirm_enabled: bool,
    pub confirm_busy: bool,
    /// Background scrolling is suppressed while this is set.
    pub scroll_locked: bool,
    pub notice: Option<Notice>,
}

/// Owns the payment modal and the single in-flight booking attempt.
#[derive(Debug)]
pub struct BookingController {
    modal: Option<PaymentModal>,
    state: BookingState,
    confirm: ControlState,
    attempts: AttemptCounter,
    notice: Option<Notice>,
    notice_duration: Duration,
}

impl Default for BookingController {
    fn default() -> Self {
        Self::new()
    }
}

impl BookingController {
    pub fn new() -> Self {
        Self {
            modal: None,
            state: BookingState::Idle,
            confirm: ControlState::new(CONFIRM_LABEL),
            attempts: AttemptCounter::default(),
            notice: None,
            notice_duration: DEFAULT_NOTICE_DURATION,
        }
    }

    /// Override how long inline validation errors stay visible.
    pub fn with_notice_duration(mut self, duration: Duration) -> Self {
        self.notice_duration = duration;
        self
    }

    pub fn state(&self) -> BookingState {
        self.state
    }

    pub fn is_processing(&self) -> bool {
        matches!(self.state, BookingState::Processing(_))
    }

    pub fn is_open(&self) -> bool {
        self.modal.is_some()
    }

    pub fn scroll_locked(&self) -> bool {
        self.modal.is_some()
    }

    pub fn selected_method(&self) -> Option<PaymentMethod> {
        self.modal.as_ref().and_then(|modal| modal.method)
    }

    pub fn breakdown(&self) -> Option<&FeeBreakdown> {
        self.modal.as_ref().map(|modal| &modal.breakdown)
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Hide an inline error once its display time has passed.
    pub fn expire_notice(&mut self, now: Instant) -> bool {
        notice::clear_expired(&mut self.notice, now)
    }

    /// Read the ticket, compute its fees and show the payment modal.
    ///
    /// On a [`ParseError`](crate::error::ParseError) nothing is rendered: the
    /// previous modal state is left untouched and an error notice is raised.
    pub fn open_payment_modal(
        &mut self,
        listing: &TicketListing,
        event: EventMetadata,
    ) -> Result<(), BookingError> {
        if self.is_processing() {
            warn!(ticket = %listing.title, "Ignoring ticket selection while a payment is processing");
            return Err(BookingError::AlreadyProcessing);
        }

        let priced = TicketOffer::from_listing(listing).and_then(|ticket| {
            let breakdown =
                FeeBreakdown::from_unit_price(ticket.unit_price).ok_or_else(|| {
                    ParseError::OutOfRange {
                        input: listing.price.clone(),
                    }
                })?;
            Ok((ticket, breakdown))
        });
        let (ticket, breakdown) = match priced {
            Ok(priced) => priced,
            Err(err) => {
                error!(ticket = %listing.title, price = %listing.price, %err, "Ticket price unreadable");
                let err = BookingError::from(err);
                self.notice = Some(Notice::failure(err.to_string()));
                return Err(err);
            }
        };

        info!(
            ticket = %ticket.title,
            unit_price = %ticket.unit_price,
            total = %breakdown.total,
            "Payment modal opened"
        );
        self.modal = Some(PaymentModal {
            ticket,
            event,
            breakdown,
            method: None,
            card: CardDetails::default(),
        });
        self.confirm.finish();
        self.notice = None;
        Ok(())
    }

    /// Mark `method` as the only selected payment method.
    pub fn select_payment_method(&mut self, method: PaymentMethod) -> Result<(), BookingError> {
        if self.is_processing() {
            return Err(BookingError::AlreadyProcessing);
        }
        let modal = self.modal.as_mut().ok_or(BookingError::NoModal)?;
        if modal.method != Some(method) {
            info!(%method, "Payment method selected");
            modal.method = Some(method);
        }
        Ok(())
    }

    /// Edit one of the card detail inputs.
    pub fn set_card_field(&mut self, field: CardField, value: String) -> Result<(), BookingError> {
        if self.is_processing() {
            return Err(BookingError::AlreadyProcessing);
        }
        let modal = self.modal.as_mut().ok_or(BookingError::NoModal)?;
        *modal.card.get_mut(field) = value;
        Ok(())
    }

    pub fn card_details(&self) -> Option<&CardDetails> {
        self.modal.as_ref().map(|modal| &modal.card)
    }

    /// Validate the modal and move to Processing.
    ///
    /// Returns the request the caller must hand to a [`Settlement`] and later
    /// report back through [`complete_settlement`](Self::complete_settlement).
    pub fn confirm_payment(&mut self) -> Result<SettlementRequest, BookingError> {
        if let BookingState::Processing(attempt) = self.state {
            warn!(%attempt, "Confirm pressed while processing; ignored");
            return Err(BookingError::AlreadyProcessing);
        }
        let modal = self.modal.as_ref().ok_or(BookingError::NoModal)?;
        let Some(method) = modal.method else {
            let err = ValidationError::NoPaymentMethod;
            warn!("Confirm pressed without a payment method");
            self.notice = Some(Notice::transient_error(
                err.to_string(),
                self.notice_duration,
            ));
            return Err(err.into());
        };

        let request = SettlementRequest {
            attempt: self.attempts.next(),
            kind: SettlementKind::Payment {
                ticket: modal.ticket.clone(),
                event: modal.event.clone(),
                breakdown: modal.breakdown,
                method,
            },
        };
        self.confirm.begin(PROCESSING_LABEL);
        self.state = BookingState::Processing(request.attempt);
        self.notice = None;
        info!(attempt = %request.attempt, %method, "Payment processing");
        Ok(request)
    }

    /// Apply the gateway's answer for `attempt`.
    pub fn complete_settlement(
        &mut self,
        attempt: AttemptId,
        result: Result<Receipt, SettlementFailure>,
    ) -> Result<AttemptOutcome, BookingError> {
        if self.state != BookingState::Processing(attempt) {
            warn!(%attempt, state = ?self.state, "Settlement for an attempt that is not in flight");
            return Err(BookingError::StaleSettlement(attempt));
        }

        self.confirm.finish();
        self.state = BookingState::Idle;

        match result {
            Ok(receipt) => {
                let title = self
                    .modal
                    .take()
                    .map(|modal| modal.ticket.title)
                    .unwrap_or_default();
                info!(%attempt, reference = %receipt.reference, "Payment settled; modal closed");
                self.notice = Some(Notice::success(format!(
                    "Payment successful! Your {title} ticket is confirmed. Reference {}.",
                    receipt.reference
                )));
                Ok(AttemptOutcome::Settled(receipt))
            }
            Err(failure) => {
                error!(%attempt, reason = %failure.reason, "Payment failed");
                self.notice = Some(Notice::failure(format!(
                    "Payment failed: {}. Please try again.",
                    failure.reason
                )));
                Ok(AttemptOutcome::Failed(failure))
            }
        }
    }

    /// Confirm, wait for `settlement` and apply its answer in one go.
    pub async fn confirm_and_settle<S>(
        &mut self,
        settlement: &S,
    ) -> Result<AttemptOutcome, BookingError>
    where
        S: Settlement + ?Sized,
    {
        let request = self.confirm_payment()?;
        let attempt = request.attempt;
        let result = settlement.attempt(request).await;
        self.complete_settlement(attempt, result)
    }

    /// Hide the modal and drop the current attempt.
    pub fn close_modal(&mut self) -> Result<(), BookingError> {
        if self.is_processing() {
            warn!("Close requested while a payment is processing");
            return Err(BookingError::AlreadyProcessing);
        }
        if self.modal.take().is_some() {
            info!("Payment modal closed");
        }
        self.confirm.finish();
        Ok(())
    }

    /// Project the current state into something a front-end can draw.
    pub fn view(&self) -> ModalView {
        let selected = self.selected_method();
        let methods = PaymentMethod::ALL
            .into_iter()
            .map(|method| MethodView {
                method,
                selected: selected == Some(method),
            })
            .collect();
        let (ticket_title, event, breakdown, card) = match &self.modal {
            Some(modal) => (
                modal.ticket.title.clone(),
                modal.event.clone(),
                modal.breakdown.lines().to_vec(),
                modal.card.clone(),
            ),
            None => Default::default(),
        };

        ModalView {
            visible: self.modal.is_some(),
            ticket_title,
            event,
            breakdown,
            methods,
            card_fields_visible: selected.map(PaymentMethod::needs_card_details).unwrap_or(false),
            card,
            confirm_label: self.confirm.label().to_string(),
            confirm_enabled: self.confirm.is_enabled(),
            confirm_busy: self.confirm.is_busy(),
            scroll_locked: self.scroll_locked(),
            notice: self.notice.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    use super::*;
    use crate::{booking::SettlementFuture, notice::NoticeKind, pricing::format_amount};

    struct ScriptedSettlement {
        calls: Arc<AtomicUsize>,
        decline: Option<&'static str>,
    }

    impl ScriptedSettlement {
        fn approving() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                decline: None,
            }
        }

        fn declining(reason: &'static str) -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                decline: Some(reason),
            }
        }
    }

    impl Settlement for ScriptedSettlement {
        fn attempt(&self, request: SettlementRequest) -> SettlementFuture {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let decline = self.decline;
            Box::pin(async move {
                tokio::time::sleep(Duration::from_millis(1500)).await;
                match decline {
                    Some(reason) => Err(SettlementFailure::new(reason)),
                    None => Ok(Receipt::for_request(&request)),
                }
            })
        }
    }

    fn listing(price: &str) -> TicketListing {
        TicketListing {
            title: "VIP Pass".to_string(),
            price: price.to_string(),
            perks: None,
        }
    }

    fn event() -> EventMetadata {
        EventMetadata {
            date: "Fri, 14 Nov 2025".to_string(),
            time: "20:00".to_string(),
            location: "Cairo Opera House".to_string(),
        }
    }

    fn opened(price: &str) -> BookingController {
        let mut controller = BookingController::new();
        controller.open_payment_modal(&listing(price), event()).unwrap();
        controller
    }

    #[test]
    fn opening_renders_breakdown_and_locks_scroll() {
        let controller = opened("100.00 EGP");
        let view = controller.view();
        assert!(view.visible);
        assert!(view.scroll_locked);
        assert_eq!(view.ticket_title, "VIP Pass");
        assert_eq!(view.event.location, "Cairo Opera House");
        let amounts: Vec<&str> = view.breakdown.iter().map(|(_, v)| v.as_str()).collect();
        assert_eq!(
            amounts,
            ["100.00 EGP", "5.00 EGP", "14.00 EGP", "119.00 EGP"]
        );
        assert!(view.methods.iter().all(|row| !row.selected));
        assert_eq!(view.confirm_label, "Confirm Payment");
        assert!(view.confirm_enabled);
    }

    #[test]
    fn reopening_clears_previous_selection_and_card() {
        let mut controller = opened("100 EGP");
        controller
            .select_payment_method(PaymentMethod::CreditCard)
            .unwrap();
        controller
            .set_card_field(CardField::Number, "4111".to_string())
            .unwrap();
        controller.open_payment_modal(&listing("250 EGP"), event()).unwrap();
        assert_eq!(controller.selected_method(), None);
        assert_eq!(controller.card_details(), Some(&CardDetails::default()));
        assert_eq!(
            controller.breakdown().map(|fees| format_amount(fees.total)),
            Some("297.50 EGP".to_string())
        );
    }

    #[test]
    fn unparseable_price_is_rejected_without_rendering() {
        let mut controller = BookingController::new();
        let err = controller
            .open_payment_modal(&listing("TBA"), event())
            .unwrap_err();
        assert!(matches!(err, BookingError::Parse(_)));
        let view = controller.view();
        assert!(!view.visible);
        assert!(view.breakdown.is_empty());
        assert!(!view.scroll_locked);
        assert_eq!(view.notice.map(|n| n.kind), Some(NoticeKind::Failure));
    }

    #[test]
    fn oversized_price_fails_without_touching_open_modal() {
        let mut controller = opened("100 EGP");
        controller.select_payment_method(PaymentMethod::Cash).unwrap();
        let huge = "70,000,000,000,000,000,000,000,000,000 EGP";
        let err = controller
            .open_payment_modal(&listing(huge), event())
            .unwrap_err();
        assert_eq!(
            err,
            BookingError::Parse(ParseError::OutOfRange {
                input: huge.to_string(),
            })
        );
        assert_eq!(controller.selected_method(), Some(PaymentMethod::Cash));
        assert_eq!(
            controller.breakdown().map(|fees| format_amount(fees.total)),
            Some("119.00 EGP".to_string())
        );
        assert_eq!(
            controller.notice().map(|n| n.kind),
            Some(NoticeKind::Failure)
        );
    }

    #[test]
    fn method_selection_is_single_and_idempotent() {
        let mut controller = opened("100 EGP");
        controller
            .select_payment_method(PaymentMethod::CreditCard)
            .unwrap();
        assert!(controller.view().card_fields_visible);

        controller.select_payment_method(PaymentMethod::Cash).unwrap();
        controller.select_payment_method(PaymentMethod::Cash).unwrap();
        let view = controller.view();
        let selected: Vec<PaymentMethod> = view
            .methods
            .iter()
            .filter(|row| row.selected)
            .map(|row| row.method)
            .collect();
        assert_eq!(selected, [PaymentMethod::Cash]);
        assert!(!view.card_fields_visible);
    }

    #[test]
    fn selecting_without_modal_fails() {
        let mut controller = BookingController::new();
        assert_eq!(
            controller.select_payment_method(PaymentMethod::Fawry),
            Err(BookingError::NoModal)
        );
    }

    #[test]
    fn confirm_without_method_stays_idle() {
        let mut controller = opened("100 EGP");
        let err = controller.confirm_payment().unwrap_err();
        assert_eq!(
            err,
            BookingError::Validation(ValidationError::NoPaymentMethod)
        );
        assert_eq!(controller.state(), BookingState::Idle);
        let view = controller.view();
        assert!(view.visible);
        assert!(view.confirm_enabled);
        let notice = view.notice.unwrap();
        assert_eq!(notice.kind, NoticeKind::Error);
        assert_eq!(notice.message, "Please select a payment method");
    }

    #[tokio::test(start_paused = true)]
    async fn successful_settlement_closes_modal() {
        let settlement = ScriptedSettlement::approving();
        let mut controller = opened("100 EGP");
        controller.select_payment_method(PaymentMethod::Fawry).unwrap();

        let request = controller.confirm_payment().unwrap();
        assert_eq!(controller.state(), BookingState::Processing(request.attempt));
        let view = controller.view();
        assert!(!view.confirm_enabled);
        assert!(view.confirm_busy);
        assert_eq!(view.confirm_label, "Processing...");

        let attempt = request.attempt;
        let result = settlement.attempt(request).await;
        let outcome = controller.complete_settlement(attempt, result).unwrap();
        let AttemptOutcome::Settled(receipt) = outcome else {
            panic!("expected settlement");
        };
        assert_eq!(receipt.method, Some(PaymentMethod::Fawry));
        assert_eq!(receipt.reference, "PAY-000001");

        let view = controller.view();
        assert_eq!(controller.state(), BookingState::Idle);
        assert!(!view.visible);
        assert!(!view.scroll_locked);
        assert!(view.confirm_enabled);
        assert_eq!(view.confirm_label, "Confirm Payment");
        assert_eq!(view.notice.map(|n| n.kind), Some(NoticeKind::Success));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_settlement_keeps_modal_open() {
        let settlement = ScriptedSettlement::declining("insufficient funds");
        let mut controller = opened("100 EGP");
        controller
            .select_payment_method(PaymentMethod::VodafoneCash)
            .unwrap();

        let outcome = controller.confirm_and_settle(&settlement).await.unwrap();
        assert_eq!(
            outcome,
            AttemptOutcome::Failed(SettlementFailure::new("insufficient funds"))
        );
        let view = controller.view();
        assert_eq!(controller.state(), BookingState::Idle);
        assert!(view.visible);
        assert!(view.confirm_enabled);
        assert_eq!(view.confirm_label, "Confirm Payment");
        let notice = view.notice.unwrap();
        assert_eq!(notice.kind, NoticeKind::Failure);
        assert!(notice.message.contains("insufficient funds"));
        assert_eq!(controller.selected_method(), Some(PaymentMethod::VodafoneCash));

        let retry = ScriptedSettlement::approving();
        let outcome = controller.confirm_and_settle(&retry).await.unwrap();
        assert!(matches!(outcome, AttemptOutcome::Settled(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn second_confirm_while_processing_starts_nothing() {
        let settlement = ScriptedSettlement::approving();
        let calls = settlement.calls.clone();
        let mut controller = opened("100 EGP");
        controller.select_payment_method(PaymentMethod::Cash).unwrap();

        let request = controller.confirm_payment().unwrap();
        assert_eq!(
            controller.confirm_payment(),
            Err(BookingError::AlreadyProcessing)
        );
        assert_eq!(controller.close_modal(), Err(BookingError::AlreadyProcessing));
        assert_eq!(
            controller.select_payment_method(PaymentMethod::Fawry),
            Err(BookingError::AlreadyProcessing)
        );

        let attempt = request.attempt;
        let pending = tokio::spawn(settlement.attempt(request));
        let result = pending.await.unwrap();
        controller.complete_settlement(attempt, result).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn stale_completion_is_rejected() {
        let mut controller = opened("100 EGP");
        let err = controller
            .complete_settlement(AttemptId(42), Err(SettlementFailure::new("late")))
            .unwrap_err();
        assert_eq!(err, BookingError::StaleSettlement(AttemptId(42)));
        assert!(controller.is_open());
        assert!(controller.notice().is_none());
    }

    #[test]
    fn close_restores_scrolling() {
        let mut controller = opened("100 EGP");
        controller.close_modal().unwrap();
        let view = controller.view();
        assert!(!view.visible);
        assert!(!view.scroll_locked);
        assert_eq!(controller.confirm_payment(), Err(BookingError::NoModal));
    }
}
