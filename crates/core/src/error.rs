//! Error types shared by the booking and account flows.

use thiserror::Error;

use crate::booking::AttemptId;

/// Input rejected before any work starts. The user may retry immediately.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// Confirm pressed before a payment method was chosen.
    #[error("Please select a payment method")]
    NoPaymentMethod,
    /// A required field is empty after trimming.
    #[error("Please fill in all required fields")]
    MissingRequired {
        /// Name of the first empty field.
        field: String,
    },
    /// Password field shorter than the minimum length.
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    /// Email field not shaped like `local@domain.tld`.
    #[error("Please enter a valid email address")]
    MalformedEmail,
}

/// Ticket markup that cannot be turned into a [`crate::models::TicketOffer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// The ticket has no title.
    #[error("ticket title is empty")]
    EmptyTitle,
    /// The price text is blank.
    #[error("ticket price is empty")]
    EmptyPrice,
    /// The price text does not contain a readable amount.
    #[error("'{input}' is not a valid price")]
    NotANumber {
        /// Raw price text.
        input: String,
    },
    /// The amount is below zero.
    #[error("'{input}' is a negative price")]
    Negative {
        /// Raw price text.
        input: String,
    },
    /// The amount is too large for its fees and total to be computed.
    #[error("'{input}' is too large a price")]
    OutOfRange {
        /// Raw price text.
        input: String,
    },
    /// The price carries a currency other than the one tickets are sold in.
    #[error("unsupported currency '{found}' (expected {expected})")]
    Currency {
        /// Currency code found in the text.
        found: String,
        /// Currency code tickets are sold in.
        expected: &'static str,
    },
}

/// Settlement rejected by the payment gateway.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct SettlementFailure {
    /// Gateway-supplied reason.
    pub reason: String,
}

impl SettlementFailure {
    /// Build a failure with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Reset email could not be delivered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}")]
pub struct DeliveryFailure {
    /// Mailer-supplied reason.
    pub reason: String,
}

impl DeliveryFailure {
    /// Build a failure with the given reason.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Errors raised by the payment modal and quick-booking flows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    /// See [`ValidationError`].
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// See [`ParseError`].
    #[error("Unable to read ticket: {0}")]
    Parse(#[from] ParseError),
    /// See [`SettlementFailure`].
    #[error("Payment failed: {0}")]
    Settlement(#[from] SettlementFailure),
    /// A settlement is already in flight for this control.
    #[error("a payment is already being processed")]
    AlreadyProcessing,
    /// Operation requires the payment modal to be open.
    #[error("no payment is open")]
    NoModal,
    /// No booking confirmation is waiting for an answer.
    #[error("no booking is awaiting confirmation")]
    NoPendingConfirmation,
    /// A completion arrived for an attempt that is not in flight.
    #[error("attempt {0} is not being processed")]
    StaleSettlement(AttemptId),
}

/// Errors raised by the password reset flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResetError {
    /// See [`ValidationError`].
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// See [`DeliveryFailure`].
    #[error("Failed to send reset link: {0}")]
    Delivery(#[from] DeliveryFailure),
    /// The reset modal is not open.
    #[error("password reset is not open")]
    NotOpen,
    /// A reset email is already being sent.
    #[error("a reset link is already being sent")]
    AlreadySending,
    /// A delivery result arrived with no reset link in flight.
    #[error("no reset link is being sent")]
    NotSending,
}
