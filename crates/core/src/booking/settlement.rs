use std::{future::Future, pin::Pin, time::Duration};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{AttemptId, PaymentMethod};
use crate::{
    error::SettlementFailure,
    models::{EventMetadata, TicketOffer},
    pricing::FeeBreakdown,
};

/// Default simulated gateway latency.
pub const DEFAULT_SETTLEMENT_DELAY: Duration = Duration::from_millis(1500);

/// Future returned by a [`Settlement`] capability.
pub type SettlementFuture =
    Pin<Box<dyn Future<Output = Result<Receipt, SettlementFailure>> + Send + 'static>>;

/// What is being settled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementKind {
    /// A paid ticket from the payment modal.
    Payment {
        /// Ticket being bought.
        ticket: TicketOffer,
        /// Event the ticket is for.
        event: EventMetadata,
        /// Fees charged.
        breakdown: FeeBreakdown,
        /// Chosen payment method.
        method: PaymentMethod,
    },
    /// A seat reservation from the quick-booking flow.
    Reservation {
        /// Event identifier.
        event_id: String,
        /// Event headline.
        title: String,
        /// Event date.
        date: String,
    },
}

/// Everything a gateway needs to finalize one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementRequest {
    /// Attempt being settled.
    pub attempt: AttemptId,
    /// Payload.
    pub kind: SettlementKind,
}

impl SettlementRequest {
    /// Amount to charge, if any.
    pub fn amount(&self) -> Option<Decimal> {
        match &self.kind {
            SettlementKind::Payment { breakdown, .. } => Some(breakdown.total),
            SettlementKind::Reservation { .. } => None,
        }
    }

    /// Payment method, if any.
    pub fn method(&self) -> Option<PaymentMethod> {
        match &self.kind {
            SettlementKind::Payment { method, .. } => Some(*method),
            SettlementKind::Reservation { .. } => None,
        }
    }

    /// Confirmation reference handed back to the user.
    pub fn reference(&self) -> String {
        let prefix = match self.kind {
            SettlementKind::Payment { .. } => "PAY",
            SettlementKind::Reservation { .. } => "BK",
        };
        format!("{prefix}-{:06}", self.attempt.0)
    }
}

/// Proof of a successful settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Attempt that was settled.
    pub attempt: AttemptId,
    /// Confirmation reference.
    pub reference: String,
    /// Amount charged.
    pub amount: Option<Decimal>,
    /// Method charged.
    pub method: Option<PaymentMethod>,
    /// When the gateway confirmed.
    pub settled_at: DateTime<Utc>,
}

impl Receipt {
    /// Receipt for `request` settled now.
    pub fn for_request(request: &SettlementRequest) -> Self {
        Self {
            attempt: request.attempt,
            reference: request.reference(),
            amount: request.amount(),
            method: request.method(),
            settled_at: Utc::now(),
        }
    }
}

/// The external call that finalizes an attempt.
pub trait Settlement: Send + Sync {
    /// Start settling `request`; resolves once the gateway answers.
    fn attempt(&self, request: SettlementRequest) -> SettlementFuture;
}

/// Gateway stand-in that answers after a fixed delay.
#[derive(Debug, Clone)]
pub struct SimulatedGateway {
    delay: Duration,
    decline: Option<String>,
}

impl SimulatedGateway {
    /// Gateway that approves every request after `delay`.
    pub fn approving(delay: Duration) -> Self {
        Self {
            delay,
            decline: None,
        }
    }

    /// Gateway that declines every request after `delay` with `reason`.
    pub fn declining(delay: Duration, reason: impl Into<String>) -> Self {
        Self {
            delay,
            decline: Some(reason.into()),
        }
    }

    /// Configured latency.
    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for SimulatedGateway {
    fn default() -> Self {
        Self::approving(DEFAULT_SETTLEMENT_DELAY)
    }
}

impl Settlement for SimulatedGateway {
    fn attempt(&self, request: SettlementRequest) -> SettlementFuture {
        let delay = self.delay;
        let decline = self.decline.clone();
        Box::pin(async move {
            debug!(attempt = %request.attempt, delay_ms = delay.as_millis() as u64, "Simulated settlement started");
            tokio::time::sleep(delay).await;
            match decline {
                Some(reason) => {
                    warn!(attempt = %request.attempt, %reason, "Simulated settlement declined");
                    Err(SettlementFailure::new(reason))
                }
                None => {
                    let receipt = Receipt::for_request(&request);
                    info!(attempt = %request.attempt, reference = %receipt.reference, "Simulated settlement approved");
                    Ok(receipt)
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation(attempt: u64) -> SettlementRequest {
        SettlementRequest {
            attempt: AttemptId(attempt),
            kind: SettlementKind::Reservation {
                event_id: "cairo-jazz".to_string(),
                title: "Cairo Jazz Night".to_string(),
                date: "14 Nov".to_string(),
            },
        }
    }

    #[tokio::test(start_paused = true)]
    async fn approves_after_delay() {
        let gateway = SimulatedGateway::approving(Duration::from_millis(1500));
        let started = tokio::time::Instant::now();
        let receipt = gateway.attempt(reservation(7)).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(1500));
        assert_eq!(receipt.reference, "BK-000007");
        assert_eq!(receipt.amount, None);
    }

    #[tokio::test(start_paused = true)]
    async fn declining_gateway_reports_reason() {
        let gateway = SimulatedGateway::declining(Duration::from_millis(10), "card declined");
        let err = gateway.attempt(reservation(1)).await.unwrap_err();
        assert_eq!(err.reason, "card declined");
    }
}
