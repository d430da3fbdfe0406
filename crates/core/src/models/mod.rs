//! Shared domain models.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{error::ParseError, pricing};

/// A ticket tier exactly as the page displays it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketListing {
    /// Tier name (e.g. `VIP Pass`).
    pub title: String,
    /// Price text including the currency suffix (e.g. `1,250.00 EGP`).
    pub price: String,
    /// Optional perks line shown under the price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub perks: Option<String>,
}

/// A ticket whose price has been read and validated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketOffer {
    /// Tier name.
    pub title: String,
    /// Unit price in EGP.
    pub unit_price: Decimal,
}

impl TicketOffer {
    /// Read an offer from display markup, rejecting blank titles and unreadable prices.
    pub fn from_listing(listing: &TicketListing) -> Result<Self, ParseError> {
        let title = listing.title.trim();
        if title.is_empty() {
            return Err(ParseError::EmptyTitle);
        }
        let unit_price = pricing::parse_price(&listing.price)?;
        Ok(Self {
            title: title.to_string(),
            unit_price,
        })
    }
}

/// Date, time and venue strings from the event detail region.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventMetadata {
    /// Display date (e.g. `Fri, 14 Nov 2025`).
    pub date: String,
    /// Display time (e.g. `20:00`).
    pub time: String,
    /// Venue.
    pub location: String,
}

/// One event card on the page together with its ticket tiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventListing {
    /// Stable identifier used to key per-event controls.
    pub id: String,
    /// Event headline.
    pub title: String,
    /// Display date.
    pub date: String,
    /// Display time.
    pub time: String,
    /// Venue.
    pub location: String,
    /// Optional tagline.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Ticket tiers on sale.
    #[serde(default)]
    pub tickets: Vec<TicketListing>,
}

impl EventListing {
    /// Metadata rendered into the payment modal.
    pub fn metadata(&self) -> EventMetadata {
        EventMetadata {
            date: self.date.clone(),
            time: self.time.clone(),
            location: self.location.clone(),
        }
    }

    /// Returns a user-facing label combining title and summary.
    pub fn display_name(&self) -> String {
        match self.summary.as_deref() {
            Some(summary) if !summary.is_empty() => format!("{} · {}", self.title, summary),
            _ => self.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn listing(title: &str, price: &str) -> TicketListing {
        TicketListing {
            title: title.to_string(),
            price: price.to_string(),
            perks: None,
        }
    }

    #[test]
    fn offer_reads_title_and_price() {
        let offer = TicketOffer::from_listing(&listing("  Regular ", "350.50 EGP")).unwrap();
        assert_eq!(offer.title, "Regular");
        assert_eq!(offer.unit_price, Decimal::new(35050, 2));
    }

    #[test]
    fn offer_rejects_blank_title() {
        let err = TicketOffer::from_listing(&listing("   ", "100 EGP")).unwrap_err();
        assert_eq!(err, ParseError::EmptyTitle);
    }

    #[test]
    fn offer_rejects_garbage_price() {
        let err = TicketOffer::from_listing(&listing("VIP", "call us")).unwrap_err();
        assert!(matches!(err, ParseError::NotANumber { .. }));
    }
}
