use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Ways a ticket can be paid for. Exactly one may be selected at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentMethod {
    /// Card payment; reveals the card detail fields.
    CreditCard,
    /// Mobile wallet.
    VodafoneCash,
    /// Pay at a Fawry outlet.
    Fawry,
    /// Cash at the venue box office.
    Cash,
}

impl PaymentMethod {
    /// All methods in display order.
    pub const ALL: [PaymentMethod; 4] = [
        PaymentMethod::CreditCard,
        PaymentMethod::VodafoneCash,
        PaymentMethod::Fawry,
        PaymentMethod::Cash,
    ];

    /// Identifier used in markup and configuration.
    pub fn id(self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "credit-card",
            PaymentMethod::VodafoneCash => "vodafone-cash",
            PaymentMethod::Fawry => "fawry",
            PaymentMethod::Cash => "cash",
        }
    }

    /// Human readable name.
    pub fn label(self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::VodafoneCash => "Vodafone Cash",
            PaymentMethod::Fawry => "Fawry",
            PaymentMethod::Cash => "Cash on Arrival",
        }
    }

    /// Whether choosing this method shows the card detail fields.
    pub fn needs_card_details(self) -> bool {
        self == PaymentMethod::CreditCard
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PaymentMethod::ALL
            .into_iter()
            .find(|method| method.id() == s.trim())
            .ok_or_else(|| format!("unknown payment method '{s}'"))
    }
}

/// Inputs in the card detail region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardField {
    /// Card number.
    Number,
    /// Name on card.
    Holder,
    /// `MM/YY`.
    Expiry,
    /// Security code.
    Cvc,
}

impl CardField {
    /// Fields in tab order.
    pub const ALL: [CardField; 4] = [
        CardField::Number,
        CardField::Holder,
        CardField::Expiry,
        CardField::Cvc,
    ];

    /// Field caption.
    pub fn label(self) -> &'static str {
        match self {
            CardField::Number => "Card number",
            CardField::Holder => "Name on card",
            CardField::Expiry => "Expiry (MM/YY)",
            CardField::Cvc => "CVC",
        }
    }

    /// Next field in tab order, wrapping around.
    pub fn next(self) -> CardField {
        match self {
            CardField::Number => CardField::Holder,
            CardField::Holder => CardField::Expiry,
            CardField::Expiry => CardField::Cvc,
            CardField::Cvc => CardField::Number,
        }
    }
}

/// Contents of the card detail region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardDetails {
    /// Card number as typed.
    pub number: String,
    /// Name on card.
    pub holder: String,
    /// Expiry as typed.
    pub expiry: String,
    /// Security code as typed.
    pub cvc: String,
}

impl CardDetails {
    /// Read a field.
    pub fn get(&self, field: CardField) -> &str {
        match field {
            CardField::Number => &self.number,
            CardField::Holder => &self.holder,
            CardField::Expiry => &self.expiry,
            CardField::Cvc => &self.cvc,
        }
    }

    /// Mutable access to a field.
    pub fn get_mut(&mut self, field: CardField) -> &mut String {
        match field {
            CardField::Number => &mut self.number,
            CardField::Holder => &mut self.holder,
            CardField::Expiry => &mut self.expiry,
            CardField::Cvc => &mut self.cvc,
        }
    }

    /// Card number with everything but the last four digits hidden.
    pub fn masked_number(&self) -> String {
        let digits: Vec<char> = self.number.chars().filter(char::is_ascii_digit).collect();
        let visible = digits.len().saturating_sub(4);
        digits
            .iter()
            .enumerate()
            .map(|(idx, ch)| if idx < visible { '•' } else { *ch })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_ids_round_trip() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.id().parse::<PaymentMethod>(), Ok(method));
        }
        assert!("bitcoin".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn only_credit_card_needs_card_details() {
        assert!(PaymentMethod::CreditCard.needs_card_details());
        assert!(!PaymentMethod::Cash.needs_card_details());
    }

    #[test]
    fn masks_all_but_last_four() {
        let card = CardDetails {
            number: "4111 1111 1111 1234".to_string(),
            ..CardDetails::default()
        };
        assert_eq!(card.masked_number(), "••••••••••••1234");
    }
}
