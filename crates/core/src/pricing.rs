//! Price parsing and fee math.
//!
//! Amounts stay exact through every calculation; rounding to two decimal
//! places only happens in [`format_amount`].

use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Currency every ticket is sold in.
pub const CURRENCY: &str = "EGP";
/// Service fee charged on the unit price (5%).
pub const SERVICE_FEE_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);
/// VAT charged on the unit price (14%).
pub const VAT_RATE: Decimal = Decimal::from_parts(14, 0, 0, false, 2);

static PRICE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<sign>-)?\s*(?P<amount>[0-9]{1,3}(?:,[0-9]{3})+(?:\.[0-9]+)?|[0-9]+(?:\.[0-9]+)?|\.[0-9]+)\s*(?P<currency>[A-Za-z]{3})?$",
    )
    .expect("invalid price regex")
});

/// Read a unit price from display text such as `"1,250.00 EGP"`.
pub fn parse_price(input: &str) -> Result<Decimal, ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ParseError::EmptyPrice);
    }

    let caps = PRICE_RE
        .captures(trimmed)
        .ok_or_else(|| ParseError::NotANumber {
            input: input.to_string(),
        })?;

    if let Some(currency) = caps.name("currency") {
        if !currency.as_str().eq_ignore_ascii_case(CURRENCY) {
            return Err(ParseError::Currency {
                found: currency.as_str().to_string(),
                expected: CURRENCY,
            });
        }
    }

    let digits = caps
        .name("amount")
        .map(|m| m.as_str().replace(',', ""))
        .unwrap_or_default();
    let amount = Decimal::from_str(&digits).map_err(|_| ParseError::NotANumber {
        input: input.to_string(),
    })?;

    if caps.name("sign").is_some() && !amount.is_zero() {
        return Err(ParseError::Negative {
            input: input.to_string(),
        });
    }
    if FeeBreakdown::from_unit_price(amount).is_none() {
        return Err(ParseError::OutOfRange {
            input: input.to_string(),
        });
    }

    Ok(amount)
}

/// Service fee, VAT and total derived from a unit price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeBreakdown {
    /// Price of one ticket.
    pub unit_price: Decimal,
    /// `unit_price × 5%`.
    pub service_fee: Decimal,
    /// `unit_price × 14%`.
    pub vat: Decimal,
    /// `unit_price + service_fee + vat`.
    pub total: Decimal,
}

impl FeeBreakdown {
    /// Compute the breakdown for the given unit price.
    ///
    /// Returns `None` when the total does not fit in a [`Decimal`].
    pub fn from_unit_price(unit_price: Decimal) -> Option<Self> {
        let service_fee = unit_price.checked_mul(SERVICE_FEE_RATE)?;
        let vat = unit_price.checked_mul(VAT_RATE)?;
        let total = unit_price.checked_add(service_fee)?.checked_add(vat)?;
        Some(Self {
            unit_price,
            service_fee,
            vat,
            total,
        })
    }

    /// Display rows in modal order: label and formatted amount.
    pub fn lines(&self) -> [(&'static str, String); 4] {
        [
            ("Ticket price", format_amount(self.unit_price)),
            ("Service fee (5%)", format_amount(self.service_fee)),
            ("VAT (14%)", format_amount(self.vat)),
            ("Total", format_amount(self.total)),
        ]
    }
}

/// Round half away from zero to two decimal places.
pub fn round_display(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format an amount for display, e.g. `119.00 EGP`.
pub fn format_amount(value: Decimal) -> String {
    let mut rounded = round_display(value);
    rounded.rescale(2);
    format!("{rounded} {CURRENCY}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    #[test]
    fn hundred_pounds_breakdown() {
        let fees = FeeBreakdown::from_unit_price(dec("100.00")).unwrap();
        assert_eq!(round_display(fees.service_fee), dec("5.00"));
        assert_eq!(round_display(fees.vat), dec("14.00"));
        assert_eq!(round_display(fees.total), dec("119.00"));
        assert_eq!(format_amount(fees.total), "119.00 EGP");
    }

    #[test]
    fn total_rounds_exact_sum_not_rounded_parts() {
        let fees = FeeBreakdown::from_unit_price(dec("123.45")).unwrap();
        assert_eq!(format_amount(fees.service_fee), "6.17 EGP");
        assert_eq!(format_amount(fees.vat), "17.28 EGP");
        // 123.45 + 6.1725 + 17.283 = 146.9055
        assert_eq!(format_amount(fees.total), "146.91 EGP");
    }

    #[test]
    fn fee_formulas_hold_for_many_prices() {
        for cents in [1_i64, 99, 250, 1_000, 12_345, 99_999, 1_250_000] {
            let price = Decimal::new(cents, 2);
            let fees = FeeBreakdown::from_unit_price(price).unwrap();
            assert_eq!(
                round_display(fees.service_fee),
                round_display(price * dec("0.05"))
            );
            assert_eq!(round_display(fees.vat), round_display(price * dec("0.14")));
            assert_eq!(
                round_display(fees.total),
                round_display(price + price * dec("0.05") + price * dec("0.14"))
            );
        }
    }

    #[test]
    fn parses_currency_suffixed_prices() {
        assert_eq!(parse_price("123.45 EGP").unwrap(), dec("123.45"));
        assert_eq!(parse_price("  80egp ").unwrap(), dec("80"));
        assert_eq!(parse_price("1,250.00 EGP").unwrap(), dec("1250.00"));
        assert_eq!(parse_price("500").unwrap(), dec("500"));
    }

    #[test]
    fn rejects_unreadable_prices() {
        assert_eq!(parse_price("  "), Err(ParseError::EmptyPrice));
        assert!(matches!(
            parse_price("Free entry"),
            Err(ParseError::NotANumber { .. })
        ));
        assert!(matches!(
            parse_price("12,34 EGP"),
            Err(ParseError::NotANumber { .. })
        ));
        assert!(matches!(
            parse_price("-5 EGP"),
            Err(ParseError::Negative { .. })
        ));
        assert_eq!(
            parse_price("100 USD"),
            Err(ParseError::Currency {
                found: "USD".to_string(),
                expected: CURRENCY,
            })
        );
    }

    #[test]
    fn breakdown_lines_follow_modal_order() {
        let lines = FeeBreakdown::from_unit_price(dec("100")).unwrap().lines();
        assert_eq!(lines[0], ("Ticket price", "100.00 EGP".to_string()));
        assert_eq!(lines[3], ("Total", "119.00 EGP".to_string()));
    }

    #[test]
    fn rejects_prices_whose_total_overflows() {
        let huge = "70,000,000,000,000,000,000,000,000,000 EGP";
        assert_eq!(
            parse_price(huge),
            Err(ParseError::OutOfRange {
                input: huge.to_string(),
            })
        );
        assert!(FeeBreakdown::from_unit_price(Decimal::MAX).is_none());
        assert!(parse_price("1,000,000,000 EGP").is_ok());
    }
}
