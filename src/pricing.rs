// Pricing: nightly rate parsing, quote computation and display formatting

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;
use tracing::warn;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PricingError {
    #[error("Malformed price: {0:?}")]
    MalformedPrice(String),

    #[error("Price too large to quote: {0}")]
    AmountOverflow(Decimal),
}

// Characters the backend uses to group thousands in price labels
const GROUPING_SEPARATORS: &[char] = &[',', '_', ' ', '\u{a0}'];

/// Parses a nightly price label such as `"10,000"` or `"2499.50"`.
///
/// Grouping separators are stripped before conversion; anything that is not a
/// non-negative number afterwards is a [`PricingError::MalformedPrice`].
pub fn parse_nightly_price(raw: &str) -> Result<Decimal, PricingError> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !GROUPING_SEPARATORS.contains(c))
        .collect();

    let value = Decimal::from_str(&cleaned)
        .map_err(|_| PricingError::MalformedPrice(raw.to_string()))?;

    if value.is_sign_negative() && !value.is_zero() {
        return Err(PricingError::MalformedPrice(raw.to_string()));
    }

    Ok(value)
}

// Derived price breakdown for a stay; never stored, always recomputed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceQuote {
    pub nightly_rate: Decimal,
    pub nights: u32,
    pub tax_rate: Decimal,
    pub base: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl PriceQuote {
    /// Base, tax and total for `nights` at `nightly_rate`. Amounts beyond
    /// what a [`Decimal`] can hold are a [`PricingError::AmountOverflow`].
    pub fn compute(
        nightly_rate: Decimal,
        nights: u32,
        tax_rate: Decimal,
    ) -> Result<Self, PricingError> {
        let overflow = || PricingError::AmountOverflow(nightly_rate);
        let base = nightly_rate
            .checked_mul(Decimal::from(nights))
            .ok_or_else(overflow)?;
        let tax = base.checked_mul(tax_rate).ok_or_else(overflow)?;
        let total = base.checked_add(tax).ok_or_else(overflow)?;

        Ok(Self {
            nightly_rate,
            nights,
            tax_rate,
            base,
            tax,
            total,
        })
    }

    fn zero(nights: u32, tax_rate: Decimal) -> Self {
        Self {
            nightly_rate: Decimal::ZERO,
            nights,
            tax_rate,
            base: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
        }
    }

    pub fn from_price_label(
        raw: &str,
        nights: u32,
        tax_rate: Decimal,
    ) -> Result<Self, PricingError> {
        Self::compute(parse_nightly_price(raw)?, nights, tax_rate)
    }

    /// Quote for rendering: a malformed or unquotable price renders as a zero
    /// quote instead of failing the whole room view.
    pub fn for_display(raw: &str, nights: u32, tax_rate: Decimal) -> Self {
        match Self::from_price_label(raw, nights, tax_rate) {
            Ok(quote) => quote,
            Err(err) => {
                warn!(price = raw, error = %err, "rendering zero quote for unparseable price");
                Self::zero(nights, tax_rate)
            }
        }
    }

    // Whole-unit total as charged
    pub fn rounded_total(&self) -> Decimal {
        round_whole(self.total)
    }

    /// Whole-unit amounts for display. Tax absorbs the rounding difference so
    /// that `base + tax == total` holds for the displayed numbers.
    pub fn breakdown(&self) -> DisplayBreakdown {
        let base = round_whole(self.base);
        let total = round_whole(self.total);

        DisplayBreakdown {
            base,
            tax: total - base,
            total,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayBreakdown {
    pub base: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl DisplayBreakdown {
    pub fn formatted(&self) -> (String, String, String) {
        (
            format_amount(self.base),
            format_amount(self.tax),
            format_amount(self.total),
        )
    }
}

fn round_whole(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Formats an amount with Indian digit grouping: `1234567` -> `12,34,567`.
pub fn format_amount(amount: Decimal) -> String {
    let text = amount.normalize().to_string();
    let (sign, unsigned) = match text.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", text.as_str()),
    };
    let (integer, fraction) = match unsigned.split_once('.') {
        Some((integer, fraction)) => (integer, Some(fraction)),
        None => (unsigned, None),
    };

    let mut grouped = group_indian(integer);
    if let Some(fraction) = fraction {
        grouped.push('.');
        grouped.push_str(fraction);
    }
    format!("{sign}{grouped}")
}

fn group_indian(digits: &str) -> String {
    if digits.len() <= 3 {
        return digits.to_string();
    }

    let (head, last_three) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();

    format!("{},{}", groups.join(","), last_three)
}

/// Formats a nightly price label as received from the backend. Labels that
/// already carry grouping pass through unchanged; empty or unparseable labels
/// render as `"0"`.
pub fn format_price_label(raw: &str) -> String {
    let raw = raw.trim();
    if raw.contains(',') {
        return raw.to_string();
    }
    match parse_nightly_price(raw) {
        Ok(value) => format_amount(value),
        Err(_) => "0".to_string(),
    }
}
