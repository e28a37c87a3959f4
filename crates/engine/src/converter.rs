//! Currency conversion over the daily rate table.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::{Currency, RateTable};

/// Result of a conversion.
///
/// `exact` is false when a rate was missing and the amount was returned
/// unconverted. That fallback is deliberate: conversion sits on read and
/// notification paths that must not block on a gap in the rate table, but
/// callers need to be able to tell a real conversion from the fallback.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Conversion {
    pub amount_minor: i64,
    pub exact: bool,
}

/// Converts amounts between currencies via the reference currency.
///
/// `amount * rate(from)` yields the amount in the reference currency;
/// dividing by `rate(to)` yields the target amount.
#[derive(Clone, Copy, Debug, Default)]
pub struct CurrencyConverter;

impl CurrencyConverter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Converts `amount_minor` from `from` to `to`, rounding half away
    /// from zero to whole minor units.
    #[must_use]
    pub fn convert(
        &self,
        amount_minor: i64,
        from: Currency,
        to: Currency,
        rates: &RateTable,
    ) -> Conversion {
        let (amount, exact) = self.convert_decimal(amount_minor, from, to, rates);
        let rounded = amount
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
            .to_i64()
            .unwrap_or(amount_minor);
        Conversion {
            amount_minor: rounded,
            exact,
        }
    }

    /// Unrounded conversion, used by aggregation so per-row rounding
    /// errors do not accumulate into period sums.
    pub(crate) fn convert_decimal(
        &self,
        amount_minor: i64,
        from: Currency,
        to: Currency,
        rates: &RateTable,
    ) -> (Decimal, bool) {
        let amount = Decimal::from(amount_minor);
        if from == to {
            return (amount, true);
        }
        let (Some(rate_from), Some(rate_to)) = (rates.rate(from), rates.rate(to)) else {
            return (amount, false);
        };
        ((amount * rate_from) / rate_to, true)
    }
}
