//! Daily FX rates and the in-memory rate table built from them.
//!
//! Rates are ingested by an external job (out of scope here) and consumed
//! read-only. Each row quotes one currency against the reference currency:
//! `rate_to_reference` is how many reference-currency units one unit of
//! `currency` is worth on `date`.

use std::collections::HashMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use sea_orm::entity::prelude::*;

use crate::Currency;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "fx_rates")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub currency: String,
    pub rate_to_reference: f64,
    pub date: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Latest known rate per currency, quoted against [`Currency::REFERENCE`].
///
/// The reference currency is always present with rate 1. Lookups for a
/// currency without a persisted rate return `None`; the converter decides
/// what to do with the gap.
#[derive(Clone, Debug, Default)]
pub struct RateTable {
    rates: HashMap<Currency, Decimal>,
}

impl RateTable {
    /// Builds a table from rate rows ordered **most recent first**.
    ///
    /// The first row seen per currency wins; malformed or non-positive
    /// rates and unknown currency codes are skipped.
    #[must_use]
    pub fn from_latest(rows: &[Model]) -> Self {
        let mut rates = HashMap::new();
        rates.insert(Currency::REFERENCE, Decimal::ONE);

        for row in rows {
            let Ok(currency) = Currency::try_from(row.currency.as_str()) else {
                continue;
            };
            let Some(rate) = Decimal::from_f64(row.rate_to_reference) else {
                continue;
            };
            if rate <= Decimal::ZERO {
                continue;
            }
            rates.entry(currency).or_insert(rate);
        }

        Self { rates }
    }

    /// Table with only the reference rate, used when no rates are loaded.
    #[must_use]
    pub fn reference_only() -> Self {
        Self::from_latest(&[])
    }

    #[must_use]
    pub fn rate(&self, currency: Currency) -> Option<Decimal> {
        self.rates.get(&currency).copied()
    }

    #[cfg(test)]
    pub(crate) fn with_rate(mut self, currency: Currency, rate: Decimal) -> Self {
        self.rates.insert(currency, rate);
        self
    }
}
