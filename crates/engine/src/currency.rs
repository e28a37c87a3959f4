use serde::{Deserialize, Serialize};

use crate::EngineError;

/// ISO-like currency code used by accounts, transactions and budgets.
///
/// The ledger stores monetary values as an `i64` number of **minor units**
/// (e.g. `1050` = `10.50 TRY`). `TRY` is the reference currency of the
/// daily rate table: every persisted FX rate expresses how many TRY one
/// unit of the quoted currency is worth, and the reference rate is 1 by
/// definition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    #[default]
    Try,
    Usd,
    Eur,
}

impl Currency {
    /// The currency all FX rates are quoted against.
    pub const REFERENCE: Currency = Currency::Try;

    /// Canonical currency code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Currency::Try => "TRY",
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
        }
    }

    /// Number of fraction digits used when formatting/parsing amounts.
    #[must_use]
    pub const fn minor_units(self) -> u8 {
        match self {
            Currency::Try | Currency::Usd | Currency::Eur => 2,
        }
    }

    /// Formats an amount of minor units as a major-unit string, e.g.
    /// `1050` becomes `"10.50"`.
    #[must_use]
    pub fn format_minor(self, amount_minor: i64) -> String {
        let scale = 10_i64.pow(u32::from(self.minor_units()));
        let sign = if amount_minor < 0 { "-" } else { "" };
        let abs = amount_minor.unsigned_abs();
        let major = abs / scale.unsigned_abs();
        let frac = abs % scale.unsigned_abs();
        format!(
            "{sign}{major}.{frac:0width$}",
            width = self.minor_units() as usize
        )
    }
}

impl core::fmt::Display for Currency {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}

impl TryFrom<&str> for Currency {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_uppercase().as_str() {
            "TRY" => Ok(Currency::Try),
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            other => Err(EngineError::InvalidCurrency(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!(Currency::try_from("usd").unwrap(), Currency::Usd);
        assert_eq!(Currency::try_from(" EUR ").unwrap(), Currency::Eur);
        assert!(Currency::try_from("GBP").is_err());
    }

    #[test]
    fn format_minor_pads_fraction() {
        assert_eq!(Currency::Try.format_minor(0), "0.00");
        assert_eq!(Currency::Try.format_minor(5), "0.05");
        assert_eq!(Currency::Try.format_minor(100_050), "1000.50");
        assert_eq!(Currency::Try.format_minor(-1_050), "-10.50");
    }
}
