use serde::{Deserialize, Serialize};

use crate::EngineError;

/// Closed set of spending/income categories.
///
/// Budgets are keyed by category, and the duplicate-charge detector falls
/// back to the category key when a transaction has no description, so the
/// set is deliberately closed rather than free-form text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Market,
    Transport,
    Food,
    Bills,
    Entertainment,
    Health,
    Education,
    #[default]
    Other,
}

impl Category {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Transport => "transport",
            Self::Food => "food",
            Self::Bills => "bills",
            Self::Entertainment => "entertainment",
            Self::Health => "health",
            Self::Education => "education",
            Self::Other => "other",
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Category {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "market" => Ok(Self::Market),
            "transport" => Ok(Self::Transport),
            "food" => Ok(Self::Food),
            "bills" => Ok(Self::Bills),
            "entertainment" => Ok(Self::Entertainment),
            "health" => Ok(Self::Health),
            "education" => Ok(Self::Education),
            "other" => Ok(Self::Other),
            other => Err(EngineError::InvalidCategory(format!(
                "unknown category: {other}"
            ))),
        }
    }
}
