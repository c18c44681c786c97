//! Supported currencies and the conversion table anchored at RWF.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Default RWF-per-USD quote, used until settings override it.
pub const DEFAULT_USD_TO_RWF: f64 = 1452.49;
/// Default RWF-per-EUR quote.
pub const DEFAULT_EUR_TO_RWF: f64 = 1687.97;

/// Currencies the tracker can display and store amounts in. RWF is the base
/// every conversion routes through.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    #[serde(rename = "USD")]
    Usd,
    #[serde(rename = "EUR")]
    Eur,
    #[default]
    #[serde(rename = "RWF")]
    Rwf,
}

impl Currency {
    pub fn code(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Rwf => "RWF",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Currency::Usd => "$",
            Currency::Eur => "€",
            Currency::Rwf => "FRw",
        }
    }

    pub fn all() -> [Currency; 3] {
        [Currency::Usd, Currency::Eur, Currency::Rwf]
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// RWF-per-unit quotes for the foreign currencies. One unit of USD is worth
/// `usd_to_rwf` francs, so USD amounts convert to base by multiplication.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateTable {
    usd_to_rwf: f64,
    eur_to_rwf: f64,
}

impl RateTable {
    pub fn new(usd_to_rwf: f64, eur_to_rwf: f64) -> Self {
        Self {
            usd_to_rwf,
            eur_to_rwf,
        }
    }

    fn rwf_per_unit(&self, currency: Currency) -> f64 {
        match currency {
            Currency::Usd => self.usd_to_rwf,
            Currency::Eur => self.eur_to_rwf,
            Currency::Rwf => 1.0,
        }
    }

    /// Converts `amount` from one currency to another through the RWF base.
    /// Identity when `from == to`; otherwise the result is rounded to two
    /// decimal places, half away from zero (`f64::round` semantics).
    pub fn convert(&self, amount: f64, from: Currency, to: Currency) -> f64 {
        if from == to {
            return amount;
        }
        let in_base = amount * self.rwf_per_unit(from);
        round2(in_base / self.rwf_per_unit(to))
    }
}

impl Default for RateTable {
    fn default() -> Self {
        Self::new(DEFAULT_USD_TO_RWF, DEFAULT_EUR_TO_RWF)
    }
}

/// Rounds to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
