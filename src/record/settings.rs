use serde::{Deserialize, Serialize};

use crate::currency::{Currency, DEFAULT_EUR_TO_RWF, DEFAULT_USD_TO_RWF};

/// Categories every record starts with. These can never be deleted; custom
/// categories are layered on top through settings.
pub const DEFAULT_CATEGORIES: &[&str] = &[
    "Food",
    "Transport",
    "Housing",
    "Utilities",
    "Health",
    "Education",
    "Entertainment",
    "Shopping",
    "Other",
];

pub fn is_default_category(name: &str) -> bool {
    DEFAULT_CATEGORIES
        .iter()
        .any(|known| known.eq_ignore_ascii_case(name))
}

/// Session-wide configuration, persisted inside the record. Every field has
/// an explicit default so partial persisted shapes merge cleanly on load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub currency: Currency,
    /// Budget for a calendar month in the active currency. `None` means no
    /// budget is set and serializes as `null`.
    #[serde(default)]
    pub monthly_budget: Option<f64>,
    #[serde(default = "default_category_names")]
    pub categories: Vec<String>,
    #[serde(default = "default_usd_rate")]
    pub usd_to_rwf: f64,
    #[serde(default = "default_eur_rate")]
    pub eur_to_rwf: f64,
}

fn default_category_names() -> Vec<String> {
    DEFAULT_CATEGORIES.iter().map(|name| name.to_string()).collect()
}

fn default_usd_rate() -> f64 {
    DEFAULT_USD_TO_RWF
}

fn default_eur_rate() -> f64 {
    DEFAULT_EUR_TO_RWF
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            currency: Currency::default(),
            monthly_budget: None,
            categories: default_category_names(),
            usd_to_rwf: default_usd_rate(),
            eur_to_rwf: default_eur_rate(),
        }
    }
}

/// Partial settings update. `monthly_budget` is doubly optional so "clear the
/// budget" (`Some(None)`) and "leave it alone" (`None`) stay distinct.
#[derive(Debug, Clone, Default)]
pub struct SettingsPatch {
    pub currency: Option<Currency>,
    pub monthly_budget: Option<Option<f64>>,
    pub categories: Option<Vec<String>>,
    pub usd_to_rwf: Option<f64>,
    pub eur_to_rwf: Option<f64>,
}

impl SettingsPatch {
    pub fn currency(currency: Currency) -> Self {
        Self {
            currency: Some(currency),
            ..Default::default()
        }
    }

    pub fn apply(&self, settings: &mut Settings) {
        if let Some(currency) = self.currency {
            settings.currency = currency;
        }
        if let Some(budget) = self.monthly_budget {
            settings.monthly_budget = budget;
        }
        if let Some(categories) = &self.categories {
            settings.categories = categories.clone();
        }
        if let Some(rate) = self.usd_to_rwf {
            settings.usd_to_rwf = rate;
        }
        if let Some(rate) = self.eur_to_rwf {
            settings.eur_to_rwf = rate;
        }
    }
}
