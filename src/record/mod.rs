//! The persisted record and its merge-over-defaults deserialization.
//!
//! Every field carries an explicit serde default, so any subset or superset
//! of the schema loads cleanly: persisted values win, missing fields fall
//! back to compiled-in defaults. That replaces ad-hoc shape merging with a
//! typed path a future schema migration can hook into.

pub mod settings;
pub mod transaction;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub use settings::{is_default_category, Settings, SettingsPatch, DEFAULT_CATEGORIES};
pub use transaction::{Transaction, TransactionDraft, TransactionPatch};

/// Schema tag written into every record.
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Root object the store reads and writes, one per installation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedRecord {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub settings: Settings,
    #[serde(default, deserialize_with = "lenient_transactions")]
    pub transactions: Vec<Transaction>,
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
}

fn default_version() -> String {
    SCHEMA_VERSION.to_string()
}

impl Default for PersistedRecord {
    fn default() -> Self {
        Self {
            version: default_version(),
            settings: Settings::default(),
            transactions: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

/// Accepts anything where the transaction list should be: a non-array value
/// collapses to an empty list, and individual malformed entries are dropped
/// with a diagnostic instead of poisoning the whole record.
fn lenient_transactions<'de, D>(deserializer: D) -> Result<Vec<Transaction>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Array(items) => Ok(items
            .into_iter()
            .filter_map(|item| match serde_json::from_value::<Transaction>(item) {
                Ok(transaction) => Some(transaction),
                Err(err) => {
                    tracing::warn!("skipping malformed transaction entry: {err}");
                    None
                }
            })
            .collect()),
        _ => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::currency::Currency;

    #[test]
    fn empty_object_merges_to_full_defaults() {
        let record: PersistedRecord = serde_json::from_str("{}").unwrap();
        assert_eq!(record.version, SCHEMA_VERSION);
        assert_eq!(record.settings, Settings::default());
        assert!(record.transactions.is_empty());
    }

    #[test]
    fn non_array_transactions_collapse_to_empty() {
        let record: PersistedRecord =
            serde_json::from_str(r#"{"transactions": "corrupted"}"#).unwrap();
        assert!(record.transactions.is_empty());
        let record: PersistedRecord =
            serde_json::from_str(r#"{"transactions": {"0": {}}}"#).unwrap();
        assert!(record.transactions.is_empty());
    }

    #[test]
    fn malformed_entries_are_dropped_not_fatal() {
        let json = r#"{"transactions": [
            {"description": "Groceries", "amount": -20.5, "category": "Food", "date": "2024-01-05"},
            "not a transaction"
        ]}"#;
        let record: PersistedRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.transactions.len(), 1);
        assert_eq!(record.transactions[0].description, "Groceries");
    }

    #[test]
    fn persisted_values_win_over_defaults() {
        let json = r#"{"version":"1.0.0","settings":{"currency":"EUR","monthlyBudget":250}}"#;
        let record: PersistedRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.settings.currency, Currency::Eur);
        assert_eq!(record.settings.monthly_budget, Some(250.0));
    }

    #[test]
    fn wire_format_uses_camel_case() {
        let record = PersistedRecord::default();
        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("lastUpdated").is_some());
        assert!(json["settings"].get("usdToRwf").is_some());
        assert!(json["settings"].get("monthlyBudget").is_some());
        assert_eq!(json["settings"]["monthlyBudget"], serde_json::Value::Null);
    }
}
