use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single income or expense event. Negative amounts are expenses, the rest
/// income; the list itself carries no ordering guarantee — display order is
/// always derived by the query engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub category: String,
    /// Calendar date in `YYYY-MM-DD` form. Kept as text so imported records
    /// with malformed dates survive the load; consumers parse and skip.
    #[serde(default)]
    pub date: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    /// Materializes a draft into a stored transaction, assigning identity and
    /// timestamps. A missing date defaults to the local calendar day.
    pub fn from_draft(draft: TransactionDraft) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            description: draft.description,
            amount: draft.amount,
            category: draft.category,
            date: draft
                .date
                .unwrap_or_else(|| Local::now().date_naive().format("%Y-%m-%d").to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_expense(&self) -> bool {
        self.amount < 0.0
    }
}

/// Caller-supplied payload for a new transaction, before the store assigns
/// identity and timestamps.
#[derive(Debug, Clone, Default)]
pub struct TransactionDraft {
    pub description: String,
    pub amount: f64,
    pub category: String,
    pub date: Option<String>,
}

/// Partial update applied over an existing transaction. Absent fields are
/// left untouched.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub category: Option<String>,
    pub date: Option<String>,
}

impl TransactionPatch {
    pub fn apply(&self, transaction: &mut Transaction) {
        if let Some(description) = &self.description {
            transaction.description = description.clone();
        }
        if let Some(amount) = self.amount {
            transaction.amount = amount;
        }
        if let Some(category) = &self.category {
            transaction.category = category.clone();
        }
        if let Some(date) = &self.date {
            transaction.date = date.clone();
        }
        transaction.updated_at = Utc::now();
    }
}
