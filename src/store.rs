//! The persistent store: sole owner and writer of the record.
//!
//! Loading never fails — a missing or corrupt record falls back to the
//! compiled-in defaults with a diagnostic. Every mutation persists through
//! the backend before it returns.

use chrono::Utc;
use uuid::Uuid;

use crate::{
    currency::{Currency, RateTable},
    errors::StoreError,
    record::{
        is_default_category, PersistedRecord, Settings, SettingsPatch, Transaction,
        TransactionDraft, TransactionPatch,
    },
    storage::StorageBackend,
    validation,
};

pub type Result<T> = std::result::Result<T, StoreError>;

pub struct Store {
    backend: Box<dyn StorageBackend>,
    record: PersistedRecord,
}

impl Store {
    /// Opens the store, loading the persisted record or materializing the
    /// default one on first access.
    pub fn open(backend: Box<dyn StorageBackend>) -> Self {
        let (record, first_run) = load_record(backend.as_ref());
        let mut store = Self { backend, record };
        if first_run {
            if let Err(err) = store.save() {
                tracing::warn!("could not persist initial record: {err}");
            }
        }
        store
    }

    /// The current record. Reflects every mutation already persisted.
    pub fn record(&self) -> &PersistedRecord {
        &self.record
    }

    /// Reloads from the backend, discarding the in-memory record. Falls back
    /// to defaults on any read or parse failure.
    pub fn reload(&mut self) -> &PersistedRecord {
        let (record, _) = load_record(self.backend.as_ref());
        self.record = record;
        &self.record
    }

    /// Persists the current record, refreshing `lastUpdated` first.
    pub fn save(&mut self) -> Result<()> {
        self.record.last_updated = Utc::now();
        let json = serde_json::to_string_pretty(&self.record)?;
        self.backend.write(&json)
    }

    /// Persists, restoring `backup` if the write fails so the in-memory
    /// record never diverges from the backing store.
    fn persist_or_rollback(&mut self, backup: PersistedRecord) -> Result<()> {
        match self.save() {
            Ok(()) => Ok(()),
            Err(err) => {
                self.record = backup;
                Err(err)
            }
        }
    }

    pub fn list_transactions(&self) -> &[Transaction] {
        &self.record.transactions
    }

    pub fn get_transaction(&self, id: Uuid) -> Option<&Transaction> {
        self.record.transactions.iter().find(|txn| txn.id == id)
    }

    /// Adds a transaction from a draft, assigning identity and timestamps.
    /// New entries are prepended; display order is derived elsewhere.
    pub fn add_transaction(&mut self, draft: TransactionDraft) -> Result<Uuid> {
        let backup = self.record.clone();
        let transaction = Transaction::from_draft(draft);
        let id = transaction.id;
        self.record.transactions.insert(0, transaction);
        self.persist_or_rollback(backup)?;
        tracing::debug!(%id, "transaction added");
        Ok(id)
    }

    pub fn update_transaction(&mut self, id: Uuid, patch: &TransactionPatch) -> Result<()> {
        if self.get_transaction(id).is_none() {
            return Err(StoreError::NotFound(format!("transaction {id}")));
        }
        let backup = self.record.clone();
        if let Some(transaction) = self.record.transactions.iter_mut().find(|txn| txn.id == id) {
            patch.apply(transaction);
        }
        self.persist_or_rollback(backup)
    }

    pub fn delete_transaction(&mut self, id: Uuid) -> Result<()> {
        let index = self
            .record
            .transactions
            .iter()
            .position(|txn| txn.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("transaction {id}")))?;
        let backup = self.record.clone();
        self.record.transactions.remove(index);
        self.persist_or_rollback(backup)
    }

    /// Empties the transaction list; settings are untouched.
    pub fn clear_transactions(&mut self) -> Result<()> {
        let backup = self.record.clone();
        self.record.transactions.clear();
        self.persist_or_rollback(backup)
    }

    pub fn settings(&self) -> &Settings {
        &self.record.settings
    }

    /// Merges `patch` over the current settings. Changing the currency first
    /// rewrites every transaction amount and the monthly budget in place,
    /// using the rate table in effect at the time of the change (rate fields
    /// carried in the patch take effect for the conversion). The rewrite and
    /// the settings merge persist as one write, so no observer ever sees a
    /// record converted halfway.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<()> {
        let backup = self.record.clone();
        if let Some(new_currency) = patch.currency {
            let current = self.record.settings.currency;
            if new_currency != current {
                let rates = RateTable::new(
                    patch.usd_to_rwf.unwrap_or(self.record.settings.usd_to_rwf),
                    patch.eur_to_rwf.unwrap_or(self.record.settings.eur_to_rwf),
                );
                let now = Utc::now();
                for transaction in &mut self.record.transactions {
                    transaction.amount = rates.convert(transaction.amount, current, new_currency);
                    transaction.updated_at = now;
                }
                if let Some(budget) = self.record.settings.monthly_budget {
                    self.record.settings.monthly_budget =
                        Some(rates.convert(budget, current, new_currency));
                }
                tracing::debug!(from = %current, to = %new_currency, "currency rewrite applied");
            }
        }
        patch.apply(&mut self.record.settings);
        self.persist_or_rollback(backup)
    }

    /// Default categories plus custom ones from settings, duplicates
    /// collapsed case-insensitively, first spelling wins.
    pub fn categories(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        let defaults = crate::record::DEFAULT_CATEGORIES
            .iter()
            .map(|name| name.to_string());
        for name in defaults.chain(self.record.settings.categories.iter().cloned()) {
            if !seen.iter().any(|known| known.eq_ignore_ascii_case(&name)) {
                seen.push(name);
            }
        }
        seen
    }

    pub fn add_category(&mut self, name: &str) -> Result<()> {
        let name = name.trim();
        validation::validate_category(name).map_err(|err| StoreError::Invalid(err.to_string()))?;
        if self
            .categories()
            .iter()
            .any(|known| known.eq_ignore_ascii_case(name))
        {
            return Err(StoreError::Invalid(format!(
                "category `{name}` already exists"
            )));
        }
        let mut categories = self.record.settings.categories.clone();
        categories.push(name.to_string());
        self.update_settings(&SettingsPatch {
            categories: Some(categories),
            ..Default::default()
        })
    }

    pub fn delete_category(&mut self, name: &str) -> Result<()> {
        if is_default_category(name) {
            return Err(StoreError::Invalid(format!(
                "`{name}` is a default category and cannot be removed"
            )));
        }
        let index = self
            .record
            .settings
            .categories
            .iter()
            .position(|known| known.eq_ignore_ascii_case(name))
            .ok_or_else(|| StoreError::NotFound(format!("category `{name}`")))?;
        let mut categories = self.record.settings.categories.clone();
        categories.remove(index);
        self.update_settings(&SettingsPatch {
            categories: Some(categories),
            ..Default::default()
        })
    }

    /// Pretty-printed dump of the whole record.
    pub fn export_record(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.record)?)
    }

    /// Parses `text` with the same merge-over-defaults semantics as loading.
    /// Malformed input is rejected wholesale without touching persisted
    /// state; on success the merged record replaces the current one and is
    /// persisted.
    pub fn import_record(&mut self, text: &str) -> Result<PersistedRecord> {
        let record: PersistedRecord = serde_json::from_str(text)
            .map_err(|err| StoreError::Invalid(format!("import rejected: {err}")))?;
        let backup = std::mem::replace(&mut self.record, record);
        self.persist_or_rollback(backup)?;
        Ok(self.record.clone())
    }

    /// Converts through the base currency with the live rate table.
    pub fn convert(&self, amount: f64, from: Currency, to: Currency) -> f64 {
        self.rate_table().convert(amount, from, to)
    }

    pub fn rate_table(&self) -> RateTable {
        RateTable::new(
            self.record.settings.usd_to_rwf,
            self.record.settings.eur_to_rwf,
        )
    }
}

fn load_record(backend: &dyn StorageBackend) -> (PersistedRecord, bool) {
    match backend.read() {
        Ok(Some(raw)) => match serde_json::from_str(&raw) {
            Ok(record) => (record, false),
            Err(err) => {
                tracing::warn!("persisted record is corrupt, using defaults: {err}");
                (PersistedRecord::default(), false)
            }
        },
        Ok(None) => (PersistedRecord::default(), true),
        Err(err) => {
            tracing::warn!("could not read persisted record, using defaults: {err}");
            (PersistedRecord::default(), false)
        }
    }
}
