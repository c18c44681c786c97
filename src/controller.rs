//! The application state controller: a single owned snapshot, a command API,
//! and synchronous subscriber notification.
//!
//! Every command updates the snapshot atomically and then broadcasts the
//! complete snapshot; subscribers never observe a half-applied mutation.
//! Commands require `&mut Controller` while callbacks only receive
//! `&Snapshot`, so a subscriber cannot re-enter a mutating command while a
//! broadcast is in flight.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Local, NaiveDate};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    errors::StoreError,
    export,
    query::{self, CategorySummary, SearchOptions, TopCategory},
    record::{
        PersistedRecord, Settings, SettingsPatch, Transaction, TransactionDraft, TransactionPatch,
    },
    store::Store,
};

/// Trailing window used by the dashboard, in days.
const RECENT_WINDOW_DAYS: i64 = 30;

const DEFAULT_SORT: &str = "date-desc";

/// UI navigation targets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Section {
    #[default]
    Dashboard,
    Transactions,
    Reports,
    Settings,
}

/// Complete controller state, delivered to subscribers on every change.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub section: Section,
    pub loading: bool,
    pub error: Option<String>,
    pub transactions: Vec<Transaction>,
    /// Derived view of `transactions` under the current query, category
    /// filter, and sort spec.
    pub filtered: Vec<Transaction>,
    pub categories: Vec<String>,
    pub settings: Settings,
    pub search_query: String,
    pub selected_category: Option<String>,
    pub sort_by: String,
    /// Transaction being edited, when the edit form is open.
    pub editing: Option<Uuid>,
    pub current_page: usize,
}

/// Read-only dashboard aggregates, computed on demand.
#[derive(Debug, Clone)]
pub struct DashboardStats {
    pub recent: Vec<Transaction>,
    pub total: f64,
    pub categories: CategorySummary,
    pub monthly: BTreeMap<String, f64>,
    pub top_category: TopCategory,
}

/// Command failures, already phrased for direct display.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    Rejected(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type CommandResult<T = ()> = Result<T, CommandError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn Fn(&Snapshot)>;

pub struct Controller {
    store: Store,
    snapshot: Snapshot,
    subscribers: HashMap<SubscriptionId, Subscriber>,
    next_subscription: u64,
}

impl Controller {
    pub fn new(store: Store) -> Self {
        let record = store.record();
        let transactions = record.transactions.clone();
        let settings = record.settings.clone();
        let mut controller = Self {
            snapshot: Snapshot {
                section: Section::default(),
                loading: false,
                error: None,
                transactions,
                filtered: Vec::new(),
                categories: store.categories(),
                settings,
                search_query: String::new(),
                selected_category: None,
                sort_by: DEFAULT_SORT.to_string(),
                editing: None,
                current_page: 1,
            },
            store,
            subscribers: HashMap::new(),
            next_subscription: 0,
        };
        controller.snapshot.filtered = controller.filtered_view();
        controller
    }

    /// Registers a callback invoked with the full snapshot after every
    /// change. Returns a handle for [`Controller::unsubscribe`].
    pub fn subscribe(&mut self, callback: impl Fn(&Snapshot) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.insert(id, Box::new(callback));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.remove(&id);
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    /// Sets the current section and unconditionally leaves editing mode;
    /// navigating away from the edit form is an implicit cancel.
    pub fn navigate_to(&mut self, section: Section) {
        self.snapshot.section = section;
        self.snapshot.editing = None;
        self.notify();
    }

    pub fn start_editing(&mut self, id: Uuid) -> CommandResult {
        if self.store.get_transaction(id).is_none() {
            return Err(self.fail(format!("transaction {id} no longer exists")));
        }
        self.snapshot.editing = Some(id);
        self.snapshot.error = None;
        self.notify();
        Ok(())
    }

    pub fn cancel_editing(&mut self) {
        self.snapshot.editing = None;
        self.notify();
    }

    /// Adds a transaction after the monthly-budget check. A draft that would
    /// push the calendar month past the budget is rejected outright with a
    /// message stating budget, spend, headroom, and overage.
    pub fn add_transaction(&mut self, draft: TransactionDraft) -> CommandResult {
        if let Some(message) = self.budget_violation(&draft) {
            return Err(self.fail(message));
        }
        match self.store.add_transaction(draft) {
            Ok(_) => {
                self.refresh_transactions();
                Ok(())
            }
            Err(err) => Err(self.fail(format!("could not save transaction: {err}"))),
        }
    }

    pub fn update_transaction(&mut self, id: Uuid, patch: &TransactionPatch) -> CommandResult {
        match self.store.update_transaction(id, patch) {
            Ok(()) => {
                self.snapshot.editing = None;
                self.refresh_transactions();
                Ok(())
            }
            Err(err) => Err(self.fail(format!("could not update transaction: {err}"))),
        }
    }

    pub fn delete_transaction(&mut self, id: Uuid) -> CommandResult {
        match self.store.delete_transaction(id) {
            Ok(()) => {
                self.refresh_transactions();
                Ok(())
            }
            Err(err) => Err(self.fail(format!("could not delete transaction: {err}"))),
        }
    }

    /// Updates the search query, resets pagination, and re-derives the view.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        self.snapshot.search_query = query.into();
        self.snapshot.current_page = 1;
        self.refilter();
    }

    /// Updates the category filter, resets pagination, and re-derives the
    /// view.
    pub fn set_selected_category(&mut self, category: Option<String>) {
        self.snapshot.selected_category = category;
        self.snapshot.current_page = 1;
        self.refilter();
    }

    /// Updates the sort spec and re-derives the view. The current page is
    /// preserved.
    pub fn set_sort_by(&mut self, sort_by: impl Into<String>) {
        self.snapshot.sort_by = sort_by.into();
        self.refilter();
    }

    pub fn set_page(&mut self, page: usize) {
        self.snapshot.current_page = page.max(1);
        self.notify();
    }

    pub fn add_category(&mut self, name: &str) -> CommandResult {
        match self.store.add_category(name) {
            Ok(()) => {
                self.refresh_categories();
                Ok(())
            }
            Err(err) => Err(self.fail(err.to_string())),
        }
    }

    pub fn delete_category(&mut self, name: &str) -> CommandResult {
        match self.store.delete_category(name) {
            Ok(()) => {
                self.refresh_categories();
                Ok(())
            }
            Err(err) => Err(self.fail(err.to_string())),
        }
    }

    /// Applies a settings patch; a currency change rewrites every amount in
    /// the store, so transactions are refreshed along with the settings and
    /// broadcast in a single notification.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> CommandResult {
        match self.store.update_settings(patch) {
            Ok(()) => {
                self.snapshot.settings = self.store.settings().clone();
                self.snapshot.categories = self.store.categories();
                self.snapshot.transactions = self.store.list_transactions().to_vec();
                self.snapshot.filtered = self.filtered_view();
                self.snapshot.error = None;
                self.notify();
                Ok(())
            }
            Err(err) => Err(self.fail(format!("could not update settings: {err}"))),
        }
    }

    pub fn export_all(&self) -> CommandResult<String> {
        Ok(self.store.export_record()?)
    }

    /// Renders the current filtered view as CSV.
    pub fn export_csv(&self) -> CommandResult<String> {
        Ok(export::to_csv(&self.snapshot.filtered)?)
    }

    /// Imports a full record dump. On success the entire snapshot is
    /// refreshed; on failure the snapshot only gains an error message.
    pub fn import_all(&mut self, text: &str) -> CommandResult<PersistedRecord> {
        match self.store.import_record(text) {
            Ok(record) => {
                self.snapshot.settings = record.settings.clone();
                self.snapshot.categories = self.store.categories();
                self.snapshot.transactions = record.transactions.clone();
                self.snapshot.filtered = self.filtered_view();
                self.snapshot.editing = None;
                self.snapshot.error = None;
                self.notify();
                Ok(record)
            }
            Err(err) => Err(self.fail(err.to_string())),
        }
    }

    pub fn clear_all_transactions(&mut self) -> CommandResult {
        match self.store.clear_transactions() {
            Ok(()) => {
                self.refresh_transactions();
                Ok(())
            }
            Err(err) => Err(self.fail(format!("could not clear transactions: {err}"))),
        }
    }

    /// Derived dashboard aggregates; not part of the persisted snapshot.
    pub fn dashboard_stats(&self) -> DashboardStats {
        let transactions = &self.snapshot.transactions;
        DashboardStats {
            recent: query::recent(transactions, RECENT_WINDOW_DAYS),
            total: query::total(transactions),
            categories: query::category_summary(transactions),
            monthly: query::monthly_summary(transactions),
            top_category: query::top_category(transactions),
        }
    }

    /// Checks a draft against the monthly budget: the sum of the draft
    /// month's existing amounts plus the new amount must not exceed it.
    /// Edits of existing transactions are exempt.
    fn budget_violation(&self, draft: &TransactionDraft) -> Option<String> {
        let budget = self.snapshot.settings.monthly_budget?;
        let month = match &draft.date {
            Some(date) => parse_month(date)?,
            None => {
                let today = Local::now().date_naive();
                (today.year(), today.month())
            }
        };
        let spent: f64 = self
            .snapshot
            .transactions
            .iter()
            .filter(|txn| parse_month(&txn.date) == Some(month))
            .map(|txn| txn.amount)
            .sum();
        let projected = spent + draft.amount;
        if projected <= budget {
            return None;
        }
        let remaining = (budget - spent).max(0.0);
        let overage = projected - budget;
        Some(format!(
            "monthly budget of {budget:.2} would be exceeded: {spent:.2} already spent, \
             {remaining:.2} remaining, over by {overage:.2}"
        ))
    }

    fn filtered_view(&self) -> Vec<Transaction> {
        query::search(
            &self.snapshot.transactions,
            &SearchOptions {
                query: self.snapshot.search_query.clone(),
                category: self.snapshot.selected_category.clone(),
                sort_by: self.snapshot.sort_by.clone(),
                limit: None,
            },
        )
    }

    fn refilter(&mut self) {
        self.snapshot.filtered = self.filtered_view();
        self.notify();
    }

    fn refresh_transactions(&mut self) {
        self.snapshot.transactions = self.store.list_transactions().to_vec();
        self.snapshot.filtered = self.filtered_view();
        self.snapshot.error = None;
        self.notify();
    }

    fn refresh_categories(&mut self) {
        self.snapshot.categories = self.store.categories();
        self.snapshot.settings = self.store.settings().clone();
        self.snapshot.error = None;
        self.notify();
    }

    /// Records a user-facing failure message on the snapshot without
    /// touching the data it carries, then broadcasts.
    fn fail(&mut self, message: String) -> CommandError {
        self.snapshot.error = Some(message.clone());
        self.notify();
        CommandError::Rejected(message)
    }

    fn notify(&self) {
        for callback in self.subscribers.values() {
            callback(&self.snapshot);
        }
    }
}

fn parse_month(date: &str) -> Option<(i32, u32)> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .map(|d| (d.year(), d.month()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;

    fn controller() -> Controller {
        Controller::new(Store::open(Box::new(MemoryStorage::new())))
    }

    fn draft(description: &str, amount: f64, category: &str, date: &str) -> TransactionDraft {
        TransactionDraft {
            description: description.into(),
            amount,
            category: category.into(),
            date: Some(date.into()),
        }
    }

    #[test]
    fn navigation_cancels_editing() {
        let mut app = controller();
        app.add_transaction(draft("Rent", -300.0, "Housing", "2024-05-01"))
            .unwrap();
        let id = app.snapshot().transactions[0].id;
        app.start_editing(id).unwrap();
        assert_eq!(app.snapshot().editing, Some(id));
        app.navigate_to(Section::Reports);
        assert_eq!(app.snapshot().editing, None);
        assert_eq!(app.snapshot().section, Section::Reports);
    }

    #[test]
    fn editing_a_missing_transaction_fails() {
        let mut app = controller();
        assert!(app.start_editing(Uuid::new_v4()).is_err());
        assert!(app.snapshot().error.is_some());
        assert_eq!(app.snapshot().editing, None);
    }

    #[test]
    fn search_and_category_changes_reset_page_sort_does_not() {
        let mut app = controller();
        app.set_page(4);
        app.set_sort_by("amount-asc");
        assert_eq!(app.snapshot().current_page, 4);
        app.set_search_query("rent");
        assert_eq!(app.snapshot().current_page, 1);
        app.set_page(3);
        app.set_selected_category(Some("Food".into()));
        assert_eq!(app.snapshot().current_page, 1);
    }

    #[test]
    fn budget_rejection_reports_overage() {
        let mut app = controller();
        app.update_settings(&SettingsPatch {
            monthly_budget: Some(Some(100.0)),
            ..Default::default()
        })
        .unwrap();
        app.add_transaction(draft("Groceries", 80.0, "Food", "2024-05-03"))
            .unwrap();

        let err = app
            .add_transaction(draft("Shoes", 30.0, "Shopping", "2024-05-10"))
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("100.00"), "{message}");
        assert!(message.contains("80.00"), "{message}");
        assert!(message.contains("20.00"), "{message}");
        assert!(message.contains("10.00"), "{message}");
        assert_eq!(app.snapshot().transactions.len(), 1);

        app.add_transaction(draft("Books", 20.0, "Education", "2024-05-12"))
            .unwrap();
        assert_eq!(app.snapshot().transactions.len(), 2);
    }

    #[test]
    fn budget_check_ignores_other_months_and_edits() {
        let mut app = controller();
        app.update_settings(&SettingsPatch {
            monthly_budget: Some(Some(50.0)),
            ..Default::default()
        })
        .unwrap();
        app.add_transaction(draft("May spend", 50.0, "Food", "2024-05-01"))
            .unwrap();
        // Different month: not counted against May.
        app.add_transaction(draft("June spend", 40.0, "Food", "2024-06-01"))
            .unwrap();

        let id = app.snapshot().transactions[0].id;
        let patch = TransactionPatch {
            amount: Some(60.0),
            ..Default::default()
        };
        // Edits bypass the budget check.
        app.update_transaction(id, &patch).unwrap();
    }

    #[test]
    fn subscribers_get_full_snapshots_and_can_unsubscribe() {
        use std::cell::RefCell;
        use std::rc::Rc;

        let mut app = controller();
        let seen: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = app.subscribe(move |snapshot: &Snapshot| {
            sink.borrow_mut().push(snapshot.transactions.len());
        });

        app.add_transaction(draft("One", -1.0, "Other", "2024-05-01"))
            .unwrap();
        app.add_transaction(draft("Two", -2.0, "Other", "2024-05-02"))
            .unwrap();
        assert_eq!(*seen.borrow(), vec![1, 2]);

        app.unsubscribe(id);
        app.add_transaction(draft("Three", -3.0, "Other", "2024-05-03"))
            .unwrap();
        assert_eq!(seen.borrow().len(), 2);
    }

    #[test]
    fn failed_command_keeps_previous_data_and_sets_error() {
        let mut app = controller();
        app.add_transaction(draft("Kept", -5.0, "Food", "2024-05-01"))
            .unwrap();
        let before = app.snapshot().transactions.clone();

        assert!(app.delete_transaction(Uuid::new_v4()).is_err());
        assert_eq!(app.snapshot().transactions, before);
        assert!(app.snapshot().error.is_some());

        // The next successful command clears the error.
        app.set_search_query("");
        app.add_transaction(draft("Next", -1.0, "Food", "2024-05-02"))
            .unwrap();
        assert_eq!(app.snapshot().error, None);
    }

    #[test]
    fn filtered_view_tracks_selections() {
        let mut app = controller();
        app.add_transaction(draft("Groceries", -10.0, "Food", "2024-05-01"))
            .unwrap();
        app.add_transaction(draft("Bus", -2.0, "Transport", "2024-05-02"))
            .unwrap();

        app.set_selected_category(Some("food".into()));
        assert_eq!(app.snapshot().filtered.len(), 1);
        assert_eq!(app.snapshot().filtered[0].description, "Groceries");

        app.set_selected_category(None);
        app.set_search_query("(");
        assert!(app.snapshot().filtered.is_empty());
        assert_eq!(app.snapshot().transactions.len(), 2);
    }

    #[test]
    fn import_refreshes_everything_or_nothing() {
        let mut source = controller();
        source
            .add_transaction(draft("Rent", -300.0, "Housing", "2024-05-01"))
            .unwrap();
        let dump = source.export_all().unwrap();

        let mut app = controller();
        app.add_transaction(draft("Old", -1.0, "Other", "2024-05-02"))
            .unwrap();

        assert!(app.import_all("{ nope").is_err());
        assert_eq!(app.snapshot().transactions.len(), 1);
        assert!(app.snapshot().error.is_some());

        app.import_all(&dump).unwrap();
        assert_eq!(app.snapshot().transactions.len(), 1);
        assert_eq!(app.snapshot().transactions[0].description, "Rent");
        assert_eq!(app.snapshot().error, None);
    }

    #[test]
    fn currency_change_is_broadcast_as_one_consistent_snapshot() {
        use std::cell::RefCell;
        use std::rc::Rc;
        use crate::currency::Currency;

        let mut app = controller();
        app.update_settings(&SettingsPatch {
            currency: Some(Currency::Usd),
            monthly_budget: Some(Some(200.0)),
            ..Default::default()
        })
        .unwrap();
        app.add_transaction(draft("Salary", 100.0, "Other", "2024-05-01"))
            .unwrap();

        let observed: Rc<RefCell<Vec<(Currency, f64, Option<f64>)>>> =
            Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&observed);
        app.subscribe(move |snapshot: &Snapshot| {
            sink.borrow_mut().push((
                snapshot.settings.currency,
                snapshot.transactions[0].amount,
                snapshot.settings.monthly_budget,
            ));
        });

        app.update_settings(&SettingsPatch::currency(Currency::Rwf))
            .unwrap();

        let observed = observed.borrow();
        assert_eq!(observed.len(), 1);
        let (currency, amount, budget) = observed[0];
        assert_eq!(currency, Currency::Rwf);
        assert!((amount - 145_249.0).abs() < 0.01);
        assert!((budget.unwrap() - 290_498.0).abs() < 0.01);
    }

    #[test]
    fn dashboard_stats_reflect_current_transactions() {
        let mut app = controller();
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        app.add_transaction(draft("Recent", -10.0, "Food", &today))
            .unwrap();
        app.add_transaction(draft("Ancient", 100.0, "Other", "2000-01-01"))
            .unwrap();

        let stats = app.dashboard_stats();
        assert_eq!(stats.recent.len(), 1);
        assert_eq!(stats.total, 90.0);
        assert_eq!(stats.top_category.category.as_deref(), Some("Other"));
        assert!(stats.monthly.contains_key("2000-01"));
    }

    #[test]
    fn clear_all_keeps_settings() {
        let mut app = controller();
        app.update_settings(&SettingsPatch {
            monthly_budget: Some(Some(75.0)),
            ..Default::default()
        })
        .unwrap();
        app.add_transaction(draft("Gone", 10.0, "Food", "2024-05-01"))
            .unwrap();
        app.clear_all_transactions().unwrap();
        assert!(app.snapshot().transactions.is_empty());
        assert!(app.snapshot().filtered.is_empty());
        assert_eq!(app.snapshot().settings.monthly_budget, Some(75.0));
    }

    #[test]
    fn csv_export_uses_the_filtered_view() {
        let mut app = controller();
        app.add_transaction(draft("Groceries", -10.0, "Food", "2024-05-01"))
            .unwrap();
        app.add_transaction(draft("Bus", -2.0, "Transport", "2024-05-02"))
            .unwrap();
        app.set_selected_category(Some("Food".into()));

        let csv = app.export_csv().unwrap();
        assert!(csv.contains("Groceries"));
        assert!(!csv.contains("Bus"));
    }
}
