//! Pure search, sort, and aggregation over a caller-supplied transaction
//! list. Nothing here touches persistence.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{Duration, Local, NaiveDate};

use crate::{record::Transaction, validation};

/// Filter/sort/limit parameters for [`search`].
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Pattern matched case-insensitively against description and category.
    /// Empty means no filtering; an invalid pattern yields no results.
    pub query: String,
    /// Exact category filter, case-insensitive. `None` or empty means all.
    pub category: Option<String>,
    /// Sort spec in `field-asc` / `field-desc` form.
    pub sort_by: String,
    pub limit: Option<usize>,
}

/// Sortable fields. Unknown field names fall back to description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Date,
    Amount,
    Category,
    Description,
}

/// Parsed `field-direction` sort spec. Malformed or missing direction
/// defaults to descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: SortField,
    pub ascending: bool,
}

impl SortSpec {
    pub fn parse(raw: &str) -> Self {
        let (field, direction) = match raw.rsplit_once('-') {
            Some((field, direction)) => (field, Some(direction)),
            None => (raw, None),
        };
        let ascending = matches!(direction, Some(d) if d.eq_ignore_ascii_case("asc"));
        let field = match field.to_ascii_lowercase().as_str() {
            "date" => SortField::Date,
            "amount" => SortField::Amount,
            "category" => SortField::Category,
            _ => SortField::Description,
        };
        Self { field, ascending }
    }

    fn compare(&self, a: &Transaction, b: &Transaction) -> std::cmp::Ordering {
        let ordering = match self.field {
            SortField::Date => parse_date(&a.date).cmp(&parse_date(&b.date)),
            SortField::Amount => a
                .amount
                .partial_cmp(&b.amount)
                .unwrap_or(std::cmp::Ordering::Equal),
            SortField::Category => a
                .category
                .to_lowercase()
                .cmp(&b.category.to_lowercase()),
            SortField::Description => a
                .description
                .to_lowercase()
                .cmp(&b.description.to_lowercase()),
        };
        if self.ascending {
            ordering
        } else {
            ordering.reverse()
        }
    }
}

/// Filters by category and pattern, sorts, and truncates. An invalid or
/// oversized pattern fails closed: the result is empty, never unfiltered.
pub fn search(transactions: &[Transaction], options: &SearchOptions) -> Vec<Transaction> {
    let mut rows: Vec<Transaction> = transactions.to_vec();
    if let Some(category) = options
        .category
        .as_deref()
        .filter(|category| !category.is_empty())
    {
        rows.retain(|txn| txn.category.eq_ignore_ascii_case(category));
    }
    let pattern = options.query.trim();
    if !pattern.is_empty() {
        match validation::compile_search_pattern(pattern) {
            Ok(Some(re)) => {
                rows.retain(|txn| re.is_match(&txn.description) || re.is_match(&txn.category))
            }
            Ok(None) => {}
            Err(_) => return Vec::new(),
        }
    }
    let mut rows = sort_owned(rows, &options.sort_by);
    if let Some(limit) = options.limit {
        rows.truncate(limit);
    }
    rows
}

/// Stable multi-field sort; equal keys keep their original relative order.
pub fn sort(transactions: &[Transaction], sort_by: &str) -> Vec<Transaction> {
    sort_owned(transactions.to_vec(), sort_by)
}

fn sort_owned(mut rows: Vec<Transaction>, sort_by: &str) -> Vec<Transaction> {
    let spec = SortSpec::parse(sort_by);
    rows.sort_by(|a, b| spec.compare(a, b));
    rows
}

/// Distinct categories present in the list, sorted.
pub fn unique_categories(transactions: &[Transaction]) -> BTreeSet<String> {
    transactions
        .iter()
        .map(|txn| txn.category.clone())
        .collect()
}

/// Sum of amounts; non-finite values count as zero.
pub fn total(transactions: &[Transaction]) -> f64 {
    transactions
        .iter()
        .map(|txn| if txn.amount.is_finite() { txn.amount } else { 0.0 })
        .sum()
}

/// Per-category totals with each category's share of the grand total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CategorySummary {
    pub totals: BTreeMap<String, f64>,
    /// Percent of the grand total per category, present only when the grand
    /// total is positive.
    pub percentages: BTreeMap<String, f64>,
    pub total_amount: f64,
}

pub fn category_summary(transactions: &[Transaction]) -> CategorySummary {
    let mut totals: BTreeMap<String, f64> = BTreeMap::new();
    for txn in transactions {
        *totals.entry(txn.category.clone()).or_insert(0.0) += txn.amount;
    }
    let total_amount = total(transactions);
    let mut percentages = BTreeMap::new();
    if total_amount > 0.0 {
        for (category, sum) in &totals {
            percentages.insert(
                category.clone(),
                crate::currency::round2(sum / total_amount * 100.0),
            );
        }
    }
    CategorySummary {
        totals,
        percentages,
        total_amount,
    }
}

/// Transactions dated within `[start, end]`, both ends inclusive.
/// Unparseable dates are excluded.
pub fn by_date_range(
    transactions: &[Transaction],
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|txn| match parse_date(&txn.date) {
            Some(date) => date >= start && date <= end,
            None => false,
        })
        .cloned()
        .collect()
}

/// Transactions from the trailing `days` window, anchored on the local
/// calendar day.
pub fn recent(transactions: &[Transaction], days: i64) -> Vec<Transaction> {
    let today = Local::now().date_naive();
    by_date_range(transactions, today - Duration::days(days), today)
}

/// Sums keyed by `YYYY-MM`. Transactions with unparseable dates are
/// silently skipped.
pub fn monthly_summary(transactions: &[Transaction]) -> BTreeMap<String, f64> {
    let mut months: BTreeMap<String, f64> = BTreeMap::new();
    for txn in transactions {
        if let Some(date) = parse_date(&txn.date) {
            *months.entry(date.format("%Y-%m").to_string()).or_insert(0.0) += txn.amount;
        }
    }
    months
}

/// The category with the strictly greatest summed amount. Ties keep the
/// category encountered first; an empty list yields `{None, 0}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TopCategory {
    pub category: Option<String>,
    pub amount: f64,
}

pub fn top_category(transactions: &[Transaction]) -> TopCategory {
    let mut sums: HashMap<&str, f64> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();
    for txn in transactions {
        let entry = sums.entry(txn.category.as_str()).or_insert_with(|| {
            order.push(txn.category.as_str());
            0.0
        });
        *entry += txn.amount;
    }
    let mut top = TopCategory::default();
    for category in order {
        let amount = sums[category];
        if top.category.is_none() || amount > top.amount {
            top = TopCategory {
                category: Some(category.to_string()),
                amount,
            };
        }
    }
    top
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::TransactionDraft;

    fn txn(description: &str, amount: f64, category: &str, date: &str) -> Transaction {
        Transaction::from_draft(TransactionDraft {
            description: description.into(),
            amount,
            category: category.into(),
            date: Some(date.into()),
        })
    }

    fn sample() -> Vec<Transaction> {
        vec![
            txn("Groceries", -10.0, "Food", "2024-04-01"),
            txn("Salary", 5.0, "Other", "2024-04-02"),
            txn("Bus card", -10.0, "Transport", "2024-04-03"),
            txn("Freelance", 20.0, "Other", "2024-04-04"),
        ]
    }

    #[test]
    fn sort_amount_asc_is_stable_for_ties() {
        let sorted = sort(&sample(), "amount-asc");
        let amounts: Vec<f64> = sorted.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![-10.0, -10.0, 5.0, 20.0]);
        // The two -10 entries keep their original relative order.
        assert_eq!(sorted[0].description, "Groceries");
        assert_eq!(sorted[1].description, "Bus card");
    }

    #[test]
    fn sort_defaults_to_descending() {
        let sorted = sort(&sample(), "date");
        assert_eq!(sorted[0].date, "2024-04-04");
        let sorted = sort(&sample(), "date-sideways");
        assert_eq!(sorted[0].date, "2024-04-04");
    }

    #[test]
    fn unknown_sort_field_falls_back_to_description() {
        let sorted = sort(&sample(), "nonsense-asc");
        assert_eq!(sorted[0].description, "Bus card");
    }

    #[test]
    fn search_matches_description_or_category_case_insensitively() {
        let rows = search(
            &sample(),
            &SearchOptions {
                query: "FOOD".into(),
                ..Default::default()
            },
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].description, "Groceries");
    }

    #[test]
    fn search_invalid_pattern_fails_closed() {
        let rows = search(
            &sample(),
            &SearchOptions {
                query: "(".into(),
                ..Default::default()
            },
        );
        assert!(rows.is_empty());
    }

    #[test]
    fn search_category_filter_is_exact() {
        let rows = search(
            &sample(),
            &SearchOptions {
                category: Some("other".into()),
                sort_by: "amount-asc".into(),
                ..Default::default()
            },
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].description, "Salary");
    }

    #[test]
    fn search_applies_limit_after_sort() {
        let rows = search(
            &sample(),
            &SearchOptions {
                sort_by: "amount-desc".into(),
                limit: Some(1),
                ..Default::default()
            },
        );
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].amount, 20.0);
    }

    #[test]
    fn empty_list_aggregates() {
        assert_eq!(total(&[]), 0.0);
        assert_eq!(category_summary(&[]), CategorySummary::default());
        assert_eq!(
            top_category(&[]),
            TopCategory {
                category: None,
                amount: 0.0
            }
        );
    }

    #[test]
    fn category_summary_percentages_only_for_positive_total() {
        let summary = category_summary(&sample());
        assert_eq!(summary.total_amount, 5.0);
        assert_eq!(summary.totals["Other"], 25.0);
        assert!(!summary.percentages.is_empty());

        let expenses = vec![txn("Only expense", -10.0, "Food", "2024-04-01")];
        let summary = category_summary(&expenses);
        assert_eq!(summary.total_amount, -10.0);
        assert!(summary.percentages.is_empty());
    }

    #[test]
    fn top_category_ties_keep_first_encountered() {
        let rows = vec![
            txn("A", 10.0, "Food", "2024-04-01"),
            txn("B", 10.0, "Transport", "2024-04-02"),
        ];
        let top = top_category(&rows);
        assert_eq!(top.category.as_deref(), Some("Food"));
        assert_eq!(top.amount, 10.0);
    }

    #[test]
    fn date_range_is_inclusive_and_skips_bad_dates() {
        let mut rows = sample();
        rows.push(txn("No date", -1.0, "Other", "not-a-date"));
        let start = NaiveDate::from_ymd_opt(2024, 4, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 4, 3).unwrap();
        let hits = by_date_range(&rows, start, end);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].description, "Salary");
        assert_eq!(hits[1].description, "Bus card");
    }

    #[test]
    fn monthly_summary_groups_and_skips_unparseable() {
        let mut rows = sample();
        rows.push(txn("Old rent", -100.0, "Housing", "2024-03-01"));
        rows.push(txn("Bad date", -50.0, "Housing", "2024-13-01"));
        let months = monthly_summary(&rows);
        assert_eq!(months["2024-04"], 5.0);
        assert_eq!(months["2024-03"], -100.0);
        assert_eq!(months.len(), 2);
    }

    #[test]
    fn unique_categories_are_sorted_distinct() {
        let categories = unique_categories(&sample());
        let list: Vec<&String> = categories.iter().collect();
        assert_eq!(list.len(), 3);
        assert_eq!(list[0], "Food");
    }
}
