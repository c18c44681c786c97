//! CSV rendering of a transaction list, for collaborator-facing downloads.

use crate::{errors::StoreError, record::Transaction};

/// Renders `Date,Description,Category,Amount` rows in the order given.
/// Fields containing commas, quotes, or newlines are double-quoted with
/// internal quotes doubled (the csv crate's default quoting).
pub fn to_csv(transactions: &[Transaction]) -> Result<String, StoreError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["Date", "Description", "Category", "Amount"])?;
    for txn in transactions {
        writer.write_record([
            txn.date.as_str(),
            txn.description.as_str(),
            txn.category.as_str(),
            &format_amount(txn.amount),
        ])?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|err| StoreError::Storage(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| StoreError::Storage(err.to_string()))
}

fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}
