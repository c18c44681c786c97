//! Field-level predicates for user-supplied transaction input.
//!
//! Each function is stateless and returns a specific, human-readable failure.
//! Nothing here is enforced by the store itself; callers validate before they
//! submit a draft.

use chrono::{Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use thiserror::Error;

/// Upper bound on user-supplied search patterns, in characters.
pub const MAX_SEARCH_PATTERN_LEN: usize = 50;

/// Compiled-size ceiling for untrusted patterns.
const PATTERN_SIZE_LIMIT: usize = 1 << 16;

static CATEGORY_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z]+(?:[ -][A-Za-z]+)*$").unwrap());
static AMOUNT_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[+-]?\d+(?:\.\d+)?$").unwrap());
static DATE_SHAPE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap());

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("description is required")]
    DescriptionRequired,
    #[error("description must not start or end with spaces")]
    DescriptionOuterWhitespace,
    #[error("description must not contain consecutive spaces")]
    DescriptionInnerWhitespace,
    #[error("amount must be a number")]
    AmountNotNumeric,
    #[error("amount must be greater than zero")]
    AmountNotPositive,
    #[error("amount can have at most two decimal places")]
    AmountTooPrecise,
    #[error("category is required")]
    CategoryRequired,
    #[error("category must be letters separated by single spaces or hyphens")]
    CategoryMalformed,
    #[error("date must be in YYYY-MM-DD format")]
    DateMalformed,
    #[error("date is not a real calendar date")]
    DateNotReal,
    #[error("date cannot be in the future")]
    DateInFuture,
    #[error("search pattern cannot exceed 50 characters")]
    PatternTooLong,
    #[error("search pattern is not a valid expression")]
    PatternInvalid,
}

pub fn validate_description(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::DescriptionRequired);
    }
    if value.trim() != value {
        return Err(ValidationError::DescriptionOuterWhitespace);
    }
    let mut previous_blank = false;
    for ch in value.chars() {
        let blank = ch.is_whitespace();
        if blank && previous_blank {
            return Err(ValidationError::DescriptionInnerWhitespace);
        }
        previous_blank = blank;
    }
    Ok(())
}

/// Validates the textual form of an amount. The text is checked rather than a
/// parsed number so that excess precision (`10.999`) can be rejected before
/// float rounding hides it.
pub fn validate_amount(raw: &str) -> Result<(), ValidationError> {
    let raw = raw.trim();
    if !AMOUNT_SHAPE.is_match(raw) {
        return Err(ValidationError::AmountNotNumeric);
    }
    if let Some((_, fraction)) = raw.split_once('.') {
        if fraction.len() > 2 {
            return Err(ValidationError::AmountTooPrecise);
        }
    }
    let value: f64 = raw.parse().map_err(|_| ValidationError::AmountNotNumeric)?;
    if value <= 0.0 {
        return Err(ValidationError::AmountNotPositive);
    }
    Ok(())
}

pub fn validate_category(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::CategoryRequired);
    }
    if !CATEGORY_SHAPE.is_match(value) {
        return Err(ValidationError::CategoryMalformed);
    }
    Ok(())
}

/// Validates a `YYYY-MM-DD` date string. Future dates (relative to the local
/// calendar day) are rejected unless `allow_future` is set.
pub fn validate_date(value: &str, allow_future: bool) -> Result<(), ValidationError> {
    if !DATE_SHAPE.is_match(value) {
        return Err(ValidationError::DateMalformed);
    }
    let date =
        NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| ValidationError::DateNotReal)?;
    if !allow_future && date > Local::now().date_naive() {
        return Err(ValidationError::DateInFuture);
    }
    Ok(())
}

pub fn validate_search_pattern(pattern: &str) -> Result<(), ValidationError> {
    compile_search_pattern(pattern).map(|_| ())
}

/// Compiles an untrusted search pattern case-insensitively. An empty pattern
/// is valid and compiles to `None` (match everything). Oversized or malformed
/// patterns fail; callers treat that as "no matches", never "all matches".
pub fn compile_search_pattern(pattern: &str) -> Result<Option<Regex>, ValidationError> {
    if pattern.is_empty() {
        return Ok(None);
    }
    if pattern.chars().count() > MAX_SEARCH_PATTERN_LEN {
        return Err(ValidationError::PatternTooLong);
    }
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .size_limit(PATTERN_SIZE_LIMIT)
        .build()
        .map(Some)
        .map_err(|_| ValidationError::PatternInvalid)
}
