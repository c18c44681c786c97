#![doc(test(attr(deny(warnings))))]

//! Fintrack Core provides the state, query, and persistence layer of a
//! personal finance tracker: a normalized persisted record with
//! merge-on-load semantics, a search/sort/aggregation engine, and a
//! currency-aware settings model that rewrites historical amounts when the
//! base display currency changes. Presentation layers drive it through the
//! [`controller::Controller`] command API and its subscription mechanism.

pub mod controller;
pub mod currency;
pub mod errors;
pub mod export;
pub mod query;
pub mod record;
pub mod storage;
pub mod store;
pub mod validation;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter =
            EnvFilter::from_default_env().add_directive("fintrack_core=info".parse().unwrap());

        fmt().with_env_filter(filter).init();
        tracing::info!("Fintrack Core tracing initialized.");
    });
}
