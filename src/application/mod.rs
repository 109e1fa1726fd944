//! Application Layer - Aggregation and background refresh
//!
//! - `aggregator`: fetch, merge, score and cache token snapshots
//! - `merge`: field precedence for one snapshot
//! - `refresher`: periodic, non-reentrant trending refresh

pub mod aggregator;
pub mod merge;
pub mod refresher;

pub use aggregator::{
    AggregatorConfig, TokenAggregator, EXCLUDED_MINTS, MAX_BATCH_MINTS, WELL_KNOWN_MINTS,
};
pub use merge::{merge_snapshot, FallbackQuote, SourceBundle};
pub use refresher::{
    BackgroundRefresher, RefreshError, RefreshOutcome, RefresherConfig, RefresherStatus,
};
