//! Reconciliation services
//!
//! - Record normalizer: raw service record → canonical confirmation
//! - Match resolver: canonical confirmation → local contact
//! - Reconciliation engine and sync report

pub mod match_resolver;
pub mod normalizer;
pub mod reconciliation;

pub use match_resolver::{MatchPolicies, MatchPolicy, MatchResolver};
pub use normalizer::{normalize, ParseError};
pub use reconciliation::{
    EngineConfig, ProgressCallback, ReconciliationEngine, RecordSummary, ReportEntry, SyncCounts,
    SyncReport, SyncStatus,
};
