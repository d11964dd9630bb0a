//! Sync report models and mutable report builder.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::spec::{EnumSyncOutcome, SpecSyncError};

/// Aggregate counters and the failing entry for one batch run.
#[derive(Debug, Clone)]
pub struct ReportSync {
    /// Overall outcome of the run.
    pub outcome: EnumSyncOutcome,
    /// Entries read from the parameter list.
    pub cnt_listed: u64,
    /// Entries handed to the decision engine.
    pub cnt_processed: u64,
    /// Entries whose decision copied (or would copy, on dry run).
    pub cnt_copied: u64,
    /// Entries left untouched with `Ignore`.
    pub cnt_ignored: u64,
    /// Entries skipped by exclude patterns.
    pub cnt_excluded: u64,
    /// First failure; the run stops there.
    pub error: Option<SpecSyncError>,
}

impl Default for ReportSync {
    fn default() -> Self {
        ReportSyncBuilder::default().build()
    }
}

impl ReportSync {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Machine-readable counters.
    pub fn to_dict(&self) -> BTreeMap<String, u64> {
        let mut dict_counts = BTreeMap::new();
        dict_counts.insert("cnt_listed".to_string(), self.cnt_listed);
        dict_counts.insert("cnt_processed".to_string(), self.cnt_processed);
        dict_counts.insert("cnt_copied".to_string(), self.cnt_copied);
        dict_counts.insert("cnt_ignored".to_string(), self.cnt_ignored);
        dict_counts.insert("cnt_excluded".to_string(), self.cnt_excluded);
        dict_counts.insert("cnt_errors".to_string(), u64::from(self.error.is_some()));
        dict_counts
    }

    /// Human-readable one-line summary.
    pub fn format(&self, prefix: &str) -> String {
        let dict_counts = self.to_dict();
        format!(
            "{prefix} outcome={} listed={} processed={} copied={} ignored={} excluded={} errors={}",
            self.outcome.as_str(),
            dict_counts["cnt_listed"],
            dict_counts["cnt_processed"],
            dict_counts["cnt_copied"],
            dict_counts["cnt_ignored"],
            dict_counts["cnt_excluded"],
            dict_counts["cnt_errors"]
        )
    }
}

impl fmt::Display for ReportSync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format("[SYNC]"))
    }
}

/// Mutable accumulator for sync statistics.
#[derive(Debug, Default, Clone)]
pub struct ReportSyncBuilder {
    pub cnt_listed: u64,
    pub cnt_processed: u64,
    pub cnt_copied: u64,
    pub cnt_ignored: u64,
    pub cnt_excluded: u64,
    pub error: Option<SpecSyncError>,
}

impl ReportSyncBuilder {
    pub fn add_listed(&mut self, value: u64) {
        self.cnt_listed += value;
    }

    pub fn add_excluded(&mut self) {
        self.cnt_excluded += 1;
    }

    /// Count one decision by its outcome.
    ///
    /// Error outcomes are recorded through [`Self::set_error`] instead.
    pub fn add_outcome(&mut self, outcome: EnumSyncOutcome) {
        self.cnt_processed += 1;
        match outcome {
            EnumSyncOutcome::Success => self.cnt_copied += 1,
            EnumSyncOutcome::Ignore => self.cnt_ignored += 1,
            _ => {}
        }
    }

    /// Record the failure that ends the run. Only the first one is kept.
    pub fn set_error(&mut self, path: PathBuf, outcome: EnumSyncOutcome, exception: String) {
        if self.error.is_some() {
            return;
        }
        self.error = Some(SpecSyncError {
            path,
            outcome,
            exception,
        });
    }

    /// Finalize builder into immutable report.
    pub fn build(self) -> ReportSync {
        let outcome = self
            .error
            .as_ref()
            .map_or(EnumSyncOutcome::Success, |e| e.outcome);
        ReportSync {
            outcome,
            cnt_listed: self.cnt_listed,
            cnt_processed: self.cnt_processed,
            cnt_copied: self.cnt_copied,
            cnt_ignored: self.cnt_ignored,
            cnt_excluded: self.cnt_excluded,
            error: self.error,
        }
    }
}
