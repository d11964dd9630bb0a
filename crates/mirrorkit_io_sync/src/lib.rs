//! `mirrorkit_io_sync` v1:
//! Timestamp-driven backup/restore of a flat list of files.
//!
//! Modules:
//! - `decide`  : decision table and single-file engine
//! - `batch`   : parameter-list orchestration, fail-fast
//! - `params`  : parameter-list parsing
//! - `storage` : metadata provider and atomic copy primitive
//! - `spec`    : enums/options/outcomes/errors
//! - `report`  : run-time report model
//! - `util`    : shared helper functions
//!
//! Files are processed one at a time. Existence and timestamps are read once
//! per decision; a writer touching the same file between that read and the
//! copy is not detected.

pub mod batch;
pub mod decide;
pub mod params;
pub mod report;
pub mod spec;
pub mod storage;
mod util;

pub use batch::{run, run_entries_with_storage, run_with_options, run_with_report};
pub use decide::{decide, decide_with_options, decide_with_storage, lookup_decision};
pub use params::{load_parameter_list, parse_parameter_list};
pub use report::{ReportSync, ReportSyncBuilder};
pub use spec::{
    EnumPairState, EnumSyncAction, EnumSyncDirection, EnumSyncOutcome, EnumSyncPatternMode,
    SpecDecision, SpecFileState, SpecSyncError, SpecSyncOptions, SyncError, SyncResult,
    compare_modified,
};
pub use storage::{LocalStorage, SyncStorage};
