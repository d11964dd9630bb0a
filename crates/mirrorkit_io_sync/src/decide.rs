//! Single-file sync decision: table lookup plus copy execution.

use std::cmp::Ordering;
use std::path::Path;

use tracing::{debug, warn};

use crate::spec::{
    EnumPairState, EnumSyncAction, EnumSyncDirection, EnumSyncOutcome, SpecDecision,
    SpecFileState, SpecSyncOptions, SyncError, SyncResult, compare_modified,
};
use crate::storage::{LocalStorage, SyncStorage};

const fn cell(action: EnumSyncAction, outcome: EnumSyncOutcome) -> SpecDecision {
    SpecDecision { action, outcome }
}

/// Look up the decision table cell for `direction` and `state_pair`.
///
/// Backup treats a missing origin as nothing to preserve. Restore treats it as
/// fatal. Equal timestamps never copy, in either direction.
pub fn lookup_decision(direction: EnumSyncDirection, state_pair: EnumPairState) -> SpecDecision {
    use EnumPairState::{Both, DestinationOnly, NeitherExists, SourceOnly};
    use EnumSyncAction::{Copy as CopyFile, Keep};
    use EnumSyncDirection::{Backup, Restore};
    use EnumSyncOutcome::{
        ErrorDestinationNewer, ErrorSourceMissing, ErrorSourceOlder, Ignore, Success,
    };

    match (direction, state_pair) {
        (Backup, NeitherExists) => cell(Keep, Ignore),
        (Backup, DestinationOnly) => cell(Keep, Ignore),
        (Backup, SourceOnly) => cell(CopyFile, Success),
        (Backup, Both(Ordering::Greater)) => cell(CopyFile, Success),
        (Backup, Both(Ordering::Equal)) => cell(Keep, Ignore),
        (Backup, Both(Ordering::Less)) => cell(Keep, ErrorDestinationNewer),

        (Restore, NeitherExists) => cell(Keep, ErrorSourceMissing),
        (Restore, DestinationOnly) => cell(Keep, ErrorSourceMissing),
        (Restore, SourceOnly) => cell(CopyFile, Success),
        (Restore, Both(Ordering::Less)) => cell(Keep, ErrorSourceOlder),
        (Restore, Both(Ordering::Equal)) => cell(Keep, Ignore),
        (Restore, Both(Ordering::Greater)) => cell(CopyFile, Success),
    }
}

/// Decide and apply the sync of `path_source` onto `path_destination` on the
/// local filesystem with default options.
///
/// Storage failures are reported as [`EnumSyncOutcome::ErrorGeneral`]; this
/// function never panics on IO errors.
pub fn decide<P, Q>(
    path_source: P,
    path_destination: Q,
    direction: EnumSyncDirection,
) -> EnumSyncOutcome
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    decide_with_options(
        path_source,
        path_destination,
        direction,
        &SpecSyncOptions::default(),
    )
}

/// Same as [`decide`], honoring `if_dry_run` and `if_preserve_xattrs`.
///
/// Exclude patterns apply to parameter-list entries and are ignored here.
pub fn decide_with_options<P, Q>(
    path_source: P,
    path_destination: Q,
    direction: EnumSyncDirection,
    spec_sync_options: &SpecSyncOptions,
) -> EnumSyncOutcome
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let storage = LocalStorage {
        if_preserve_xattrs: spec_sync_options.if_preserve_xattrs,
    };
    decide_with_storage(
        &storage,
        path_source.as_ref(),
        path_destination.as_ref(),
        direction,
        spec_sync_options.if_dry_run,
    )
}

/// Decision engine over an arbitrary [`SyncStorage`].
pub fn decide_with_storage<S>(
    storage: &S,
    path_source: &Path,
    path_destination: &Path,
    direction: EnumSyncDirection,
    if_dry_run: bool,
) -> EnumSyncOutcome
where
    S: SyncStorage + ?Sized,
{
    match execute_decision(storage, path_source, path_destination, direction, if_dry_run) {
        Ok(spec_decision) => spec_decision.outcome,
        Err(e) => {
            warn!(
                source = %path_source.display(),
                destination = %path_destination.display(),
                %direction,
                error = %e,
                "sync decision failed"
            );
            e.outcome()
        }
    }
}

/// Read both states, look up the cell and perform the copy when required.
///
/// The states are read once; an external writer touching either file between
/// the read and the copy is not detected.
pub(crate) fn execute_decision<S>(
    storage: &S,
    path_source: &Path,
    path_destination: &Path,
    direction: EnumSyncDirection,
    if_dry_run: bool,
) -> SyncResult<SpecDecision>
where
    S: SyncStorage + ?Sized,
{
    let state_src = storage.file_state(path_source)?;
    let state_dst = storage.file_state(path_destination)?;
    let state_pair = EnumPairState::from_states(&state_src, &state_dst);
    let spec_decision = lookup_decision(direction, state_pair);

    debug!(
        source = %path_source.display(),
        destination = %path_destination.display(),
        %direction,
        ?state_pair,
        action = ?spec_decision.action,
        outcome = spec_decision.outcome.as_str(),
        dry_run = if_dry_run,
        "sync decision"
    );

    if spec_decision.action == EnumSyncAction::Copy && !if_dry_run {
        storage.copy_file(path_source, path_destination)?;
        verify_copy(storage, &state_src, path_destination)?;
    }
    Ok(spec_decision)
}

/// Post-condition: destination is not older than the source stamp observed
/// before the copy.
fn verify_copy<S>(
    storage: &S,
    state_src: &SpecFileState,
    path_destination: &Path,
) -> SyncResult<()>
where
    S: SyncStorage + ?Sized,
{
    let Some(ft_src) = state_src.modified_at() else {
        return Ok(());
    };
    let state_dst = storage.file_state(path_destination)?;
    match state_dst.modified_at() {
        Some(ft_dst) if compare_modified(ft_dst, ft_src) != Ordering::Less => Ok(()),
        ft_dst => Err(SyncError::TimestampRegression {
            path: path_destination.to_path_buf(),
            source_seconds: ft_src.unix_seconds(),
            destination_seconds: ft_dst.map_or(i64::MIN, |ft| ft.unix_seconds()),
        }),
    }
}
