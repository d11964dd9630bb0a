//! Batch orchestration: parameter list in, one aggregated outcome out.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::decide::execute_decision;
use crate::params::load_parameter_list;
use crate::report::{ReportSync, ReportSyncBuilder};
use crate::spec::{EnumSyncDirection, EnumSyncOutcome, SpecSyncOptions, SyncResult};
use crate::storage::{LocalStorage, SyncStorage};
use crate::util::{compile_patterns, resolve_entry, should_exclude_entry};

/// Sync every file named in `path_params` from `dir_origin` to
/// `dir_destination`, with default options.
///
/// Entries are processed strictly in order and the first error outcome ends
/// the run. Returns `Success` only if every processed entry was `Success` or
/// `Ignore`.
pub fn run<P, Q, R>(
    path_params: P,
    dir_origin: Q,
    dir_destination: R,
    direction: EnumSyncDirection,
) -> EnumSyncOutcome
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    run_with_options(
        path_params,
        dir_origin,
        dir_destination,
        direction,
        &SpecSyncOptions::default(),
    )
}

/// Same as [`run`], honoring [`SpecSyncOptions`].
pub fn run_with_options<P, Q, R>(
    path_params: P,
    dir_origin: Q,
    dir_destination: R,
    direction: EnumSyncDirection,
    spec_sync_options: &SpecSyncOptions,
) -> EnumSyncOutcome
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    run_with_report(
        path_params,
        dir_origin,
        dir_destination,
        direction,
        spec_sync_options,
    )
    .outcome
}

/// Same as [`run_with_options`], returning the full [`ReportSync`].
///
/// A missing parameter file yields `ErrorParameterFileMissing`; any other
/// failure to read it yields `ErrorGeneral`. No entry is processed in either
/// case.
///
/// Entries are joined onto both bases and must stay below them: an absolute
/// entry or one containing `..` stops the run with `ErrorGeneral`.
pub fn run_with_report<P, Q, R>(
    path_params: P,
    dir_origin: Q,
    dir_destination: R,
    direction: EnumSyncDirection,
    spec_sync_options: &SpecSyncOptions,
) -> ReportSync
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
    R: AsRef<Path>,
{
    let path_params = path_params.as_ref();
    let l_entries = match load_parameter_list(path_params) {
        Ok(v) => v,
        Err(e) => {
            warn!(params = %path_params.display(), error = %e, "parameter list not loaded");
            let mut builder_sync_report = ReportSyncBuilder::default();
            builder_sync_report.set_error(path_params.to_path_buf(), e.outcome(), e.to_string());
            return builder_sync_report.build();
        }
    };

    let storage = LocalStorage {
        if_preserve_xattrs: spec_sync_options.if_preserve_xattrs,
    };
    run_entries_with_storage(
        &storage,
        &l_entries,
        dir_origin.as_ref(),
        dir_destination.as_ref(),
        direction,
        spec_sync_options,
    )
}

/// Apply the decision engine to already-loaded `l_entries` over `storage`.
pub fn run_entries_with_storage<S>(
    storage: &S,
    l_entries: &[String],
    path_dir_origin: &Path,
    path_dir_destination: &Path,
    direction: EnumSyncDirection,
    spec_sync_options: &SpecSyncOptions,
) -> ReportSync
where
    S: SyncStorage + ?Sized,
{
    let mut builder_sync_report = ReportSyncBuilder::default();
    builder_sync_report.add_listed(l_entries.len() as u64);

    let spec_sync_pats = match compile_patterns(
        spec_sync_options.patterns_exclude.as_deref(),
        spec_sync_options.rule_pattern,
    ) {
        Ok(v) => v,
        Err(e) => {
            builder_sync_report.set_error(PathBuf::new(), e.outcome(), e.to_string());
            return finish(builder_sync_report, direction);
        }
    };

    for entry in l_entries {
        if should_exclude_entry(entry, spec_sync_pats.as_ref()) {
            debug!(entry = %entry, "entry excluded by pattern");
            builder_sync_report.add_excluded();
            continue;
        }

        let (path_src, path_dst) = match resolve_pair(entry, path_dir_origin, path_dir_destination)
        {
            Ok(v) => v,
            Err(e) => {
                builder_sync_report.set_error(PathBuf::from(entry), e.outcome(), e.to_string());
                break;
            }
        };

        match execute_decision(
            storage,
            &path_src,
            &path_dst,
            direction,
            spec_sync_options.if_dry_run,
        ) {
            Ok(spec_decision) => {
                let outcome = spec_decision.outcome;
                builder_sync_report.add_outcome(outcome);
                if outcome.is_error() {
                    builder_sync_report.set_error(
                        path_src,
                        outcome,
                        format!("{}: {}", outcome.describe(), path_dst.display()),
                    );
                    break;
                }
            }
            Err(e) => {
                let outcome = e.outcome();
                builder_sync_report.add_outcome(outcome);
                builder_sync_report.set_error(path_src, outcome, e.to_string());
                break;
            }
        }
    }

    finish(builder_sync_report, direction)
}

fn resolve_pair(
    entry: &str,
    path_dir_origin: &Path,
    path_dir_destination: &Path,
) -> SyncResult<(PathBuf, PathBuf)> {
    Ok((
        resolve_entry(path_dir_origin, entry)?,
        resolve_entry(path_dir_destination, entry)?,
    ))
}

fn finish(builder_sync_report: ReportSyncBuilder, direction: EnumSyncDirection) -> ReportSync {
    let report = builder_sync_report.build();
    match &report.error {
        None => info!(%direction, summary = %report, "sync run finished"),
        Some(spec_error) => warn!(
            %direction,
            summary = %report,
            path = %spec_error.path.display(),
            error = %spec_error.exception,
            "sync run stopped"
        ),
    }
    report
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    use filetime::{FileTime, set_file_mtime};
    use tempfile::TempDir;

    use super::{run, run_entries_with_storage, run_with_options, run_with_report};
    use crate::spec::{
        EnumSyncDirection, EnumSyncOutcome, EnumSyncPatternMode, SpecFileState, SpecSyncOptions,
        SyncError, SyncResult,
    };
    use crate::storage::SyncStorage;

    const T_BASE: i64 = 1_700_000_000;

    struct Bases {
        tmp: TempDir,
        origin: PathBuf,
        destination: PathBuf,
    }

    impl Bases {
        fn new() -> Self {
            let tmp = TempDir::new().expect("tempdir");
            let origin = tmp.path().join("hd_source");
            let destination = tmp.path().join("pen_drive_target");
            fs::create_dir_all(&origin).expect("mkdir origin");
            fs::create_dir_all(&destination).expect("mkdir destination");
            Self {
                tmp,
                origin,
                destination,
            }
        }

        fn params(&self, txt: &str) -> PathBuf {
            let path = self.tmp.path().join("Backup.parm");
            fs::write(&path, txt).expect("write params");
            path
        }
    }

    fn write_file(path: &Path, txt: &str, secs: i64) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent");
        }
        fs::write(path, txt).expect("write text");
        set_file_mtime(path, FileTime::from_unix_time(secs, 0)).expect("set mtime");
    }

    fn read_text(path: &Path) -> String {
        fs::read_to_string(path).expect("read text")
    }

    #[test]
    fn backs_up_every_listed_file() {
        let b = Bases::new();
        write_file(&b.origin.join("a.txt"), "a", T_BASE);
        write_file(&b.origin.join("docs/b.txt"), "b", T_BASE);
        let path_params = b.params("a.txt\n\ndocs/b.txt\nmissing.txt\n");

        let report = run_with_report(
            &path_params,
            &b.origin,
            &b.destination,
            EnumSyncDirection::Backup,
            &SpecSyncOptions::default(),
        );
        assert_eq!(report.outcome, EnumSyncOutcome::Success);
        assert_eq!(report.cnt_listed, 3);
        assert_eq!(report.cnt_copied, 2);
        assert_eq!(report.cnt_ignored, 1);
        assert_eq!(read_text(&b.destination.join("docs/b.txt")), "b");
    }

    #[test]
    fn second_run_ignores_everything() {
        let b = Bases::new();
        write_file(&b.origin.join("a.txt"), "a", T_BASE);
        let path_params = b.params("a.txt\n");

        let d = EnumSyncDirection::Backup;
        assert_eq!(
            run(&path_params, &b.origin, &b.destination, d),
            EnumSyncOutcome::Success
        );
        let report = run_with_report(
            &path_params,
            &b.origin,
            &b.destination,
            d,
            &SpecSyncOptions::default(),
        );
        assert_eq!(report.outcome, EnumSyncOutcome::Success);
        assert_eq!(report.cnt_copied, 0);
        assert_eq!(report.cnt_ignored, 1);
    }

    #[test]
    fn stops_at_first_error_and_leaves_the_rest_untouched() {
        let b = Bases::new();
        for name in ["one.txt", "two.txt", "three.txt"] {
            write_file(&b.origin.join(name), name, T_BASE);
        }
        write_file(&b.destination.join("two.txt"), "edited", T_BASE + 3600);
        let path_params = b.params("one.txt\ntwo.txt\nthree.txt\n");

        let report = run_with_report(
            &path_params,
            &b.origin,
            &b.destination,
            EnumSyncDirection::Backup,
            &SpecSyncOptions::default(),
        );
        assert_eq!(report.outcome, EnumSyncOutcome::ErrorDestinationNewer);
        assert_eq!(report.cnt_processed, 2);
        assert_eq!(report.cnt_copied, 1);
        assert_eq!(
            report.error.as_ref().map(|e| e.path.clone()),
            Some(b.origin.join("two.txt"))
        );
        assert_eq!(read_text(&b.destination.join("one.txt")), "one.txt");
        assert_eq!(read_text(&b.destination.join("two.txt")), "edited");
        assert!(!b.destination.join("three.txt").exists());
    }

    #[test]
    fn missing_parameter_file_is_reported() {
        let b = Bases::new();
        let path_params = b.tmp.path().join("nope.parm");

        let report = run_with_report(
            &path_params,
            &b.origin,
            &b.destination,
            EnumSyncDirection::Backup,
            &SpecSyncOptions::default(),
        );
        assert_eq!(report.outcome, EnumSyncOutcome::ErrorParameterFileMissing);
        assert_eq!(report.cnt_listed, 0);
        assert_eq!(report.cnt_processed, 0);
    }

    #[test]
    fn restore_fails_on_missing_backup_copy() {
        let b = Bases::new();
        write_file(&b.origin.join("a.txt"), "backup", T_BASE);
        write_file(&b.destination.join("b.txt"), "local", T_BASE);
        let path_params = b.params("a.txt\nb.txt\n");

        let outcome = run(
            &path_params,
            &b.origin,
            &b.destination,
            EnumSyncDirection::Restore,
        );
        assert_eq!(outcome, EnumSyncOutcome::ErrorSourceMissing);
        assert_eq!(read_text(&b.destination.join("a.txt")), "backup");
        assert_eq!(read_text(&b.destination.join("b.txt")), "local");
    }

    #[test]
    fn excluded_entries_are_skipped() {
        let b = Bases::new();
        write_file(&b.origin.join("keep.txt"), "k", T_BASE);
        write_file(&b.origin.join("scratch.tmp"), "t", T_BASE);
        let path_params = b.params("keep.txt\nscratch.tmp\n");
        let spec_sync_options = SpecSyncOptions {
            patterns_exclude: Some(vec!["*.tmp".to_string()]),
            ..SpecSyncOptions::default()
        };

        let report = run_with_report(
            &path_params,
            &b.origin,
            &b.destination,
            EnumSyncDirection::Backup,
            &spec_sync_options,
        );
        assert_eq!(report.outcome, EnumSyncOutcome::Success);
        assert_eq!(report.cnt_excluded, 1);
        assert!(b.destination.join("keep.txt").exists());
        assert!(!b.destination.join("scratch.tmp").exists());
    }

    #[test]
    fn invalid_exclude_pattern_fails_before_any_copy() {
        let b = Bases::new();
        write_file(&b.origin.join("a.txt"), "a", T_BASE);
        let path_params = b.params("a.txt\n");
        let spec_sync_options = SpecSyncOptions {
            patterns_exclude: Some(vec!["(".to_string()]),
            rule_pattern: EnumSyncPatternMode::Regex,
            ..SpecSyncOptions::default()
        };

        let outcome = run_with_options(
            &path_params,
            &b.origin,
            &b.destination,
            EnumSyncDirection::Backup,
            &spec_sync_options,
        );
        assert_eq!(outcome, EnumSyncOutcome::ErrorGeneral);
        assert!(!b.destination.join("a.txt").exists());
    }

    #[test]
    fn entry_escaping_base_is_rejected() {
        let b = Bases::new();
        write_file(&b.tmp.path().join("outside.txt"), "x", T_BASE);
        let path_params = b.params("../outside.txt\n");

        let outcome = run(
            &path_params,
            &b.origin,
            &b.destination,
            EnumSyncDirection::Backup,
        );
        assert_eq!(outcome, EnumSyncOutcome::ErrorGeneral);
    }

    #[test]
    fn dry_run_counts_copies_without_writing() {
        let b = Bases::new();
        write_file(&b.origin.join("a.txt"), "a", T_BASE);
        let path_params = b.params("a.txt\n");
        let spec_sync_options = SpecSyncOptions {
            if_dry_run: true,
            ..SpecSyncOptions::default()
        };

        let report = run_with_report(
            &path_params,
            &b.origin,
            &b.destination,
            EnumSyncDirection::Backup,
            &spec_sync_options,
        );
        assert_eq!(report.outcome, EnumSyncOutcome::Success);
        assert_eq!(report.cnt_copied, 1);
        assert!(!b.destination.join("a.txt").exists());
    }

    /// Every origin file exists; copying `path_fail` fails like a pulled drive.
    struct FlakyStorage {
        path_fail: PathBuf,
        l_copied: RefCell<Vec<PathBuf>>,
    }

    impl SyncStorage for FlakyStorage {
        fn file_state(&self, path: &Path) -> SyncResult<SpecFileState> {
            if path.starts_with("/hd") || self.l_copied.borrow().iter().any(|p| p == path) {
                Ok(SpecFileState::Present {
                    modified_at: FileTime::from_unix_time(T_BASE, 0),
                })
            } else {
                Ok(SpecFileState::Absent)
            }
        }

        fn copy_file(&self, _path_src: &Path, path_dst: &Path) -> SyncResult<()> {
            if path_dst == self.path_fail {
                return Err(SyncError::Io {
                    operation: "copy bytes",
                    path: path_dst.to_path_buf(),
                    source: io::Error::other("device removed"),
                });
            }
            self.l_copied.borrow_mut().push(path_dst.to_path_buf());
            Ok(())
        }
    }

    #[test]
    fn storage_failure_mid_run_stops_with_error_general() {
        let storage = FlakyStorage {
            path_fail: PathBuf::from("/pen/two.txt"),
            l_copied: RefCell::new(Vec::new()),
        };
        let l_entries = ["one.txt", "two.txt", "three.txt"].map(String::from);

        let report = run_entries_with_storage(
            &storage,
            &l_entries,
            Path::new("/hd"),
            Path::new("/pen"),
            EnumSyncDirection::Backup,
            &SpecSyncOptions::default(),
        );
        assert_eq!(report.outcome, EnumSyncOutcome::ErrorGeneral);
        assert_eq!(report.cnt_listed, 3);
        assert_eq!(report.cnt_processed, 2);
        assert_eq!(report.cnt_copied, 1);
        assert_eq!(
            report.error.as_ref().map(|e| e.path.clone()),
            Some(PathBuf::from("/hd/two.txt"))
        );
        assert_eq!(
            *storage.l_copied.borrow(),
            vec![PathBuf::from("/pen/one.txt")]
        );
    }
}
