//! Sync models: directions, decisions, outcome taxonomy, options and errors.

use std::cmp::Ordering;
use std::fmt;
use std::io;
use std::path::PathBuf;

use filetime::FileTime;
use thiserror::Error;

////////////////////////////////////////////////////////////////////////////////
// #region EnumsInit

/// Which side of a pair is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumSyncDirection {
    /// Origin is the source of truth; the mirror is brought up to date.
    Backup,
    /// The mirror is copied back over the origin.
    Restore,
}

impl EnumSyncDirection {
    /// Stable lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Backup => "backup",
            Self::Restore => "restore",
        }
    }
}

impl fmt::Display for EnumSyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Side effect selected by the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumSyncAction {
    /// Copy source over destination (create or overwrite).
    Copy,
    /// Leave both files untouched.
    Keep,
}

/// Result kind of one decision or one batch run.
///
/// Closed and flat: callers must be able to tell every kind apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumSyncOutcome {
    /// A copy was performed.
    Success,
    /// Nothing to do; destination is acceptable as-is.
    Ignore,
    /// Storage failure while comparing or copying.
    ErrorGeneral,
    /// The side that must exist for this direction is absent.
    ErrorSourceMissing,
    /// Backup refused: destination was modified after source.
    ErrorDestinationNewer,
    /// Restore refused: restore source is older than its destination.
    ErrorSourceOlder,
    /// The parameter file does not exist.
    ErrorParameterFileMissing,
}

impl EnumSyncOutcome {
    /// All outcome kinds, in code order.
    pub const ALL: [Self; 7] = [
        Self::Success,
        Self::Ignore,
        Self::ErrorGeneral,
        Self::ErrorSourceMissing,
        Self::ErrorDestinationNewer,
        Self::ErrorSourceOlder,
        Self::ErrorParameterFileMissing,
    ];

    /// `true` for every kind except `Success` and `Ignore`.
    pub fn is_error(self) -> bool {
        !self.is_ok()
    }

    /// `true` for `Success` and `Ignore`.
    pub fn is_ok(self) -> bool {
        matches!(self, Self::Success | Self::Ignore)
    }

    /// Stable numeric code. Non-negative values are not errors.
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Ignore => 1,
            Self::ErrorGeneral => -1,
            Self::ErrorSourceMissing => -2,
            Self::ErrorDestinationNewer => -3,
            Self::ErrorSourceOlder => -4,
            Self::ErrorParameterFileMissing => -5,
        }
    }

    /// Stable snake-case name, suitable for logs and exit messages.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Ignore => "ignore",
            Self::ErrorGeneral => "error_general",
            Self::ErrorSourceMissing => "error_source_missing",
            Self::ErrorDestinationNewer => "error_destination_newer",
            Self::ErrorSourceOlder => "error_source_older",
            Self::ErrorParameterFileMissing => "error_parameter_file_missing",
        }
    }

    /// Human-readable description.
    pub fn describe(self) -> &'static str {
        match self {
            Self::Success => "file copied",
            Self::Ignore => "nothing to do",
            Self::ErrorGeneral => "storage failure while comparing or copying",
            Self::ErrorSourceMissing => "source file does not exist",
            Self::ErrorDestinationNewer => "destination is newer than source",
            Self::ErrorSourceOlder => "source is older than destination",
            Self::ErrorParameterFileMissing => "parameter file does not exist",
        }
    }
}

impl fmt::Display for EnumSyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.as_str(), self.describe())
    }
}

/// Pattern matching mode for exclude lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumSyncPatternMode {
    /// Shell-like wildcards (`*`, `?`, character classes).
    Glob,
    /// Regular expression pattern.
    Regex,
    /// Substring match.
    Literal,
}

/// Existence pattern of a source/destination pair, with the timestamp
/// relation of source to destination when both exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnumPairState {
    NeitherExists,
    DestinationOnly,
    SourceOnly,
    /// `Ordering` is `source.cmp(destination)` on modification time.
    Both(Ordering),
}

impl EnumPairState {
    pub fn from_states(state_src: &SpecFileState, state_dst: &SpecFileState) -> Self {
        match (state_src, state_dst) {
            (SpecFileState::Absent, SpecFileState::Absent) => Self::NeitherExists,
            (SpecFileState::Absent, SpecFileState::Present { .. }) => Self::DestinationOnly,
            (SpecFileState::Present { .. }, SpecFileState::Absent) => Self::SourceOnly,
            (
                SpecFileState::Present { modified_at: ft_src },
                SpecFileState::Present { modified_at: ft_dst },
            ) => Self::Both(compare_modified(*ft_src, *ft_dst)),
        }
    }
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region StructsAndErrors

/// Existence and modification time of one path, read fresh per decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecFileState {
    Absent,
    Present {
        /// Last modification time reported by storage metadata.
        modified_at: FileTime,
    },
}

impl SpecFileState {
    pub fn modified_at(&self) -> Option<FileTime> {
        match self {
            Self::Absent => None,
            Self::Present { modified_at } => Some(*modified_at),
        }
    }
}

/// Compare modification times at whole-second resolution.
///
/// Sub-second parts are dropped so that storage with coarse timestamps does
/// not turn a fresh copy into a perpetual "source is newer".
pub fn compare_modified(ft_a: FileTime, ft_b: FileTime) -> Ordering {
    ft_a.unix_seconds().cmp(&ft_b.unix_seconds())
}

/// One cell of the decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpecDecision {
    pub action: EnumSyncAction,
    pub outcome: EnumSyncOutcome,
}

/// Input options for `decide_with_options` and the batch runners.
#[derive(Debug, Clone)]
pub struct SpecSyncOptions {
    /// Exclude patterns applied to each parameter-list entry.
    pub patterns_exclude: Option<Vec<String>>,
    /// Pattern interpretation mode.
    pub rule_pattern: EnumSyncPatternMode,
    /// Do not mutate storage; a copy cell still reports `Success`.
    pub if_dry_run: bool,
    /// Copy extended attributes after the byte copy (Linux only, best effort).
    pub if_preserve_xattrs: bool,
}

impl Default for SpecSyncOptions {
    fn default() -> Self {
        Self {
            patterns_exclude: None,
            rule_pattern: EnumSyncPatternMode::Glob,
            if_dry_run: false,
            if_preserve_xattrs: true,
        }
    }
}

/// Result alias for fallible sync steps.
pub type SyncResult<T> = Result<T, SyncError>;

/// Failures raised below the decision boundary.
///
/// Never returned from `decide`/`run`; mapped to an outcome via
/// [`SyncError::outcome`].
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("{operation} failed for {}: {source}", path.display())]
    Io {
        /// Operation that triggered the IO failure.
        operation: &'static str,
        /// Path involved in the IO failure.
        path: PathBuf,
        source: io::Error,
    },
    #[error("parameter file does not exist: {}", path.display())]
    ParameterFileMissing { path: PathBuf },
    #[error(
        "copied file is older than its source ({destination_seconds} < {source_seconds}): {}",
        path.display()
    )]
    TimestampRegression {
        path: PathBuf,
        source_seconds: i64,
        destination_seconds: i64,
    },
    #[error("invalid exclude pattern `{pattern}`: {message}")]
    InvalidPattern { pattern: String, message: String },
    #[error("unsafe parameter entry `{entry}`: {reason}")]
    UnsafeEntry { entry: String, reason: &'static str },
}

impl SyncError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Outcome kind reported for this failure.
    pub fn outcome(&self) -> EnumSyncOutcome {
        match self {
            Self::ParameterFileMissing { .. } => EnumSyncOutcome::ErrorParameterFileMissing,
            Self::Io { .. }
            | Self::TimestampRegression { .. }
            | Self::InvalidPattern { .. }
            | Self::UnsafeEntry { .. } => EnumSyncOutcome::ErrorGeneral,
        }
    }
}

/// The failing entry of a batch run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecSyncError {
    /// Failed source, destination or parameter path.
    pub path: PathBuf,
    /// Outcome the failure was reported as.
    pub outcome: EnumSyncOutcome,
    /// User-facing error text.
    pub exception: String,
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
