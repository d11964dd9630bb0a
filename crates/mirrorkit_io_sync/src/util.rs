use std::path::{Component, Path, PathBuf};

use globset::{Glob, GlobMatcher};
use regex::Regex;

use crate::spec::{EnumSyncPatternMode, SyncError, SyncResult};

////////////////////////////////////////////////////////////////////////////////
// #region PatternMatching

#[derive(Debug, Clone)]
pub(crate) enum TypeSyncPatternSeq {
    Literal(Vec<String>),
    Glob(Vec<GlobMatcher>),
    Regex(Vec<Regex>),
}

impl TypeSyncPatternSeq {
    pub(crate) fn is_match(&self, value: &str) -> bool {
        match self {
            Self::Literal(v) => v.iter().any(|p| value.contains(p.as_str())),
            Self::Glob(v) => v.iter().any(|p| p.is_match(value)),
            Self::Regex(v) => v.iter().any(|p| p.is_match(value)),
        }
    }
}

pub(crate) fn compile_patterns(
    patterns: Option<&[String]>,
    rule_pattern: EnumSyncPatternMode,
) -> SyncResult<Option<TypeSyncPatternSeq>> {
    let patterns = match patterns {
        Some(v) if !v.is_empty() => v,
        _ => return Ok(None),
    };

    let seq = match rule_pattern {
        EnumSyncPatternMode::Literal => TypeSyncPatternSeq::Literal(patterns.to_vec()),
        EnumSyncPatternMode::Glob => TypeSyncPatternSeq::Glob(compile_each(patterns, |p| {
            Glob::new(p).map(|g| g.compile_matcher())
        })?),
        EnumSyncPatternMode::Regex => {
            TypeSyncPatternSeq::Regex(compile_each(patterns, Regex::new)?)
        }
    };
    Ok(Some(seq))
}

/// Compile every pattern, failing on the first one that does not parse.
fn compile_each<T, E, F>(patterns: &[String], compile: F) -> SyncResult<Vec<T>>
where
    E: std::fmt::Display,
    F: Fn(&str) -> Result<T, E>,
{
    patterns
        .iter()
        .map(|pattern| {
            compile(pattern.as_str()).map_err(|e| SyncError::InvalidPattern {
                pattern: pattern.clone(),
                message: e.to_string(),
            })
        })
        .collect()
}

pub(crate) fn should_exclude_entry(entry: &str, patterns: Option<&TypeSyncPatternSeq>) -> bool {
    patterns.is_some_and(|p| p.is_match(entry))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////
// #region PathUtilities

/// Join a parameter-list entry onto `path_dir_base`.
///
/// Entries must stay below the base: absolute paths, drive prefixes and `..`
/// components are rejected.
pub(crate) fn resolve_entry(path_dir_base: &Path, entry: &str) -> SyncResult<PathBuf> {
    let path_rel = Path::new(entry);
    for part in path_rel.components() {
        let reason = match part {
            Component::Normal(_) | Component::CurDir => continue,
            Component::ParentDir => "parent directory components are not allowed",
            Component::RootDir | Component::Prefix(_) => "entry must be a relative path",
        };
        return Err(SyncError::UnsafeEntry {
            entry: entry.to_string(),
            reason,
        });
    }
    Ok(path_dir_base.join(path_rel))
}

// #endregion
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{compile_patterns, resolve_entry, should_exclude_entry};
    use crate::spec::{EnumSyncPatternMode, SyncError};

    fn pats(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn glob_regex_and_literal_patterns_match_entries() {
        let l_glob = pats(&["*.tmp"]);
        let glob =
            compile_patterns(Some(l_glob.as_slice()), EnumSyncPatternMode::Glob).expect("glob");
        assert!(should_exclude_entry("cache/x.tmp", glob.as_ref()));
        assert!(!should_exclude_entry("docs/x.txt", glob.as_ref()));

        let l_regex = pats(&[r"^logs/"]);
        let regex =
            compile_patterns(Some(l_regex.as_slice()), EnumSyncPatternMode::Regex).expect("regex");
        assert!(should_exclude_entry("logs/today.txt", regex.as_ref()));
        assert!(!should_exclude_entry("src/logs/today.txt", regex.as_ref()));

        let l_literal = pats(&["secret"]);
        let literal = compile_patterns(Some(l_literal.as_slice()), EnumSyncPatternMode::Literal)
            .expect("literal");
        assert!(should_exclude_entry("my_secret.key", literal.as_ref()));
    }

    #[test]
    fn patterns_containing_commas_compile_whole() {
        let l_glob = pats(&["*.{tmp,bak}"]);
        let glob =
            compile_patterns(Some(l_glob.as_slice()), EnumSyncPatternMode::Glob).expect("glob");
        assert!(should_exclude_entry("a.tmp", glob.as_ref()));
        assert!(should_exclude_entry("a.bak", glob.as_ref()));
        assert!(!should_exclude_entry("a.txt", glob.as_ref()));

        let l_regex = pats(&[r"^x{1,3}\.txt$"]);
        let regex =
            compile_patterns(Some(l_regex.as_slice()), EnumSyncPatternMode::Regex).expect("regex");
        assert!(should_exclude_entry("xx.txt", regex.as_ref()));
        assert!(!should_exclude_entry("xxxx.txt", regex.as_ref()));
    }

    #[test]
    fn empty_or_missing_patterns_exclude_nothing() {
        let none = compile_patterns(None, EnumSyncPatternMode::Glob).expect("none");
        assert!(none.is_none());

        let l_empty: Vec<String> = Vec::new();
        let empty =
            compile_patterns(Some(l_empty.as_slice()), EnumSyncPatternMode::Regex).expect("empty");
        assert!(!should_exclude_entry("a.txt", empty.as_ref()));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        let l_bad = pats(&["("]);
        let res = compile_patterns(Some(l_bad.as_slice()), EnumSyncPatternMode::Regex);
        assert!(matches!(res, Err(SyncError::InvalidPattern { .. })));
    }

    #[test]
    fn resolve_entry_joins_relative_and_rejects_escapes() {
        let base = Path::new("/base");
        assert_eq!(
            resolve_entry(base, "docs/a.txt").expect("relative"),
            Path::new("/base/docs/a.txt")
        );
        assert!(matches!(
            resolve_entry(base, "../etc/passwd"),
            Err(SyncError::UnsafeEntry { .. })
        ));
        assert!(matches!(
            resolve_entry(base, "/etc/passwd"),
            Err(SyncError::UnsafeEntry { .. })
        ));
    }
}
