//! Parameter list loading: one relative path per line.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::spec::{SyncError, SyncResult};

/// Parse a parameter list from any line-oriented reader.
///
/// Blank and whitespace-only lines are dropped; every other line is kept
/// verbatim and in order. Both `\n` and `\r\n` endings are accepted.
pub fn parse_parameter_list<R: BufRead>(reader: R) -> io::Result<Vec<String>> {
    let mut l_entries = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        l_entries.push(line);
    }
    Ok(l_entries)
}

/// Open and parse the parameter file at `path_params`.
///
/// A missing file is [`SyncError::ParameterFileMissing`]; any other open or
/// read failure is [`SyncError::Io`].
pub fn load_parameter_list<P: AsRef<Path>>(path_params: P) -> SyncResult<Vec<String>> {
    let path_params = path_params.as_ref();
    let file_params = File::open(path_params).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => SyncError::ParameterFileMissing {
            path: path_params.to_path_buf(),
        },
        _ => SyncError::io("open parameter file", path_params, e),
    })?;
    parse_parameter_list(BufReader::new(file_params))
        .map_err(|e| SyncError::io("read parameter file", path_params, e))
}
