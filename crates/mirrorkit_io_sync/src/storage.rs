//! Storage collaborators: metadata provider and copy primitive.

use std::fs::{self, File};
use std::io;
use std::path::Path;

use filetime::{FileTime, set_file_times};
use tempfile::NamedTempFile;

use crate::spec::{SpecFileState, SyncError, SyncResult};

/// What the decision engine needs from storage.
pub trait SyncStorage {
    /// Existence and modification time of `path`, read fresh.
    fn file_state(&self, path: &Path) -> SyncResult<SpecFileState>;

    /// Copy `path_src` to `path_dst`, creating or fully overwriting it,
    /// including its modification time.
    ///
    /// Must be atomic-or-untouched: on error the destination keeps its
    /// previous bytes and timestamp.
    fn copy_file(&self, path_src: &Path, path_dst: &Path) -> SyncResult<()>;
}

/// Local filesystem backend.
#[derive(Debug, Clone, Copy)]
pub struct LocalStorage {
    pub if_preserve_xattrs: bool,
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self {
            if_preserve_xattrs: true,
        }
    }
}

impl SyncStorage for LocalStorage {
    fn file_state(&self, path: &Path) -> SyncResult<SpecFileState> {
        match fs::metadata(path) {
            Ok(stat) => Ok(SpecFileState::Present {
                modified_at: FileTime::from_last_modification_time(&stat),
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(SpecFileState::Absent),
            Err(e) => Err(SyncError::io("read metadata", path, e)),
        }
    }

    fn copy_file(&self, path_src: &Path, path_dst: &Path) -> SyncResult<()> {
        copy_file_atomic(path_src, path_dst, self.if_preserve_xattrs)
    }
}

/// Copy through a temporary sibling of `path_dst`, then rename it into place.
///
/// The temporary file is removed on drop if any step before the rename fails.
pub(crate) fn copy_file_atomic(
    path_src: &Path,
    path_dst: &Path,
    if_preserve_xattrs: bool,
) -> SyncResult<()> {
    let stat_src =
        fs::metadata(path_src).map_err(|e| SyncError::io("stat source", path_src, e))?;
    if !stat_src.is_file() {
        return Err(SyncError::io(
            "copy",
            path_src,
            io::Error::new(io::ErrorKind::InvalidInput, "source is not a regular file"),
        ));
    }

    let path_dir_dst = match path_dst.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(path_dir_dst)
        .map_err(|e| SyncError::io("create destination directory", path_dir_dst, e))?;

    let mut file_tmp = NamedTempFile::new_in(path_dir_dst)
        .map_err(|e| SyncError::io("create temporary file", path_dir_dst, e))?;
    let mut file_src =
        File::open(path_src).map_err(|e| SyncError::io("open source", path_src, e))?;
    io::copy(&mut file_src, file_tmp.as_file_mut())
        .map_err(|e| SyncError::io("copy bytes", path_dst, e))?;
    file_tmp
        .as_file()
        .sync_all()
        .map_err(|e| SyncError::io("flush", path_dst, e))?;

    apply_metadata(&stat_src, path_src, file_tmp.path(), if_preserve_xattrs)
        .map_err(|e| SyncError::io("apply metadata", path_dst, e))?;

    file_tmp
        .persist(path_dst)
        .map_err(|e| SyncError::io("replace destination", path_dst, e.error))?;
    Ok(())
}

fn apply_metadata(
    stat_src: &fs::Metadata,
    path_src: &Path,
    path_tmp: &Path,
    if_preserve_xattrs: bool,
) -> Result<(), io::Error> {
    fs::set_permissions(path_tmp, stat_src.permissions())?;

    let file_time_access = FileTime::from_last_access_time(stat_src);
    let file_time_modify = FileTime::from_last_modification_time(stat_src);
    set_file_times(path_tmp, file_time_access, file_time_modify)?;

    #[cfg(target_os = "linux")]
    if if_preserve_xattrs {
        copy_xattrs_linux(path_src, path_tmp);
    }
    #[cfg(not(target_os = "linux"))]
    let _ = (path_src, if_preserve_xattrs);
    Ok(())
}

#[cfg(target_os = "linux")]
fn copy_xattrs_linux(path_src: &Path, path_dst: &Path) {
    let iter_xattr_names = match xattr::list(path_src) {
        Ok(v) => v,
        Err(_) => return,
    };

    for name in iter_xattr_names {
        let Some(raw_value) = xattr::get(path_src, &name).ok().flatten() else {
            continue;
        };
        if let Err(e) = xattr::set(path_dst, &name, &raw_value) {
            tracing::debug!(
                path = %path_dst.display(),
                xattr = %name.to_string_lossy(),
                error = %e,
                "extended attribute not copied"
            );
        }
    }
}
