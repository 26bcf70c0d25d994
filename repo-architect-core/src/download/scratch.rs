use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Ephemeral working directory for a clone.
///
/// Removed by [`ScratchDir::release`] or, on any other exit path, by `Drop`. Both
/// clear write protection first: git writes its pack files read-only, and some
/// platforms refuse to delete those.
pub struct ScratchDir {
    dir: Option<TempDir>,
    path: PathBuf,
}

impl ScratchDir {
    pub fn new(prefix: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(prefix).tempdir()?;
        let path = dir.path().to_path_buf();
        debug!(path = %path.display(), "Created scratch directory");
        Ok(Self {
            dir: Some(dir),
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the directory now, reporting failure.
    pub fn release(mut self) -> io::Result<()> {
        match self.dir.take() {
            Some(dir) => remove(dir),
            None => Ok(()),
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = remove(dir) {
                warn!(error = %e, path = %path.display(), "Failed to remove scratch directory");
            }
        }
    }
}

fn remove(dir: TempDir) -> io::Result<()> {
    clear_write_protection(dir.path());
    let path = dir.path().to_path_buf();
    dir.close()?;
    debug!(path = %path.display(), "Removed scratch directory");
    Ok(())
}

/// Make every file and directory under `root` writable by its owner.
pub fn clear_write_protection(root: &Path) {
    for entry in WalkDir::new(root).into_iter().filter_map(Result::ok) {
        if entry.path_is_symlink() {
            continue;
        }
        let Ok(meta) = entry.metadata() else {
            continue;
        };
        let mut perms = meta.permissions();
        if !perms.readonly() && !meta.is_dir() {
            continue;
        }
        make_owner_writable(&mut perms, meta.is_dir());
        if let Err(e) = fs::set_permissions(entry.path(), perms) {
            debug!(error = %e, path = %entry.path().display(), "Could not clear write protection");
        }
    }
}

#[cfg(unix)]
fn make_owner_writable(perms: &mut fs::Permissions, is_dir: bool) {
    use std::os::unix::fs::PermissionsExt;
    let extra = if is_dir { 0o700 } else { 0o200 };
    perms.set_mode(perms.mode() | extra);
}

#[cfg(not(unix))]
#[allow(clippy::permissions_set_readonly_false)]
fn make_owner_writable(perms: &mut fs::Permissions, _is_dir: bool) {
    perms.set_readonly(false);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set_readonly(path: &Path) {
        let mut perms = fs::metadata(path).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(path, perms).unwrap();
    }

    fn populate_readonly_tree(root: &Path) {
        let objects = root.join("repo/.git/objects/pack");
        fs::create_dir_all(&objects).unwrap();
        let pack = objects.join("pack-1.pack");
        fs::write(&pack, b"PACK").unwrap();
        set_readonly(&pack);
        set_readonly(&objects);
    }

    #[test]
    fn release_removes_read_only_content() {
        let scratch = ScratchDir::new("scratch-test-").unwrap();
        let path = scratch.path().to_path_buf();
        populate_readonly_tree(&path);

        scratch.release().unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn drop_removes_directory_on_early_exit() {
        let path = {
            let scratch = ScratchDir::new("scratch-test-").unwrap();
            populate_readonly_tree(scratch.path());
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
