//! Atomic file write using the write-rename pattern.
//!
//! Writes to `{path}.tmp`, calls `sync_all()` so the bytes reach storage,
//! then renames over the final path. A crash mid-write leaves the previous
//! save intact.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".tmp");
    PathBuf::from(name)
}

/// Atomically write `data` to `path`, creating parent directories.
pub fn atomic_write(path: impl AsRef<Path>, data: &[u8]) -> std::io::Result<()> {
    let final_path = path.as_ref();
    if let Some(parent) = final_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let tmp = tmp_path(final_path);
    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&tmp, final_path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Unique scratch directory per test.
    fn test_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "railbrake_atomic_write_{}_{}",
            name,
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_atomic_write_creates_file_without_leftovers() {
        let dir = test_dir("creates");
        let path = dir.join("session.rbrk");

        atomic_write(&path, b"hello").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"hello");
        assert!(!tmp_path(&path).exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_atomic_write_overwrites_existing_and_stale_tmp() {
        let dir = test_dir("overwrites");
        let path = dir.join("session.rbrk");
        fs::write(&path, b"original").unwrap();
        fs::write(tmp_path(&path), b"partial garbage").unwrap();

        atomic_write(&path, b"new save").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new save");
        assert!(!tmp_path(&path).exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = test_dir("parents");
        let path = dir.join("nested").join("deep").join("snapshot.rbrk");

        atomic_write(&path, b"nested").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"nested");

        let _ = fs::remove_dir_all(&dir);
    }
}
