// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use blake3::Hasher;
use tracing::debug;

pub mod mock;

/// Abstract filesystem interface.
///
/// Everything the engine does to the source and output trees (input
/// discovery, staleness checks, copying, committing staged outputs, cleaning)
/// goes through this trait. External transform commands are the only writers
/// that bypass it.
pub trait FileSystem: Send + Sync + Debug {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>>;
    fn exists(&self, path: &Path) -> bool;
    fn is_file(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// Last-modified time, or `None` if the path is missing or unreadable.
    fn modified(&self, path: &Path) -> Option<SystemTime>;

    /// Set the last-modified time of an existing file.
    fn set_modified(&self, path: &Path, time: SystemTime) -> Result<()>;

    /// Return a list of entries in a directory.
    /// Returns full paths.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn copy(&self, from: &Path, to: &Path) -> Result<()>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn open_read(&self, path: &Path) -> Result<Box<dyn Read + Send>> {
        let file = fs::File::open(path).with_context(|| format!("opening file {:?}", path))?;
        Ok(Box::new(file))
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        path.metadata().and_then(|m| m.modified()).ok()
    }

    fn set_modified(&self, path: &Path, time: SystemTime) -> Result<()> {
        fs::File::options()
            .write(true)
            .open(path)
            .and_then(|file| file.set_modified(time))
            .with_context(|| format!("setting mtime of {:?}", path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = Vec::new();
        for entry in fs::read_dir(path).with_context(|| format!("reading dir {:?}", path))? {
            let entry = entry?;
            entries.push(entry.path());
        }
        Ok(entries)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).with_context(|| format!("creating dir {:?}", path))
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<()> {
        fs::copy(from, to).with_context(|| format!("copying {:?} to {:?}", from, to))?;
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        fs::rename(from, to).with_context(|| format!("renaming {:?} to {:?}", from, to))
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        fs::remove_file(path).with_context(|| format!("removing file {:?}", path))
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).with_context(|| format!("removing dir {:?}", path))
    }
}

/// blake3 digest of a file's contents, read through `fs`.
pub fn digest(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let mut hasher = Hasher::new();
    let mut file = fs
        .open_read(path)
        .with_context(|| format!("opening file for hashing: {:?}", path))?;
    let mut buf = [0u8; 8192];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hasher.finalize().to_hex().to_string())
}

/// Move a fully written `staged` file over `target`.
///
/// If `target` already holds identical bytes, the staged copy is discarded
/// and the bytes of `target` are left alone. Its mtime only moves when it is
/// older than `source_mtime`: it is raised to the later of now and the
/// source time, so the output no longer looks stale next to an input that
/// was touched without changing. Returns whether `target` was (re)written.
pub fn commit_staged(
    fs: &dyn FileSystem,
    staged: &Path,
    target: &Path,
    source_mtime: Option<SystemTime>,
) -> Result<bool> {
    if fs.is_file(target) && digest(fs, staged)? == digest(fs, target)? {
        debug!(?target, "output unchanged; discarding staged copy");
        fs.remove_file(staged)?;

        if let Some(source_time) = source_mtime
            && fs.modified(target).is_none_or(|t| t < source_time)
        {
            debug!(?target, "refreshing mtime of unchanged output");
            fs.set_modified(target, source_time.max(SystemTime::now()))?;
        }
        return Ok(false);
    }

    fs.rename(staged, target)?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::mock::MockFileSystem;
    use super::*;

    #[test]
    fn commit_replaces_changed_output() -> Result<()> {
        let fs = MockFileSystem::new();
        fs.add_file("./dist/a.css", b"old".to_vec());
        fs.add_file("./dist/.a.css.assetflow-tmp", b"new".to_vec());

        let written = commit_staged(
            &fs,
            Path::new("./dist/.a.css.assetflow-tmp"),
            Path::new("./dist/a.css"),
            None,
        )?;

        assert!(written);
        assert!(!fs.exists(Path::new("./dist/.a.css.assetflow-tmp")));
        assert_eq!(fs.contents(Path::new("./dist/a.css")), Some(b"new".to_vec()));
        Ok(())
    }

    #[test]
    fn commit_keeps_identical_output_untouched() -> Result<()> {
        let fs = MockFileSystem::new();
        fs.add_file("./dist/a.css", b"same".to_vec());
        let before = fs.modified(Path::new("./dist/a.css"));
        fs.add_file("./dist/.a.css.assetflow-tmp", b"same".to_vec());

        let written = commit_staged(
            &fs,
            Path::new("./dist/.a.css.assetflow-tmp"),
            Path::new("./dist/a.css"),
            None,
        )?;

        assert!(!written);
        assert!(!fs.exists(Path::new("./dist/.a.css.assetflow-tmp")));
        assert_eq!(fs.modified(Path::new("./dist/a.css")), before);
        Ok(())
    }

    #[test]
    fn identical_output_older_than_its_source_gets_a_fresh_mtime() -> Result<()> {
        let fs = MockFileSystem::new();
        fs.add_file("./dist/a.webp", b"same".to_vec());
        fs.add_file("./src/a.png", b"png".to_vec());
        let touched = SystemTime::now() + std::time::Duration::from_secs(60);
        fs.set_modified(Path::new("./src/a.png"), touched)?;
        fs.add_file("./dist/.a.webp.assetflow-tmp", b"same".to_vec());

        let written = commit_staged(
            &fs,
            Path::new("./dist/.a.webp.assetflow-tmp"),
            Path::new("./dist/a.webp"),
            fs.modified(Path::new("./src/a.png")),
        )?;

        assert!(!written);
        assert_eq!(fs.contents(Path::new("./dist/a.webp")), Some(b"same".to_vec()));
        assert_eq!(fs.modified(Path::new("./dist/a.webp")), Some(touched));
        Ok(())
    }
}
