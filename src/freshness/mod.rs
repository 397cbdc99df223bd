// src/freshness/mod.rs

//! Mtime-based staleness checks for incremental stages.
//!
//! An input is fresh when the output its stage would produce already exists
//! in the destination directory and is at least as new as the input. Checks
//! are per file: editing a shared include does not make its dependents stale.

use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use crate::fs::FileSystem;
use crate::stage::{Input, OutputNaming};

/// True if `output` exists with a modification time >= `source_mtime`.
///
/// A missing source mtime never counts as fresh.
pub fn is_output_fresh(fs: &dyn FileSystem, output: &Path, source_mtime: Option<SystemTime>) -> bool {
    let Some(source_time) = source_mtime else {
        return false;
    };

    fs.modified(output)
        .map(|output_time| output_time >= source_time)
        .unwrap_or(false)
}

/// Staleness oracle bound to one stage's naming rule.
pub struct StalenessOracle<N: OutputNaming + ?Sized> {
    fs: Arc<dyn FileSystem>,
    naming: Arc<N>,
}

impl<N: OutputNaming + ?Sized> Clone for StalenessOracle<N> {
    fn clone(&self) -> Self {
        Self {
            fs: Arc::clone(&self.fs),
            naming: Arc::clone(&self.naming),
        }
    }
}

impl<N: OutputNaming + ?Sized> StalenessOracle<N> {
    pub fn new(fs: Arc<dyn FileSystem>, naming: Arc<N>) -> Self {
        Self { fs, naming }
    }

    pub fn is_stale(&self, input: &Path, destination_dir: &Path) -> bool {
        let Some(name) = self.naming.output_name(input) else {
            return true;
        };
        let output = destination_dir.join(name);
        !is_output_fresh(self.fs.as_ref(), &output, self.fs.modified(input))
    }

    pub fn is_stale_input(&self, input: &Input) -> bool {
        self.is_stale(&input.source, &input.dest_dir)
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::OsString;
    use std::time::Duration;

    use super::*;
    use crate::fs::mock::MockFileSystem;

    struct ToWebp;

    impl OutputNaming for ToWebp {
        fn output_name(&self, input: &Path) -> Option<OsString> {
            Some(input.with_extension("webp").file_name()?.to_os_string())
        }
    }

    fn oracle(fs: &MockFileSystem) -> StalenessOracle<ToWebp> {
        StalenessOracle::new(Arc::new(fs.clone()), Arc::new(ToWebp))
    }

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn missing_output_is_stale() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/images/a.png", "png");

        assert!(oracle(&fs).is_stale(Path::new("./src/images/a.png"), Path::new("./dist/images")));
    }

    #[test]
    fn newer_input_is_stale_older_or_equal_is_fresh() {
        let fs = MockFileSystem::new();
        fs.add_file("./src/images/a.png", "png");
        fs.add_file("./dist/images/a.webp", "webp");
        let oracle = oracle(&fs);
        let input = Path::new("./src/images/a.png");
        let dest = Path::new("./dist/images");

        fs.set_modified(Path::new("./src/images/a.png"), at(200)).unwrap();
        fs.set_modified(Path::new("./dist/images/a.webp"), at(100)).unwrap();
        assert!(oracle.is_stale(input, dest));

        fs.set_modified(Path::new("./dist/images/a.webp"), at(200)).unwrap();
        assert!(!oracle.is_stale(input, dest));

        fs.set_modified(Path::new("./dist/images/a.webp"), at(300)).unwrap();
        assert!(!oracle.is_stale(input, dest));
    }

    #[test]
    fn unreadable_input_is_stale() {
        let fs = MockFileSystem::new();
        fs.add_file("./dist/images/ghost.webp", "webp");

        assert!(oracle(&fs).is_stale(Path::new("./src/images/ghost.png"), Path::new("./dist/images")));
    }

    #[test]
    fn real_files_use_filesystem_mtimes() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("a.png");
        let out_dir = dir.path().join("out");
        std::fs::create_dir_all(&out_dir)?;
        std::fs::write(&input, "png")?;
        let output = out_dir.join("a.webp");
        std::fs::write(&output, "webp")?;

        let fs: Arc<dyn FileSystem> = Arc::new(crate::fs::RealFileSystem);
        let oracle = StalenessOracle::new(fs, Arc::new(ToWebp));

        std::fs::File::options().write(true).open(&input)?.set_modified(at(2_000))?;
        std::fs::File::options().write(true).open(&output)?.set_modified(at(1_000))?;
        assert!(oracle.is_stale(&input, &out_dir));

        std::fs::File::options().write(true).open(&output)?.set_modified(at(3_000))?;
        assert!(!oracle.is_stale(&input, &out_dir));
        Ok(())
    }
}
