// src/stage/inputs.rs

use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::config::{Layout, PathSpec};
use crate::fs::FileSystem;
use crate::stage::Input;

/// Collect every file matching `spec.source`, paired with the directory its
/// output belongs in.
///
/// Walks the literal base directory of the source glob; a missing base yields
/// no inputs. The result is sorted by source path.
pub fn collect_inputs(fs: &dyn FileSystem, layout: &Layout, spec: &PathSpec) -> Result<Vec<Input>> {
    let base = layout.resolve(spec.base());
    if !fs.is_dir(&base) {
        debug!(class = %spec.class(), base = ?base, "source base missing; no inputs");
        return Ok(Vec::new());
    }

    let dest_root = layout.resolve(spec.dest());
    let mut inputs = Vec::new();
    let mut stack = vec![base.clone()];

    while let Some(dir) = stack.pop() {
        for path in fs.read_dir(&dir)? {
            if fs.is_dir(&path) {
                stack.push(path);
            } else if fs.is_file(&path) {
                let Some(rel) = project_relative(&layout.project_dir, &path) else {
                    continue;
                };
                if spec.is_source(&rel) {
                    let dest_dir = dest_dir_for(&base, &dest_root, &path);
                    inputs.push(Input {
                        source: path,
                        dest_dir,
                    });
                }
            }
        }
    }

    inputs.sort();
    Ok(inputs)
}

fn project_relative(project_dir: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(project_dir).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

/// `dest_root` joined with the input's directory relative to `base`.
fn dest_dir_for(base: &Path, dest_root: &Path, input: &Path) -> PathBuf {
    match input.strip_prefix(base).ok().and_then(Path::parent) {
        Some(sub) if !sub.as_os_str().is_empty() => dest_root.join(sub),
        _ => dest_root.to_path_buf(),
    }
}
