// src/live/event.rs

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// How much of the page a client has to refresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ReloadScope {
    #[serde(rename = "full")]
    FullPage,
    #[serde(rename = "style")]
    StyleOnly,
}

/// Notification sent to connected browsers after a rebuild.
///
/// Serialized as `{"scope":"style","paths":["/styles/main.min.css"]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadEvent {
    pub scope: ReloadScope,
    #[serde(rename = "paths")]
    pub affected_paths: Vec<String>,
}

impl ReloadEvent {
    /// Classify the outputs of a run.
    ///
    /// Only stylesheets written -> [`ReloadScope::StyleOnly`]; anything else
    /// written -> [`ReloadScope::FullPage`]; nothing written -> `None`.
    pub fn from_outputs(outputs: &BTreeSet<PathBuf>, output_root: &Path) -> Option<Self> {
        if outputs.is_empty() {
            return None;
        }

        let style_only = outputs.iter().all(|p| is_stylesheet(p));
        Some(Self {
            scope: if style_only {
                ReloadScope::StyleOnly
            } else {
                ReloadScope::FullPage
            },
            affected_paths: outputs.iter().map(|p| url_path(p, output_root)).collect(),
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

fn is_stylesheet(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("css"))
}

/// URL path of an output as served from the output root.
fn url_path(path: &Path, output_root: &Path) -> String {
    let rel = path.strip_prefix(output_root).unwrap_or(path);
    let joined = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    format!("/{}", joined.trim_start_matches('/'))
}
