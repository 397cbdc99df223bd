// src/graph/topology.rs

//! The fixed shape of the build.
//!
//! ```text
//! seq[clean, par[fonts, images], par[seq[markup, styles], scripts]]
//! ```
//!
//! Markup precedes styles because style commands may scan the built markup
//! (via `{output_root}`) to drop unused rules.

use crate::graph::TaskNode;
use crate::types::AssetClass;

/// Fonts and images, which have no ordering constraints.
pub fn static_assets() -> TaskNode {
    TaskNode::par([
        TaskNode::leaf(AssetClass::Fonts),
        TaskNode::leaf(AssetClass::Images),
    ])
}

/// Markup, then the styles that depend on it.
pub fn documents() -> TaskNode {
    TaskNode::seq([
        TaskNode::leaf(AssetClass::Markup),
        TaskNode::leaf(AssetClass::Styles),
    ])
}

/// Documents alongside scripts.
pub fn front_end() -> TaskNode {
    TaskNode::par([documents(), TaskNode::leaf(AssetClass::Scripts)])
}

/// The complete build tree.
pub fn full_build() -> TaskNode {
    TaskNode::seq([TaskNode::Clean, static_assets(), front_end()])
}

/// Sub-tree rerun when a file under the class's watch pattern changes.
pub fn watch_target(class: AssetClass) -> TaskNode {
    match class {
        AssetClass::Markup => documents(),
        other => TaskNode::leaf(other),
    }
}
