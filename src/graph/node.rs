// src/graph/node.rs

use std::fmt;

use crate::types::AssetClass;

/// A node of the build tree.
///
/// The tree is closed: leaves are the five asset stages plus `Clean`, and
/// composition is either ordered (`Sequence`) or concurrent (`Parallel`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskNode {
    /// Delete the output root.
    Clean,
    Leaf(AssetClass),
    /// Run children in order; stop at the first failing child.
    Sequence(Vec<TaskNode>),
    /// Run children concurrently; every child runs to completion.
    Parallel(Vec<TaskNode>),
}

impl TaskNode {
    pub fn leaf(class: AssetClass) -> Self {
        TaskNode::Leaf(class)
    }

    pub fn seq(children: impl IntoIterator<Item = TaskNode>) -> Self {
        TaskNode::Sequence(children.into_iter().collect())
    }

    pub fn par(children: impl IntoIterator<Item = TaskNode>) -> Self {
        TaskNode::Parallel(children.into_iter().collect())
    }

    /// Whether `other` is this node or appears anywhere below it.
    pub fn contains(&self, other: &TaskNode) -> bool {
        if self == other {
            return true;
        }
        match self {
            TaskNode::Sequence(children) | TaskNode::Parallel(children) => {
                children.iter().any(|c| c.contains(other))
            }
            TaskNode::Clean | TaskNode::Leaf(_) => false,
        }
    }

    /// Asset classes of every leaf below this node, in tree order.
    pub fn leaves(&self) -> Vec<AssetClass> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves(&self, out: &mut Vec<AssetClass>) {
        match self {
            TaskNode::Leaf(class) => out.push(*class),
            TaskNode::Sequence(children) | TaskNode::Parallel(children) => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
            TaskNode::Clean => {}
        }
    }

    /// Compact label, e.g. `seq[markup, styles]`.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TaskNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (prefix, children) = match self {
            TaskNode::Clean => return f.write_str("clean"),
            TaskNode::Leaf(class) => return write!(f, "{class}"),
            TaskNode::Sequence(children) => ("seq", children),
            TaskNode::Parallel(children) => ("par", children),
        };
        write!(f, "{prefix}[")?;
        for (i, child) in children.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{child}")?;
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use AssetClass::*;

    #[test]
    fn labels_nest() {
        let node = TaskNode::seq([
            TaskNode::Clean,
            TaskNode::par([TaskNode::leaf(Fonts), TaskNode::leaf(Images)]),
        ]);
        assert_eq!(node.label(), "seq[clean, par[fonts, images]]");
    }

    #[test]
    fn contains_is_reflexive_and_transitive() {
        let docs = TaskNode::seq([TaskNode::leaf(Markup), TaskNode::leaf(Styles)]);
        let root = TaskNode::par([docs.clone(), TaskNode::leaf(Scripts)]);

        assert!(docs.contains(&docs));
        assert!(docs.contains(&TaskNode::leaf(Styles)));
        assert!(root.contains(&TaskNode::leaf(Styles)));
        assert!(!docs.contains(&TaskNode::leaf(Scripts)));
        assert!(!TaskNode::leaf(Styles).contains(&docs));
    }
}
