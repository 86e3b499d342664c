use indextree::{Arena, NodeId};

use crate::node::WeightedNode;

/// One entry in a [`SizeTree`].
#[derive(Debug, Clone)]
struct SizeEntry {
    label: String,
    size: u64,
    is_dir: bool,
    /// Subtree total, filled in by [`SizeTree::aggregate`].
    total: u64,
}

/// A ready-made weighted tree backed by an arena allocator.
///
/// The layout engine only consumes the [`WeightedNode`] trait; this tree
/// exists so callers with a flat list of (path, size) records — and this
/// crate's own tests — have something to pour them into without writing an
/// adapter first. Build it up with [`add_dir`](Self::add_dir) /
/// [`add_leaf`](Self::add_leaf), then call [`aggregate`](Self::aggregate)
/// once before layout.
#[derive(Debug)]
pub struct SizeTree {
    arena: Arena<SizeEntry>,
    root: NodeId,
}

impl SizeTree {
    pub fn new(root_label: impl Into<String>) -> Self {
        let mut arena = Arena::new();
        let root = arena.new_node(SizeEntry {
            label: root_label.into(),
            size: 0,
            is_dir: true,
            total: 0,
        });
        Self { arena, root }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Append a container child under `parent`.
    pub fn add_dir(&mut self, parent: NodeId, label: impl Into<String>) -> NodeId {
        let id = self.arena.new_node(SizeEntry {
            label: label.into(),
            size: 0,
            is_dir: true,
            total: 0,
        });
        parent.append(id, &mut self.arena);
        id
    }

    /// Append a leaf child of the given size under `parent`.
    pub fn add_leaf(&mut self, parent: NodeId, label: impl Into<String>, size: u64) -> NodeId {
        let id = self.arena.new_node(SizeEntry {
            label: label.into(),
            size,
            is_dir: false,
            total: size,
        });
        parent.append(id, &mut self.arena);
        id
    }

    /// Recompute subtree totals bottom-up. Call after the tree is built (or
    /// rebuilt); totals are what the engine sees as node weights.
    pub fn aggregate(&mut self) {
        self.aggregate_recursive(self.root);
    }

    fn aggregate_recursive(&mut self, id: NodeId) -> u64 {
        // Collect children first (to avoid borrow issues)
        let children: Vec<NodeId> = id.children(&self.arena).collect();
        let mut total = 0u64;
        for child in children {
            total += self.aggregate_recursive(child);
        }

        if let Some(node) = self.arena.get_mut(id) {
            let entry = node.get_mut();
            if entry.is_dir {
                entry.total = total;
            } else {
                entry.total = entry.size;
                total = entry.size;
            }
        }
        total
    }

    pub fn total_size(&self) -> u64 {
        self.entry(self.root).total
    }

    pub fn label(&self, id: NodeId) -> &str {
        &self.entry(id).label
    }

    pub fn size(&self, id: NodeId) -> u64 {
        self.entry(id).total
    }

    /// Handle for the layout engine.
    pub fn node(&self, id: NodeId) -> SizeNodeRef<'_> {
        SizeNodeRef { tree: self, id }
    }

    fn entry(&self, id: NodeId) -> &SizeEntry {
        self.arena.get(id).expect("node belongs to this arena").get()
    }
}

/// Copyable [`WeightedNode`] handle into a [`SizeTree`].
#[derive(Debug, Clone, Copy)]
pub struct SizeNodeRef<'t> {
    tree: &'t SizeTree,
    id: NodeId,
}

impl<'t> SizeNodeRef<'t> {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn label(&self) -> &'t str {
        self.tree.label(self.id)
    }
}

impl<'t> WeightedNode for SizeNodeRef<'t> {
    fn weight(&self) -> u64 {
        self.tree.entry(self.id).total
    }

    fn is_container(&self) -> bool {
        self.tree.entry(self.id).is_dir
    }

    fn children(&self) -> impl Iterator<Item = Self> {
        let tree = self.tree;
        self.id.children(&tree.arena).map(move |id| SizeNodeRef { tree, id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_totals() {
        let mut tree = SizeTree::new("root");
        let root = tree.root();
        tree.add_leaf(root, "file1", 100);
        let dir1 = tree.add_dir(root, "dir1");
        tree.add_leaf(dir1, "file2", 200);
        tree.add_leaf(dir1, "file3", 50);
        tree.aggregate();

        assert_eq!(tree.total_size(), 350);
        assert_eq!(tree.size(dir1), 250);
    }

    #[test]
    fn test_handles_expose_the_weighted_view() {
        let mut tree = SizeTree::new("root");
        let root = tree.root();
        let dir = tree.add_dir(root, "dir");
        tree.add_leaf(dir, "a", 10);
        tree.add_leaf(dir, "b", 20);
        tree.aggregate();

        let node = tree.node(root);
        assert!(node.is_container());
        assert_eq!(node.weight(), 30);

        let children: Vec<_> = node.children().collect();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].label(), "dir");
        assert_eq!(children[0].weight(), 30);
        assert_eq!(children[0].children().count(), 2);
    }

    #[test]
    fn test_empty_dir_has_zero_weight() {
        let mut tree = SizeTree::new("root");
        let root = tree.root();
        tree.add_dir(root, "empty");
        tree.aggregate();
        assert_eq!(tree.total_size(), 0);
    }
}
