use std::sync::{Arc, OnceLock};

use crate::color::Rgb;
use crate::cushion::CushionSurface;
use crate::geometry::Rect;
use crate::node::WeightedNode;
use crate::render::CushionPixmap;

/// One rectangle of the finished layout, owning its cushion surface and the
/// lazily rendered pixmap.
///
/// Tiles form a tree isomorphic to the visited part of the caller's node
/// tree. A tile with children is fully covered by them and is never painted
/// itself; a tile without children is a leaf the caller paints, either from
/// [`rendered`](Self::rendered) or as a flat [`base_color`](Self::base_color)
/// fill when shading is off.
///
/// Children are `Arc`-shared so a render task can hold a finished subtree
/// while the layout pass keeps building siblings above it.
#[derive(Debug)]
pub struct Tile<N> {
    node: N,
    rect: Rect,
    surface: CushionSurface,
    color: Rgb,
    children: Vec<Arc<Tile<N>>>,
    /// Set when some task (possibly of an ancestor) renders this subtree.
    covered: bool,
    pixmap: OnceLock<CushionPixmap>,
}

impl<N: WeightedNode> Tile<N> {
    pub(crate) fn new(
        node: N,
        rect: Rect,
        surface: CushionSurface,
        color: Rgb,
        children: Vec<Arc<Tile<N>>>,
        covered: bool,
    ) -> Self {
        Self { node, rect, surface, color, children, covered, pixmap: OnceLock::new() }
    }

    /// The caller's node this tile represents.
    pub fn node(&self) -> &N {
        &self.node
    }

    pub fn rect(&self) -> Rect {
        self.rect
    }

    pub fn surface(&self) -> &CushionSurface {
        &self.surface
    }

    /// Unshaded base color from the palette callback.
    pub fn base_color(&self) -> Rgb {
        self.color
    }

    pub fn children(&self) -> &[Arc<Tile<N>>] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// The shaded pixmap, present once cushion rendering has run for this
    /// tile. Absent for container tiles, in plain-color mode, and after a
    /// cancelled pass.
    pub fn rendered(&self) -> Option<&CushionPixmap> {
        self.pixmap.get()
    }

    pub(crate) fn covered(&self) -> bool {
        self.covered
    }

    pub(crate) fn store_pixmap(&self, pixmap: CushionPixmap) {
        // Task subtrees are disjoint, so a second write never happens; if a
        // caller keeps the tree across passes the first write wins.
        let _ = self.pixmap.set(pixmap);
    }

    /// Number of tiles in this subtree, excluding `self`.
    pub fn descendant_count(&self) -> usize {
        self.children.iter().map(|c| 1 + c.descendant_count()).sum()
    }

    /// Visit every leaf tile in depth-first order.
    pub fn for_each_leaf<'a>(&'a self, f: &mut impl FnMut(&'a Tile<N>)) {
        if self.is_leaf() {
            f(self);
        } else {
            for child in &self.children {
                child.for_each_leaf(f);
            }
        }
    }

    /// Deepest tile whose rectangle contains the point, for hit testing in
    /// the caller's interaction layer.
    pub fn tile_at(&self, x: f64, y: f64) -> Option<&Tile<N>> {
        if !self.rect.contains(x, y) {
            return None;
        }
        for child in &self.children {
            if let Some(hit) = child.tile_at(x, y) {
                return Some(hit);
            }
        }
        Some(self)
    }
}
