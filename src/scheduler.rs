use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::trace;

use crate::config::RenderConfig;
use crate::geometry::Rect;
use crate::node::WeightedNode;
use crate::render::render_cushion;
use crate::tile::Tile;

/// Shared cancellation flag for one layout pass.
///
/// The flag only ever transitions false → true. It is the single piece of
/// state touched from multiple threads, so the store is `Release` and the
/// loads are `Acquire`; everything else in a pass is either built before the
/// tasks start or written through disjoint write-once cells.
#[derive(Debug, Default)]
pub struct CancelFlag(AtomicBool);

impl CancelFlag {
    pub fn new() -> Self {
        Self(AtomicBool::new(false))
    }

    /// Request cancellation. Subdivision stops at the next container and
    /// in-flight render tasks exit before their next tile.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Purely geometric decision whether a tile's subtree gets its own render
/// task. Subtrees already covered by an ancestor's task never re-dispatch.
pub(crate) fn dispatch_decision<N: WeightedNode>(
    config: &RenderConfig,
    node: &N,
    rect: Rect,
    parent_rect: Option<Rect>,
    covered: bool,
) -> bool {
    if covered || !config.cushion_shading {
        return false;
    }

    // Too small to be worth a task of its own.
    if rect.width < config.min_thread_tile_size || rect.height < config.min_thread_tile_size {
        return false;
    }

    // Only the root, or children of a large parent, start tasks.
    let threshold = config.max_tile_threshold;
    match parent_rect {
        None => {}
        Some(p) if p.width > threshold || p.height > threshold => {}
        Some(_) => return false,
    }

    // A tile large in both dimensions whose children are all containers
    // defers to those children for finer-grained tasks.
    if rect.width >= threshold && rect.height >= threshold && node.is_container() {
        let mut children = node.children().peekable();
        if children.peek().is_some() && children.all(|c| c.is_container()) {
            return false;
        }
    }

    true
}

/// Hands finished subtrees to rayon and renders whatever no task covers.
///
/// Owned by one layout pass; the pass's rayon scope joins every spawned
/// task before `layout` returns, which is the only blocking point in the
/// engine.
pub(crate) struct RenderScheduler<'a, 'scope> {
    scope: &'a rayon::Scope<'scope>,
    config: &'scope RenderConfig,
    cancel: &'scope CancelFlag,
}

impl<'a, 'scope> RenderScheduler<'a, 'scope> {
    pub(crate) fn new(
        scope: &'a rayon::Scope<'scope>,
        config: &'scope RenderConfig,
        cancel: &'scope CancelFlag,
    ) -> Self {
        Self { scope, config, cancel }
    }

    pub(crate) fn should_dispatch<N: WeightedNode>(
        &self,
        node: &N,
        rect: Rect,
        parent_rect: Option<Rect>,
        covered: bool,
    ) -> bool {
        dispatch_decision(self.config, node, rect, parent_rect, covered)
    }

    /// Spawn a task rendering every leaf of `tile`'s subtree. The subtree is
    /// fully built by the time this is called; the task never spawns
    /// further tasks of its own.
    pub(crate) fn spawn_render<N>(&self, tile: Arc<Tile<N>>)
    where
        N: WeightedNode + Send + Sync + 'scope,
    {
        let rect = tile.rect();
        trace!("dispatching render task for {:.0}x{:.0} tile", rect.width, rect.height);
        let config = self.config;
        let cancel = self.cancel;
        self.scope.spawn(move |_| {
            if cancel.is_cancelled() {
                return;
            }
            render_subtree(&tile, config, cancel);
        });
    }

    /// Render, on the calling thread, every leaf no task is responsible
    /// for. Runs after the tile tree is complete, before the scope join.
    pub(crate) fn render_uncovered<N: WeightedNode>(&self, tile: &Tile<N>) {
        if !self.config.cushion_shading || tile.covered() {
            return;
        }
        if tile.is_leaf() {
            if !self.cancel.is_cancelled() {
                tile.store_pixmap(render_cushion(
                    tile.rect(),
                    tile.surface(),
                    tile.base_color(),
                    self.config,
                ));
            }
            return;
        }
        for child in tile.children() {
            self.render_uncovered(child);
        }
    }
}

/// Render all leaves below `tile`, checking for cancellation between tiles
/// so a cancel takes effect within one tile's render time.
pub(crate) fn render_subtree<N: WeightedNode>(
    tile: &Tile<N>,
    config: &RenderConfig,
    cancel: &CancelFlag,
) {
    if tile.is_leaf() {
        if !cancel.is_cancelled() {
            tile.store_pixmap(render_cushion(tile.rect(), tile.surface(), tile.base_color(), config));
        }
        return;
    }
    for child in tile.children() {
        if cancel.is_cancelled() {
            return;
        }
        render_subtree(child, config, cancel);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SizeTree;

    fn config() -> RenderConfig {
        RenderConfig {
            min_thread_tile_size: 50.0,
            max_tile_threshold: 300.0,
            ..RenderConfig::default()
        }
    }

    #[test]
    fn test_cancel_flag_transitions_once() {
        let flag = CancelFlag::new();
        assert!(!flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
        flag.cancel();
        assert!(flag.is_cancelled());
    }

    #[test]
    fn test_dispatch_requires_minimum_tile_size() {
        let mut tree = SizeTree::new("root");
        let root = tree.root();
        tree.add_leaf(root, "a", 10);
        tree.aggregate();
        let node = tree.node(root);
        let cfg = config();

        assert!(dispatch_decision(&cfg, &node, Rect::new(0.0, 0.0, 60.0, 60.0), None, false));
        assert!(!dispatch_decision(&cfg, &node, Rect::new(0.0, 0.0, 40.0, 60.0), None, false));
        assert!(!dispatch_decision(&cfg, &node, Rect::new(0.0, 0.0, 60.0, 40.0), None, false));
    }

    #[test]
    fn test_dispatch_requires_root_or_large_parent() {
        let mut tree = SizeTree::new("root");
        let root = tree.root();
        tree.add_leaf(root, "a", 10);
        tree.aggregate();
        let node = tree.node(root);
        let cfg = config();
        let rect = Rect::new(0.0, 0.0, 100.0, 100.0);

        // Root always qualifies.
        assert!(dispatch_decision(&cfg, &node, rect, None, false));
        // Small parent: defer to the parent's own task.
        assert!(!dispatch_decision(&cfg, &node, rect, Some(Rect::new(0.0, 0.0, 200.0, 200.0)), false));
        // Large parent in one dimension is enough.
        assert!(dispatch_decision(&cfg, &node, rect, Some(Rect::new(0.0, 0.0, 400.0, 200.0)), false));
    }

    #[test]
    fn test_dispatch_defers_large_all_container_tiles_to_children() {
        let mut tree = SizeTree::new("root");
        let root = tree.root();
        let d1 = tree.add_dir(root, "d1");
        let d2 = tree.add_dir(root, "d2");
        tree.add_leaf(d1, "a", 10);
        tree.add_leaf(d2, "b", 10);
        tree.aggregate();
        let node = tree.node(root);
        let cfg = config();

        // Large in both dimensions, children all directories: defer.
        assert!(!dispatch_decision(&cfg, &node, Rect::new(0.0, 0.0, 400.0, 400.0), None, false));
        // Large in one dimension only: dispatch here.
        assert!(dispatch_decision(&cfg, &node, Rect::new(0.0, 0.0, 400.0, 200.0), None, false));

        // With a direct leaf child the tile renders as one unit.
        tree.add_leaf(root, "loose", 10);
        tree.aggregate();
        let node = tree.node(root);
        assert!(dispatch_decision(&cfg, &node, Rect::new(0.0, 0.0, 400.0, 400.0), None, false));
    }

    #[test]
    fn test_covered_subtrees_never_redispatch() {
        let mut tree = SizeTree::new("root");
        let root = tree.root();
        tree.add_leaf(root, "a", 10);
        tree.aggregate();
        let node = tree.node(root);
        let cfg = config();
        assert!(!dispatch_decision(&cfg, &node, Rect::new(0.0, 0.0, 500.0, 500.0), None, true));
    }

    #[test]
    fn test_plain_color_mode_never_dispatches() {
        let mut tree = SizeTree::new("root");
        let root = tree.root();
        tree.add_leaf(root, "a", 10);
        tree.aggregate();
        let node = tree.node(root);
        let cfg = RenderConfig { cushion_shading: false, ..config() };
        assert!(!dispatch_decision(&cfg, &node, Rect::new(0.0, 0.0, 500.0, 500.0), None, false));
    }
}
