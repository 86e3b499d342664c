use std::sync::Arc;

use log::debug;

use crate::color::Rgb;
use crate::config::{CushionHeights, RenderConfig};
use crate::cushion::CushionSurface;
use crate::geometry::Rect;
use crate::node::{SortedChildren, WeightedNode};
use crate::scheduler::{CancelFlag, RenderScheduler};
use crate::tile::Tile;

/// Which axis a strip subdivision partitions. Containers recurse with the
/// opposite orientation, which is what keeps simple strip layout from
/// degenerating into parallel stripes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Orientation {
    /// Children side by side along x.
    Horizontal,
    /// Children stacked along y.
    Vertical,
}

impl Orientation {
    fn flipped(self) -> Self {
        match self {
            Self::Horizontal => Self::Vertical,
            Self::Vertical => Self::Horizontal,
        }
    }

    fn for_rect(rect: Rect) -> Self {
        if rect.width >= rect.height {
            Self::Horizontal
        } else {
            Self::Vertical
        }
    }

    fn primary_extent(self, rect: Rect) -> f64 {
        match self {
            Self::Horizontal => rect.width,
            Self::Vertical => rect.height,
        }
    }
}

/// Lay out `node`'s subtree inside `rect` and render cushion shading for
/// every produced leaf.
///
/// The returned tile's rectangle equals `rect`; its children partition the
/// rectangle in proportion to their weights, modulo the configured culling
/// and pixel-grid rounding. Cushion rendering for large subtrees runs on
/// rayon's pool; all of it is joined before this function returns, so the
/// caller can paint immediately. With `config.cushion_shading` off the tree
/// comes back without pixmaps and the caller fills rectangles with each
/// tile's base color instead.
///
/// `color_of` maps a leaf (or childless container) to its unshaded base
/// color. `cancel` may be flipped from another thread at any time; a
/// cancelled pass returns promptly with a partial tree that the caller
/// should discard.
pub fn layout<N, F>(
    node: N,
    rect: Rect,
    config: &RenderConfig,
    color_of: F,
    cancel: &CancelFlag,
) -> Arc<Tile<N>>
where
    N: WeightedNode + Send + Sync,
    F: Fn(&N) -> Rgb,
{
    config.assert_valid();
    debug_assert!(!rect.is_empty(), "layout rect must have positive area");

    let heights = config.cushion_heights();
    rayon::in_place_scope(|scope| {
        let pass = LayoutPass {
            config,
            heights: &heights,
            color_of: &color_of,
            cancel,
            scheduler: RenderScheduler::new(scope, config, cancel),
        };
        let root = pass.build_tile(
            node,
            rect,
            None,
            CushionSurface::flat(),
            0,
            Orientation::for_rect(rect),
            false,
        );
        pass.scheduler.render_uncovered(&root);
        root
        // Scope join: every dispatched render task finishes here.
    })
}

struct LayoutPass<'a, 'scope, F> {
    config: &'a RenderConfig,
    heights: &'a CushionHeights,
    color_of: &'a F,
    cancel: &'a CancelFlag,
    scheduler: RenderScheduler<'a, 'scope>,
}

impl<'a, 'scope, F> LayoutPass<'a, 'scope, F> {
    /// Create the tile for `node`, subdividing into children when it is a
    /// container with weight. `depth` is the tile's own nesting depth,
    /// `dir` the orientation its children are laid out in (strip mode),
    /// `covered` whether an ancestor's render task owns this subtree.
    fn build_tile<N>(
        &self,
        node: N,
        rect: Rect,
        parent_rect: Option<Rect>,
        surface: CushionSurface,
        depth: usize,
        dir: Orientation,
        covered: bool,
    ) -> Arc<Tile<N>>
    where
        N: WeightedNode + Send + Sync + 'scope,
        F: Fn(&N) -> Rgb,
    {
        let dispatch = self.scheduler.should_dispatch(&node, rect, parent_rect, covered);
        let sub_covered = covered || dispatch;

        let children = if node.is_container() && node.weight() > 0 {
            self.subdivide(&node, rect, &surface, depth, dir, sub_covered)
        } else {
            Vec::new()
        };

        let color = (self.color_of)(&node);
        let tile = Arc::new(Tile::new(node, rect, surface, color, children, sub_covered));
        if dispatch {
            // The subtree is complete; hand it off as one unit of work.
            self.scheduler.spawn_render(Arc::clone(&tile));
        }
        tile
    }

    fn subdivide<N>(
        &self,
        node: &N,
        rect: Rect,
        surface: &CushionSurface,
        depth: usize,
        dir: Orientation,
        covered: bool,
    ) -> Vec<Arc<Tile<N>>>
    where
        N: WeightedNode + Send + Sync + 'scope,
        F: Fn(&N) -> Rgb,
    {
        if self.cancel.is_cancelled() || rect.is_empty() {
            return Vec::new();
        }
        if self.config.squarify {
            self.squarify_children(node, rect, surface, depth, covered)
        } else {
            self.strip_children(node, rect, surface, depth, dir, covered)
        }
    }

    /// Ordered-strip subdivision: the full primary extent is split among the
    /// weight-sorted children. Offsets always come from the cumulative
    /// weight sum so rounding error cannot accumulate across many small
    /// children; a child only materializes once the boundary has advanced
    /// past `min_tile_size` since the previous tile, and a culled child's
    /// weight still moves the cumulative offset.
    fn strip_children<N>(
        &self,
        node: &N,
        rect: Rect,
        surface: &CushionSurface,
        depth: usize,
        dir: Orientation,
        covered: bool,
    ) -> Vec<Arc<Tile<N>>>
    where
        N: WeightedNode + Send + Sync + 'scope,
        F: Fn(&N) -> Rgb,
    {
        let children = SortedChildren::collect(node, false);
        let total = children.total_weight();
        if total == 0 {
            return Vec::new();
        }

        let extent = dir.primary_extent(rect);
        let scale = extent / total as f64;
        let min_tile = self.config.min_tile_size;

        let mut tiles = Vec::new();
        let mut cumulative = 0u64;
        let mut offset = 0.0f64;
        let mut next_offset = min_tile.min(extent);
        let mut culled = 0usize;

        for child in children.as_slice() {
            cumulative += child.weight();
            let new_offset = (scale * cumulative as f64).round().min(extent);
            if new_offset < next_offset || new_offset <= offset {
                culled += 1;
                continue;
            }

            let child_rect = match dir {
                Orientation::Horizontal => {
                    Rect::new(rect.x + offset, rect.y, new_offset - offset, rect.height)
                }
                Orientation::Vertical => {
                    Rect::new(rect.x, rect.y + offset, rect.width, new_offset - offset)
                }
            };

            let mut child_surface =
                CushionSurface::derive_scaled(surface, self.heights.factor(depth));
            match dir {
                Orientation::Horizontal => child_surface.add_vertical_ridge(rect.y, rect.bottom()),
                Orientation::Vertical => child_surface.add_horizontal_ridge(rect.x, rect.right()),
            }

            tiles.push(self.build_tile(
                *child,
                child_rect,
                Some(rect),
                child_surface,
                depth + 1,
                dir.flipped(),
                covered,
            ));
            offset = new_offset;
            next_offset = (offset + min_tile).min(extent);
        }

        if culled > 0 {
            debug!("strip layout culled {culled} of {} children below min tile size", children.len());
        }
        tiles
    }

    /// Squarified subdivision: peel rows off the remaining rectangle, each
    /// row along its current shorter side, growing a row greedily while the
    /// worst aspect ratio does not get worse.
    fn squarify_children<N>(
        &self,
        node: &N,
        rect: Rect,
        surface: &CushionSurface,
        depth: usize,
        covered: bool,
    ) -> Vec<Arc<Tile<N>>>
    where
        N: WeightedNode + Send + Sync + 'scope,
        F: Fn(&N) -> Rgb,
    {
        let mut children = SortedChildren::collect(node, true);
        let mut remaining_weight = children.total_weight();
        if remaining_weight == 0 {
            return Vec::new();
        }

        let mut remaining = rect;
        let mut tiles = Vec::new();

        while children.position() < children.len()
            && remaining_weight > 0
            && !remaining.is_empty()
        {
            let row_start = children.position();
            let slice = children.remaining();

            // A horizontal row spans the full width and grows downward;
            // rows always span the shorter side of what is left.
            let horizontal_row = remaining.width <= remaining.height;
            let (prim_extent, sec_extent) = if horizontal_row {
                (remaining.width, remaining.height)
            } else {
                (remaining.height, remaining.width)
            };

            let mut count = 1;
            let mut sum = slice[0].weight();
            let mut w_min = sum;
            let mut w_max = sum;
            let mut best =
                worst_aspect(sum, w_min, w_max, prim_extent, sec_extent, remaining_weight);
            while count < slice.len() {
                let w = slice[count].weight();
                let next = worst_aspect(
                    sum + w,
                    w_min.min(w),
                    w_max.max(w),
                    prim_extent,
                    sec_extent,
                    remaining_weight,
                );
                if next > best {
                    break;
                }
                sum += w;
                w_min = w_min.min(w);
                w_max = w_max.max(w);
                best = next;
                count += 1;
            }

            // Force-grow rows that would come out thinner than the
            // configured minimum, trading aspect quality for progress. A
            // row that exhausts the children absorbs all remaining weight.
            let mut thickness = sec_extent * sum as f64 / remaining_weight as f64;
            if sum < remaining_weight {
                while thickness <= self.config.min_squarified_tile_height && count < slice.len() {
                    sum += slice[count].weight();
                    count += 1;
                    thickness = sec_extent * sum as f64 / remaining_weight as f64;
                }
            }

            let row_rect = if horizontal_row {
                Rect::new(remaining.x, remaining.y, remaining.width, thickness)
            } else {
                Rect::new(remaining.x, remaining.y, thickness, remaining.height)
            };
            self.layout_row(
                &slice[..count],
                sum,
                row_rect,
                rect,
                surface,
                depth,
                horizontal_row,
                covered,
                &mut tiles,
            );

            children.set_position(row_start + count);
            remaining_weight -= sum;
            remaining = if horizontal_row {
                Rect::new(
                    remaining.x,
                    remaining.y + thickness,
                    remaining.width,
                    (remaining.height - thickness).max(0.0),
                )
            } else {
                Rect::new(
                    remaining.x + thickness,
                    remaining.y,
                    (remaining.width - thickness).max(0.0),
                    remaining.height,
                )
            };
        }

        tiles
    }

    /// Distribute one resolved row among its children with the same
    /// cumulative rounding and culling as strip layout. The row carries one
    /// shared surface, ridged across the row's thickness; each child then
    /// adds its own ridge along the row.
    #[allow(clippy::too_many_arguments)]
    fn layout_row<N>(
        &self,
        row: &[N],
        row_weight: u64,
        row_rect: Rect,
        parent_rect: Rect,
        parent_surface: &CushionSurface,
        depth: usize,
        horizontal_row: bool,
        covered: bool,
        tiles: &mut Vec<Arc<Tile<N>>>,
    ) where
        N: WeightedNode + Send + Sync + 'scope,
        F: Fn(&N) -> Rgb,
    {
        let mut row_surface =
            CushionSurface::derive_scaled(parent_surface, self.heights.factor(depth));
        if horizontal_row {
            row_surface.add_vertical_ridge(row_rect.y, row_rect.bottom());
        } else {
            row_surface.add_horizontal_ridge(row_rect.x, row_rect.right());
        }

        let extent = if horizontal_row { row_rect.width } else { row_rect.height };
        let scale = extent / row_weight as f64;
        let min_tile = self.config.min_tile_size;

        let mut cumulative = 0u64;
        let mut offset = 0.0f64;
        let mut next_offset = min_tile.min(extent);
        let mut culled = 0usize;

        for child in row {
            cumulative += child.weight();
            let new_offset = (scale * cumulative as f64).round().min(extent);
            if new_offset < next_offset || new_offset <= offset {
                culled += 1;
                continue;
            }

            let child_rect = if horizontal_row {
                Rect::new(row_rect.x + offset, row_rect.y, new_offset - offset, row_rect.height)
            } else {
                Rect::new(row_rect.x, row_rect.y + offset, row_rect.width, new_offset - offset)
            };

            let mut child_surface = row_surface;
            if horizontal_row {
                child_surface.add_horizontal_ridge(child_rect.x, child_rect.right());
            } else {
                child_surface.add_vertical_ridge(child_rect.y, child_rect.bottom());
            }

            tiles.push(self.build_tile(
                *child,
                child_rect,
                Some(parent_rect),
                child_surface,
                depth + 1,
                Orientation::for_rect(child_rect),
                covered,
            ));
            offset = new_offset;
            next_offset = (offset + min_tile).min(extent);
        }

        if culled > 0 {
            debug!("squarified row culled {culled} of {} children below min tile size", row.len());
        }
    }
}

/// Worst aspect ratio a candidate row would have: the most extreme of
/// thickness-over-length and length-over-thickness across its members,
/// which is attained at the lightest and heaviest member respectively.
fn worst_aspect(
    sum: u64,
    w_min: u64,
    w_max: u64,
    prim_extent: f64,
    sec_extent: f64,
    remaining_weight: u64,
) -> f64 {
    if sum == 0 || w_min == 0 || prim_extent <= 0.0 {
        return f64::INFINITY;
    }
    let sum = sum as f64;
    let thickness = sec_extent * sum / remaining_weight as f64;
    if thickness <= 0.0 {
        return f64::INFINITY;
    }
    let a = thickness * sum / (prim_extent * w_min as f64);
    let b = (prim_extent * w_max as f64) / (thickness * sum);
    a.max(b)
}
