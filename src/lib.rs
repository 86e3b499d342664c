//! Treemap tiling with cushion-shaded rendering.
//!
//! Turns a tree of weighted nodes plus a rectangle into a tree of tiles:
//! each tile gets a weight-proportional sub-rectangle and, for leaves, a
//! per-pixel shaded RGB image that makes the tile read as a lit 3D cushion.
//! Rendering of large subtrees is fanned out over rayon and joined before
//! [`layout`] returns.
//!
//! The engine is toolkit-independent: callers implement [`WeightedNode`]
//! over their own tree (or use [`SizeTree`]), call [`layout`], and paint the
//! resulting [`Tile`] rectangles however they like.
//!
//! ```
//! use cushionmap::{layout, CancelFlag, Rect, RenderConfig, Rgb, SizeTree};
//!
//! let mut tree = SizeTree::new("root");
//! let root = tree.root();
//! tree.add_leaf(root, "a", 600);
//! tree.add_leaf(root, "b", 400);
//! tree.aggregate();
//!
//! let config = RenderConfig::default();
//! let cancel = CancelFlag::new();
//! let tiles = layout(
//!     tree.node(root),
//!     Rect::new(0.0, 0.0, 1024.0, 768.0),
//!     &config,
//!     |_| Rgb::new(0x4a, 0x90, 0xd9),
//!     &cancel,
//! );
//! assert_eq!(tiles.children().len(), 2);
//! ```

mod color;
mod config;
mod cushion;
mod geometry;
mod layout;
mod model;
mod node;
mod render;
mod scheduler;
mod tile;

pub use color::Rgb;
pub use config::{CushionHeights, RenderConfig};
pub use cushion::CushionSurface;
pub use geometry::Rect;
pub use layout::layout;
pub use model::{SizeNodeRef, SizeTree};
pub use node::{SortedChildren, WeightedNode};
pub use render::{render_cushion, CushionPixmap};
pub use scheduler::CancelFlag;
pub use tile::Tile;
