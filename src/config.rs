use serde::{Deserialize, Serialize};

/// All tuning knobs for one layout pass.
///
/// The struct is plain serializable data so callers can persist user-chosen
/// values however they like; the engine itself reads it only. The palette
/// callback is passed alongside the config (see [`crate::layout::layout`])
/// because it is code, not configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Squarified layout when true, ordered strip layout otherwise.
    pub squarify: bool,
    /// Render lit cushions. When off, tiles only carry their base color and
    /// no pixmaps are produced.
    pub cushion_shading: bool,
    /// Children thinner than this (px, along the subdivision axis) are
    /// dropped to bound the tile count.
    pub min_tile_size: f64,
    /// Minimum acceptable squarified row thickness (px) before the row is
    /// force-grown with further children.
    pub min_squarified_tile_height: f64,
    /// Cushion height factor applied at the first nesting level.
    pub cushion_height: f64,
    /// Per-level decay of the cushion height factor.
    pub cushion_height_scale: f64,
    /// Number of nesting levels the height sequence covers. Laying out a
    /// tree deeper than this is a contract violation.
    pub cushion_depth_capacity: usize,
    /// Lighting floor added to every pixel's intensity.
    pub ambient_light: f64,
    /// Light direction, pre-scaled so that `ambient_light` plus the vector's
    /// norm stays within 1 (keeps shaded channels in range by construction).
    pub light_x: f64,
    pub light_y: f64,
    pub light_z: f64,
    /// Force a visible boundary line where adjacent cushions come out
    /// near-identical.
    pub enforce_contrast: bool,
    /// A tile whose parent exceeds this size (px, either dimension) is a
    /// candidate for its own render task; a tile exceeding it in both
    /// dimensions defers dispatch to its children.
    pub max_tile_threshold: f64,
    /// Minimum tile width and height (px) for a render task of its own.
    pub min_thread_tile_size: f64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        // Light direction (1, 2, 10), normalized, scaled under the ambient
        // ceiling so intensity tops out at 1.0.
        Self {
            squarify: true,
            cushion_shading: true,
            min_tile_size: 3.0,
            min_squarified_tile_height: 8.0,
            cushion_height: 0.8,
            cushion_height_scale: 0.75,
            cushion_depth_capacity: 48,
            ambient_light: 0.3,
            light_x: 0.068_31,
            light_y: 0.136_63,
            light_z: 0.683_13,
            enforce_contrast: true,
            max_tile_threshold: 300.0,
            min_thread_tile_size: 60.0,
        }
    }
}

impl RenderConfig {
    /// Contract checks for values the algorithm cannot defend against
    /// locally. Violations are caller bugs, not recoverable errors.
    pub(crate) fn assert_valid(&self) {
        assert!(self.min_tile_size >= 0.0, "min_tile_size must be non-negative");
        assert!(
            self.min_squarified_tile_height >= 0.0,
            "min_squarified_tile_height must be non-negative"
        );
        assert!(self.cushion_depth_capacity > 0, "cushion height sequence cannot be empty");
    }

    /// Materialize the per-depth height sequence for one pass.
    pub fn cushion_heights(&self) -> CushionHeights {
        CushionHeights::new(
            self.cushion_height,
            self.cushion_height_scale,
            self.cushion_depth_capacity,
        )
    }
}

/// Per-nesting-depth cushion height factors, computed once per layout pass
/// and passed down the recursion explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct CushionHeights {
    factors: Vec<f64>,
}

impl CushionHeights {
    pub fn new(base: f64, scale: f64, capacity: usize) -> Self {
        let mut factors = Vec::with_capacity(capacity);
        let mut h = base;
        for _ in 0..capacity {
            factors.push(h);
            h *= scale;
        }
        Self { factors }
    }

    /// Height factor for a child whose parent sits at `depth` (root = 0).
    pub fn factor(&self, depth: usize) -> f64 {
        assert!(
            depth < self.factors.len(),
            "cushion height sequence exhausted at nesting depth {depth}"
        );
        self.factors[depth]
    }

    pub fn len(&self) -> usize {
        self.factors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }
}
