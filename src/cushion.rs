/// Coefficients of the quadratic height field that gives a tile its 3D
/// cushion look (van Wijk & van de Wetering, "Cushion Treemaps").
///
/// The field is `h(x, y) = xx2*x² + xx1*x + yy2*y² + yy1*y`, evaluated in
/// scene coordinates. A tile's surface is derived from its parent's at
/// construction time and then receives at most one ridge per axis for the
/// subdivision step that created it; after that it is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CushionSurface {
    xx1: f64,
    xx2: f64,
    yy1: f64,
    yy2: f64,
}

impl CushionSurface {
    /// The flat surface the root tile starts from.
    pub fn flat() -> Self {
        Self::default()
    }

    /// Copy a parent surface with all four coefficients scaled by the height
    /// factor for the child's nesting depth. Inherited ridges fade with
    /// depth; the ridges added afterwards are at full height.
    pub fn derive_scaled(parent: &Self, height_factor: f64) -> Self {
        Self {
            xx1: parent.xx1 * height_factor,
            xx2: parent.xx2 * height_factor,
            yy1: parent.yy1 * height_factor,
            yy2: parent.yy2 * height_factor,
        }
    }

    /// Add a ridge along the x axis over `[start, end]`, peaked at the
    /// interval midpoint. Degenerate intervals leave the surface unchanged.
    pub fn add_horizontal_ridge(&mut self, start: f64, end: f64) {
        if let Some(r) = ridge_reciprocal(start, end) {
            self.xx2 -= r;
            self.xx1 += r * (start + end);
        }
    }

    /// Add a ridge along the y axis over `[start, end]`.
    pub fn add_vertical_ridge(&mut self, start: f64, end: f64) {
        if let Some(r) = ridge_reciprocal(start, end) {
            self.yy2 -= r;
            self.yy1 += r * (start + end);
        }
    }

    pub fn xx1(&self) -> f64 {
        self.xx1
    }

    pub fn xx2(&self) -> f64 {
        self.xx2
    }

    pub fn yy1(&self) -> f64 {
        self.yy1
    }

    pub fn yy2(&self) -> f64 {
        self.yy2
    }

    /// Height of the field at a point, in scene coordinates.
    pub fn height_at(&self, x: f64, y: f64) -> f64 {
        self.xx2 * x * x + self.xx1 * x + self.yy2 * y * y + self.yy1 * y
    }
}

fn ridge_reciprocal(start: f64, end: f64) -> Option<f64> {
    let span = end - start;
    if span == 0.0 {
        return None;
    }
    Some(4.0 / (span * span))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ridge_peaks_at_midpoint_with_unit_height() {
        let mut s = CushionSurface::flat();
        s.add_horizontal_ridge(10.0, 30.0);

        let edge = s.height_at(10.0, 0.0);
        let mid = s.height_at(20.0, 0.0);
        let other_edge = s.height_at(30.0, 0.0);

        assert!((edge - other_edge).abs() < 1e-9);
        assert!((mid - edge - 1.0).abs() < 1e-9, "ridge height must be 1 over its edges");
        // Slightly off-center is lower than the peak.
        assert!(s.height_at(19.0, 0.0) < mid);
        assert!(s.height_at(21.0, 0.0) < mid);
    }

    #[test]
    fn test_degenerate_interval_is_ignored() {
        let mut s = CushionSurface::flat();
        s.add_vertical_ridge(5.0, 5.0);
        assert_eq!(s, CushionSurface::flat());
    }

    #[test]
    fn test_axes_are_independent() {
        let mut s = CushionSurface::flat();
        s.add_horizontal_ridge(0.0, 10.0);
        assert_eq!(s.yy1(), 0.0);
        assert_eq!(s.yy2(), 0.0);
        s.add_vertical_ridge(0.0, 4.0);
        assert!(s.yy2() < 0.0);
    }

    #[test]
    fn test_derive_scaled_fades_inherited_ridges() {
        let mut parent = CushionSurface::flat();
        parent.add_horizontal_ridge(0.0, 100.0);
        parent.add_vertical_ridge(0.0, 50.0);

        let child = CushionSurface::derive_scaled(&parent, 0.5);
        assert!((child.xx2() - parent.xx2() * 0.5).abs() < 1e-12);
        assert!((child.xx1() - parent.xx1() * 0.5).abs() < 1e-12);
        assert!((child.yy2() - parent.yy2() * 0.5).abs() < 1e-12);
        assert!((child.yy1() - parent.yy1() * 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_nested_ridges_compound() {
        let mut s = CushionSurface::flat();
        s.add_horizontal_ridge(0.0, 100.0);
        let before = s.xx2();
        // A nested subdivision of [20, 40] adds onto the existing curvature.
        s.add_horizontal_ridge(20.0, 40.0);
        assert!(s.xx2() < before);
    }
}
