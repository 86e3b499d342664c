use crate::color::Rgb;
use crate::config::RenderConfig;
use crate::cushion::CushionSurface;
use crate::geometry::Rect;

/// Sample pairs taken per edge when checking whether a boundary line must be
/// forced.
const CONTRAST_SAMPLES: u32 = 8;

/// How far inward the comparison pixel sits.
const CONTRAST_INSET: u32 = 3;

/// Shaded RGB pixel buffer for one tile, row-major, three bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CushionPixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl CushionPixmap {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize * 3;
        Self { width, height, data: vec![0; len] }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Raw RGB bytes, for upload into whatever image type the caller paints
    /// with.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: u32, y: u32) -> Rgb {
        let i = self.index(x, y);
        Rgb::new(self.data[i], self.data[i + 1], self.data[i + 2])
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: Rgb) {
        let i = self.index(x, y);
        self.data[i] = color.r;
        self.data[i + 1] = color.g;
        self.data[i + 2] = color.b;
    }

    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        (y as usize * self.width as usize + x as usize) * 3
    }
}

/// Render the lit cushion for one tile.
///
/// Pure function of its inputs: the surface normal is taken analytically
/// from the quadratic height field at each pixel center, then shaded with a
/// Lambertian term over the configured light direction plus the ambient
/// floor. Safe to call concurrently for different tiles.
pub fn render_cushion(
    rect: Rect,
    surface: &CushionSurface,
    base: Rgb,
    config: &RenderConfig,
) -> CushionPixmap {
    let width = rect.width.round().max(0.0) as u32;
    let height = rect.height.round().max(0.0) as u32;
    let mut pixmap = CushionPixmap::new(width, height);
    if width == 0 || height == 0 {
        return pixmap;
    }

    for py in 0..height {
        let y = rect.y + f64::from(py) + 0.5;
        let ny = -(2.0 * surface.yy2() * y + surface.yy1());
        for px in 0..width {
            let x = rect.x + f64::from(px) + 0.5;
            let nx = -(2.0 * surface.xx2() * x + surface.xx1());

            let diffuse = (config.light_z + ny * config.light_y + nx * config.light_x)
                / (nx * nx + ny * ny + 1.0).sqrt();
            let intensity = config.ambient_light + diffuse.max(0.0);

            pixmap.set_pixel(px, py, base.scaled(intensity));
        }
    }

    if config.enforce_contrast {
        ensure_contrast(&mut pixmap);
    }

    pixmap
}

/// Force a visible seam on the right and bottom edges when the shading
/// there is indistinguishable from the tile interior. Adjacent siblings
/// with near-identical base colors and curvature would otherwise blend
/// into one block.
pub(crate) fn ensure_contrast(pixmap: &mut CushionPixmap) {
    let w = pixmap.width;
    let h = pixmap.height;
    if w <= CONTRAST_INSET || h <= CONTRAST_INSET {
        return;
    }

    if edge_blends(pixmap, h, |pm, i| (pm.pixel(w - 1, i), pm.pixel(w - 1 - CONTRAST_INSET, i))) {
        let line = pixmap.pixel(w - 1, h / 2).contrasting();
        for y in 0..h {
            pixmap.set_pixel(w - 1, y, line);
        }
    }

    if edge_blends(pixmap, w, |pm, i| (pm.pixel(i, h - 1), pm.pixel(i, h - 1 - CONTRAST_INSET))) {
        let line = pixmap.pixel(w / 2, h - 1).contrasting();
        for x in 0..w {
            pixmap.set_pixel(x, h - 1, line);
        }
    }
}

/// Sample along one edge; true when more than half of the boundary pixels
/// are identical to their inward counterparts.
fn edge_blends(
    pixmap: &CushionPixmap,
    extent: u32,
    sample: impl Fn(&CushionPixmap, u32) -> (Rgb, Rgb),
) -> bool {
    let samples = CONTRAST_SAMPLES.min(extent);
    let mut identical = 0;
    for s in 0..samples {
        let i = (u64::from(s) * u64::from(extent) / u64::from(samples)) as u32;
        let (edge, inward) = sample(pixmap, i);
        if edge == inward {
            identical += 1;
        }
    }
    identical * 2 > samples
}
