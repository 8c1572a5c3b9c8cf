//! Page geometry: target page size, fit-to-page placement and the
//! transforms that map a source page (box + `/Rotate`) onto an output page.
//!
//! Everything here works in PDF points (1/72 in). Every output page, whether
//! it holds an image, a copied PDF page, a cover or a placeholder, has the
//! same [`PageSize`].

use serde::{Deserialize, Serialize};

/// Output page dimensions in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// ISO 216 A4: 210 × 297 mm.
    pub const A4: PageSize = PageSize {
        width: 595.28,
        height: 841.89,
    };

    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// `[0 0 w h]` as used for `/MediaBox`.
    pub fn media_box(&self) -> [f32; 4] {
        [0.0, 0.0, self.width, self.height]
    }
}

impl Default for PageSize {
    fn default() -> Self {
        PageSize::A4
    }
}

/// Where a scaled source lands on the output page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Lower-left corner of the placed source.
    pub x: f32,
    pub y: f32,
    /// Size of the placed source after scaling.
    pub width: f32,
    pub height: f32,
    pub scale: f32,
}

/// Fit a `src_w × src_h` source inside `page` minus `margin` on every side,
/// preserving aspect ratio and centring on both axes.
///
/// The source is scaled up or down as needed. Returns `None` when either the
/// source or the drawable area has no positive extent.
pub fn fit_to_page(src_w: f32, src_h: f32, page: PageSize, margin: f32) -> Option<Placement> {
    let avail_w = page.width - 2.0 * margin;
    let avail_h = page.height - 2.0 * margin;
    if !(src_w > 0.0 && src_h > 0.0 && avail_w > 0.0 && avail_h > 0.0) {
        return None;
    }

    let scale = (avail_w / src_w).min(avail_h / src_h);
    let width = src_w * scale;
    let height = src_h * scale;

    Some(Placement {
        x: margin + (avail_w - width) / 2.0,
        y: margin + (avail_h - height) / 2.0,
        width,
        height,
        scale,
    })
}

/// A source page's visible box in its own user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl SourceBox {
    /// Normalise corner order, since producers sometimes write `[x1 y1 x0 y0]`.
    pub fn from_corners(a: f32, b: f32, c: f32, d: f32) -> Self {
        Self {
            x0: a.min(c),
            y0: b.min(d),
            x1: a.max(c),
            y1: b.max(d),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// Normalise a `/Rotate` value to 0, 90, 180 or 270.
///
/// Values that are not multiples of 90 are invalid per ISO 32000 and are
/// treated as 0, which is what viewers do.
pub fn normalise_rotation(rotate: i64) -> u16 {
    let r = rotate.rem_euclid(360);
    if r % 90 == 0 {
        r as u16
    } else {
        0
    }
}

/// Affine matrix `[a b c d e f]` as used by the `cm` operator.
pub type Matrix = [f32; 6];

/// `m1` applied first, then `m2`.
fn concat(m1: Matrix, m2: Matrix) -> Matrix {
    let [a1, b1, c1, d1, e1, f1] = m1;
    let [a2, b2, c2, d2, e2, f2] = m2;
    [
        a1 * a2 + b1 * c2,
        a1 * b2 + b1 * d2,
        c1 * a2 + d1 * c2,
        c1 * b2 + d1 * d2,
        e1 * a2 + f1 * c2 + e2,
        e1 * b2 + f1 * d2 + f2,
    ]
}

/// The single transform that draws a source page, as a viewer would display
/// it, fitted and centred on an output page.
///
/// Composed of: move the box origin to (0, 0), apply the clockwise display
/// rotation, then scale and translate into the placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageTransform {
    pub matrix: Matrix,
    pub placement: Placement,
}

impl PageTransform {
    /// True when drawing with this transform changes nothing.
    pub fn is_identity(&self) -> bool {
        const EPS: f32 = 1e-3;
        let identity: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        self.matrix
            .iter()
            .zip(identity.iter())
            .all(|(a, b)| (a - b).abs() < EPS)
    }
}

/// Compute the transform for a source page box with the given rotation.
pub fn page_transform(
    source: SourceBox,
    rotate: u16,
    page: PageSize,
    margin: f32,
) -> Option<PageTransform> {
    let (w, h) = (source.width(), source.height());
    // Displayed dimensions after the viewer applies /Rotate.
    let (disp_w, disp_h) = if rotate % 180 == 0 { (w, h) } else { (h, w) };
    let placement = fit_to_page(disp_w, disp_h, page, margin)?;

    let to_origin: Matrix = [1.0, 0.0, 0.0, 1.0, -source.x0, -source.y0];
    let rotation: Matrix = match rotate {
        90 => [0.0, -1.0, 1.0, 0.0, 0.0, w],
        180 => [-1.0, 0.0, 0.0, -1.0, w, h],
        270 => [0.0, 1.0, -1.0, 0.0, h, 0.0],
        _ => [1.0, 0.0, 0.0, 1.0, 0.0, 0.0],
    };
    let s = placement.scale;
    let fit: Matrix = [s, 0.0, 0.0, s, placement.x, placement.y];

    Some(PageTransform {
        matrix: concat(concat(to_origin, rotation), fit),
        placement,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-3;

    fn apply(m: Matrix, x: f32, y: f32) -> (f32, f32) {
        (m[0] * x + m[2] * y + m[4], m[1] * x + m[3] * y + m[5])
    }

    #[test]
    fn landscape_photo_fits_width() {
        let p = fit_to_page(800.0, 600.0, PageSize::A4, 20.0).expect("placement");
        let avail_w = PageSize::A4.width - 40.0;
        assert!((p.width - avail_w).abs() < EPS);
        assert!((p.width / p.height - 800.0 / 600.0).abs() < EPS);
        // Centred vertically
        let top_gap = PageSize::A4.height - (p.y + p.height);
        assert!((top_gap - p.y).abs() < EPS);
    }

    #[test]
    fn placement_never_exceeds_printable_area() {
        let margin = 20.0;
        let page = PageSize::A4;
        for &(w, h) in &[
            (1.0, 1000.0),
            (1000.0, 1.0),
            (16.0, 16.0),
            (4000.0, 3000.0),
            (595.28, 841.89),
            (3.0, 7.0),
        ] {
            let p = fit_to_page(w, h, page, margin).expect("placement");
            assert!(p.x >= margin - EPS, "{w}x{h}: x={}", p.x);
            assert!(p.y >= margin - EPS, "{w}x{h}: y={}", p.y);
            assert!(p.x + p.width <= page.width - margin + EPS);
            assert!(p.y + p.height <= page.height - margin + EPS);
            let ratio = (p.width / p.height) / (w / h);
            assert!((ratio - 1.0).abs() < 1e-3, "{w}x{h}: ratio drift {ratio}");
        }
    }

    #[test]
    fn small_sources_are_scaled_up() {
        let p = fit_to_page(16.0, 16.0, PageSize::A4, 20.0).expect("placement");
        assert!(p.scale > 1.0);
    }

    #[test]
    fn degenerate_inputs_have_no_placement() {
        assert!(fit_to_page(0.0, 100.0, PageSize::A4, 20.0).is_none());
        assert!(fit_to_page(100.0, -1.0, PageSize::A4, 20.0).is_none());
        assert!(fit_to_page(100.0, 100.0, PageSize::A4, 400.0).is_none());
    }

    #[test]
    fn rotation_is_normalised() {
        assert_eq!(normalise_rotation(0), 0);
        assert_eq!(normalise_rotation(450), 90);
        assert_eq!(normalise_rotation(-90), 270);
        assert_eq!(normalise_rotation(45), 0);
    }

    #[test]
    fn exact_a4_page_maps_to_identity() {
        let source = SourceBox::from_corners(0.0, 0.0, 595.28, 841.89);
        let t = page_transform(source, 0, PageSize::A4, 0.0).expect("transform");
        assert!(t.is_identity(), "got {:?}", t.matrix);
    }

    #[test]
    fn letter_page_is_not_identity() {
        let source = SourceBox::from_corners(0.0, 0.0, 612.0, 792.0);
        let t = page_transform(source, 0, PageSize::A4, 0.0).expect("transform");
        assert!(!t.is_identity());
    }

    #[test]
    fn rotated_page_corners_land_inside_placement() {
        let source = SourceBox::from_corners(10.0, 20.0, 610.0, 420.0); // 600 × 400
        for rotate in [0u16, 90, 180, 270] {
            let t = page_transform(source, rotate, PageSize::A4, 20.0).expect("transform");
            let p = t.placement;
            for (x, y) in [(10.0, 20.0), (610.0, 20.0), (10.0, 420.0), (610.0, 420.0)] {
                let (u, v) = apply(t.matrix, x, y);
                assert!(u >= p.x - EPS && u <= p.x + p.width + EPS, "rot {rotate}: u={u}");
                assert!(v >= p.y - EPS && v <= p.y + p.height + EPS, "rot {rotate}: v={v}");
            }
        }
    }

    #[test]
    fn quarter_turn_moves_left_edge_to_top() {
        let source = SourceBox::from_corners(0.0, 0.0, 600.0, 400.0);
        let t = page_transform(source, 90, PageSize::A4, 0.0).expect("transform");
        let p = t.placement;
        // Source bottom-left is displayed top-left after a clockwise quarter turn.
        let (u, v) = apply(t.matrix, 0.0, 0.0);
        assert!((u - p.x).abs() < EPS);
        assert!((v - (p.y + p.height)).abs() < EPS);
    }

    #[test]
    fn reversed_corners_are_normalised() {
        let b = SourceBox::from_corners(612.0, 792.0, 0.0, 0.0);
        assert_eq!(b.width(), 612.0);
        assert_eq!(b.height(), 792.0);
    }
}
