//! Pure calculation functions for image dimensions.
//!
//! All functions here are pure and testable without any I/O or images. The
//! pixel operations in [`transform`](super::transform) only ever call these
//! to decide *where* to cut and *how big* to scale.

use super::params::CropMargins;

/// A single margin may remove at most `1 / MAX_CROP_DIVISOR` (20%) of its axis.
pub const MAX_CROP_DIVISOR: u32 = 5;

/// A crop rectangle in source pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Calculate the scaled-down size that fits inside `max` while preserving
/// aspect ratio.
///
/// Returns `None` when the source already fits (no resize needed). Never
/// upscales. Each output dimension is truncated, as the upload service has
/// always done, and floored at 1px. The arithmetic is integral so the binding
/// axis lands exactly on its bound.
///
/// # Examples
/// ```
/// # use showroom::imaging::calculations::fit_within;
/// assert_eq!(fit_within((4000, 3000), (1920, 1440)), Some((1920, 1440)));
/// assert_eq!(fit_within((800, 600), (1920, 1440)), None);
/// ```
pub fn fit_within(source: (u32, u32), max: (u32, u32)) -> Option<(u32, u32)> {
    let (src_w, src_h) = source;
    let (max_w, max_h) = max;

    if src_w <= max_w && src_h <= max_h {
        return None;
    }

    // Compare max_w/src_w against max_h/src_h without floating point.
    let (w, h) = if max_w as u64 * src_h as u64 <= max_h as u64 * src_w as u64 {
        // Width is the binding constraint
        (max_w, (src_h as u64 * max_w as u64 / src_w as u64) as u32)
    } else {
        (
            (src_w as u64 * max_h as u64 / src_h as u64) as u32,
            max_h,
        )
    };
    Some((w.max(1), h.max(1)))
}

/// Calculate the crop box that strips `margins` from an image of `source` size.
///
/// Each margin is first clamped to 20% of its axis (top/bottom against the
/// height, left/right against the width). Returns `None` if the remaining box
/// is degenerate (zero width or height), in which case callers skip the crop.
pub fn clamp_crop(source: (u32, u32), margins: CropMargins) -> Option<CropBox> {
    let (w, h) = source;
    let max_vertical = h / MAX_CROP_DIVISOR;
    let max_horizontal = w / MAX_CROP_DIVISOR;

    let top = margins.top.min(max_vertical);
    let bottom = margins.bottom.min(max_vertical);
    let left = margins.left.min(max_horizontal);
    let right = margins.right.min(max_horizontal);

    let width = w.checked_sub(left)?.checked_sub(right)?;
    let height = h.checked_sub(top)?.checked_sub(bottom)?;
    if width == 0 || height == 0 {
        return None;
    }

    Some(CropBox {
        x: left,
        y: top,
        width,
        height,
    })
}

/// Calculate the centered crop of `source` that matches the aspect ratio of
/// `target`. The longer axis (relative to the target ratio) is trimmed
/// symmetrically; the other axis is kept whole.
pub fn center_crop_box(source: (u32, u32), target: (u32, u32)) -> CropBox {
    let (src_w, src_h) = (source.0 as u64, source.1 as u64);
    let (tgt_w, tgt_h) = (target.0.max(1) as u64, target.1.max(1) as u64);

    if src_w * tgt_h > tgt_w * src_h {
        // Wider than target: trim the sides
        let width = (src_h * tgt_w / tgt_h).clamp(1, src_w.max(1));
        CropBox {
            x: ((src_w - width.min(src_w)) / 2) as u32,
            y: 0,
            width: width as u32,
            height: src_h as u32,
        }
    } else {
        // Taller than (or same as) target: trim top and bottom
        let height = (src_w * tgt_h / tgt_w).clamp(1, src_h.max(1));
        CropBox {
            x: 0,
            y: ((src_h - height.min(src_h)) / 2) as u32,
            width: src_w as u32,
            height: height as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // fit_within tests
    // =========================================================================

    #[test]
    fn fit_noop_when_inside_bounds() {
        assert_eq!(fit_within((1920, 1440), (1920, 1440)), None);
        assert_eq!(fit_within((10, 10), (1920, 1440)), None);
    }

    #[test]
    fn fit_landscape_limited_by_width() {
        // 3840x1600 → ratio min(0.5, 0.9) = 0.5 → 1920x800
        assert_eq!(fit_within((3840, 1600), (1920, 1440)), Some((1920, 800)));
    }

    #[test]
    fn fit_portrait_limited_by_height() {
        // 3000x4000 → ratio min(0.64, 0.36) = 0.36 → 1080x1440
        assert_eq!(fit_within((3000, 4000), (1920, 1440)), Some((1080, 1440)));
    }

    #[test]
    fn fit_only_one_axis_over() {
        // 2000x100 → ratio 0.96 → 1920x96
        assert_eq!(fit_within((2000, 100), (1920, 1440)), Some((1920, 96)));
    }

    #[test]
    fn fit_never_upscales_or_exceeds() {
        for &(w, h) in &[(5000, 1), (1, 5000), (1921, 1441), (7, 9000), (12345, 6789)] {
            if let Some((nw, nh)) = fit_within((w, h), (1920, 1440)) {
                assert!(nw <= w && nh <= h, "{w}x{h} grew to {nw}x{nh}");
                assert!(nw <= 1920 && nh <= 1440, "{w}x{h} → {nw}x{nh} out of bounds");
                assert!(nw >= 1 && nh >= 1);
            }
        }
    }

    #[test]
    fn fit_preserves_aspect_within_rounding() {
        for &(w, h) in &[(4032, 3024), (3000, 4000), (5472, 3648), (2001, 1999)] {
            let (nw, nh) = fit_within((w, h), (1920, 1440)).unwrap();
            // The free axis is the truncation of the exact proportional value.
            let exact_h = h as f64 * nw as f64 / w as f64;
            let exact_w = w as f64 * nh as f64 / h as f64;
            assert!(
                (nh as f64 - exact_h).abs() < 1.0 || (nw as f64 - exact_w).abs() < 1.0,
                "{w}x{h} → {nw}x{nh}"
            );
        }
    }

    #[test]
    fn fit_binding_axis_hits_bound_exactly() {
        assert_eq!(fit_within((4032, 3024), (1920, 1440)), Some((1920, 1440)));
        assert_eq!(fit_within((4000, 3000), (1920, 1440)), Some((1920, 1440)));
    }

    // =========================================================================
    // clamp_crop tests
    // =========================================================================

    #[test]
    fn crop_within_limits_is_exact() {
        let b = clamp_crop(
            (1000, 800),
            CropMargins {
                top: 10,
                bottom: 60,
                left: 5,
                right: 5,
            },
        )
        .unwrap();
        assert_eq!(
            b,
            CropBox {
                x: 5,
                y: 10,
                width: 990,
                height: 730
            }
        );
    }

    #[test]
    fn crop_margins_clamped_to_twenty_percent() {
        let b = clamp_crop(
            (1000, 500),
            CropMargins {
                top: 400,
                bottom: 400,
                left: 900,
                right: 0,
            },
        )
        .unwrap();
        // 20% of 500 = 100 per vertical edge, 20% of 1000 = 200 horizontal
        assert_eq!(b.y, 100);
        assert_eq!(b.height, 300);
        assert_eq!(b.x, 200);
        assert_eq!(b.width, 800);
    }

    #[test]
    fn crop_never_removes_more_than_twenty_percent_per_edge() {
        let huge = CropMargins {
            top: u32::MAX,
            bottom: u32::MAX,
            left: u32::MAX,
            right: u32::MAX,
        };
        for &(w, h) in &[(10, 10), (640, 480), (1, 1000), (4032, 3024)] {
            let b = clamp_crop((w, h), huge).unwrap();
            assert!(b.x as f64 <= w as f64 * 0.2);
            assert!(b.y as f64 <= h as f64 * 0.2);
            assert!((w - b.x - b.width) as f64 <= w as f64 * 0.2);
            assert!((h - b.y - b.height) as f64 <= h as f64 * 0.2);
        }
    }

    #[test]
    fn crop_degenerate_source_is_skipped() {
        assert_eq!(clamp_crop((0, 100), CropMargins::default()), None);
        assert_eq!(clamp_crop((100, 0), CropMargins::default()), None);
    }

    // =========================================================================
    // center_crop_box tests
    // =========================================================================

    #[test]
    fn center_crop_wide_source_trims_sides() {
        // 1600x900 (16:9) → 4:3 box: width = 900 * 4/3 = 1200, left = 200
        let b = center_crop_box((1600, 900), (600, 450));
        assert_eq!(
            b,
            CropBox {
                x: 200,
                y: 0,
                width: 1200,
                height: 900
            }
        );
    }

    #[test]
    fn center_crop_tall_source_trims_top_bottom() {
        // 900x1600 → 4:3 box: height = 900 * 3/4 = 675, top = (1600-675)/2 = 462
        let b = center_crop_box((900, 1600), (600, 450));
        assert_eq!(
            b,
            CropBox {
                x: 0,
                y: 462,
                width: 900,
                height: 675
            }
        );
    }

    #[test]
    fn center_crop_same_ratio_keeps_everything() {
        let b = center_crop_box((800, 600), (300, 225));
        assert_eq!(
            b,
            CropBox {
                x: 0,
                y: 0,
                width: 800,
                height: 600
            }
        );
    }
}
