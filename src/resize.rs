//! # Resize Planner
//!
//! Calcola le dimensioni di destinazione di un'immagine rispettando l'aspect ratio.
//!
//! ## Regole
//! - Se entrambi i lati sono `<= max_dimension`: nessun resize (`NoOp`)
//! - Lato lungo orizzontale: larghezza = `max_dimension`, altezza = `round(max / ratio)`
//! - Altrimenti (verticale o quadrata): altezza = `max_dimension`, larghezza = `round(max * ratio)`
//! - Arrotondamento all'intero più vicino, mai sotto 1 pixel
//!
//! ## Esempio
//! ```rust
//! use image_upload_pipeline::image_ref::Dimensions;
//! use image_upload_pipeline::resize::{plan_resize, ResizePlan};
//!
//! let source = Dimensions::new(1600, 1200).unwrap();
//! assert_eq!(plan_resize(source, 800), ResizePlan::Target(Dimensions::new(800, 600).unwrap()));
//! ```

use crate::image_ref::Dimensions;
use serde::Serialize;

/// Outcome of planning a resize
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "plan", rename_all = "snake_case")]
pub enum ResizePlan {
    /// Source already fits inside the bound
    NoOp,
    /// Downscale to these dimensions
    Target(Dimensions),
}

impl ResizePlan {
    pub fn target(&self) -> Option<Dimensions> {
        match self {
            ResizePlan::NoOp => None,
            ResizePlan::Target(dims) => Some(*dims),
        }
    }
}

/// Plans an aspect-preserving downscale so neither side exceeds `max_dimension`
pub fn plan_resize(source: Dimensions, max_dimension: u32) -> ResizePlan {
    if source.fits_within(max_dimension) {
        return ResizePlan::NoOp;
    }

    let ratio = source.aspect_ratio();
    let bound = max_dimension as f64;

    let (width, height) = if source.width() > source.height() {
        (max_dimension, round_side(bound / ratio))
    } else {
        (round_side(bound * ratio), max_dimension)
    };

    // Both sides are >= 1 here, so this never falls back to NoOp.
    Dimensions::new(width, height).map_or(ResizePlan::NoOp, ResizePlan::Target)
}

fn round_side(value: f64) -> u32 {
    (value.round() as u32).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dims(width: u32, height: u32) -> Dimensions {
        Dimensions::new(width, height).unwrap()
    }

    #[test]
    fn test_within_bound_is_noop() {
        assert_eq!(plan_resize(dims(800, 800), 800), ResizePlan::NoOp);
        assert_eq!(plan_resize(dims(640, 480), 800), ResizePlan::NoOp);
        assert_eq!(plan_resize(dims(1, 800), 800), ResizePlan::NoOp);
    }

    #[test]
    fn test_landscape() {
        assert_eq!(plan_resize(dims(1600, 1200), 800), ResizePlan::Target(dims(800, 600)));
        assert_eq!(plan_resize(dims(1920, 1080), 800), ResizePlan::Target(dims(800, 450)));
    }

    #[test]
    fn test_portrait() {
        assert_eq!(plan_resize(dims(1200, 1600), 800), ResizePlan::Target(dims(600, 800)));
        assert_eq!(plan_resize(dims(3024, 4032), 800), ResizePlan::Target(dims(600, 800)));
    }

    #[test]
    fn test_square_uses_height_branch() {
        assert_eq!(plan_resize(dims(2000, 2000), 800), ResizePlan::Target(dims(800, 800)));
    }

    #[test]
    fn test_rounding_to_nearest() {
        // 800 / (1000/333) = 266.4
        assert_eq!(plan_resize(dims(1000, 333), 800), ResizePlan::Target(dims(800, 266)));
        // 800 / (1000/334) = 267.2
        assert_eq!(plan_resize(dims(1000, 334), 800), ResizePlan::Target(dims(800, 267)));
        // 800 * (999/1000) = 799.2
        assert_eq!(plan_resize(dims(999, 1000), 800), ResizePlan::Target(dims(799, 800)));
    }

    #[test]
    fn test_extreme_ratio_keeps_one_pixel() {
        assert_eq!(plan_resize(dims(10000, 1), 800), ResizePlan::Target(dims(800, 1)));
        assert_eq!(plan_resize(dims(1, 10000), 800), ResizePlan::Target(dims(1, 800)));
    }

    #[test]
    fn test_target_hits_bound_and_keeps_ratio() {
        let bound = 800;
        for width in (801..4000).step_by(97) {
            for height in (50..4000).step_by(113) {
                let source = dims(width, height);
                let target = plan_resize(source, bound).target().unwrap();

                assert_eq!(target.longest_side(), bound, "{}", source);
                assert!(target.fits_within(bound));

                // Ratio preserved within one pixel of rounding on the short side.
                if width > height {
                    let exact = bound as f64 * height as f64 / width as f64;
                    assert!((target.height() as f64 - exact).abs() <= 1.0, "{}", source);
                } else {
                    let exact = bound as f64 * width as f64 / height as f64;
                    assert!((target.width() as f64 - exact).abs() <= 1.0, "{}", source);
                }
            }
        }
    }
}
