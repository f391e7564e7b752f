//! Sepia tone transform over a decoded image.
//!
//! Deterministic and parameterized by a fixed intensity in `[0, 1]`.
//! Cancellation is checked twice: before the pixel buffer is extracted, and
//! after extraction but before the tone mapping pass, so a cancelled task
//! aborts before its costliest remaining step.

use image::{DynamicImage, Rgba};

use crate::cancel::CancelToken;

/// Outcome of one filter attempt. `Unavailable` is non-fatal: the record
/// keeps its unfiltered image and may be retried on a later reconciliation.
#[derive(Debug)]
pub enum ToneOutcome {
    Filtered(DynamicImage),
    Unavailable,
    Cancelled,
}

/// Apply a sepia tone of the given intensity to `image`.
pub fn apply_sepia_tone(
    image: &DynamicImage,
    intensity: f32,
    cancel: &CancelToken,
) -> ToneOutcome {
    if cancel.is_cancelled() {
        return ToneOutcome::Cancelled;
    }

    if !intensity.is_finite() || !(0.0..=1.0).contains(&intensity) {
        tracing::warn!(intensity, "sepia filter unavailable: intensity out of range");
        return ToneOutcome::Unavailable;
    }
    if image.width() == 0 || image.height() == 0 {
        return ToneOutcome::Unavailable;
    }

    let mut rgba = image.to_rgba8();

    if cancel.is_cancelled() {
        return ToneOutcome::Cancelled;
    }

    for px in rgba.pixels_mut() {
        *px = sepia_pixel(*px, intensity);
    }

    ToneOutcome::Filtered(DynamicImage::ImageRgba8(rgba))
}

/// Standard sepia matrix, blended toward the original by `1 - intensity`.
fn sepia_pixel(px: Rgba<u8>, intensity: f32) -> Rgba<u8> {
    let [r, g, b, a] = px.0;
    let (rf, gf, bf) = (r as f32, g as f32, b as f32);

    let sr = (0.393 * rf + 0.769 * gf + 0.189 * bf).min(255.0);
    let sg = (0.349 * rf + 0.686 * gf + 0.168 * bf).min(255.0);
    let sb = (0.272 * rf + 0.534 * gf + 0.131 * bf).min(255.0);

    let blend = |orig: f32, sepia: f32| (orig + (sepia - orig) * intensity).round() as u8;
    Rgba([blend(rf, sr), blend(gf, sg), blend(bf, sb), a])
}
