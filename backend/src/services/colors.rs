//! Zone score color ramp.
//!
//! Scores map onto a two-stop ramp from light mint (`#c2ffe2`) to dark navy
//! (`#000057`), interpolated in CIE Lab so perceived lightness changes evenly.
//! Positions along the ramp are raised to [`POWER_SCALING_FACTOR`], which
//! spends more of the ramp on high scores.

use palette::white_point::D65;
use palette::{FromColor, Lab, Mix, Srgb};

/// Ramp start (lowest score).
pub const LOW_SCORE_COLOR: &str = "#c2ffe2";
/// Ramp end (highest score).
pub const HIGH_SCORE_COLOR: &str = "#000057";
/// Color of zones that carry no score.
pub const DEFAULT_ZONE_COLOR: &str = "#c2ffe2";

pub const POWER_SCALING_FACTOR: i32 = 2;
pub const LEGEND_STEPS: usize = 10;

const LOW_RGB: Srgb<u8> = Srgb::new(0xc2, 0xff, 0xe2);
const HIGH_RGB: Srgb<u8> = Srgb::new(0x00, 0x00, 0x57);

/// Color for `score` given the observed score range.
///
/// A range with `min >= max` is replaced by `[0, 1]`. The normalized score is
/// clamped to `[0, 1]` before the power curve is applied.
pub fn zone_score_color(score: f64, min: f64, max: f64) -> String {
    let (min, max) = if min >= max || !min.is_finite() || !max.is_finite() {
        (0.0, 1.0)
    } else {
        (min, max)
    };
    let normalized = (score - min) / (max - min);
    let t = if normalized.is_finite() {
        normalized.clamp(0.0, 1.0)
    } else {
        0.0
    };
    ramp(t.powi(POWER_SCALING_FACTOR))
}

/// Color for a score already rescaled into `[0, 1]`.
pub fn color_for(score: f64) -> String {
    zone_score_color(score, 0.0, 1.0)
}

/// Legend swatches: [`LEGEND_STEPS`] samples at `(i / (steps - 1))^2`.
pub fn legend() -> Vec<String> {
    let last = (LEGEND_STEPS - 1) as f64;
    (0..LEGEND_STEPS)
        .map(|i| ramp((i as f64 / last).powi(POWER_SCALING_FACTOR)))
        .collect()
}

/// Sample the ramp at `t` in `[0, 1]`.
fn ramp(t: f64) -> String {
    if t <= 0.0 {
        return LOW_SCORE_COLOR.to_string();
    }
    if t >= 1.0 {
        return HIGH_SCORE_COLOR.to_string();
    }

    let mixed = to_lab(LOW_RGB).mix(to_lab(HIGH_RGB), t);
    to_hex(Srgb::<f64>::from_color(mixed).into_format())
}

fn to_lab(color: Srgb<u8>) -> Lab<D65, f64> {
    Lab::from_color(color.into_format::<f64>())
}

fn to_hex(color: Srgb<u8>) -> String {
    let (r, g, b) = color.into_components();
    format!("#{:02x}{:02x}{:02x}", r, g, b)
}
