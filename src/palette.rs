// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Turning escape records into colors.
//!
//! The escaping families are colored from a continuous iteration count
//! (the "normalized iteration count" of Linas Vepstas), which takes the
//! bands out of the classic escape-time picture.  Newton is colored by
//! which of the four roots the sample settled on.  Nothing that reaches
//! the mapper can make it fail: interior, exhausted and degenerate
//! samples are all simply black.

use crate::fractal::{EscapeRecord, FractalFamily, Outcome};
use std::f64::consts::LN_2;
use std::str::FromStr;

/// One RGBA8 pixel.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    /// Opaque black: the color of everything that never left.
    pub const BLACK: Rgba = Rgba([0, 0, 0, 255]);

    /// An opaque color.
    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Rgba([r, g, b, 255])
    }
}

/// Colors for the roots 1, i, -1 and -i respectively.
const ROOT_COLORS: [Rgba; 4] = [
    Rgba([255, 0, 0, 255]),
    Rgba([255, 255, 0, 255]),
    Rgba([0, 255, 0, 255]),
    Rgba([0, 0, 255, 255]),
];

/// The gradient applied to escaping samples.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Palette {
    /// Blue through white to red, along a logarithmic ramp of the
    /// smooth iteration count.
    Smooth,
    /// A logarithmic blue ramp for the early escapers and a flat dark
    /// red for anything escaping in the last three quarters of the
    /// budget.
    LogBlue,
    /// Hard contrast bands, wrapping every few iterations.
    Bands,
    /// Phase-shifted cosines of the smooth count.
    Cosine,
}

impl Default for Palette {
    fn default() -> Self {
        Palette::Smooth
    }
}

impl FromStr for Palette {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "smooth" => Ok(Palette::Smooth),
            "logblue" | "log-blue" => Ok(Palette::LogBlue),
            "bands" => Ok(Palette::Bands),
            "cosine" => Ok(Palette::Cosine),
            other => Err(format!("Unknown palette '{}'", other)),
        }
    }
}

/// Continuous iteration count `n + 1 - log2(log2 |v|)` for an escaped
/// record.  `None` for anything that didn't escape.
pub fn smooth_iterations(record: &EscapeRecord) -> Option<f64> {
    if record.outcome != Outcome::Escaped {
        return None;
    }
    let magnitude_squared = record.magnitude_squared?;
    let nu = ((magnitude_squared.ln() / 2.0) / LN_2).ln() / LN_2;
    Some(record.iterations as f64 + 1.0 - nu)
}

/// Maps escape records to colors for one render.  Pure and cheap to
/// copy; every worker gets the same one.
#[derive(Copy, Clone, Debug)]
pub struct ColorMapper {
    /// The gradient for the escaping families.
    pub palette: Palette,
    /// The iteration budget the records were produced under.
    pub max_iterations: usize,
}

impl ColorMapper {
    /// A mapper for records produced with the given budget.
    pub fn new(palette: Palette, max_iterations: usize) -> Self {
        ColorMapper {
            palette,
            max_iterations,
        }
    }

    /// The color of one sample.
    pub fn color(&self, family: &FractalFamily, record: &EscapeRecord) -> Rgba {
        if family.is_root_finding() {
            return match record.root_index() {
                Some(root) => ROOT_COLORS[root],
                None => Rgba::BLACK,
            };
        }
        match smooth_iterations(record) {
            Some(n) if n.is_finite() => self.gradient(n.max(0.0), record.iterations),
            Some(_) => self.gradient(0.0, record.iterations),
            None => Rgba::BLACK,
        }
    }

    fn gradient(&self, n: f64, whole: usize) -> Rgba {
        let max = self.max_iterations.max(1) as f64;
        match self.palette {
            Palette::Smooth => {
                let t = unit((1.0 + n).ln() / (1.0 + max).ln());
                if t < 0.5 {
                    let s = channel(t * 2.0);
                    Rgba::rgb(s, s, 255)
                } else {
                    let s = channel(1.0 - (t - 0.5) * 2.0);
                    Rgba::rgb(255, s, s)
                }
            }
            Palette::LogBlue => {
                if n > max / 4.0 {
                    Rgba::rgb(100, 0, 0)
                } else {
                    let scale = unit(n.max(1.0).ln() / max.ln());
                    Rgba::rgb(0, 0, 255 - channel(scale))
                }
            }
            Palette::Bands => {
                let n = whole as u8;
                Rgba::rgb(
                    255u8.wrapping_sub(15u8.wrapping_mul(n)),
                    30u8.wrapping_mul(n),
                    30u8.wrapping_mul(n),
                )
            }
            Palette::Cosine => Rgba::rgb(
                ((1.0 + (n * 0.08).cos()) * 128.0) as u8,
                ((1.0 + (n * 0.1).sin()) * 128.0) as u8,
                ((1.0 - (n * 0.05).sin()) * 128.0) as u8,
            ),
        }
    }
}

/// Clamp to [0, 1], sending NaN to 0.
fn unit(t: f64) -> f64 {
    t.max(0.0).min(1.0)
}

/// Scale a unit value to a channel.
fn channel(t: f64) -> u8 {
    (unit(t) * 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fractal::{iterate, Limits};
    use crate::numeric::Double;

    fn escaped(iterations: usize, magnitude_squared: f64) -> EscapeRecord {
        EscapeRecord {
            outcome: Outcome::Escaped,
            iterations,
            final_value: Some((magnitude_squared.sqrt(), 0.0)),
            magnitude_squared: Some(magnitude_squared),
        }
    }

    #[test]
    fn smooth_count_at_the_escape_radius() {
        // |v| = 2 gives log2(log2 2) = 0, so the count is just n + 1.
        let n = smooth_iterations(&escaped(7, 4.0)).unwrap();
        assert!((n - 8.0).abs() < 1e-12);
    }

    #[test]
    fn interior_is_black_in_every_palette() {
        let limits = Limits::default();
        let inside = iterate(&Double, &FractalFamily::Mandelbrot, 0.0, 0.0, &limits);
        for palette in &[Palette::Smooth, Palette::LogBlue, Palette::Bands, Palette::Cosine] {
            let mapper = ColorMapper::new(*palette, 200);
            assert_eq!(mapper.color(&FractalFamily::Mandelbrot, &inside), Rgba::BLACK);
        }
    }

    #[test]
    fn smooth_gradient_runs_blue_to_red() {
        let mapper = ColorMapper::new(Palette::Smooth, 200);
        let family = FractalFamily::Mandelbrot;
        let early = mapper.color(&family, &escaped(0, 4.0));
        let late = mapper.color(&family, &escaped(199, 4.0));
        assert_eq!(early.0[2], 255);
        assert!(early.0[0] < late.0[0]);
        assert_eq!(late.0[0], 255);
        assert!(late.0[2] < 10);
    }

    #[test]
    fn smooth_gradient_is_monotonic() {
        let mapper = ColorMapper::new(Palette::Smooth, 200);
        let family = FractalFamily::Tricorn;
        let mut previous = (0u32, 765u32);
        for n in 0..200 {
            let Rgba([r, _, b, _]) = mapper.color(&family, &escaped(n, 5.0));
            // Red only ever rises; blue only ever falls.
            assert!(u32::from(r) >= previous.0);
            assert!(u32::from(b) <= previous.1);
            previous = (u32::from(r), u32::from(b));
        }
    }

    #[test]
    fn huge_magnitudes_do_not_break_the_mapper() {
        let mapper = ColorMapper::new(Palette::Smooth, 200);
        let color = mapper.color(&FractalFamily::Mandelbrot, &escaped(0, std::f64::INFINITY));
        assert_eq!(color, Rgba::rgb(0, 0, 255));
    }

    #[test]
    fn late_escapers_get_the_dark_band() {
        let mapper = ColorMapper::new(Palette::LogBlue, 200);
        let color = mapper.color(&FractalFamily::Mandelbrot, &escaped(120, 5.0));
        assert_eq!(color, Rgba::rgb(100, 0, 0));
    }

    #[test]
    fn dark_band_starts_a_quarter_into_the_budget() {
        // Smooth count 61 in both cases.
        let record = escaped(60, 4.0);
        let short = ColorMapper::new(Palette::LogBlue, 200);
        assert_eq!(short.color(&FractalFamily::Mandelbrot, &record), Rgba::rgb(100, 0, 0));
        let long = ColorMapper::new(Palette::LogBlue, 400);
        let color = long.color(&FractalFamily::Mandelbrot, &record);
        assert_eq!(&color.0[..2], &[0, 0]);
        assert!(color.0[2] > 0 && color.0[2] < 255);
    }

    #[test]
    fn newton_roots_have_fixed_colors() {
        let mapper = ColorMapper::new(Palette::default(), 200);
        let limits = Limits::default();
        let family = FractalFamily::Newton;
        let one = iterate(&Double, &family, 1.5, 0.0, &limits);
        let minus_i = iterate(&Double, &family, 0.0, -0.9, &limits);
        let stuck = iterate(&Double, &family, 0.0, 0.0, &limits);
        assert_eq!(mapper.color(&family, &one), Rgba::rgb(255, 0, 0));
        assert_eq!(mapper.color(&family, &minus_i), Rgba::rgb(0, 0, 255));
        assert_eq!(mapper.color(&family, &stuck), Rgba::BLACK);
    }

    #[test]
    fn palettes_parse() {
        assert_eq!("Smooth".parse::<Palette>(), Ok(Palette::Smooth));
        assert_eq!("log-blue".parse::<Palette>(), Ok(Palette::LogBlue));
        assert!("plaid".parse::<Palette>().is_err());
    }
}
