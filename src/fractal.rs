// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The escape-time families.
//!
//! Each family is a bounded loop over a single recurrence with one exit
//! test per turn.  A sample either escapes (the orbit leaves the
//! radius-2 disc), converges (Newton only), or runs out of budget.
//! Everything here is written once against `Numeric`, so the same loop
//! body serves every precision tier.

use crate::numeric::Numeric;
use std::f64::consts::FRAC_PI_2;
use std::str::FromStr;

/// `|v|²` beyond which an orbit is considered gone.
pub const ESCAPE_RADIUS_SQUARED: f64 = 4.0;

/// The constant used for Julia sets unless told otherwise.
pub const DEFAULT_JULIA: (f64, f64) = (-0.7, 0.27015);

/// Default iteration budget for the escaping families.
pub const DEFAULT_MAX_ITERATIONS: usize = 200;

/// Default iteration budget for Newton's method.
pub const DEFAULT_MAX_ROOT_ITERATIONS: usize = 50;

/// Newton's method is done when `|z⁴ - 1|` drops below this.
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// The four roots of z⁴ - 1, in order of increasing angle.
pub const NEWTON_ROOTS: [(f64, f64); 4] = [(1.0, 0.0), (0.0, 1.0), (-1.0, 0.0), (0.0, -1.0)];

/// Which recurrence to run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum FractalFamily {
    /// v₀ = 0, vₙ₊₁ = vₙ² + c
    Mandelbrot,
    /// v₀ = sample, vₙ₊₁ = vₙ² + k, with k fixed for the render.
    Julia(f64, f64),
    /// vₙ₊₁ = conj(vₙ)² + c
    Tricorn,
    /// Newton's method on z⁴ - 1.
    Newton,
}

impl Default for FractalFamily {
    fn default() -> Self {
        FractalFamily::Mandelbrot
    }
}

impl FractalFamily {
    /// Look a family up by name, attaching `constant` to a Julia set.
    /// Unknown names are an error here; the interactive surface does its
    /// own defaulting before it gets this far.
    pub fn from_name(name: &str, constant: Option<(f64, f64)>) -> Result<Self, String> {
        let (re, im) = constant.unwrap_or(DEFAULT_JULIA);
        match name.to_ascii_lowercase().as_str() {
            "mandelbrot" => Ok(FractalFamily::Mandelbrot),
            "julia" => Ok(FractalFamily::Julia(re, im)),
            "tricorn" => Ok(FractalFamily::Tricorn),
            "newton" => Ok(FractalFamily::Newton),
            other => Err(format!("Unknown fractal type '{}'", other)),
        }
    }

    /// The name `from_name` accepts for this family.
    pub fn name(&self) -> &'static str {
        match self {
            FractalFamily::Mandelbrot => "mandelbrot",
            FractalFamily::Julia(..) => "julia",
            FractalFamily::Tricorn => "tricorn",
            FractalFamily::Newton => "newton",
        }
    }

    /// Whether this family is colored by its roots rather than by
    /// escape velocity.
    pub fn is_root_finding(&self) -> bool {
        *self == FractalFamily::Newton
    }
}

impl FromStr for FractalFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FractalFamily::from_name(s, None)
    }
}

/// Iteration budgets and tolerances for one render.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Limits {
    /// Budget for Mandelbrot, Julia and Tricorn.
    pub max_iterations: usize,
    /// Budget for Newton.
    pub max_root_iterations: usize,
    /// Newton convergence tolerance on `|z⁴ - 1|`.
    pub tolerance: f64,
}

impl Default for Limits {
    fn default() -> Self {
        Limits {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_root_iterations: DEFAULT_MAX_ROOT_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

/// How an orbit ended.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Outcome {
    /// Left the escape radius.
    Escaped,
    /// Settled onto a root (Newton).
    Converged,
    /// Ran out of budget.
    Exhausted,
    /// A Newton step would have divided by a vanishing derivative.
    Degenerate,
}

/// What one run of a family over one sample produced.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct EscapeRecord {
    /// How it ended.
    pub outcome: Outcome,
    /// 0-based index of the iteration that escaped or converged; the
    /// full budget when exhausted.
    pub iterations: usize,
    /// The last value of the orbit, for root coloring.
    pub final_value: Option<(f64, f64)>,
    /// `|v|²` at the moment of escape, for smooth coloring.
    pub magnitude_squared: Option<f64>,
}

impl EscapeRecord {
    fn escape(iterations: usize, final_value: (f64, f64), magnitude_squared: f64) -> Self {
        EscapeRecord {
            outcome: Outcome::Escaped,
            iterations,
            final_value: Some(final_value),
            magnitude_squared: Some(magnitude_squared),
        }
    }

    fn converged(iterations: usize, final_value: (f64, f64)) -> Self {
        EscapeRecord {
            outcome: Outcome::Converged,
            iterations,
            final_value: Some(final_value),
            magnitude_squared: None,
        }
    }

    fn ended(outcome: Outcome, iterations: usize) -> Self {
        EscapeRecord {
            outcome,
            iterations,
            final_value: None,
            magnitude_squared: None,
        }
    }

    /// True if the orbit escaped or converged; false for interior and
    /// degenerate samples.
    pub fn escaped(&self) -> bool {
        match self.outcome {
            Outcome::Escaped | Outcome::Converged => true,
            Outcome::Exhausted | Outcome::Degenerate => false,
        }
    }

    /// For a converged Newton record, the index into `NEWTON_ROOTS` of
    /// the root it reached, judged by angle.
    pub fn root_index(&self) -> Option<usize> {
        if self.outcome != Outcome::Converged {
            return None;
        }
        let (re, im) = self.final_value?;
        let quarter = (im.atan2(re) / FRAC_PI_2).round() as i64;
        Some(quarter.rem_euclid(4) as usize)
    }
}

/// Run `family` over the sample point `(re, im)` using `backend`.
pub fn iterate<B: Numeric>(
    backend: &B,
    family: &FractalFamily,
    re: f64,
    im: f64,
    limits: &Limits,
) -> EscapeRecord {
    let sample = backend.from_coordinates(re, im);
    match *family {
        FractalFamily::Mandelbrot => {
            let start = backend.from_coordinates(0.0, 0.0);
            escape_time(backend, start, &sample, limits.max_iterations, false)
        }
        FractalFamily::Julia(kre, kim) => {
            let k = backend.from_coordinates(kre, kim);
            escape_time(backend, sample, &k, limits.max_iterations, false)
        }
        FractalFamily::Tricorn => {
            let start = backend.from_coordinates(0.0, 0.0);
            escape_time(backend, start, &sample, limits.max_iterations, true)
        }
        FractalFamily::Newton => newton(backend, sample, limits),
    }
}

/// The shared body of Mandelbrot, Julia and Tricorn: square (optionally
/// after conjugating), add, test.
fn escape_time<B: Numeric>(
    backend: &B,
    start: B::Value,
    addend: &B::Value,
    max_iterations: usize,
    conjugate: bool,
) -> EscapeRecord {
    let mut v = start;
    for n in 0..max_iterations {
        let base = if conjugate {
            backend.conjugate(&v)
        } else {
            v
        };
        v = backend.add(&backend.square(&base), addend);
        if backend.exceeds(&v, ESCAPE_RADIUS_SQUARED) {
            return EscapeRecord::escape(
                n,
                backend.to_f64_pair(&v),
                backend.magnitude_squared(&v),
            );
        }
    }
    EscapeRecord::ended(Outcome::Exhausted, max_iterations)
}

/// Newton's method on f(z) = z⁴ - 1, f'(z) = 4z³.  Tests for convergence
/// before each step, so a sample already on a root converges at 0.
fn newton<B: Numeric>(backend: &B, start: B::Value, limits: &Limits) -> EscapeRecord {
    let one = backend.from_coordinates(1.0, 0.0);
    let four = backend.from_coordinates(4.0, 0.0);
    let tolerance_squared = limits.tolerance * limits.tolerance;

    let mut z = start;
    for n in 0..limits.max_root_iterations {
        let z2 = backend.square(&z);
        let z3 = backend.multiply(&z2, &z);
        let f = backend.subtract(&backend.square(&z2), &one);
        if backend.magnitude_squared(&f) < tolerance_squared {
            return EscapeRecord::converged(n, backend.to_f64_pair(&z));
        }
        let df = backend.multiply(&four, &z3);
        match backend.divide(&f, &df) {
            Some(step) => z = backend.subtract(&z, &step),
            None => return EscapeRecord::ended(Outcome::Degenerate, n),
        }
    }
    EscapeRecord::ended(Outcome::Exhausted, limits.max_root_iterations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::numeric::{BigFloat, Double, Rational, Single};

    #[test]
    fn origin_is_inside_the_mandelbrot_set() {
        let record = iterate(&Double, &FractalFamily::Mandelbrot, 0.0, 0.0, &Limits::default());
        assert_eq!(record.outcome, Outcome::Exhausted);
        assert!(!record.escaped());
        assert_eq!(record.iterations, 200);
    }

    #[test]
    fn far_points_escape_at_once() {
        let record = iterate(&Double, &FractalFamily::Mandelbrot, 2.0, 2.0, &Limits::default());
        assert!(record.escaped());
        assert_eq!(record.iterations, 0);
        assert_eq!(record.magnitude_squared, Some(8.0));
    }

    #[test]
    fn radius_two_exactly_is_not_an_escape() {
        // -2 is a fixed point at |v|² = 4 exactly.
        let record = iterate(&Double, &FractalFamily::Mandelbrot, -2.0, 0.0, &Limits::default());
        assert_eq!(record.outcome, Outcome::Exhausted);
    }

    #[test]
    fn escape_on_the_last_step_counts_as_escaped() {
        // c = 1: the orbit runs 1, 2, 5, crossing the radius at n = 2.
        let limits = |max_iterations| Limits {
            max_iterations,
            ..Limits::default()
        };
        let just_enough = iterate(&Double, &FractalFamily::Mandelbrot, 1.0, 0.0, &limits(3));
        assert_eq!(just_enough.outcome, Outcome::Escaped);
        assert_eq!(just_enough.iterations, 2);
        assert_eq!(just_enough.magnitude_squared, Some(25.0));

        let one_short = iterate(&Double, &FractalFamily::Mandelbrot, 1.0, 0.0, &limits(2));
        assert_eq!(one_short.outcome, Outcome::Exhausted);
        assert_eq!(one_short.iterations, 2);
    }

    #[test]
    fn tricorn_differs_from_mandelbrot() {
        // c = -0.5 + 0.6i sits in the main cardioid but outside the
        // tricorn's body.
        let limits = Limits::default();
        let m = iterate(&Double, &FractalFamily::Mandelbrot, -0.5, 0.6, &limits);
        let t = iterate(&Double, &FractalFamily::Tricorn, -0.5, 0.6, &limits);
        assert!(!m.escaped());
        assert!(t.escaped());
    }

    #[test]
    fn julia_starts_from_the_sample() {
        let julia = FractalFamily::Julia(DEFAULT_JULIA.0, DEFAULT_JULIA.1);
        let limits = Limits::default();
        assert!(iterate(&Double, &julia, 1.9, 1.9, &limits).escaped());
        assert!(!iterate(&Double, &julia, 0.0, -0.5625, &limits).escaped());
        // The origin itself lies outside this particular Julia set.
        assert!(iterate(&Double, &julia, 0.0, 0.0, &limits).escaped());
    }

    #[test]
    fn newton_finds_one_from_one_and_a_half() {
        let record = iterate(&Double, &FractalFamily::Newton, 1.5, 0.0, &Limits::default());
        assert_eq!(record.outcome, Outcome::Converged);
        assert!(record.iterations < DEFAULT_MAX_ROOT_ITERATIONS);
        assert_eq!(record.root_index(), Some(0));
        let (re, im) = record.final_value.unwrap();
        assert!((re - 1.0).abs() < 1e-6 && im.abs() < 1e-6);
    }

    #[test]
    fn newton_finds_the_other_roots() {
        let limits = Limits::default();
        let family = FractalFamily::Newton;
        assert_eq!(iterate(&Double, &family, 0.1, 1.2, &limits).root_index(), Some(1));
        assert_eq!(iterate(&Double, &family, -1.3, 0.05, &limits).root_index(), Some(2));
        assert_eq!(iterate(&Double, &family, 0.0, -0.9, &limits).root_index(), Some(3));
    }

    #[test]
    fn newton_at_the_origin_is_degenerate_not_fatal() {
        let record = iterate(&Double, &FractalFamily::Newton, 0.0, 0.0, &Limits::default());
        assert_eq!(record.outcome, Outcome::Degenerate);
        assert!(!record.escaped());
        assert_eq!(record.root_index(), None);
    }

    #[test]
    fn every_tier_agrees_on_simple_points() {
        let limits = Limits::default();
        for &(re, im) in &[(0.0, 0.0), (2.0, 2.0), (-1.0, 0.5), (0.0, 1.0), (0.5, 0.0)] {
            let expected = iterate(&Double, &FractalFamily::Mandelbrot, re, im, &limits);
            for record in &[
                iterate(&Single, &FractalFamily::Mandelbrot, re, im, &limits),
                iterate(&BigFloat::default(), &FractalFamily::Mandelbrot, re, im, &limits),
                iterate(&Rational::default(), &FractalFamily::Mandelbrot, re, im, &limits),
            ] {
                assert_eq!(record.outcome, expected.outcome, "at {},{}", re, im);
                assert_eq!(record.iterations, expected.iterations, "at {},{}", re, im);
            }
        }
    }

    #[test]
    fn newton_runs_on_the_big_tiers() {
        let limits = Limits::default();
        let big = iterate(&BigFloat::default(), &FractalFamily::Newton, 1.5, 0.0, &limits);
        let rat = iterate(&Rational::default(), &FractalFamily::Newton, 1.5, 0.0, &limits);
        assert_eq!(big.root_index(), Some(0));
        assert_eq!(rat.root_index(), Some(0));
    }

    #[test]
    fn family_names_round_trip_through_from_name() {
        for family in &["mandelbrot", "julia", "tricorn", "newton"] {
            assert_eq!(FractalFamily::from_name(family, None).unwrap().name(), *family);
        }
        assert_eq!(
            FractalFamily::from_name("julia", Some((0.3, 0.5))),
            Ok(FractalFamily::Julia(0.3, 0.5))
        );
        assert!("burningship".parse::<FractalFamily>().is_err());
    }
}
