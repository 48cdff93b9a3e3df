// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Precision tiers.
//!
//! Every fractal family is written once, against the `Numeric` trait,
//! and the four backends below plug into it: `f32` and `f64` complex
//! numbers straight out of `num`, a pair of `dashu_float::FBig`
//! arbitrary-precision floats, and a pair of `num::BigRational`s.  The
//! last two trade a great deal of speed for fidelity at zoom levels
//! where an `f64` has run out of mantissa.
//!
//! Values are created fresh for every sample, so no big-number scratch
//! space is ever shared between threads.

use dashu_float::FBig;
use num::bigint::BigInt;
use num::rational::BigRational;
use num::{Complex, One, ToPrimitive, Zero};
use std::convert::TryFrom;
use std::fmt;
use std::str::FromStr;

/// A divisor whose magnitude-squared falls below this is treated as
/// zero: the division is refused and the caller must cope.
pub const DEGENERATE_MAGNITUDE: f64 = 1e-24;

/// Default bit count for the arbitrary-precision tiers.
pub const DEFAULT_PRECISION_BITS: usize = 128;

/// The capability set the fractal recurrences need from a complex
/// number type.  All operations take the backend by reference so the
/// arbitrary-precision tiers can carry their precision along.
pub trait Numeric: Sync {
    /// The complex sample type of this tier.
    type Value: Clone + fmt::Debug;

    /// Human-readable tier name, used in logs.
    fn name(&self) -> &'static str;

    /// Build a complex value from a pair of plane coordinates.
    fn from_coordinates(&self, re: f64, im: f64) -> Self::Value;

    /// `a + b`
    fn add(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// `a - b`
    fn subtract(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// `a * b`
    fn multiply(&self, a: &Self::Value, b: &Self::Value) -> Self::Value;

    /// `a / b`, or `None` when `|b|²` is below `DEGENERATE_MAGNITUDE`.
    fn divide(&self, a: &Self::Value, b: &Self::Value) -> Option<Self::Value>;

    /// The complex conjugate of `a`.
    fn conjugate(&self, a: &Self::Value) -> Self::Value;

    /// `|a|²`, rounded to an `f64`.
    fn magnitude_squared(&self, a: &Self::Value) -> f64;

    /// `a` as a pair of `f64`s, for the color mapper.
    fn to_f64_pair(&self, a: &Self::Value) -> (f64, f64);

    /// `|a|² > threshold`.  Backends with more precision than an `f64`
    /// override this to compare natively.
    fn exceeds(&self, a: &Self::Value, threshold: f64) -> bool {
        self.magnitude_squared(a) > threshold
    }

    /// `a * a`
    fn square(&self, a: &Self::Value) -> Self::Value {
        self.multiply(a, a)
    }
}

/// Runtime choice of precision tier.  Parsed from the CLI and carried
/// by a `ViewportRequest`; the render driver turns it into a concrete
/// backend.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Precision {
    /// `Complex<f32>`
    Single,
    /// `Complex<f64>`
    Double,
    /// Arbitrary-precision floats with the given mantissa bit count.
    BigFloat(usize),
    /// Arbitrary-precision rationals re-quantized to `2^-bits` after
    /// every multiplication.
    Rational(usize),
}

impl Default for Precision {
    fn default() -> Self {
        Precision::Double
    }
}

impl Precision {
    /// The same tier with a different bit count.  No effect on the
    /// fixed-width tiers.
    pub fn with_bits(self, bits: usize) -> Self {
        match self {
            Precision::BigFloat(_) => Precision::BigFloat(bits),
            Precision::Rational(_) => Precision::Rational(bits),
            fixed => fixed,
        }
    }
}

impl FromStr for Precision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "single" | "f32" | "complex64" => Ok(Precision::Single),
            "double" | "f64" | "complex128" => Ok(Precision::Double),
            "bigfloat" | "float" => Ok(Precision::BigFloat(DEFAULT_PRECISION_BITS)),
            "rational" | "bigrat" | "rat" => Ok(Precision::Rational(DEFAULT_PRECISION_BITS)),
            other => Err(format!("Unknown precision tier '{}'", other)),
        }
    }
}

/// Tier (a): single-precision complex.
#[derive(Copy, Clone, Debug, Default)]
pub struct Single;

impl Numeric for Single {
    type Value = Complex<f32>;

    fn name(&self) -> &'static str {
        "single"
    }

    fn from_coordinates(&self, re: f64, im: f64) -> Self::Value {
        Complex {
            re: re as f32,
            im: im as f32,
        }
    }

    fn add(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        a + b
    }

    fn subtract(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        a - b
    }

    fn multiply(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        a * b
    }

    fn divide(&self, a: &Self::Value, b: &Self::Value) -> Option<Self::Value> {
        if f64::from(b.norm_sqr()) < DEGENERATE_MAGNITUDE {
            return None;
        }
        Some(a / b)
    }

    fn conjugate(&self, a: &Self::Value) -> Self::Value {
        a.conj()
    }

    fn magnitude_squared(&self, a: &Self::Value) -> f64 {
        f64::from(a.norm_sqr())
    }

    fn to_f64_pair(&self, a: &Self::Value) -> (f64, f64) {
        (f64::from(a.re), f64::from(a.im))
    }

    fn exceeds(&self, a: &Self::Value, threshold: f64) -> bool {
        a.norm_sqr() > threshold as f32
    }
}

/// Tier (b): double-precision complex.  The workhorse.
#[derive(Copy, Clone, Debug, Default)]
pub struct Double;

impl Numeric for Double {
    type Value = Complex<f64>;

    fn name(&self) -> &'static str {
        "double"
    }

    fn from_coordinates(&self, re: f64, im: f64) -> Self::Value {
        Complex { re, im }
    }

    fn add(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        a + b
    }

    fn subtract(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        a - b
    }

    fn multiply(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        a * b
    }

    fn divide(&self, a: &Self::Value, b: &Self::Value) -> Option<Self::Value> {
        if b.norm_sqr() < DEGENERATE_MAGNITUDE {
            return None;
        }
        Some(a / b)
    }

    fn conjugate(&self, a: &Self::Value) -> Self::Value {
        a.conj()
    }

    fn magnitude_squared(&self, a: &Self::Value) -> f64 {
        a.norm_sqr()
    }

    fn to_f64_pair(&self, a: &Self::Value) -> (f64, f64) {
        (a.re, a.im)
    }
}

/// Tier (c): two independent arbitrary-precision floats.
#[derive(Copy, Clone, Debug)]
pub struct BigFloat {
    /// Mantissa bits kept after every operation.
    pub precision_bits: usize,
}

impl Default for BigFloat {
    fn default() -> Self {
        BigFloat {
            precision_bits: DEFAULT_PRECISION_BITS,
        }
    }
}

impl BigFloat {
    /// A real at this backend's precision.  Zero is built separately;
    /// non-finite input collapses to zero as well.
    fn real(&self, v: f64) -> FBig {
        if v == 0.0 {
            return FBig::ZERO.with_precision(self.precision_bits).value();
        }
        match <FBig>::try_from(v) {
            Ok(f) => f.with_precision(self.precision_bits).value(),
            Err(_) => FBig::ZERO.with_precision(self.precision_bits).value(),
        }
    }

    fn norm_sqr(&self, a: &Complex<FBig>) -> FBig {
        &(&a.re * &a.re) + &(&a.im * &a.im)
    }
}

impl Numeric for BigFloat {
    type Value = Complex<FBig>;

    fn name(&self) -> &'static str {
        "bigfloat"
    }

    fn from_coordinates(&self, re: f64, im: f64) -> Self::Value {
        Complex {
            re: self.real(re),
            im: self.real(im),
        }
    }

    fn add(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        Complex {
            re: &a.re + &b.re,
            im: &a.im + &b.im,
        }
    }

    fn subtract(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        Complex {
            re: &a.re - &b.re,
            im: &a.im - &b.im,
        }
    }

    fn multiply(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        // (a + bi)(c + di) = (ac - bd) + (ad + bc)i
        Complex {
            re: &(&a.re * &b.re) - &(&a.im * &b.im),
            im: &(&a.re * &b.im) + &(&a.im * &b.re),
        }
    }

    fn divide(&self, a: &Self::Value, b: &Self::Value) -> Option<Self::Value> {
        if self.magnitude_squared(b) < DEGENERATE_MAGNITUDE {
            return None;
        }
        let denom = self.norm_sqr(b);
        let re = &(&a.re * &b.re) + &(&a.im * &b.im);
        let im = &(&a.im * &b.re) - &(&a.re * &b.im);
        Some(Complex {
            re: &re / &denom,
            im: &im / &denom,
        })
    }

    fn conjugate(&self, a: &Self::Value) -> Self::Value {
        Complex {
            re: a.re.clone(),
            im: -a.im.clone(),
        }
    }

    fn magnitude_squared(&self, a: &Self::Value) -> f64 {
        self.norm_sqr(a).to_f64().value()
    }

    fn to_f64_pair(&self, a: &Self::Value) -> (f64, f64) {
        (a.re.to_f64().value(), a.im.to_f64().value())
    }

    fn exceeds(&self, a: &Self::Value, threshold: f64) -> bool {
        self.norm_sqr(a) > self.real(threshold)
    }
}

/// Tier (d): two independent arbitrary-precision rationals.
///
/// Exact rational arithmetic doubles the bit length of the denominator
/// with every squaring, which makes even a modest iteration budget
/// intractable.  Products and quotients are therefore snapped onto the
/// grid `2^-precision_bits`; sums and differences stay exact.
#[derive(Copy, Clone, Debug)]
pub struct Rational {
    /// Denominator bits kept after every multiplication.
    pub precision_bits: usize,
}

impl Default for Rational {
    fn default() -> Self {
        Rational {
            precision_bits: DEFAULT_PRECISION_BITS,
        }
    }
}

impl Rational {
    fn real(&self, v: f64) -> BigRational {
        BigRational::from_float(v).unwrap_or_else(BigRational::zero)
    }

    fn quantize(&self, r: BigRational) -> BigRational {
        if r.denom().bits() <= self.precision_bits + 1 {
            return r;
        }
        let numer = (r.numer().clone() << self.precision_bits) / r.denom().clone();
        BigRational::new(numer, BigInt::one() << self.precision_bits)
    }

    fn norm_sqr(&self, a: &Complex<BigRational>) -> BigRational {
        &(&a.re * &a.re) + &(&a.im * &a.im)
    }
}

/// Convert a rational to the nearest `f64` we can manage, shifting both
/// halves down first so neither overflows on the way.
fn ratio_to_f64(r: &BigRational) -> f64 {
    let shift = r
        .numer()
        .bits()
        .max(r.denom().bits())
        .saturating_sub(1000);
    let numer = (r.numer().clone() >> shift).to_f64().unwrap_or(0.0);
    let denom = (r.denom().clone() >> shift).to_f64().unwrap_or(0.0);
    if denom == 0.0 {
        return if numer < 0.0 {
            std::f64::NEG_INFINITY
        } else {
            std::f64::INFINITY
        };
    }
    numer / denom
}

impl Numeric for Rational {
    type Value = Complex<BigRational>;

    fn name(&self) -> &'static str {
        "rational"
    }

    fn from_coordinates(&self, re: f64, im: f64) -> Self::Value {
        Complex {
            re: self.real(re),
            im: self.real(im),
        }
    }

    fn add(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        Complex {
            re: &a.re + &b.re,
            im: &a.im + &b.im,
        }
    }

    fn subtract(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        Complex {
            re: &a.re - &b.re,
            im: &a.im - &b.im,
        }
    }

    fn multiply(&self, a: &Self::Value, b: &Self::Value) -> Self::Value {
        Complex {
            re: self.quantize(&(&a.re * &b.re) - &(&a.im * &b.im)),
            im: self.quantize(&(&a.re * &b.im) + &(&a.im * &b.re)),
        }
    }

    fn divide(&self, a: &Self::Value, b: &Self::Value) -> Option<Self::Value> {
        let denom = self.norm_sqr(b);
        if denom.is_zero() || ratio_to_f64(&denom) < DEGENERATE_MAGNITUDE {
            return None;
        }
        let re = &(&a.re * &b.re) + &(&a.im * &b.im);
        let im = &(&a.im * &b.re) - &(&a.re * &b.im);
        Some(Complex {
            re: self.quantize(&re / &denom),
            im: self.quantize(&im / &denom),
        })
    }

    fn conjugate(&self, a: &Self::Value) -> Self::Value {
        Complex {
            re: a.re.clone(),
            im: -a.im.clone(),
        }
    }

    fn magnitude_squared(&self, a: &Self::Value) -> f64 {
        ratio_to_f64(&self.norm_sqr(a))
    }

    fn to_f64_pair(&self, a: &Self::Value) -> (f64, f64) {
        (ratio_to_f64(&a.re), ratio_to_f64(&a.im))
    }

    fn exceeds(&self, a: &Self::Value, threshold: f64) -> bool {
        self.norm_sqr(a) > self.real(threshold)
    }
}
