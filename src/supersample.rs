// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Antialiasing by supersampling.
//!
//! Each pixel is split into an N×N grid of cells and one sample is taken
//! at a random spot inside each cell.  The randomness comes from a
//! generator seeded by the pixel's own coordinates, so a pixel always
//! gets the same jitter no matter which thread draws it or in what
//! order.

use crate::palette::Rgba;
use crate::planes::{Pixel, PlaneMapper};
use itertools::iproduct;
use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// How many sub-samples to take per pixel, and how to jitter them.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Supersampler {
    /// Sub-samples per side; `factor²` samples per pixel.  One means a
    /// single sample at the pixel's corner, without jitter.
    pub factor: usize,
    /// Mixed into every pixel's jitter.
    pub seed: u64,
}

impl Default for Supersampler {
    fn default() -> Self {
        Supersampler { factor: 2, seed: 0 }
    }
}

impl Supersampler {
    /// An N×N sampler.
    pub fn new(factor: usize, seed: u64) -> Self {
        Supersampler { factor, seed }
    }

    fn pixel_seed(&self, pixel: &Pixel) -> u64 {
        let x = (pixel.0 as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let y = (pixel.1 as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
        self.seed ^ x ^ y.rotate_left(31)
    }

    /// Offsets, in pixels, of every sub-sample inside the pixel's
    /// footprint.  Always exactly `(0, 0)` when the factor is one.
    pub fn offsets(&self, pixel: &Pixel) -> Vec<(f64, f64)> {
        if self.factor <= 1 {
            return vec![(0.0, 0.0)];
        }
        let n = self.factor as f64;
        let jitter = Uniform::new(0.0_f64, 1.0_f64);
        let mut rng = StdRng::seed_from_u64(self.pixel_seed(pixel));
        iproduct!(0..self.factor, 0..self.factor)
            .map(|(i, j)| {
                let dx = (i as f64 + jitter.sample(&mut rng)) / n;
                let dy = (j as f64 + jitter.sample(&mut rng)) / n;
                (dx, dy)
            })
            .collect()
    }

    /// Shade every sub-sample of `pixel` with `shade`, which is handed
    /// plane coordinates, and average the results.
    pub fn sample<F>(&self, mapper: &PlaneMapper, pixel: &Pixel, mut shade: F) -> Rgba
    where
        F: FnMut(f64, f64) -> Rgba,
    {
        let colors: Vec<Rgba> = self
            .offsets(pixel)
            .into_iter()
            .map(|(dx, dy)| {
                let (re, im) = mapper.sample_point(pixel.0 as f64 + dx, pixel.1 as f64 + dy);
                shade(re, im)
            })
            .collect();
        average(&colors)
    }
}

/// Channel-wise mean, truncated rather than rounded.
pub fn average(colors: &[Rgba]) -> Rgba {
    if colors.is_empty() {
        return Rgba::BLACK;
    }
    let mut sums = [0u32; 4];
    for color in colors {
        for (sum, channel) in sums.iter_mut().zip(color.0.iter()) {
            *sum += u32::from(*channel);
        }
    }
    let count = colors.len() as u32;
    Rgba([
        (sums[0] / count) as u8,
        (sums[1] / count) as u8,
        (sums[2] / count) as u8,
        (sums[3] / count) as u8,
    ])
}
