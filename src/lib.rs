#![deny(missing_docs)]
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Escape-time fractal renderer
//!
//! An escape-time fractal is drawn by taking the point of the complex
//! plane under each pixel and feeding it through a recurrence over and
//! over, measuring how quickly the result runs off to infinity.  This
//! "velocity" is the number used to color the pixel; points that never
//! run off are colored black.  The Mandelbrot set, its Julia sets and
//! the Tricorn are all drawn this way.  Newton's method on z⁴ - 1 is the
//! odd one out: there every point eventually settles on one of four
//! roots, and the pixel is colored by which one.
//!
//! The same recurrence can be run at four precisions, from `f32` up to
//! arbitrary-precision rationals, which matters once the zoom is deep
//! enough that neighboring pixels stop being distinguishable as `f64`s.
//!
//! ```no_run
//! use escapetime::{render_request, ViewportRequest};
//!
//! let request = ViewportRequest::from_query("type=julia&zoom=0.8");
//! let image = render_request(&request).unwrap();
//! assert_eq!(image.width(), 1024);
//! ```

extern crate crossbeam;
extern crate dashu_float;
extern crate failure;
extern crate itertools;
#[macro_use]
extern crate log;
extern crate num;
extern crate num_cpus;
extern crate rand;
extern crate url;

pub mod error;
pub mod fractal;
pub mod numeric;
pub mod palette;
pub mod planes;
pub mod render;
pub mod request;
pub mod supersample;

pub use error::RenderError;
pub use fractal::{iterate, EscapeRecord, FractalFamily, Limits, Outcome};
pub use numeric::{Numeric, Precision};
pub use palette::{ColorMapper, Palette, Rgba};
pub use planes::{PlaneMapper, Viewport};
pub use render::{render, CancelToken, LogObserver, PixelBuffer, RenderOptions, Renderer};
pub use request::{render_request, render_request_with, ViewportRequest};
pub use supersample::Supersampler;
