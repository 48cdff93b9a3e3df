// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The outward-facing description of a render.
//!
//! A `ViewportRequest` is what a front end (the command line, or an HTTP
//! handler) fills in.  `from_query` implements the forgiving rules of
//! the interactive surface: anything it can't parse quietly becomes the
//! default, so a hand-edited URL still gets a picture.

use crate::error::{RenderError, Result};
use crate::fractal::FractalFamily;
use crate::numeric::Precision;
use crate::planes::{IntegralPlane, Viewport};
use crate::render::{CancelToken, PixelBuffer, RenderOptions, Renderer};
use url::form_urlencoded;

/// Parameters for one render, as a caller supplies them.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewportRequest {
    /// `mandelbrot`, `julia`, `tricorn` or `newton`.
    pub family: String,
    /// Real offset of the view.
    pub center_x: f64,
    /// Imaginary offset of the view.
    pub center_y: f64,
    /// Greater than one zooms out.
    pub zoom: f64,
    /// Canvas width in pixels.
    pub width: usize,
    /// Canvas height in pixels.
    pub height: usize,
    /// Numeric tier.
    pub precision: Precision,
    /// The Julia constant, if not the default.
    pub constant: Option<(f64, f64)>,
}

impl Default for ViewportRequest {
    fn default() -> Self {
        ViewportRequest {
            family: "mandelbrot".to_string(),
            center_x: 0.0,
            center_y: 0.0,
            zoom: 1.0,
            width: 1024,
            height: 1024,
            precision: Precision::default(),
            constant: None,
        }
    }
}

/// The first value of `key` in a `k=v&k=v` query string, with `%XX`
/// escapes and `+` decoded.
fn query_value(query: &str, key: &str) -> Option<String> {
    form_urlencoded::parse(query.trim_start_matches('?').as_bytes())
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.into_owned())
}

/// A finite float, if `key` holds one.
fn query_float(query: &str, key: &str) -> Option<f64> {
    query_value(query, key)
        .and_then(|v| v.parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

impl ViewportRequest {
    /// Read `type`, `x`, `y` and `zoom` from an HTTP query string, with
    /// or without its leading `?`.  An unknown `type` is a Mandelbrot;
    /// unparseable numbers fall back to 0, 0 and 1, as does a zoom that
    /// isn't positive.  Everything else takes its default.
    pub fn from_query(query: &str) -> Self {
        let family = match query_value(query, "type") {
            Some(ref name) if FractalFamily::from_name(name, None).is_ok() => {
                name.to_ascii_lowercase()
            }
            _ => "mandelbrot".to_string(),
        };
        ViewportRequest {
            family,
            center_x: query_float(query, "x").unwrap_or(0.0),
            center_y: query_float(query, "y").unwrap_or(0.0),
            zoom: query_float(query, "zoom")
                .filter(|zoom| *zoom > 0.0)
                .unwrap_or(1.0),
            ..ViewportRequest::default()
        }
    }

    /// The family this request names.  Unknown names are a
    /// configuration error.
    pub fn fractal_family(&self) -> Result<FractalFamily> {
        FractalFamily::from_name(&self.family, self.constant).map_err(RenderError::Configuration)
    }

    /// The viewport this request describes, on the default bounds.
    pub fn viewport(&self) -> Viewport {
        Viewport {
            canvas: IntegralPlane(self.width, self.height),
            center: (self.center_x, self.center_y),
            zoom: self.zoom,
            ..Viewport::default()
        }
    }

    /// A renderer configured from this request and `options`.
    pub fn renderer(&self, options: RenderOptions) -> Result<Renderer<'static>> {
        Ok(Renderer::new(
            self.viewport(),
            self.fractal_family()?,
            self.precision,
            options,
        ))
    }
}

/// Render a request with default options.
pub fn render_request(request: &ViewportRequest) -> Result<PixelBuffer> {
    request.renderer(RenderOptions::default())?.render()
}

/// Render a request with explicit options, abandoning it if `cancel`
/// fires.
pub fn render_request_with(
    request: &ViewportRequest,
    options: RenderOptions,
    cancel: &CancelToken,
) -> Result<PixelBuffer> {
    request.renderer(options)?.render_with(cancel)
}
