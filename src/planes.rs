//! Contains the PlaneMapper struct, which describes a relationship
//! between a canvas of pixels with its origin at the top-left, and a
//! rectangle on the complex plane that is then shifted by a center
//! offset and scaled by a zoom factor.

use crate::error::{RenderError, Result};

/// Describes the width and height of an integral plane that is assumed
/// to start at 0,0.  Both must be non-zero for anything to be drawn.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct IntegralPlane(pub usize, pub usize);

/// The unshifted, unzoomed region of the complex plane the canvas
/// covers: `(xmin, ymin, xmax, ymax)`.  The real part runs along x and
/// the imaginary part along y.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ComplexPlane(pub f64, pub f64, pub f64, pub f64);

impl Default for ComplexPlane {
    fn default() -> Self {
        ComplexPlane(-2.0, -2.0, 2.0, 2.0)
    }
}

/// Describes the x, y of a pixel on the canvas.  (0, 0) is the top-left,
/// matching the row-major pixel buffer.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Pixel(pub usize, pub usize);

/// Everything that decides which part of the plane a render shows.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Viewport {
    /// The region of the plane at zoom 1 with no center offset.
    pub bounds: ComplexPlane,
    /// The canvas, in pixels.
    pub canvas: IntegralPlane,
    /// Offset added to plane coordinates before zooming.
    pub center: (f64, f64),
    /// Greater than one zooms out, less than one zooms in.
    pub zoom: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Viewport {
            bounds: ComplexPlane::default(),
            canvas: IntegralPlane(1024, 1024),
            center: (0.0, 0.0),
            zoom: 1.0,
        }
    }
}

impl Viewport {
    /// The default bounds on a canvas of the given size.
    pub fn with_canvas(width: usize, height: usize) -> Self {
        Viewport {
            canvas: IntegralPlane(width, height),
            ..Viewport::default()
        }
    }

    /// Check the invariants a render relies on.  Anything finite and
    /// positive is accepted, however extreme.
    pub fn validate(&self) -> Result<()> {
        let IntegralPlane(width, height) = self.canvas;
        if width == 0 || height == 0 {
            return Err(RenderError::config(format!(
                "Canvas must be at least 1x1, got {}x{}",
                width, height
            )));
        }
        if width.checked_mul(height).is_none() {
            return Err(RenderError::config(format!(
                "Canvas of {}x{} is too large to address",
                width, height
            )));
        }
        if !(self.zoom.is_finite() && self.zoom > 0.0) {
            return Err(RenderError::config(format!(
                "Zoom must be a positive number, got {}",
                self.zoom
            )));
        }
        if !(self.center.0.is_finite() && self.center.1.is_finite()) {
            return Err(RenderError::config("The center must be a finite point"));
        }
        let ComplexPlane(xmin, ymin, xmax, ymax) = self.bounds;
        if !(xmin.is_finite() && ymin.is_finite() && xmax.is_finite() && ymax.is_finite()) {
            return Err(RenderError::config("Plane bounds must be finite"));
        }
        if xmax <= xmin {
            return Err(RenderError::config(
                "The left edge of the plane is not to the left of the right edge.",
            ));
        }
        if ymax <= ymin {
            return Err(RenderError::config(
                "The top edge of the plane is not above the bottom edge.",
            ));
        }
        Ok(())
    }
}

/// Maps pixels (and fractions of pixels) on the canvas to points on the
/// complex plane.  Only ever built from a validated `Viewport`.
#[derive(Debug)]
pub struct PlaneMapper {
    /// The canvas.
    pub integral_plane: IntegralPlane,
    /// The plane region before centering and zooming.
    pub complex_plane: ComplexPlane,
    center: (f64, f64),
    zoom: f64,
    // Width and height of one pixel in plane units, before zooming.
    grid_factors: (f64, f64),
}

impl PlaneMapper {
    /// Validates the viewport and prepares the mapping.
    pub fn new(viewport: &Viewport) -> Result<PlaneMapper> {
        viewport.validate()?;
        let IntegralPlane(width, height) = viewport.canvas;
        let ComplexPlane(xmin, ymin, xmax, ymax) = viewport.bounds;
        Ok(PlaneMapper {
            integral_plane: viewport.canvas,
            complex_plane: viewport.bounds,
            center: viewport.center,
            zoom: viewport.zoom,
            grid_factors: (
                (xmax - xmin) / (width as f64),
                (ymax - ymin) / (height as f64),
            ),
        })
    }

    /// The total number of pixels on the canvas.
    pub fn len(&self) -> usize {
        self.integral_plane.0 * self.integral_plane.1
    }

    /// Always false for a mapper built through `new`.
    pub fn is_empty(&self) -> bool {
        self.integral_plane.0 == 0 || self.integral_plane.1 == 0
    }

    /// Canvas width in pixels.
    pub fn width(&self) -> usize {
        self.integral_plane.0
    }

    /// Canvas height in pixels.
    pub fn height(&self) -> usize {
        self.integral_plane.1
    }

    /// Map a position on the canvas, in (possibly fractional) pixels,
    /// to the plane:
    /// `((x / width) * (xmax - xmin) + xmin + center.x) * zoom`,
    /// and the same for y.
    pub fn sample_point(&self, x: f64, y: f64) -> (f64, f64) {
        (
            (x * self.grid_factors.0 + self.complex_plane.0 + self.center.0) * self.zoom,
            (y * self.grid_factors.1 + self.complex_plane.1 + self.center.1) * self.zoom,
        )
    }

    /// The plane point at the top-left corner of a pixel.
    pub fn pixel_to_point(&self, pixel: &Pixel) -> (f64, f64) {
        self.sample_point(pixel.0 as f64, pixel.1 as f64)
    }

    /// The inverse mapping: the pixel whose footprint contains a point,
    /// if it is on the canvas at all.
    pub fn point_to_pixel(&self, point: (f64, f64)) -> Option<Pixel> {
        let left = (point.0 / self.zoom - self.center.0 - self.complex_plane.0) / self.grid_factors.0;
        let top = (point.1 / self.zoom - self.center.1 - self.complex_plane.1) / self.grid_factors.1;
        if left < 0.0
            || top < 0.0
            || left >= self.integral_plane.0 as f64
            || top >= self.integral_plane.1 as f64
        {
            return None;
        }
        Some(Pixel(left as usize, top as usize))
    }
}
