// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The render driver.
//!
//! A render walks every pixel of the canvas exactly once, mapping it to
//! the plane, running the chosen family over it at the chosen precision,
//! and coloring the result.  Rows are handed out to a pool of scoped
//! worker threads through a shared iterator over the output buffer's
//! rows, so every worker writes only to rows it alone holds and no
//! locking is needed beyond the hand-out itself.  Because no pixel
//! depends on any other, the buffer comes out the same however the rows
//! were shared among the workers.

use crossbeam::thread::ScopedJoinHandle;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::error::{RenderError, Result};
use crate::fractal::{iterate, EscapeRecord, FractalFamily, Limits, Outcome};
use crate::numeric::{BigFloat, Double, Numeric, Precision, Rational, Single};
use crate::palette::{ColorMapper, Palette, Rgba};
use crate::planes::{Pixel, PlaneMapper, Viewport};
use crate::supersample::Supersampler;

/// The arbitrary-precision tiers refuse to run with fewer bits than this.
pub const MIN_PRECISION_BITS: usize = 16;

/// Knobs for one render that aren't part of the viewport.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RenderOptions {
    /// Iteration budgets and the Newton tolerance.
    pub limits: Limits,
    /// Sub-samples per side of each pixel, 2 unless set; 1 disables
    /// antialiasing.
    pub supersample: usize,
    /// Seed for the supersampling jitter.
    pub seed: u64,
    /// Worker threads.
    pub threads: usize,
    /// Gradient for the escaping families.
    pub palette: Palette,
}

impl Default for RenderOptions {
    fn default() -> Self {
        RenderOptions {
            limits: Limits::default(),
            supersample: 2,
            seed: 0,
            threads: num_cpus::get(),
            palette: Palette::default(),
        }
    }
}

impl RenderOptions {
    fn validate(&self) -> Result<()> {
        if self.limits.max_iterations == 0 || self.limits.max_root_iterations == 0 {
            return Err(RenderError::config("Iteration budgets must be at least 1"));
        }
        if !(self.limits.tolerance.is_finite() && self.limits.tolerance > 0.0) {
            return Err(RenderError::config(format!(
                "Tolerance must be a positive number, got {}",
                self.limits.tolerance
            )));
        }
        if self.supersample == 0 {
            return Err(RenderError::config("Supersampling factor must be at least 1"));
        }
        if self.threads == 0 {
            return Err(RenderError::config("Thread count must be at least 1"));
        }
        Ok(())
    }
}

/// The finished image: row-major RGBA, one entry per canvas pixel.
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    width: usize,
    height: usize,
    pixels: Vec<Rgba>,
}

impl PixelBuffer {
    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// All pixels, row by row from the top.
    pub fn pixels(&self) -> &[Rgba] {
        &self.pixels
    }

    /// The pixel at column `x`, row `y`.
    pub fn get(&self, x: usize, y: usize) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some(self.pixels[y * self.width + x])
    }

    /// Flatten to RGBA8 bytes, ready for an image encoder.
    pub fn into_raw(self) -> Vec<u8> {
        let mut raw = Vec::with_capacity(self.pixels.len() * 4);
        for pixel in &self.pixels {
            raw.extend_from_slice(&pixel.0);
        }
        raw
    }
}

/// Lets a caller abandon a render, directly or by deadline.  Clones
/// share the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// A token that only fires when `cancel` is called.
    pub fn new() -> Self {
        CancelToken::default()
    }

    /// A token that also fires once `timeout` has passed.
    pub fn with_timeout(timeout: Duration) -> Self {
        CancelToken {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(Instant::now() + timeout),
        }
    }

    /// Fire the token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Whether the token has fired.
    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => {
                self.flag.store(true, Ordering::SeqCst);
                true
            }
            _ => false,
        }
    }
}

/// Tally of how the samples of a render (or of one row) ended.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct RenderStats {
    /// Rows finished.
    pub rows: usize,
    /// Samples taken, counting every sub-sample.
    pub samples: usize,
    /// Samples that escaped.
    pub escaped: usize,
    /// Newton samples that found a root.
    pub converged: usize,
    /// Samples that ran out of budget.
    pub exhausted: usize,
    /// Newton samples abandoned at a vanishing derivative.
    pub degenerate: usize,
}

impl RenderStats {
    fn record(&mut self, record: &EscapeRecord) {
        self.samples += 1;
        match record.outcome {
            Outcome::Escaped => self.escaped += 1,
            Outcome::Converged => self.converged += 1,
            Outcome::Exhausted => self.exhausted += 1,
            Outcome::Degenerate => self.degenerate += 1,
        }
    }

    fn merge(&mut self, other: &RenderStats) {
        self.rows += other.rows;
        self.samples += other.samples;
        self.escaped += other.escaped;
        self.converged += other.converged;
        self.exhausted += other.exhausted;
        self.degenerate += other.degenerate;
    }
}

/// Watches a render as it happens.  Called from worker threads, so it
/// has to be shareable; rows are reported in whatever order they
/// finish.
pub trait RenderObserver: Sync {
    /// A row is done.
    fn row_finished(&self, _row: usize, _stats: &RenderStats) {}

    /// The whole render is done.
    fn render_finished(&self, _stats: &RenderStats, _elapsed: Duration) {}
}

/// Reports progress through the `log` facade.
#[derive(Copy, Clone, Debug, Default)]
pub struct LogObserver;

impl RenderObserver for LogObserver {
    fn row_finished(&self, row: usize, stats: &RenderStats) {
        debug!(
            "row {}: {} samples, {} escaped, {} converged, {} degenerate",
            row, stats.samples, stats.escaped, stats.converged, stats.degenerate
        );
    }

    fn render_finished(&self, stats: &RenderStats, elapsed: Duration) {
        info!(
            "{} rows, {} samples ({} escaped, {} converged, {} interior, {} degenerate) in {:.1}ms",
            stats.rows,
            stats.samples,
            stats.escaped,
            stats.converged,
            stats.exhausted,
            stats.degenerate,
            elapsed.as_secs_f64() * 1000.0
        );
    }
}

/// One configured render.  Holds nothing but read-only configuration,
/// and may be run any number of times.
pub struct Renderer<'a> {
    /// Which part of the plane, on what canvas.
    pub viewport: Viewport,
    /// Which recurrence.
    pub family: FractalFamily,
    /// Which numeric tier.
    pub precision: Precision,
    /// Everything else.
    pub options: RenderOptions,
    observer: Option<&'a dyn RenderObserver>,
}

impl<'a> Renderer<'a> {
    /// Configure a render.  Nothing is checked until it runs.
    pub fn new(
        viewport: Viewport,
        family: FractalFamily,
        precision: Precision,
        options: RenderOptions,
    ) -> Self {
        Renderer {
            viewport,
            family,
            precision,
            options,
            observer: None,
        }
    }

    /// Report progress to `observer`.
    pub fn with_observer(mut self, observer: &'a dyn RenderObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Render to completion.
    pub fn render(&self) -> Result<PixelBuffer> {
        self.render_with(&CancelToken::new())
    }

    /// Render, giving up with `RenderError::Cancelled` if `cancel` fires
    /// first.
    pub fn render_with(&self, cancel: &CancelToken) -> Result<PixelBuffer> {
        self.options.validate()?;
        let mapper = PlaneMapper::new(&self.viewport)?;
        match self.precision {
            Precision::Single => self.drive(&Single, &mapper, cancel),
            Precision::Double => self.drive(&Double, &mapper, cancel),
            Precision::BigFloat(bits) => {
                check_bits(bits)?;
                self.drive(&BigFloat { precision_bits: bits }, &mapper, cancel)
            }
            Precision::Rational(bits) => {
                check_bits(bits)?;
                self.drive(&Rational { precision_bits: bits }, &mapper, cancel)
            }
        }
    }

    fn drive<B: Numeric>(
        &self,
        backend: &B,
        mapper: &PlaneMapper,
        cancel: &CancelToken,
    ) -> Result<PixelBuffer> {
        let started = Instant::now();
        let (width, height) = (mapper.width(), mapper.height());
        let threads = self.options.threads.min(height);
        info!(
            "Rendering {} {}x{} at {} precision on {} threads",
            self.family.name(),
            width,
            height,
            backend.name(),
            threads
        );

        let mut pixels = vec![Rgba::BLACK; mapper.len()];
        let results: Vec<Result<RenderStats>> = {
            let rows = Arc::new(Mutex::new(pixels.chunks_mut(width).enumerate()));
            crossbeam::scope(|spawner| {
                let handles: Vec<ScopedJoinHandle<Result<RenderStats>>> = (0..threads)
                    .map(|_| {
                        let rows = rows.clone();
                        spawner.spawn(move |_| {
                            let mut stats = RenderStats::default();
                            loop {
                                if cancel.is_cancelled() {
                                    return Err(RenderError::Cancelled);
                                }
                                let row = match rows.lock() {
                                    Ok(mut rows) => rows.next(),
                                    Err(_) => return Err(RenderError::WorkerPanicked),
                                };
                                match row {
                                    Some((y, line)) => {
                                        let row_stats =
                                            self.render_row(backend, mapper, cancel, y, line)?;
                                        if let Some(observer) = self.observer {
                                            observer.row_finished(y, &row_stats);
                                        }
                                        stats.merge(&row_stats);
                                    }
                                    None => {
                                        break;
                                    }
                                }
                            }
                            Ok(stats)
                        })
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|handle| handle.join().unwrap_or(Err(RenderError::WorkerPanicked)))
                    .collect::<Vec<Result<RenderStats>>>()
            })
            .map_err(|_| RenderError::WorkerPanicked)?
        };

        let mut stats = RenderStats::default();
        for result in results {
            stats.merge(&result?);
        }
        if let Some(observer) = self.observer {
            observer.render_finished(&stats, started.elapsed());
        }
        debug!("render finished in {:?}", started.elapsed());

        Ok(PixelBuffer {
            width,
            height,
            pixels,
        })
    }

    /// Fill one row, giving up between pixels if `cancel` fires.
    fn render_row<B: Numeric>(
        &self,
        backend: &B,
        mapper: &PlaneMapper,
        cancel: &CancelToken,
        y: usize,
        line: &mut [Rgba],
    ) -> Result<RenderStats> {
        let sampler = Supersampler::new(self.options.supersample, self.options.seed);
        let colors = ColorMapper::new(self.options.palette, self.color_budget());
        let mut stats = RenderStats {
            rows: 1,
            ..RenderStats::default()
        };
        for (x, cell) in line.iter_mut().enumerate() {
            if cancel.is_cancelled() {
                return Err(RenderError::Cancelled);
            }
            *cell = sampler.sample(mapper, &Pixel(x, y), |re, im| {
                let record = iterate(backend, &self.family, re, im, &self.options.limits);
                stats.record(&record);
                colors.color(&self.family, &record)
            });
        }
        Ok(stats)
    }

    fn color_budget(&self) -> usize {
        if self.family.is_root_finding() {
            self.options.limits.max_root_iterations
        } else {
            self.options.limits.max_iterations
        }
    }
}

fn check_bits(bits: usize) -> Result<()> {
    if bits < MIN_PRECISION_BITS {
        return Err(RenderError::config(format!(
            "Arbitrary precision needs at least {} bits, got {}",
            MIN_PRECISION_BITS, bits
        )));
    }
    Ok(())
}

/// Render `family` over `viewport` at `precision`, to completion.
pub fn render(
    viewport: &Viewport,
    family: &FractalFamily,
    precision: Precision,
    options: &RenderOptions,
) -> Result<PixelBuffer> {
    Renderer::new(*viewport, *family, precision, *options).render()
}
