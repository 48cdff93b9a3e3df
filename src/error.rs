// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The ways a render can fail to produce a buffer.
//!
//! Numeric trouble inside a single sample (a Newton step dividing by a
//! vanishing derivative, say) is never an error here: it is absorbed
//! into that sample's `EscapeRecord` and the render carries on.

use failure::Fail;

/// Everything `render` can hand back instead of a `PixelBuffer`.
#[derive(Debug, Fail, PartialEq)]
pub enum RenderError {
    /// The viewport, canvas or options were not something we can draw.
    /// Fatal to that render; never retried.
    #[fail(display = "configuration error: {}", _0)]
    Configuration(String),

    /// The caller's token fired (explicitly or by deadline) before every
    /// row was finished.  No partial buffer accompanies this.
    #[fail(display = "render cancelled")]
    Cancelled,

    /// A worker thread panicked.  Should not happen; reported rather
    /// than re-raised.
    #[fail(display = "a render worker panicked")]
    WorkerPanicked,
}

impl RenderError {
    /// Shorthand used by the validators.
    pub fn config<S: Into<String>>(message: S) -> Self {
        RenderError::Configuration(message.into())
    }
}

/// Result alias for the render pipeline.
pub type Result<T> = std::result::Result<T, RenderError>;
