#![warn(missing_docs)]
//! # qr-token-display
//!
//! ## Purpose
//! Renders the held token as a QR code together with its countdown.
//!
//! ## Responsibilities
//! - Format remaining time as `MM:SS` and draw the shrinking progress bar.
//! - Encode the opaque token into a QR code at a fixed error-correction level.
//! - Own the countdown timer for the mounted token and forward its expiration
//!   exactly once.
//!
//! ## Data flow
//! App receives a [`TokenResponse`] -> [`DisplaySurface::mount`] encodes the QR
//! and spawns a [`CountdownTimer`] -> timer events come back through
//! [`DisplaySurface::apply`] -> [`DisplaySurface::render`] produces the frame.
//!
//! ## Ownership and lifetimes
//! A surface owns its timer. Replacing or dropping the surface tears the timer
//! down, so stale ticks cannot reach a newer surface.

use qr_token_core::TokenResponse;
use qr_token_countdown::{Countdown, CountdownEvent, CountdownState, CountdownTimer};
use qrcode::render::{svg, unicode};
use qrcode::{EcLevel, QrCode};
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;

/// Error-correction level used for every token.
pub const QR_EC_LEVEL: EcLevel = EcLevel::H;
/// Minimum edge length of exported SVG images, in pixels.
pub const QR_PIXEL_SIZE: u32 = 256;
/// Character width of the progress bar.
pub const PROGRESS_BAR_WIDTH: usize = 32;

/// Formats seconds as zero-padded `MM:SS` without hour rollover.
pub fn format_remaining(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Draws a bar whose filled share follows `progress_percent`.
pub fn render_progress_bar(progress_percent: f64, width: usize) -> String {
    let clamped = progress_percent.clamp(0.0, 100.0);
    let filled = ((clamped / 100.0) * width as f64).round() as usize;
    let filled = filled.min(width);
    format!("[{}{}]", "█".repeat(filled), "░".repeat(width - filled))
}

/// QR code for one token.
pub struct QrImage {
    code: QrCode,
}

impl std::fmt::Debug for QrImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QrImage")
            .field("width", &self.code.width())
            .finish()
    }
}

impl QrImage {
    /// Encodes `token` at [`QR_EC_LEVEL`].
    ///
    /// # Errors
    /// Returns [`DisplayError::Encode`] when the token does not fit a QR code.
    pub fn encode(token: &str) -> Result<Self, DisplayError> {
        let code = QrCode::with_error_correction_level(token.as_bytes(), QR_EC_LEVEL)
            .map_err(|error| DisplayError::Encode(error.to_string()))?;
        Ok(Self { code })
    }

    /// Returns the module count along one edge.
    pub fn width(&self) -> usize {
        self.code.width()
    }

    /// Returns the underlying code.
    pub fn code(&self) -> &QrCode {
        &self.code
    }

    /// Renders with Unicode half blocks, light-on-dark for terminal scanning.
    pub fn to_terminal(&self) -> String {
        self.code
            .render::<unicode::Dense1x2>()
            .dark_color(unicode::Dense1x2::Light)
            .light_color(unicode::Dense1x2::Dark)
            .quiet_zone(true)
            .build()
    }

    /// Renders an SVG document at least [`QR_PIXEL_SIZE`] pixels wide.
    pub fn to_svg(&self) -> String {
        self.code
            .render::<svg::Color<'_>>()
            .min_dimensions(QR_PIXEL_SIZE, QR_PIXEL_SIZE)
            .quiet_zone(true)
            .build()
    }
}

/// Result of feeding one countdown event into a surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayUpdate {
    /// Countdown advanced; frame should be redrawn.
    Redraw,
    /// Token expired; caller should request a new one.
    Expired,
    /// Event belonged to another surface or was already handled.
    Ignored,
}

/// Mounted token with its QR image and running countdown.
#[derive(Debug)]
pub struct DisplaySurface {
    generation: u64,
    response: TokenResponse,
    qr: QrImage,
    state: CountdownState,
    expiration_reported: bool,
    _timer: CountdownTimer,
}

impl DisplaySurface {
    /// Mounts `response`, observed at `now_ms`, and starts its countdown.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    /// Returns [`DisplayError::Encode`] when the token cannot be encoded.
    pub fn mount(
        response: TokenResponse,
        now_ms: i64,
        generation: u64,
        events: UnboundedSender<CountdownEvent>,
    ) -> Result<Self, DisplayError> {
        let qr = QrImage::encode(&response.token)?;
        let countdown = Countdown::activate(response.expires_at, now_ms);
        let state = countdown.state();
        let timer = CountdownTimer::spawn(countdown, generation, events);

        Ok(Self {
            generation,
            response,
            qr,
            state,
            expiration_reported: false,
            _timer: timer,
        })
    }

    /// Returns the generation this surface answers to.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns the mounted token payload.
    pub fn response(&self) -> &TokenResponse {
        &self.response
    }

    /// Returns the QR image.
    pub fn qr(&self) -> &QrImage {
        &self.qr
    }

    /// Returns the latest countdown snapshot.
    pub fn state(&self) -> CountdownState {
        self.state
    }

    /// Returns the remaining time as `MM:SS`.
    pub fn remaining_text(&self) -> String {
        format_remaining(self.state.remaining_seconds)
    }

    /// Applies one timer event.
    ///
    /// Events from other generations are ignored, and `Expired` is reported
    /// at most once.
    pub fn apply(&mut self, event: &CountdownEvent) -> DisplayUpdate {
        if event.generation() != self.generation {
            return DisplayUpdate::Ignored;
        }

        match event {
            CountdownEvent::Tick { state, .. } => {
                self.state = *state;
                DisplayUpdate::Redraw
            }
            CountdownEvent::Expired { .. } if !self.expiration_reported => {
                self.expiration_reported = true;
                self.state = CountdownState {
                    remaining_seconds: 0,
                    progress_percent: 0.0,
                };
                DisplayUpdate::Expired
            }
            CountdownEvent::Expired { .. } => DisplayUpdate::Ignored,
        }
    }

    /// Renders the QR block followed by the countdown line and bar.
    pub fn render(&self) -> String {
        format!(
            "{}\nExpires in: {}\n{} {:>3.0}%\n",
            self.qr.to_terminal(),
            self.remaining_text(),
            render_progress_bar(self.state.progress_percent, PROGRESS_BAR_WIDTH),
            self.state.progress_percent
        )
    }
}

/// Display layer errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DisplayError {
    /// Token could not be encoded as a QR code.
    #[error("qr encoding failed: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for formatting helpers.

    use super::*;

    #[test]
    fn formats_minutes_without_hour_rollover() {
        assert_eq!(format_remaining(0), "00:00");
        assert_eq!(format_remaining(59), "00:59");
        assert_eq!(format_remaining(60), "01:00");
        assert_eq!(format_remaining(300), "05:00");
        assert_eq!(format_remaining(3_661), "61:01");
    }

    #[test]
    fn progress_bar_is_clamped() {
        assert_eq!(render_progress_bar(100.0, 4), "[████]");
        assert_eq!(render_progress_bar(50.0, 4), "[██░░]");
        assert_eq!(render_progress_bar(0.0, 4), "[░░░░]");
        assert_eq!(render_progress_bar(150.0, 2), "[██]");
        assert_eq!(render_progress_bar(-3.0, 2), "[░░]");
    }
}
