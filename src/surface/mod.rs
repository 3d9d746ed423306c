//! The target surface: the browser content hosting the editor, seen from
//! the host through its native controls only.

pub mod chrome;

use std::fmt;

use serde::Serialize;

use crate::error::SurfaceError;
use crate::probe::ExecutionRequest;

pub const MIN_ZOOM: f64 = 0.3;
pub const MAX_ZOOM: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.1;
pub const DEFAULT_ZOOM: f64 = 1.0;

/// Lifecycle of a surface as seen by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SurfaceState {
    Absent,
    Loading,
    Ready,
    Navigating,
}

impl fmt::Display for SurfaceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SurfaceState::Absent => "absent",
            SurfaceState::Loading => "loading",
            SurfaceState::Ready => "ready",
            SurfaceState::Navigating => "navigating",
        };
        f.write_str(s)
    }
}

/// Native controls of the embedding browser surface.
///
/// Everything here is a capability of the browser itself, not of the page it
/// shows. The one exception, [`run_in_context`](TargetSurface::run_in_context),
/// is one-way: the request is handed over and nothing comes back.
pub trait TargetSurface: Send {
    fn state(&self) -> SurfaceState;

    fn reload(&mut self) -> Result<(), SurfaceError>;
    fn reload_bypassing_cache(&mut self) -> Result<(), SurfaceError>;

    fn zoom_factor(&self) -> Result<f64, SurfaceError>;
    fn set_zoom_factor(&mut self, factor: f64) -> Result<(), SurfaceError>;

    fn can_go_back(&self) -> Result<bool, SurfaceError>;
    fn go_back(&mut self) -> Result<(), SurfaceError>;
    fn can_go_forward(&self) -> Result<bool, SurfaceError>;
    fn go_forward(&mut self) -> Result<(), SurfaceError>;

    fn load_url(&mut self, url: &str) -> Result<(), SurfaceError>;

    fn is_devtools_open(&self) -> Result<bool, SurfaceError>;
    fn open_devtools(&mut self) -> Result<(), SurfaceError>;
    fn close_devtools(&mut self) -> Result<(), SurfaceError>;

    /// Inject and run the probe for `request` inside the page. Returns once
    /// the request is handed off; the probe's own result is never observed.
    fn run_in_context(&mut self, request: ExecutionRequest) -> Result<(), SurfaceError>;
}

/// Opens a fresh surface on a URL. Used when the base URL changes and the
/// current surface is replaced wholesale.
pub trait SurfaceFactory: Send {
    fn open(&mut self, url: &str) -> Result<Box<dyn TargetSurface>, SurfaceError>;
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn zoom_in(current: f64) -> f64 {
    round_hundredths(current + ZOOM_STEP).clamp(MIN_ZOOM, MAX_ZOOM)
}

pub fn zoom_out(current: f64) -> f64 {
    round_hundredths(current - ZOOM_STEP).clamp(MIN_ZOOM, MAX_ZOOM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zoom_in_clamps_at_the_top() {
        assert_eq!(zoom_in(2.95), 3.0);
        assert_eq!(zoom_in(3.0), 3.0);
    }

    #[test]
    fn zoom_out_clamps_at_the_bottom() {
        assert_eq!(zoom_out(0.35), 0.3);
        assert_eq!(zoom_out(0.3), 0.3);
    }

    #[test]
    fn steps_do_not_accumulate_float_error() {
        let mut factor = DEFAULT_ZOOM;
        for _ in 0..5 {
            factor = zoom_in(factor);
        }
        assert_eq!(factor, 1.5);
        for _ in 0..5 {
            factor = zoom_out(factor);
        }
        assert_eq!(factor, 1.0);
    }

    #[test]
    fn out_of_range_input_is_pulled_back() {
        assert_eq!(zoom_in(7.0), MAX_ZOOM);
        assert_eq!(zoom_out(-1.0), MIN_ZOOM);
    }
}
