// Display side: what the GUI is told to draw, and the tick that drives it

mod console;
pub(crate) mod render_loop;

pub use console::ConsoleDisplay;
pub use render_loop::{RenderLoop, DEFAULT_TICK_INTERVAL};

use crate::transport::TransportState;

/// The two vertical lines drawn over the cached waveform image.
/// Both are x positions in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlay {
    pub cursor: f64,
    pub marker: Option<f64>,
}

impl Overlay {
    pub fn time_label(&self) -> String {
        format!("Time: {:.3} sec.", self.cursor)
    }

    pub fn marker_label(&self) -> String {
        match self.marker {
            Some(marker) => format!("Marker: {:.3} sec.", marker),
            None => "Marker: - sec.".to_string(),
        }
    }
}

/// Which transport buttons are usable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub play: bool,
    pub pause: bool,
    pub stop: bool,
}

impl Controls {
    pub fn for_state(state: TransportState) -> Self {
        match state {
            TransportState::Idle => Self::default(),
            TransportState::Stopped => Self {
                play: true,
                pause: false,
                stop: false,
            },
            TransportState::Playing => Self {
                play: false,
                pause: true,
                stop: true,
            },
            TransportState::Paused => Self {
                play: true,
                pause: true,
                stop: true,
            },
        }
    }
}

/// Implemented by whatever draws the plot.
///
/// Called from the render loop, never while the controller is locked.
/// Implementations must not block.
pub trait DisplaySink: Send + Sync {
    /// Restore the cached background and draw the overlay lines on it
    fn redraw_overlay(&self, overlay: Overlay);

    fn update_controls(&self, _controls: Controls) {}
}
