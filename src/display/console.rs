// Text-mode display used by the command line binary

use parking_lot::Mutex;
use std::io::Write;

use super::{Controls, DisplaySink, Overlay};

/// Prints the time and marker labels on a single, rewritten line
#[derive(Default)]
pub struct ConsoleDisplay {
    last_line: Mutex<String>,
}

impl ConsoleDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    fn line(overlay: &Overlay) -> String {
        format!("{}   {}", overlay.time_label(), overlay.marker_label())
    }
}

impl DisplaySink for ConsoleDisplay {
    fn redraw_overlay(&self, overlay: Overlay) {
        let line = Self::line(&overlay);
        let mut last_line = self.last_line.lock();
        if *last_line == line {
            return;
        }

        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "\r{}", line);
        let _ = stdout.flush();
        *last_line = line;
    }

    fn update_controls(&self, controls: Controls) {
        log::trace!("Controls: {:?}", controls);
    }
}
