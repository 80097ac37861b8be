//! Live throughput line shown on the terminal while a phase runs

use std::io::{self, Write};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use colored::Colorize;

use crate::executor::{ProgressObserver, ProgressUpdate};
use crate::models::Phase;

/// Minimum gap between two redraws
pub const REDRAW_INTERVAL: Duration = Duration::from_millis(200);

/// Redraws a single stderr line with the running rate, at most once per
/// [`REDRAW_INTERVAL`]
pub struct ConsoleProgress {
    use_color: bool,
    last_draw: Mutex<Option<Instant>>,
}

impl ConsoleProgress {
    pub fn new(use_color: bool) -> Self {
        Self {
            use_color,
            last_draw: Mutex::new(None),
        }
    }

    /// Text of the progress line for `update`
    pub fn render(&self, update: &ProgressUpdate) -> String {
        let (arrow, label) = match update.phase {
            Phase::Download => ("↓", "Download"),
            Phase::Upload => ("↑", "Upload"),
            Phase::Latency => ("~", "Latency"),
        };
        let rate = format!("{:>9.2} Mbps", update.mbps);
        let rate = if self.use_color { rate.bold().to_string() } else { rate };

        format!("{} {:<8} {} ({:.1}s)", arrow, label, rate, update.elapsed.as_secs_f64())
    }

    /// Whether a redraw is due, recording it if so
    fn should_draw(&self) -> bool {
        let Ok(mut last) = self.last_draw.lock() else {
            return false;
        };
        let now = Instant::now();
        match *last {
            Some(previous) if now.duration_since(previous) < REDRAW_INTERVAL => false,
            _ => {
                *last = Some(now);
                true
            },
        }
    }
}

impl ProgressObserver for ConsoleProgress {
    fn on_progress(&self, update: ProgressUpdate) {
        if !self.should_draw() {
            return;
        }
        let mut stderr = io::stderr().lock();
        let _ = write!(stderr, "\r{}\x1b[K", self.render(&update));
        let _ = stderr.flush();
    }

    fn on_phase_complete(&self, phase: Phase) {
        if phase == Phase::Latency {
            return;
        }
        if let Ok(mut last) = self.last_draw.lock() {
            *last = None;
        }
        let _ = write!(io::stderr(), "\r\x1b[K");
    }
}
