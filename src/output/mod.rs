//! Output formatting and display system
//!
//! Renders a finished [`SpeedTestReport`] as colored text, plain text or JSON,
//! and draws the live rate line while a transfer phase runs.

pub mod formatter;
mod colored;
mod json;
mod progress;

pub use formatter::{
    format_bytes,
    format_duration,
    FormattingOptions,
    PlainFormatter,
    ReportFormatter,
};
pub use self::colored::{
    ColoredFormatter,
    ColorScheme,
    PerformanceLevel,
};
pub use json::JsonFormatter;
pub use progress::{ConsoleProgress, REDRAW_INTERVAL};

use crate::{error::Result, models::SpeedTestReport};

/// Output formatting factory for creating appropriate formatters
pub struct OutputFormatterFactory;

impl OutputFormatterFactory {
    /// Create a formatter based on color support and preferences
    pub fn create_formatter(enable_color: bool, verbose: bool, json: bool) -> Box<dyn ReportFormatter> {
        if json {
            return Box::new(JsonFormatter);
        }

        let options = FormattingOptions {
            enable_color,
            verbose_mode: verbose,
            ..Default::default()
        };

        if enable_color {
            Box::new(ColoredFormatter::new(options))
        } else {
            Box::new(PlainFormatter::new(options))
        }
    }

    /// Create a plain text formatter for scripts/logs
    pub fn create_plain_formatter() -> Box<dyn ReportFormatter> {
        Self::create_formatter(false, true, false)
    }
}

/// Render a report with the formatter matching the given preferences
pub fn render_report(report: &SpeedTestReport, enable_color: bool, verbose: bool, json: bool) -> Result<String> {
    OutputFormatterFactory::create_formatter(enable_color, verbose, json).format_report(report)
}
