//! Colored formatter implementation with terminal color support

use crate::{
    error::Result,
    models::{LatencyResult, Phase, ThroughputResult},
};
use super::formatter::{fmt_err, format_bytes, format_duration, FormattingOptions, ReportFormatter};
use std::fmt::Write as _;
use colored::*;

/// Rating of a measured figure, used for color coding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceLevel {
    Excellent,
    Good,
    Fair,
    Poor,
    VeryPoor,
}

impl PerformanceLevel {
    /// Classify a round-trip time in milliseconds
    pub fn from_latency(time_ms: f64) -> Self {
        if time_ms < 20.0 {
            Self::Excellent
        } else if time_ms < 50.0 {
            Self::Good
        } else if time_ms < 100.0 {
            Self::Fair
        } else if time_ms < 300.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    /// Classify a throughput in megabits per second
    pub fn from_throughput(mbps: f64) -> Self {
        if mbps >= 500.0 {
            Self::Excellent
        } else if mbps >= 100.0 {
            Self::Good
        } else if mbps >= 25.0 {
            Self::Fair
        } else if mbps >= 5.0 {
            Self::Poor
        } else {
            Self::VeryPoor
        }
    }

    pub fn color(&self) -> Color {
        match self {
            Self::Excellent => Color::Green,
            Self::Good => Color::Cyan,
            Self::Fair => Color::Yellow,
            Self::Poor => Color::Magenta,
            Self::VeryPoor => Color::Red,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Excellent => "●●●●",
            Self::Good => "●●●○",
            Self::Fair => "●●○○",
            Self::Poor => "●○○○",
            Self::VeryPoor => "○○○○",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Excellent => "Excellent",
            Self::Good => "Good",
            Self::Fair => "Fair",
            Self::Poor => "Poor",
            Self::VeryPoor => "Very Poor",
        }
    }
}

/// Color scheme configuration
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub header: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
    pub label: Color,
    pub muted: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self {
            header: Color::Blue,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
            label: Color::Cyan,
            muted: Color::BrightBlack,
        }
    }
}

/// Colored formatter implementation
pub struct ColoredFormatter {
    options: FormattingOptions,
    color_scheme: ColorScheme,
}

impl ColoredFormatter {
    pub fn new(options: FormattingOptions) -> Self {
        Self {
            options,
            color_scheme: ColorScheme::default(),
        }
    }

    /// Apply color to text if colors are enabled
    fn colorize(&self, text: &str, color: Color) -> ColoredString {
        if self.options.enable_color {
            text.color(color)
        } else {
            text.normal()
        }
    }

    fn label(&self, label: &str) -> ColoredString {
        let padded = format!("{:<width$}", format!("{}:", label), width = self.options.label_width);
        self.colorize(&padded, self.color_scheme.label).bold()
    }

    fn rated(&self, value: String, level: PerformanceLevel) -> String {
        format!(
            "{} {}",
            self.colorize(&value, level.color()).bold(),
            self.colorize(level.symbol(), level.color())
        )
    }
}

impl ReportFormatter for ColoredFormatter {
    fn format_header(&self, title: &str) -> Result<String> {
        let mut output = String::new();
        let border = "═".repeat(title.chars().count() + 4);

        writeln!(output, "{}", self.colorize(&border, self.color_scheme.header)).map_err(fmt_err)?;
        writeln!(output, "  {}  ", self.colorize(title, self.color_scheme.header).bold()).map_err(fmt_err)?;
        write!(output, "{}", self.colorize(&border, self.color_scheme.header)).map_err(fmt_err)?;

        Ok(output)
    }

    fn format_latency(&self, latency: &LatencyResult) -> Result<String> {
        let mut output = String::new();
        let level = PerformanceLevel::from_latency(latency.median_ms);

        writeln!(
            output,
            "{} {}",
            self.label("Ping"),
            self.rated(format!("{:.1} ms", latency.median_ms), level)
        )
        .map_err(fmt_err)?;

        if self.options.verbose_mode {
            let detail = format!(
                "samples {} | jitter {:.1} ms",
                latency.format_samples(),
                latency.summary.jitter_ms
            );
            writeln!(output, "{} {}", self.label(""), self.colorize(&detail, self.color_scheme.muted))
                .map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_throughput(&self, result: &ThroughputResult) -> Result<String> {
        let mut output = String::new();
        let level = PerformanceLevel::from_throughput(result.mbps);
        let label = match result.phase {
            Phase::Download => "Download",
            Phase::Upload => "Upload",
            Phase::Latency => "Latency",
        };

        writeln!(
            output,
            "{} {}",
            self.label(label),
            self.rated(format!("{:.2} Mbps", result.mbps), level)
        )
        .map_err(fmt_err)?;

        if self.options.verbose_mode {
            let detail = format!(
                "{} in {} | {} workers",
                format_bytes(result.bytes),
                format_duration(result.elapsed_ms()),
                result.workers
            );
            writeln!(output, "{} {}", self.label(""), self.colorize(&detail, self.color_scheme.muted))
                .map_err(fmt_err)?;
        }

        Ok(output)
    }

    fn format_error(&self, error: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("✗", self.color_scheme.error).bold(), error))
    }

    fn format_warning(&self, warning: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("!", self.color_scheme.warning).bold(), warning))
    }

    fn format_success(&self, message: &str) -> Result<String> {
        Ok(format!("{} {}", self.colorize("✓", self.color_scheme.success).bold(), message))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::formatter::tests::sample_report;

    fn formatter(verbose: bool) -> ColoredFormatter {
        colored::control::set_override(false);
        ColoredFormatter::new(FormattingOptions {
            enable_color: false,
            verbose_mode: verbose,
            ..Default::default()
        })
    }

    #[test]
    fn test_latency_levels() {
        assert_eq!(PerformanceLevel::from_latency(5.0), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::from_latency(35.0), PerformanceLevel::Good);
        assert_eq!(PerformanceLevel::from_latency(80.0), PerformanceLevel::Fair);
        assert_eq!(PerformanceLevel::from_latency(150.0), PerformanceLevel::Poor);
        assert_eq!(PerformanceLevel::from_latency(1500.0), PerformanceLevel::VeryPoor);
    }

    #[test]
    fn test_throughput_levels() {
        assert_eq!(PerformanceLevel::from_throughput(940.0), PerformanceLevel::Excellent);
        assert_eq!(PerformanceLevel::from_throughput(100.0), PerformanceLevel::Good);
        assert_eq!(PerformanceLevel::from_throughput(30.0), PerformanceLevel::Fair);
        assert_eq!(PerformanceLevel::from_throughput(5.0), PerformanceLevel::Poor);
        assert_eq!(PerformanceLevel::from_throughput(0.0), PerformanceLevel::VeryPoor);
    }

    #[test]
    fn test_report_contains_figures() {
        let output = formatter(false).format_report(&sample_report()).unwrap();
        assert!(output.contains("11.0 ms"));
        assert!(output.contains("100.00 Mbps"));
        assert!(output.contains("20.00 Mbps"));
        assert!(!output.contains("workers"));
    }

    #[test]
    fn test_verbose_details() {
        let output = formatter(true).format_report(&sample_report()).unwrap();
        assert!(output.contains("jitter 1.0 ms"));
        assert!(output.contains("4 workers"));
    }
}
