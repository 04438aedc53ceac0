//! Output handling: human-readable or JSON, with optional color

mod formatter;

pub use formatter::Formatter;

/// How command output is rendered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OutputConfig {
    /// Strict JSON on stdout, no colors or progress bars
    pub json: bool,
    pub no_color: bool,
    /// Suppress everything except errors
    pub quiet: bool,
}

impl OutputConfig {
    /// Whether an interactive progress bar may be drawn
    pub fn show_progress(&self) -> bool {
        !self.json && !self.quiet
    }
}
