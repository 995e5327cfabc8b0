//! Framed operator notices.
//!
//! Connection state changes are rare and matter to whoever is watching
//! the server console, so they are printed as boxes rather than as a
//! single log line:
//!
//! ```text
//! ╔════════════════════════════════════════════════════════════════╗
//! ║                         WARDEN NOTICE                          ║
//! ║────────────────────────────────────────────────────────────────║
//! ║ Connection to the authority has been restored!                 ║
//! ╚════════════════════════════════════════════════════════════════╝
//! ```
//!
//! [`Frame`] is public so the agent can render its own banners (server
//! info, critical errors) in the same style.

use tracing::Level;

/// Inner width of a frame, in characters.
pub const FRAME_WIDTH: usize = 64;

/// A titled box of text lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    title: String,
    lines: Vec<String>,
}

impl Frame {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            lines: Vec::new(),
        }
    }

    /// Adds left-aligned text, word-wrapped to fit the frame.
    pub fn line(mut self, text: impl AsRef<str>) -> Self {
        for line in wrap(text.as_ref(), FRAME_WIDTH - 2) {
            self.lines.push(format!(" {line:<width$} ", width = FRAME_WIDTH - 2));
        }
        self
    }

    /// Adds `label: value`, wrapping the value under the label.
    pub fn field(self, label: &str, value: impl AsRef<str>) -> Self {
        self.line(format!("{label}: {}", value.as_ref()))
    }

    /// Adds centered text.
    pub fn centered(mut self, text: impl AsRef<str>) -> Self {
        for line in wrap(text.as_ref(), FRAME_WIDTH - 2) {
            self.lines.push(format!("{line:^width$}", width = FRAME_WIDTH));
        }
        self
    }

    pub fn blank(mut self) -> Self {
        self.lines.push(" ".repeat(FRAME_WIDTH));
        self
    }

    /// Renders the frame, one string per output line.
    pub fn render(&self) -> Vec<String> {
        let mut out = Vec::with_capacity(self.lines.len() + 4);
        out.push(format!("╔{}╗", "═".repeat(FRAME_WIDTH)));
        out.push(format!("║{:^width$}║", self.title, width = FRAME_WIDTH));
        out.push(format!("║{}║", "─".repeat(FRAME_WIDTH)));
        for line in &self.lines {
            out.push(format!("║{line}║"));
        }
        out.push(format!("╚{}╝", "═".repeat(FRAME_WIDTH)));
        out
    }

    /// Emits every rendered line at `level`.
    pub fn log(&self, level: Level) {
        for line in self.render() {
            match level {
                Level::ERROR => tracing::error!("{line}"),
                Level::WARN => tracing::warn!("{line}"),
                Level::INFO => tracing::info!("{line}"),
                Level::DEBUG => tracing::debug!("{line}"),
                Level::TRACE => tracing::trace!("{line}"),
            }
        }
    }
}

/// Greedy word wrap by character count. Words longer than `width` are
/// split.
fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        if word.is_empty() {
            continue;
        }
        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current_len += word.len();
        current.extend(word);
    }
    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

// ---------------------------------------------------------------------------
// Connection notices
// ---------------------------------------------------------------------------

pub(crate) fn connection_lost(cause: &str) {
    Frame::new("WARDEN WARNING")
        .line("Connection to the authority has been lost!")
        .blank()
        .line(
            "The server will continue to run, but some features may be \
             unavailable until the connection is restored.",
        )
        .blank()
        .field("Cause", cause)
        .line("Attempting to reconnect...")
        .log(Level::WARN);
}

pub(crate) fn connection_restored() {
    Frame::new("WARDEN NOTICE")
        .line("Connection to the authority has been restored!")
        .blank()
        .line("Heartbeat service resumed normal operation.")
        .log(Level::INFO);
}
