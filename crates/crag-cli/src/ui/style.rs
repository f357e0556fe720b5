//! Message styling for CLI output.
//!
//! ## Message Types
//!
//! | Prefix | Meaning | Color |
//! |--------|---------|-------|
//! | `[ok]` | Success | Green |
//! | `[err]` | Error | Red |
//! | `[warn]` | Warning | Yellow |
//! | `[info]` | Information | Blue |
//! | `[hint]` | Suggestion | Cyan |

use owo_colors::OwoColorize;

use crag_core::{GateDecisionKind, TraceNode};

use super::color::ColorMode;

/// Message severity/type for CLI output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Operation completed successfully
    Ok,
    /// Operation failed, cannot continue
    Err,
    /// Operation succeeded with caveats
    Warn,
    /// Neutral status
    Info,
    /// Actionable next step
    Hint,
}

impl MessageType {
    /// Returns the prefix text for this message type.
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::Ok => "[ok]",
            Self::Err => "[err]",
            Self::Warn => "[warn]",
            Self::Info => "[info]",
            Self::Hint => "[hint]",
        }
    }
}

/// Main styling interface for CLI output.
///
/// # Example
///
/// ```ignore
/// let style = Style::new(ColorMode::Never);
/// println!("{}", style.message(MessageType::Ok, "Evidence is sufficient"));
/// ```
#[derive(Debug, Clone)]
pub struct Style {
    color_mode: ColorMode,
}

impl Style {
    pub fn new(color_mode: ColorMode) -> Self {
        Self { color_mode }
    }

    pub fn colors_enabled(&self) -> bool {
        self.color_mode.is_enabled()
    }

    /// Format a simple message with a type prefix.
    pub fn message(&self, msg_type: MessageType, text: &str) -> String {
        let prefix = msg_type.prefix();
        if self.colors_enabled() {
            let colored_prefix = match msg_type {
                MessageType::Ok => prefix.green().to_string(),
                MessageType::Err => prefix.red().to_string(),
                MessageType::Warn => prefix.yellow().to_string(),
                MessageType::Info => prefix.blue().to_string(),
                MessageType::Hint => prefix.cyan().to_string(),
            };
            format!("{} {}", colored_prefix, text)
        } else {
            format!("{} {}", prefix, text)
        }
    }

    /// Format a section header.
    pub fn section(&self, title: &str) -> String {
        if self.colors_enabled() {
            title.bold().to_string()
        } else {
            title.to_string()
        }
    }

    /// Format an error with optional cause and hint lines.
    pub fn error_with_context(
        &self,
        msg: &str,
        cause: Option<&str>,
        hint: Option<&str>,
    ) -> String {
        let mut output = self.message(MessageType::Err, msg);

        if let Some(cause_text) = cause {
            output.push('\n');
            output.push_str(&format!("      Cause: {}", cause_text));
        }

        if let Some(hint_text) = hint {
            output.push('\n');
            output.push_str(&format!("      Hint: {}", hint_text));
        }

        output
    }

    pub fn key_value(&self, key: &str, value: &str) -> String {
        if self.colors_enabled() {
            format!("{}: {}", key.dimmed(), value)
        } else {
            format!("{}: {}", key, value)
        }
    }

    /// Format a judge score, green above the threshold and red otherwise.
    pub fn score(&self, value: f32, threshold: f32) -> String {
        let formatted = format!("{:.2}", value);
        if !self.colors_enabled() {
            formatted
        } else if value > threshold {
            formatted.green().to_string()
        } else {
            formatted.red().to_string()
        }
    }

    pub fn decision(&self, kind: GateDecisionKind) -> String {
        let text = kind.to_string();
        if !self.colors_enabled() {
            return text;
        }
        match kind {
            GateDecisionKind::Sufficient => text.green().to_string(),
            GateDecisionKind::Insufficient => text.yellow().to_string(),
        }
    }

    /// Format a trace node label. The current node is bold, terminal nodes
    /// are green for `Done` and red for `Failed`.
    pub fn trace_label(&self, node: &TraceNode) -> String {
        if !self.colors_enabled() {
            return node.label.clone();
        }
        let colored = if !node.is_terminal {
            node.label.clone()
        } else if node.label.starts_with("Failed") {
            node.label.red().to_string()
        } else {
            node.label.green().to_string()
        };
        if node.is_current {
            colored.bold().to_string()
        } else {
            colored
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_prefix() {
        assert_eq!(MessageType::Ok.prefix(), "[ok]");
        assert_eq!(MessageType::Err.prefix(), "[err]");
        assert_eq!(MessageType::Warn.prefix(), "[warn]");
        assert_eq!(MessageType::Info.prefix(), "[info]");
        assert_eq!(MessageType::Hint.prefix(), "[hint]");
    }

    #[test]
    fn test_message_no_color() {
        let style = Style::new(ColorMode::Never);
        assert_eq!(style.message(MessageType::Ok, "Sufficient"), "[ok] Sufficient");
        assert_eq!(style.message(MessageType::Err, "Failed"), "[err] Failed");
    }

    #[test]
    fn test_error_with_context() {
        let style = Style::new(ColorMode::Never);
        let output = style.error_with_context(
            "Failed to initialize",
            Some("Provider `tavily` is unavailable"),
            Some("Set search.provider to none"),
        );
        assert!(output.contains("[err] Failed to initialize"));
        assert!(output.contains("Cause: Provider `tavily` is unavailable"));
        assert!(output.contains("Hint: Set search.provider to none"));
    }

    #[test]
    fn test_plain_domain_values() {
        let style = Style::new(ColorMode::Never);
        assert_eq!(style.score(0.456, 0.5), "0.46");
        assert_eq!(style.decision(GateDecisionKind::Insufficient), "insufficient");
        assert_eq!(style.key_value("Query", "q"), "Query: q");
    }
}
