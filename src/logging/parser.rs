//! Extracts correlation metadata from log messages.
//!
//! Only three message shapes are recognized, all anchored at the start of the
//! message:
//!
//! ```text
//! [Request] <tool> ...
//! [Response] <tool> success (<N>ms)
//! [Error] <tool> failed: ... (<N>ms)
//! ```
//!
//! Call sites that want a tool name or duration attached must emit one of
//! these shapes; see [`super::tool_call`].
use super::entry::{LogEntry, LogLevel};
use once_cell::sync::Lazy;
use regex::Regex;

static REQUEST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\[Request\]\s+(\w+)").expect("request pattern is valid"));

static RESPONSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[Response\]\s+(\w+)\s+success\s+\((\d+)ms\)").expect("response pattern is valid")
});

static FAILURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\[Error\]\s+(\w+)\s+failed:.*\((\d+)ms\)").expect("failure pattern is valid")
});

/// Builds a [`LogEntry`] from the pieces of an accepted write.
pub fn parse(timestamp: String, level: LogLevel, message: String, raw: String) -> LogEntry {
    let (tool, duration_ms) = match extract(&message) {
        Some((tool, duration_ms)) => (Some(tool), duration_ms),
        None => (None, None),
    };

    LogEntry {
        timestamp,
        level,
        message,
        tool,
        duration_ms,
        raw,
    }
}

/// Returns the tool name and optional duration if `message` matches a known shape.
fn extract(message: &str) -> Option<(String, Option<u64>)> {
    for pattern in [&*RESPONSE, &*FAILURE] {
        if let Some(caps) = pattern.captures(message) {
            // A duration that does not fit in u64 is dropped, the tool is kept.
            let duration = caps[2].parse::<u64>().ok();
            return Some((caps[1].to_string(), duration));
        }
    }

    REQUEST
        .captures(message)
        .map(|caps| (caps[1].to_string(), None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(message: &str) -> LogEntry {
        parse(
            "2025-01-01T00:00:00.000Z".into(),
            LogLevel::Info,
            message.into(),
            format!("[2025-01-01T00:00:00.000Z] [INFO ] {message}"),
        )
    }

    #[test]
    fn response_sets_tool_and_duration() {
        let e = entry("[Response] redmine_get_issue success (42ms)");
        assert_eq!(e.tool.as_deref(), Some("redmine_get_issue"));
        assert_eq!(e.duration_ms, Some(42));
    }

    #[test]
    fn plain_messages_have_no_metadata() {
        let e = entry("just a note");
        assert_eq!(e.tool, None);
        assert_eq!(e.duration_ms, None);
    }

    #[test]
    fn request_sets_tool_only() {
        let e = entry(r#"[Request] redmine_list_issues {"project_id":"demo"}"#);
        assert_eq!(e.tool.as_deref(), Some("redmine_list_issues"));
        assert_eq!(e.duration_ms, None);
    }

    #[test]
    fn failure_sets_tool_and_duration() {
        let e = entry("[Error] redmine_update_issue failed: HTTP 422 (validation) (1280ms)");
        assert_eq!(e.tool.as_deref(), Some("redmine_update_issue"));
        assert_eq!(e.duration_ms, Some(1280));
    }

    #[test]
    fn shapes_must_be_anchored() {
        assert_eq!(entry("note: [Request] redmine_get_issue").tool, None);
        assert_eq!(entry("[Response] redmine_get_issue failed (3ms)").duration_ms, None);
        assert_eq!(entry("[Response] redmine_get_issue failed (3ms)").tool, None);
    }

    #[test]
    fn response_without_duration_is_not_a_match() {
        let e = entry("[Response] redmine_get_issue success");
        assert_eq!(e.tool, None);
    }

    #[test]
    fn oversized_duration_keeps_tool() {
        let e = entry("[Response] redmine_search success (99999999999999999999999ms)");
        assert_eq!(e.tool.as_deref(), Some("redmine_search"));
        assert_eq!(e.duration_ms, None);
    }

    #[test]
    fn fields_pass_through() {
        let e = entry("hello");
        assert_eq!(e.message, "hello");
        assert_eq!(e.level, LogLevel::Info);
        assert_eq!(e.raw, "[2025-01-01T00:00:00.000Z] [INFO ] hello");
    }
}
