//! Logs a tool invocation in the shapes the entry parser recognizes.
use super::redact::{truncate_for_log, DEFAULT_TRUNCATE_LENGTH};
use super::EventLog;
use serde::Serialize;
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::time::Instant;

/// Runs `call` as tool `name`, logging its request, outcome and elapsed time.
///
/// Emits `[Request] <name> <args>` before the call, then either
/// `[Response] <name> success (<N>ms)` followed by a debug line with the
/// truncated result, or `[Error] <name> failed: <error> (<N>ms)`. Arguments and
/// results are redacted before they are formatted. The call's result is
/// returned untouched.
pub async fn traced<T, E, F>(log: &EventLog, name: &str, args: &Value, call: F) -> Result<T, E>
where
    F: Future<Output = Result<T, E>>,
    T: Serialize,
    E: Display,
{
    if args.is_null() {
        log.info(format!("[Request] {name}"));
    } else {
        log.info(format!(
            "[Request] {} {}",
            name,
            truncate_for_log(args, DEFAULT_TRUNCATE_LENGTH)
        ));
    }

    let started = Instant::now();
    let result = call.await;
    let elapsed = started.elapsed().as_millis();

    match &result {
        Ok(value) => {
            log.info(format!("[Response] {name} success ({elapsed}ms)"));
            let body = serde_json::to_value(value).unwrap_or(Value::Null);
            log.debug(format!(
                "[Response] {} result: {}",
                name,
                truncate_for_log(&body, DEFAULT_TRUNCATE_LENGTH)
            ));
        }
        Err(e) => log.error(format!("[Error] {name} failed: {e} ({elapsed}ms)")),
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{EventLogConfig, LogEntry, LogLevel};
    use parking_lot::Mutex;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn recording_log(dir: &TempDir) -> (EventLog, Arc<Mutex<Vec<Arc<LogEntry>>>>) {
        let log = EventLog::new(EventLogConfig {
            file_path: dir.path().join("tools.log"),
            min_level: LogLevel::Debug,
            mirror_stderr: false,
        });
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        log.subscribe(Arc::new(move |entry: &Arc<LogEntry>| -> anyhow::Result<()> {
            sink.lock().push(entry.clone());
            Ok(())
        }));
        (log, seen)
    }

    #[tokio::test]
    async fn success_emits_request_response_and_result() {
        let dir = TempDir::new().unwrap();
        let (log, seen) = recording_log(&dir);

        let out: Result<Value, String> = traced(
            &log,
            "redmine_get_issue",
            &json!({"issue_id": 7, "api_key": "0123456789abcdef0123"}),
            async { Ok(json!({"issue": {"id": 7}})) },
        )
        .await;
        assert_eq!(out.unwrap()["issue"]["id"], 7);

        let seen = seen.lock();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0].tool.as_deref(), Some("redmine_get_issue"));
        assert!(seen[0].message.contains(r#""issue_id":7"#));
        assert!(!seen[0].message.contains("0123456789abcdef0123"));
        assert_eq!(seen[1].tool.as_deref(), Some("redmine_get_issue"));
        assert!(seen[1].duration_ms.is_some());
        assert_eq!(seen[2].level, LogLevel::Debug);
        assert!(seen[2].message.contains(r#"{"issue":{"id":7}}"#));
    }

    #[tokio::test]
    async fn failure_emits_error_shape() {
        let dir = TempDir::new().unwrap();
        let (log, seen) = recording_log(&dir);

        let out: Result<Value, String> = traced(&log, "redmine_update_issue", &Value::Null, async {
            Err("HTTP 422".to_string())
        })
        .await;
        assert!(out.is_err());

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].message, "[Request] redmine_update_issue");
        assert_eq!(seen[1].level, LogLevel::Error);
        assert_eq!(seen[1].tool.as_deref(), Some("redmine_update_issue"));
        assert!(seen[1].duration_ms.is_some());
        assert!(seen[1].message.starts_with("[Error] redmine_update_issue failed: HTTP 422 ("));
    }
}
