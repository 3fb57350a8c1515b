//! Turns lines read from a stream (usually stdin) into event log entries.
use crate::logging::{EventLog, LogLevel};
use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

/// Splits a leading `[LEVEL]` tag off `line`.
///
/// The tag is matched case-insensitively and may be padded, so both `[WARN]`
/// and `[INFO ]` are understood. Lines without a recognised tag keep their
/// full text and get `fallback`.
pub fn split_level(line: &str, fallback: LogLevel) -> (LogLevel, &str) {
    let tagged = line
        .strip_prefix('[')
        .and_then(|rest| rest.split_once(']'))
        .and_then(|(tag, rest)| Some((tag.parse::<LogLevel>().ok()?, rest.trim_start())));

    tagged.unwrap_or((fallback, line))
}

/// Writes every non-blank line of `reader` to `log` until end of input.
///
/// Bytes that are not valid UTF-8 are replaced with U+FFFD so one bad line
/// never ends forwarding. Returns the number of lines forwarded.
///
/// # Errors
///
/// Returns an error if reading from `reader` fails.
pub async fn forward<R>(mut reader: R, log: &EventLog, fallback: LogLevel) -> Result<usize>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();
    let mut forwarded = 0;
    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            break;
        }
        let text = String::from_utf8_lossy(&buf);
        let line = text.trim_end();
        if line.trim().is_empty() {
            continue;
        }
        let (level, message) = split_level(line, fallback);
        log.write(level, message);
        forwarded += 1;
    }
    Ok(forwarded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{EventLogConfig, LogEntry};
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn tags_select_the_level() {
        assert_eq!(
            split_level("[ERROR] disk full", LogLevel::Info),
            (LogLevel::Error, "disk full")
        );
        assert_eq!(
            split_level("[warn]   retrying", LogLevel::Info),
            (LogLevel::Warn, "retrying")
        );
        assert_eq!(
            split_level("[INFO ] padded", LogLevel::Debug),
            (LogLevel::Info, "padded")
        );
    }

    #[test]
    fn untagged_lines_keep_their_text() {
        assert_eq!(
            split_level("[Request] list_issues", LogLevel::Info),
            (LogLevel::Info, "[Request] list_issues")
        );
        assert_eq!(
            split_level("plain text", LogLevel::Debug),
            (LogLevel::Debug, "plain text")
        );
        assert_eq!(
            split_level("[unterminated", LogLevel::Warn),
            (LogLevel::Warn, "[unterminated")
        );
    }

    #[tokio::test]
    async fn forwards_non_blank_lines_in_order() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(EventLogConfig {
            file_path: dir.path().join("pipe.log"),
            min_level: LogLevel::Debug,
            mirror_stderr: false,
        });
        let seen: Arc<Mutex<Vec<(LogLevel, String)>>> = Arc::default();
        let sink = Arc::clone(&seen);
        log.subscribe(Arc::new(move |entry: &Arc<LogEntry>| -> anyhow::Result<()> {
            sink.lock().push((entry.level, entry.message.clone()));
            Ok(())
        }));

        let input: &[u8] = b"starting\n\n   \n[ERROR] boom\r\n[DEBUG] detail\n";
        let forwarded = forward(input, &log, LogLevel::Info).await.unwrap();

        assert_eq!(forwarded, 3);
        assert_eq!(
            *seen.lock(),
            vec![
                (LogLevel::Info, "starting".to_string()),
                (LogLevel::Error, "boom".to_string()),
                (LogLevel::Debug, "detail".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn invalid_utf8_does_not_stop_forwarding() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(EventLogConfig {
            file_path: dir.path().join("pipe.log"),
            min_level: LogLevel::Debug,
            mirror_stderr: false,
        });

        let input: &[u8] = b"before\n\xff\xfe bad\nafter\n";
        let forwarded = forward(input, &log, LogLevel::Info).await.unwrap();

        assert_eq!(forwarded, 3);
        let on_disk = std::fs::read_to_string(log.file_path()).unwrap();
        let lines: Vec<&str> = on_disk.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].ends_with("before"));
        assert!(lines[1].ends_with("\u{FFFD}\u{FFFD} bad"));
        assert!(lines[2].ends_with("after"));
    }

    #[tokio::test]
    async fn last_line_without_newline_is_forwarded() {
        let dir = TempDir::new().unwrap();
        let log = EventLog::new(EventLogConfig {
            file_path: dir.path().join("pipe.log"),
            min_level: LogLevel::Debug,
            mirror_stderr: false,
        });

        let input: &[u8] = b"first\n[WARN] trailing";
        assert_eq!(forward(input, &log, LogLevel::Info).await.unwrap(), 2);
    }
}
