//! The "show me the log viewer" operational tool.
use serde::Serialize;

/// What the status tool reports back to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewerStatus {
    pub running: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    pub message: String,
}

impl ViewerStatus {
    pub fn running(port: u16, url: String, opened: bool) -> Self {
        let message = if opened {
            "Opened the Log Viewer in the browser".to_string()
        } else {
            format!("Log Viewer running at {url}")
        };
        Self {
            running: true,
            url: Some(url),
            port: Some(port),
            message,
        }
    }

    pub fn stopped() -> Self {
        Self {
            running: false,
            url: None,
            port: None,
            message: "Log Viewer is not running, set LOG_VIEWER=true to enable it".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stopped_status_carries_a_hint() {
        let json = serde_json::to_value(ViewerStatus::stopped()).unwrap();
        assert_eq!(json["running"], false);
        assert!(json.get("url").is_none());
        assert!(json["message"].as_str().unwrap().contains("LOG_VIEWER=true"));
    }

    #[test]
    fn running_status_reports_where() {
        let status = ViewerStatus::running(3457, "http://localhost:3457".into(), false);
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["running"], true);
        assert_eq!(json["port"], 3457);
        assert_eq!(json["url"], "http://localhost:3457");
    }
}
