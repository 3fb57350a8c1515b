use crate::logging::{EventLogConfig, LogLevel, DEFAULT_HISTORY_SIZE};
use crate::web::{ViewerConfig, DEFAULT_MAX_PORT_RETRIES, DEFAULT_PORT};
use clap::{builder::BoolishValueParser, ArgAction, Parser};
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "logcast")]
#[command(about = "Structured event log with a live browser viewer")]
pub struct AppArgs {
    #[arg(
        long,
        env = "LOG_FILE",
        default_value_os_t = EventLogConfig::default().file_path,
        help = "File every accepted entry is appended to"
    )]
    pub log_file: PathBuf,

    #[arg(
        long,
        env = "LOG_LEVEL",
        default_value = "info",
        help = "Minimum level written (debug, info, warn, error)"
    )]
    pub log_level: LogLevel,

    #[arg(
        long,
        env = "LOG_VIEWER",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        help = "Serve the live log viewer"
    )]
    pub viewer: bool,

    #[arg(
        long,
        env = "LOG_VIEWER_PORT",
        default_value_t = DEFAULT_PORT,
        help = "First port the viewer tries to bind"
    )]
    pub viewer_port: u16,

    #[arg(
        long,
        env = "LOG_VIEWER_OPEN",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = BoolishValueParser::new(),
        help = "Open the viewer in a browser once it is up (ignored when CI is set)"
    )]
    pub viewer_open: bool,

    #[arg(
        long,
        env = "LOG_VIEWER_HISTORY",
        default_value_t = DEFAULT_HISTORY_SIZE,
        help = "Entries replayed to a newly connected observer"
    )]
    pub viewer_history: usize,

    #[arg(
        long,
        default_value_t = DEFAULT_MAX_PORT_RETRIES,
        help = "Consecutive ports tried before the viewer gives up"
    )]
    pub max_port_retries: u16,

    #[arg(
        long,
        default_value = "info",
        help = "Level for piped lines without a [LEVEL] tag"
    )]
    pub pipe_level: LogLevel,
}

impl AppArgs {
    pub fn from_cli() -> Self {
        <Self as Parser>::parse()
    }

    pub fn event_log_config(&self) -> EventLogConfig {
        EventLogConfig {
            file_path: self.log_file.clone(),
            min_level: self.log_level,
            mirror_stderr: true,
        }
    }

    pub fn viewer_config(&self) -> ViewerConfig {
        self.viewer_config_in(std::env::var_os("CI").is_some())
    }

    /// Builds the viewer configuration; `ci` suppresses opening a browser.
    fn viewer_config_in(&self, ci: bool) -> ViewerConfig {
        ViewerConfig {
            enabled: self.viewer,
            base_port: self.viewer_port,
            max_port_retries: self.max_port_retries,
            auto_open: self.viewer_open && !ci,
            history_size: self.viewer_history,
        }
    }
}
