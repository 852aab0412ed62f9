use crate::config::Config;
use log::{LevelFilter, SetLoggerError};
use simplelog::{self, ConfigBuilder};

/// Dependency modules whose logs are dropped below Trace. Websocket framing
/// and HTTP plumbing log every frame and request, which would bury relay events.
const FILTERED_MODULES: &[&str] = &[
    "tokio_tungstenite",
    "tungstenite",
    "tower_http",
    "tower",
    "hyper",
    "axum",
];

pub struct Logger {}

impl Logger {
    /// Installs the global terminal logger for `config.log_level_filter`.
    ///
    /// Fails only if a logger was already installed for this process.
    pub fn init_logger(config: &Config) -> Result<(), SetLoggerError> {
        let level = config.log_level_filter;

        simplelog::TermLogger::init(
            level,
            Self::build_log_config(Self::ignored_modules(level)),
            simplelog::TerminalMode::Mixed,
            simplelog::ColorChoice::Auto,
        )
    }

    /// Modules to silence at `level`. Trace shows everything for deep debugging.
    fn ignored_modules(level: LevelFilter) -> &'static [&'static str] {
        if level == LevelFilter::Trace {
            &[]
        } else {
            FILTERED_MODULES
        }
    }

    fn build_log_config(ignored: &[&'static str]) -> simplelog::Config {
        let mut builder = ConfigBuilder::new();
        builder.set_time_format_rfc3339();

        for &module in ignored {
            builder.add_filter_ignore_str(module);
        }

        builder.build()
    }
}
