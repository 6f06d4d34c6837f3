//! Subscriber set-up for the `tracing` events the conversions emit.

use serde::Deserialize;
use std::collections::BTreeMap;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// The `[logging]` section of a configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `warn,jobwire_core=debug`
    pub level: String,

    pub format: LogFormat,

    /// Extra per-target levels layered over `level`
    pub module_levels: BTreeMap<String, String>,

    /// Print source file and line of each event
    pub include_location: bool,

    /// Print the module path of each event
    pub include_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            format: LogFormat::default(),
            module_levels: BTreeMap::new(),
            include_location: false,
            include_target: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per event
    #[default]
    Json,
    /// Multi-line, for reading at a terminal
    Pretty,
    Compact,
}

impl LoggingConfig {
    /// The same settings with the global level replaced, if one is given.
    pub fn with_level(mut self, level: Option<&str>) -> Self {
        if let Some(level) = level {
            self.level = level.to_string();
        }
        self
    }

    fn env_filter(&self) -> anyhow::Result<EnvFilter> {
        self.module_levels
            .iter()
            .try_fold(EnvFilter::try_new(&self.level)?, |filter, (target, level)| {
                Ok(filter.add_directive(format!("{}={}", target, level).parse()?))
            })
    }
}

/// Install the global subscriber. Events are written to stderr so command
/// output on stdout stays machine-readable.
///
/// # Errors
///
/// Fails when a level directive does not parse or a global subscriber is
/// already installed.
pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let filter = config.env_filter()?;

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_target(config.include_target);
    let layer = match config.format {
        LogFormat::Json => layer.json().boxed(),
        LogFormat::Pretty => layer.pretty().boxed(),
        LogFormat::Compact => layer.compact().boxed(),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init()?;
    Ok(())
}
