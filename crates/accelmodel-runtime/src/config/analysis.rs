use super::logger::{LogLevel, LoggerConfig};

/// Configuration of analysis logging.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct AnalysisConfig {
    /// Logger configuration for analysis calls.
    #[serde(default)]
    pub logger: LoggerConfig<AnalysisLogLevel>,
}

/// How much of each analysis is logged.
#[derive(
    Default, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
pub enum AnalysisLogLevel {
    /// Nothing is logged.
    #[default]
    #[serde(rename = "disabled")]
    Disabled,

    /// One line per analysis call.
    #[serde(rename = "basic")]
    Basic,

    /// Intermediate quantities are logged as well.
    #[serde(rename = "full")]
    Full,
}

impl LogLevel for AnalysisLogLevel {}
