use super::GlobalConfig;
use super::analysis::AnalysisLogLevel;
use core::fmt::Display;
use hashbrown::HashMap;
use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::PathBuf,
    sync::Arc,
};

/// Configuration for logging in accelmodel, parameterized by a log level type.
///
/// Note that you can use multiple outputs at the same time.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(bound = "")]
pub struct LoggerConfig<L: LogLevel> {
    /// Path to the log file, if file logging is enabled.
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Whether to append to the log file (true) or overwrite it (false). Defaults to true.
    #[serde(default = "append_default")]
    pub append: bool,

    /// Whether to log to standard output.
    #[serde(default)]
    pub stdout: bool,

    /// Whether to log to standard error.
    #[serde(default)]
    pub stderr: bool,

    /// Optional crate-level logging through the `log` facade.
    #[serde(default)]
    pub log: Option<LogCrateLevel>,

    /// The log level for this logger, determining verbosity.
    #[serde(default)]
    pub level: L,
}

impl<L: LogLevel> Default for LoggerConfig<L> {
    fn default() -> Self {
        Self {
            file: None,
            append: true,
            stdout: false,
            stderr: false,
            log: None,
            level: L::default(),
        }
    }
}

/// Log levels using the `log` crate.
#[derive(
    Clone, Copy, Debug, Default, serde::Serialize, serde::Deserialize, Hash, PartialEq, Eq,
)]
pub enum LogCrateLevel {
    /// Logs informational messages.
    #[default]
    #[serde(rename = "info")]
    Info,

    /// Logs debugging messages.
    #[serde(rename = "debug")]
    Debug,

    /// Logs trace-level messages.
    #[serde(rename = "trace")]
    Trace,
}

fn append_default() -> bool {
    true
}

/// Trait for types that can be used as log levels in [LoggerConfig].
pub trait LogLevel:
    serde::de::DeserializeOwned + serde::Serialize + Clone + Copy + core::fmt::Debug + Default
{
}

/// Routes analysis messages to every output configured in [GlobalConfig].
#[derive(Debug)]
pub struct Logger {
    loggers: Vec<LoggerKind>,
    analysis_index: Vec<usize>,
    /// Global configuration for logging settings.
    pub config: Arc<GlobalConfig>,
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Logger {
    /// Creates a new `Logger` instance based on the global configuration.
    pub fn new() -> Self {
        Self::from_config(GlobalConfig::get())
    }

    /// Creates a new `Logger` from an explicit configuration.
    pub fn from_config(config: Arc<GlobalConfig>) -> Self {
        let mut loggers = Vec::new();
        let mut analysis_index = Vec::new();

        #[derive(Hash, PartialEq, Eq)]
        enum LoggerId {
            File(PathBuf),
            Stdout,
            Stderr,
            LogCrate(LogCrateLevel),
        }

        let mut logger2index = HashMap::<LoggerId, usize>::new();

        let mut register = |id: LoggerId, logger: &dyn Fn() -> Option<LoggerKind>| {
            if let Some(index) = logger2index.get(&id) {
                analysis_index.push(*index);
            } else if let Some(logger) = logger() {
                let index = loggers.len();
                logger2index.insert(id, index);
                loggers.push(logger);
                analysis_index.push(index);
            }
        };

        let settings = &config.analysis.logger;

        if settings.level != AnalysisLogLevel::Disabled {
            if let Some(file) = &settings.file {
                register(LoggerId::File(file.clone()), &|| {
                    FileLogger::new(file, settings.append).map(LoggerKind::File)
                });
            }

            if settings.stdout {
                register(LoggerId::Stdout, &|| Some(LoggerKind::Stdout));
            }

            if settings.stderr {
                register(LoggerId::Stderr, &|| Some(LoggerKind::Stderr));
            }

            if let Some(level) = settings.log {
                register(LoggerId::LogCrate(level), &|| Some(LoggerKind::Log(level)));
            }
        }

        Self {
            loggers,
            analysis_index,
            config,
        }
    }

    /// Logs a message for analysis, directing it to all configured analysis loggers.
    pub fn log_analysis<S: Display>(&mut self, msg: &S) {
        let length = self.analysis_index.len();
        if length > 1 {
            let msg = msg.to_string();
            for i in 0..length {
                let index = self.analysis_index[i];
                self.log(&msg, index)
            }
        } else if let Some(index) = self.analysis_index.first() {
            self.log(&msg, *index)
        }
    }

    /// Returns the current analysis log level from the global configuration.
    pub fn log_level_analysis(&self) -> AnalysisLogLevel {
        self.config.analysis.logger.level
    }

    /// Whether any output is registered.
    pub fn is_enabled(&self) -> bool {
        !self.analysis_index.is_empty()
    }

    fn log<S: Display>(&mut self, msg: &S, index: usize) {
        let logger = &mut self.loggers[index];
        logger.log(msg);
    }
}

#[derive(Debug)]
enum LoggerKind {
    File(FileLogger),
    Stdout,
    Stderr,
    Log(LogCrateLevel),
}

impl LoggerKind {
    fn log<S: Display>(&mut self, msg: &S) {
        match self {
            LoggerKind::File(file_logger) => file_logger.log(msg),
            LoggerKind::Stdout => println!("{msg}"),
            LoggerKind::Stderr => eprintln!("{msg}"),
            LoggerKind::Log(level) => match level {
                LogCrateLevel::Info => log::info!("{msg}"),
                LogCrateLevel::Debug => log::debug!("{msg}"),
                LogCrateLevel::Trace => log::trace!("{msg}"),
            },
        }
    }
}

/// Logger that writes messages to a file.
#[derive(Debug)]
struct FileLogger {
    writer: BufWriter<File>,
}

impl FileLogger {
    // A file that can't be opened disables this output instead of failing the analysis.
    fn new(path: &PathBuf, append: bool) -> Option<Self> {
        let file = OpenOptions::new()
            .write(true)
            .append(append)
            .truncate(!append)
            .create(true)
            .open(path);

        match file {
            Ok(file) => Some(Self {
                writer: BufWriter::new(file),
            }),
            Err(err) => {
                log::warn!("Unable to open log file {path:?}: {err}");
                None
            }
        }
    }

    fn log<S: Display>(&mut self, msg: &S) {
        if let Err(err) = writeln!(self.writer, "{msg}").and_then(|_| self.writer.flush()) {
            log::warn!("Unable to write analysis log: {err}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_level_registers_nothing() {
        let mut config = GlobalConfig::default();
        config.analysis.logger.stdout = true;

        let logger = Logger::from_config(Arc::new(config));
        assert!(!logger.is_enabled());
    }

    #[test]
    fn file_output_receives_messages() {
        let path = std::env::temp_dir().join(format!("accelmodel-{}.log", std::process::id()));
        let mut config = GlobalConfig::default();
        config.analysis.logger.level = AnalysisLogLevel::Basic;
        config.analysis.logger.file = Some(path.clone());
        config.analysis.logger.append = false;
        config.analysis.logger.log = Some(LogCrateLevel::Debug);

        let mut logger = Logger::from_config(Arc::new(config));
        logger.log_analysis(&"matmul op-1 compute bound");
        drop(logger);

        let content = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(content, "matmul op-1 compute bound\n");
    }
}
