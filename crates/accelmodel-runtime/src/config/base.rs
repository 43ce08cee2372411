use super::{analysis::AnalysisConfig, session::SessionConfig};
use std::sync::Arc;

/// Static mutex holding the global configuration, initialized as `None`.
static ACCELMODEL_GLOBAL_CONFIG: spin::Mutex<Option<Arc<GlobalConfig>>> = spin::Mutex::new(None);

/// Global configuration of accelmodel, combining logging and session settings.
///
/// Hardware constants are not part of the configuration: accelerator profiles are static data.
#[derive(Default, Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct GlobalConfig {
    /// Configuration of analysis logging.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Session defaults.
    #[serde(default)]
    pub session: SessionConfig,
}

impl GlobalConfig {
    /// Retrieves the current global configuration, loading it from the current directory if not set.
    ///
    /// If no configuration is set, it attempts to load one from `accelmodel.toml` or
    /// `AccelModel.toml` in the current directory or its parents, then applies environment
    /// overrides. If no file is found, a default configuration is used.
    pub fn get() -> Arc<Self> {
        let mut state = ACCELMODEL_GLOBAL_CONFIG.lock();
        if state.as_ref().is_none() {
            let config = Self::from_current_dir().override_from_env();
            *state = Some(Arc::new(config));
        }

        match state.as_ref() {
            Some(config) => config.clone(),
            None => unreachable!("The global config is initialized above"),
        }
    }

    /// Sets the global configuration to the provided value.
    ///
    /// # Panics
    /// Panics if the configuration has already been set or read, as it cannot be overridden.
    ///
    /// # Warning
    /// This method must be called at the start of the program, before any calls to `get`.
    pub fn set(config: Self) {
        let mut state = ACCELMODEL_GLOBAL_CONFIG.lock();
        if state.is_some() {
            panic!("Cannot set the global configuration multiple times.");
        }
        *state = Some(Arc::new(config));
    }

    /// Save the current configuration to the provided file path.
    pub fn save_default<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<()> {
        let config = Self::get();
        let content = toml::to_string_pretty(config.as_ref())
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))?;
        std::fs::write(path, content)
    }

    /// Parse a configuration from TOML content.
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Overrides configuration fields based on environment variables.
    pub fn override_from_env(mut self) -> Self {
        use super::analysis::AnalysisLogLevel;
        use super::session::ProfileKind;

        if let Ok(val) = std::env::var("ACCELMODEL_DEBUG_LOG") {
            let logger = &mut self.analysis.logger;
            logger.level = AnalysisLogLevel::Full;

            match val.as_str() {
                "stdout" => logger.stdout = true,
                "stderr" => logger.stderr = true,
                "1" | "true" => logger.file = Some("/tmp/accelmodel.log".into()),
                "0" | "false" => logger.level = AnalysisLogLevel::Disabled,
                file_path => logger.file = Some(file_path.into()),
            }
        };

        if let Ok(val) = std::env::var("ACCELMODEL_PROFILE") {
            match ProfileKind::from_name(&val) {
                Some(profile) => self.session.profile = profile,
                None => log::warn!("Ignoring unknown ACCELMODEL_PROFILE value `{val}`"),
            }
        }

        self
    }

    // Traverses up the directory tree until a valid configuration file is found or the root
    // is reached.
    fn from_current_dir() -> Self {
        let Ok(mut dir) = std::env::current_dir() else {
            return Self::default();
        };

        loop {
            if let Ok(content) = Self::from_file_path(dir.join("accelmodel.toml")) {
                return content;
            }

            if let Ok(content) = Self::from_file_path(dir.join("AccelModel.toml")) {
                return content;
            }

            if !dir.pop() {
                break;
            }
        }

        Self::default()
    }

    fn from_file_path<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = match Self::from_toml(&content) {
            Ok(val) => val,
            Err(err) => panic!("The file provided doesn't have the right format => {err:?}"),
        };

        Ok(config)
    }
}
