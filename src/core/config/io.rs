use crate::core::config::data::{path_display, Config};
use directories::ProjectDirs;
use std::error::Error as StdError;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Errors that can occur when loading or saving the configuration file.
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as valid TOML.
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Failed to write the configuration file.
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    Serialize(toml::ser::Error),

    /// No home directory to derive the default location from.
    NoConfigDir,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => {
                write!(f, "Failed to read config at {}: {}", path_display(path), source)
            }
            ConfigError::Parse { path, source } => {
                write!(f, "Failed to parse config at {}: {}", path_display(path), source)
            }
            ConfigError::Write { path, source } => {
                write!(f, "Failed to write config at {}: {}", path_display(path), source)
            }
            ConfigError::Serialize(source) => write!(f, "Failed to serialize config: {source}"),
            ConfigError::NoConfigDir => write!(f, "Could not determine the config directory"),
        }
    }
}

impl StdError for ConfigError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            ConfigError::Parse { source, .. } => Some(source),
            ConfigError::Write { source, .. } => Some(source),
            ConfigError::Serialize(source) => Some(source),
            ConfigError::NoConfigDir => None,
        }
    }
}

impl Config {
    /// A missing file yields the defaults.
    pub fn load_from_path(config_path: &Path) -> Result<Config, ConfigError> {
        if !config_path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })
    }

    /// Write atomically: the file is replaced only once the new contents are
    /// fully on disk.
    pub fn save_to_path(&self, config_path: &Path) -> Result<(), ConfigError> {
        let write_error = |source| ConfigError::Write {
            path: config_path.to_path_buf(),
            source,
        };
        let parent = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());

        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(write_error)?;
        }

        let contents = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        // Same directory as the target, so the final rename never crosses
        // filesystems.
        let mut temp_file =
            NamedTempFile::new_in(parent.unwrap_or(Path::new("."))).map_err(write_error)?;

        temp_file.write_all(contents.as_bytes()).map_err(write_error)?;
        temp_file.as_file_mut().sync_all().map_err(write_error)?;
        temp_file
            .persist(config_path)
            .map_err(|err| write_error(err.error))?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf, ConfigError> {
        let proj_dirs =
            ProjectDirs::from("org", "parley", "parley").ok_or(ConfigError::NoConfigDir)?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }
}
