use clap::ValueEnum;
use compio::fs;
use hashlink::LinkedHashMap;
use saphyr::{LoadableYamlNode, Scalar, Yaml};
use snafu::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::{ext::BestEffortPathExt, persistence::SnapshotFormat};

const CONFIG_FILE_NAME: &str = "memfs.yaml";
const DEFAULT_SNAPSHOT_FILE_NAME: &str = "memfs.snapshot";

fn get_config_file_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE_NAME)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorMode {
    /// Resolves `Auto` against the capabilities of stdout.
    pub fn enabled(&self) -> bool {
        match self {
            ColorMode::Auto => supports_color::on(supports_color::Stream::Stdout).is_some(),
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotConfig {
    pub path: PathBuf,
    pub format: SnapshotFormat,
    pub autoload: bool,
    pub autosave: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_SNAPSHOT_FILE_NAME),
            format: SnapshotFormat::default(),
            autoload: false,
            autosave: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellConfig {
    pub prompt: bool,
    pub color: ColorMode,
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: true,
            color: ColorMode::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    pub snapshot: SnapshotConfig,
    pub shell: ShellConfig,
}

impl Config {
    /// Reads `memfs.yaml` from `root`. A missing file yields the defaults.
    /// The snapshot path is resolved against `root`.
    pub async fn read(root: &Path) -> Result<Self, ConfigError> {
        let path = get_config_file_path(root);
        let mut config = if path.exists() {
            Self::from_path(path).await?
        } else {
            info!(
                "No config file at {}, using defaults",
                path.best_effort_path_display()
            );
            Self::default()
        };

        if config.snapshot.path.is_relative() {
            config.snapshot.path = root.join(&config.snapshot.path);
        }
        Ok(config)
    }

    pub async fn from_path(path: PathBuf) -> Result<Self, ConfigError> {
        debug!("Reading config file: {}", path.best_effort_path_display());
        let bytes = fs::read(&path).await.context(ReadSnafu {
            file_path: path.best_effort_path_display(),
        })?;
        let contents = String::from_utf8_lossy(&bytes);
        debug!("Successfully read config file: {} bytes", bytes.len());

        Self::try_from(&*contents)
    }

    fn parse_snapshot_section(
        section: &LinkedHashMap<Yaml, Yaml>,
    ) -> Result<SnapshotConfig, ConfigError> {
        let mut snapshot = SnapshotConfig::default();

        for (key, value) in section {
            match key.as_str() {
                Some("path") => snapshot.path = PathBuf::from(expect_str("snapshot.path", value)?),
                Some("format") => {
                    let name = expect_str("snapshot.format", value)?;
                    snapshot.format = SnapshotFormat::from_str(name, true).map_err(|_| {
                        ConfigError::InvalidValueError {
                            key: "snapshot.format".to_string(),
                            reason: format!("unknown format '{name}', expected legacy or framed"),
                        }
                    })?;
                }
                Some("autoload") => snapshot.autoload = expect_bool("snapshot.autoload", value)?,
                Some("autosave") => snapshot.autosave = expect_bool("snapshot.autosave", value)?,
                _ => debug!("Ignoring unknown snapshot setting: {:?}", key),
            }
        }

        Ok(snapshot)
    }

    fn parse_shell_section(section: &LinkedHashMap<Yaml, Yaml>) -> Result<ShellConfig, ConfigError> {
        let mut shell = ShellConfig::default();

        for (key, value) in section {
            match key.as_str() {
                Some("prompt") => shell.prompt = expect_bool("shell.prompt", value)?,
                Some("color") => {
                    shell.color = match expect_str("shell.color", value)? {
                        "auto" => ColorMode::Auto,
                        "always" => ColorMode::Always,
                        "never" => ColorMode::Never,
                        other => {
                            return InvalidValueSnafu {
                                key: "shell.color",
                                reason: format!("unknown mode '{other}', expected auto, always or never"),
                            }
                            .fail();
                        }
                    }
                }
                _ => debug!("Ignoring unknown shell setting: {:?}", key),
            }
        }

        Ok(shell)
    }
}

impl TryFrom<&str> for Config {
    type Error = ConfigError;

    fn try_from(contents: &str) -> Result<Self, Self::Error> {
        let documents = Yaml::load_from_str(contents).context(ParseSnafu)?;
        let Some(document) = documents.first() else {
            return Ok(Config::default());
        };
        if matches!(document, Yaml::Value(Scalar::Null)) {
            return Ok(Config::default());
        }

        let top_level = document.as_mapping().context(TopLevelNotMapSnafu)?;

        let mut config = Config::default();
        for (key, value) in top_level {
            match key.as_str() {
                Some("snapshot") => {
                    config.snapshot =
                        Self::parse_snapshot_section(expect_mapping("snapshot", value)?)?
                }
                Some("shell") => {
                    config.shell = Self::parse_shell_section(expect_mapping("shell", value)?)?
                }
                _ => debug!("Ignoring unknown config section: {:?}", key),
            }
        }

        Ok(config)
    }
}

fn expect_mapping<'a, 'y>(
    key: &str,
    value: &'a Yaml<'y>,
) -> Result<&'a LinkedHashMap<Yaml<'y>, Yaml<'y>>, ConfigError> {
    value.as_mapping().context(InvalidValueSnafu {
        key,
        reason: "expected a map",
    })
}

fn expect_str<'a>(key: &str, value: &'a Yaml) -> Result<&'a str, ConfigError> {
    value.as_str().context(InvalidValueSnafu {
        key,
        reason: "expected a string",
    })
}

fn expect_bool(key: &str, value: &Yaml) -> Result<bool, ConfigError> {
    match value {
        Yaml::Value(Scalar::Boolean(flag)) => Ok(*flag),
        _ => InvalidValueSnafu {
            key,
            reason: "expected true or false",
        }
        .fail(),
    }
}

#[derive(Debug, Snafu)]
pub enum ConfigError {
    #[snafu(display("Failed to read the config file: {}", file_path))]
    ReadError {
        file_path: String,
        source: std::io::Error,
    },
    #[snafu(display("Failed to parse the config file"))]
    ParseError { source: saphyr::ScanError },
    #[snafu(display("Top level of config should be a map"))]
    TopLevelNotMap,
    #[snafu(display("Invalid value for '{}': {}", key, reason))]
    InvalidValueError { key: String, reason: String },
}
