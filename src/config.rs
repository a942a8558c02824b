// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the configuration file that pagesync uses, and how
//! it is merged with command line overrides into the explicit settings that
//! the importer needs. Nothing in here reads the process environment, with
//! the exception of shell expansion of the content directory.
//!
//! # General Layout
//!
//! ```toml
//! [remote]
//! host = "books.example.com"
//! user = "root"
//! app_dir = "/opt/once/current"
//! runner = ["bin/rails", "runner", "-"]
//! ssh_program = "ssh"
//! ssh_options = ["-o", "StrictHostKeyChecking=no"]
//! connect_timeout = 10
//!
//! [import]
//! content_dir = "content"
//! extension = "md"
//! default_year = 2025
//! heredoc_delimiter = "PAGESYNC_BODY"
//! ```
//!
//! Every field is optional. However, host and user must be given either here
//! or on the command line before anything gets imported.

use crate::{
    batch::ImportSettings,
    encode::{ContentEncoder, DEFAULT_DELIMITER},
    identity::IdentityRules,
    path::default_config_file,
    remote::ssh::SshSettings,
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{
    fmt::{Display, Error as FmtError, Formatter, Result as FmtResult},
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};
use tracing::{debug, info};

/// Name of configuration file looked up in current directory.
pub const LOCAL_CONFIG_FILE: &str = "pagesync.toml";

/// Configuration file layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConfigFile {
    /// Remote command channel settings.
    pub remote: RemoteSection,

    /// Content import settings.
    pub import: ImportSection,
}

impl ConfigFile {
    /// Load configuration file at target path.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if file content is invalid.
    /// - Return [`ConfigError::ShellExpansion`] if content directory cannot be
    ///   expanded.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("load configuration from {}", path.display());
        read_to_string(path)
            .map_err(|err| ConfigError::Read {
                source: err,
                path: path.to_path_buf(),
            })?
            .parse()
    }

    /// Locate and load configuration file.
    ///
    /// An explicit path must exist. Otherwise, [`LOCAL_CONFIG_FILE`] in the
    /// current directory is tried, then `$XDG_CONFIG_HOME/pagesync/config.toml`.
    /// Built-in defaults are used if neither exists.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError`] if located file cannot be loaded.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let candidates = [Some(PathBuf::from(LOCAL_CONFIG_FILE)), default_config_file().ok()];
        for path in candidates.into_iter().flatten() {
            if path.is_file() {
                info!("using configuration file {}", path.display());
                return Self::load(path);
            }
        }

        debug!("no configuration file found, using defaults");
        Ok(Self::default())
    }
}

impl FromStr for ConfigFile {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: ConfigFile = toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on content directory field.
        config.import.content_dir = ContentDir::new(
            shellexpand::full(config.import.content_dir.to_string().as_str())
                .map_err(ConfigError::ShellExpansion)?
                .into_owned(),
        );

        Ok(config)
    }
}

impl Display for ConfigFile {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(
            toml::ser::to_string_pretty(self)
                .map_err(ConfigError::Serialize)?
                .as_str(),
        )
    }
}

/// Remote command channel settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RemoteSection {
    /// Remote host running the content store.
    pub host: Option<String>,

    /// Remote user to log in as.
    pub user: Option<String>,

    /// Directory of content store application on remote host.
    pub app_dir: String,

    /// Runner command that reads a program from standard input.
    pub runner: Vec<String>,

    /// Local SSH client binary.
    pub ssh_program: String,

    /// Extra options for SSH client.
    pub ssh_options: Vec<String>,

    /// Connection timeout in seconds.
    pub connect_timeout: Option<u64>,
}

impl Default for RemoteSection {
    fn default() -> Self {
        Self {
            host: None,
            user: None,
            app_dir: "/opt/once/current".into(),
            runner: vec!["bin/rails".into(), "runner".into(), "-".into()],
            ssh_program: "ssh".into(),
            ssh_options: vec!["-o".into(), "StrictHostKeyChecking=no".into()],
            connect_timeout: None,
        }
    }
}

/// Content import settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ImportSection {
    /// Directory holding content files.
    pub content_dir: ContentDir,

    /// Extension of eligible content files, without leading dot.
    pub extension: String,

    /// Publication year for files without a year hint.
    pub default_year: i32,

    /// Heredoc delimiter used to deliver page bodies.
    pub heredoc_delimiter: String,
}

impl Default for ImportSection {
    fn default() -> Self {
        Self {
            content_dir: ContentDir::new("content"),
            extension: "md".into(),
            default_year: 2025,
            heredoc_delimiter: DEFAULT_DELIMITER.into(),
        }
    }
}

/// Path to directory holding content files.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize, Serialize)]
pub struct ContentDir(PathBuf);

impl ContentDir {
    /// Construct new content directory path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    /// Treat content directory as [`Path`] slice.
    pub fn as_path(&self) -> &Path {
        self.0.as_path()
    }
}

impl Display for ContentDir {
    fn fmt(&self, fmt: &mut Formatter<'_>) -> FmtResult {
        fmt.write_str(self.as_path().to_string_lossy().as_ref())
    }
}

/// Command line overrides of configuration file.
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct Overrides {
    /// Remote host.
    pub host: Option<String>,

    /// Remote user.
    pub user: Option<String>,

    /// Directory holding content files.
    pub content_dir: Option<PathBuf>,
}

/// Fully resolved settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Command channel settings.
    pub ssh: SshSettings,

    /// Batch import settings.
    pub import: ImportSettings,
}

impl Settings {
    /// Merge configuration file and overrides into validated settings.
    ///
    /// Overrides take precedence over the configuration file. Blank values
    /// count as missing.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::MissingHost`] if no remote host is given.
    /// - Return [`ConfigError::MissingUser`] if no remote user is given.
    /// - Return [`ConfigError::InvalidDefaultYear`] if default year is not a
    ///   valid calendar year.
    /// - Return [`ConfigError::Encode`] if heredoc delimiter is invalid.
    pub fn resolve(config: ConfigFile, overrides: Overrides) -> Result<Self> {
        let present = |value: &String| !value.trim().is_empty();
        let host = overrides
            .host
            .filter(present)
            .or(config.remote.host.filter(present))
            .ok_or(ConfigError::MissingHost)?;
        let user = overrides
            .user
            .filter(present)
            .or(config.remote.user.filter(present))
            .ok_or(ConfigError::MissingUser)?;

        let year = config.import.default_year;
        let fallback_date = NaiveDate::from_ymd_opt(year, 1, 1)
            .filter(|_| year > 0)
            .ok_or(ConfigError::InvalidDefaultYear { year })?;

        let content_dir = overrides
            .content_dir
            .unwrap_or_else(|| config.import.content_dir.as_path().to_path_buf());

        Ok(Self {
            ssh: SshSettings {
                host,
                user,
                app_dir: config.remote.app_dir,
                runner: config.remote.runner,
                program: config.remote.ssh_program,
                options: config.remote.ssh_options,
                connect_timeout: config.remote.connect_timeout,
            },
            import: ImportSettings {
                content_dir,
                rules: IdentityRules::new(config.import.extension, fallback_date),
                encoder: ContentEncoder::new(config.import.heredoc_delimiter)?,
            },
        })
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read configuration file at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to serialize configuration.
    #[error(transparent)]
    Serialize(#[from] toml::ser::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),

    /// No remote host given.
    #[error("remote host is not set, use --host, SSH_HOST, or remote.host")]
    MissingHost,

    /// No remote user given.
    #[error("remote user is not set, use --user, SSH_USER, or remote.user")]
    MissingUser,

    /// Default year cannot be turned into a date.
    #[error("invalid default year {year}")]
    InvalidDefaultYear { year: i32 },

    /// Encoder settings are invalid.
    #[error(transparent)]
    Encode(#[from] crate::encode::EncodeError),
}

impl From<ConfigError> for FmtError {
    fn from(_: ConfigError) -> Self {
        FmtError
    }
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
