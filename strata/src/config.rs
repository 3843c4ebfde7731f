//! Engine configuration.
//!
//! Everything here describes the CLI as a whole rather than any single
//! controller. It can be built in code or loaded from a JSON document.

use crate::controller::ROOT_LABEL;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for loading an [`EngineConfig`]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read engine config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse engine config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// When to colorize help and error output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorMode {
    #[default]
    Auto,
    Always,
    Never,
}

impl From<ColorMode> for clap::ColorChoice {
    fn from(mode: ColorMode) -> Self {
        match mode {
            ColorMode::Auto => clap::ColorChoice::Auto,
            ColorMode::Always => clap::ColorChoice::Always,
            ColorMode::Never => clap::ColorChoice::Never,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Program name shown in usage lines. Falls back to argv[0].
    pub program: Option<String>,

    /// One-line description on the root `--help`.
    pub about: Option<String>,

    /// Enables `-V`/`--version` on the root parser.
    pub version: Option<String>,

    /// Label of the controller every stack starts from.
    pub root_label: String,

    /// Suffix of the hidden routing flags.
    ///
    /// Left unset, a per-process value is generated. Tests that compare help
    /// output across runs should pin it.
    pub sentinel_salt: Option<String>,

    pub color: ColorMode,

    /// Collect unrecognized arguments into [`Invocation::unknown_args`]
    /// instead of rejecting the input.
    ///
    /// [`Invocation::unknown_args`]: crate::Invocation::unknown_args
    pub ignore_unknown_arguments: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            program: None,
            about: None,
            version: None,
            root_label: ROOT_LABEL.to_string(),
            sentinel_salt: None,
            color: ColorMode::Auto,
            ignore_unknown_arguments: false,
        }
    }
}

impl EngineConfig {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: Some(program.into()),
            ..Self::default()
        }
    }

    pub fn about(mut self, about: impl Into<String>) -> Self {
        self.about = Some(about.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn root_label(mut self, label: impl Into<String>) -> Self {
        self.root_label = label.into();
        self
    }

    pub fn sentinel_salt(mut self, salt: impl Into<String>) -> Self {
        self.sentinel_salt = Some(salt.into());
        self
    }

    pub fn color(mut self, color: ColorMode) -> Self {
        self.color = color;
        self
    }

    pub fn ignore_unknown_arguments(mut self, ignore: bool) -> Self {
        self.ignore_unknown_arguments = ignore;
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&content)
    }

    /// The configured program name, else the file stem of argv[0].
    pub fn program_name(&self) -> String {
        if let Some(program) = &self.program {
            return program.clone();
        }

        std::env::args_os()
            .next()
            .and_then(|arg0| {
                Path::new(&arg0)
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .unwrap_or_else(|| "app".to_string())
    }

    /// Salt for the routing flags: configured, or derived from the process.
    pub(crate) fn resolved_salt(&self) -> String {
        match &self.sentinel_salt {
            Some(salt) => salt.clone(),
            None => {
                use std::hash::BuildHasher;
                let hash = std::collections::hash_map::RandomState::new()
                    .hash_one(std::process::id());
                format!("{:08x}", hash as u32)
            }
        }
    }
}
