// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const APP_NAME: &str = "joiner";
const CONFIG_VERSION: i64 = 1;
const DEFAULT_WILDCARD_BASE_URL: &str = "http://127.0.0.1:8188";
const DEFAULT_WILDCARD_TIMEOUT: &str = "3s";
const DEFAULT_LOG_LEVEL: &str = "info";
const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub workflow: Workflow,
    #[serde(default)]
    pub wildcards: Wildcards,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            workflow: Workflow::default(),
            wildcards: Wildcards::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Workflow {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Wildcards {
    pub enabled: Option<bool>,
    pub base_url: Option<String>,
    pub timeout: Option<String>,
    pub dir: Option<String>,
}

impl Default for Wildcards {
    fn default() -> Self {
        Self {
            enabled: Some(true),
            base_url: Some(DEFAULT_WILDCARD_BASE_URL.to_owned()),
            timeout: Some(DEFAULT_WILDCARD_TIMEOUT.to_owned()),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

/// Where completion candidates come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateSetting {
    Disabled,
    Directory(PathBuf),
    Server { base_url: String, timeout: Duration },
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("JOINER_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set JOINER_CONFIG_PATH to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} has no version. Add `version = 1` and put values under [workflow], [wildcards], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(timeout) = &self.wildcards.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "wildcards.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(level) = &self.log.level
            && !LOG_LEVELS.contains(&level.to_ascii_lowercase().as_str())
        {
            bail!(
                "log.level in {} must be one of {}, got {:?}",
                path.display(),
                LOG_LEVELS.join(", "),
                level
            );
        }

        if let Some(workflow) = &self.workflow.path
            && workflow.trim().is_empty()
        {
            bail!("workflow.path in {} must not be empty", path.display());
        }

        Ok(())
    }

    pub fn workflow_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.workflow.path {
            return Ok(PathBuf::from(path));
        }
        let data_root = dirs::data_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [workflow].path or pass --workflow")
        })?;
        Ok(data_root.join(APP_NAME).join("workflow.json"))
    }

    pub fn wildcards_enabled(&self) -> bool {
        self.wildcards.enabled.unwrap_or(true)
    }

    pub fn wildcard_base_url(&self) -> &str {
        self.wildcards
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_WILDCARD_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn wildcard_timeout(&self) -> Result<Duration> {
        parse_duration(
            self.wildcards
                .timeout
                .as_deref()
                .unwrap_or(DEFAULT_WILDCARD_TIMEOUT),
        )
    }

    /// A configured directory wins over the server.
    pub fn candidate_setting(&self) -> Result<CandidateSetting> {
        if !self.wildcards_enabled() {
            return Ok(CandidateSetting::Disabled);
        }
        if let Some(dir) = &self.wildcards.dir {
            return Ok(CandidateSetting::Directory(PathBuf::from(dir)));
        }
        Ok(CandidateSetting::Server {
            base_url: self.wildcard_base_url().to_owned(),
            timeout: self.wildcard_timeout()?,
        })
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.log.file {
            return Ok(PathBuf::from(path));
        }
        let cache_root = dirs::cache_dir().ok_or_else(|| {
            anyhow!("cannot resolve cache directory; set [log].file in the config")
        })?;
        Ok(cache_root.join(APP_NAME).join("joiner.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# joiner config\n# Place this file at: {}\n\nversion = 1\n\n[workflow]\n# Optional. Default is the platform data dir (for example ~/.local/share/joiner/workflow.json)\n# path = \"/absolute/path/to/workflow.json\"\n\n[wildcards]\nenabled = true\nbase_url = \"{}\"\ntimeout = \"{}\"\n# Optional. Read wildcard names from *.txt files instead of the server.\n# dir = \"/absolute/path/to/wildcards\"\n\n[log]\nlevel = \"{}\"\n# file = \"/absolute/path/to/joiner.log\"\n",
            path.display(),
            DEFAULT_WILDCARD_BASE_URL,
            DEFAULT_WILDCARD_TIMEOUT,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    let raw = raw.trim();
    let (value, scale) = if let Some(value) = raw.strip_suffix("ms") {
        (value, Duration::from_millis(1))
    } else if let Some(value) = raw.strip_suffix('s') {
        (value, Duration::from_secs(1))
    } else if let Some(value) = raw.strip_suffix('m') {
        (value, Duration::from_secs(60))
    } else {
        bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 3s)")
    };
    let count: u32 = value
        .parse()
        .with_context(|| format!("invalid timeout duration {raw:?}"))?;
    Ok(scale * count)
}
