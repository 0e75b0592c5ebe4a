use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

use crate::{InstallLayout, VersionTag, DEFAULT_BASELINE_VERSION};

pub const DEFAULT_REPOSITORY_URL: &str = "https://github.com/stepup-rs/stepup";

/// Typed section/key lookups over a TOML settings document.
#[derive(Debug, Clone, Default)]
pub struct Settings {
    table: toml::Table,
}

impl Settings {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table = toml::from_str::<toml::Table>(content).context("failed parsing settings")?;
        Ok(Self { table })
    }

    pub fn has_section(&self, section: &str) -> bool {
        self.table
            .get(section)
            .is_some_and(|value| value.is_table())
    }

    pub fn has_option(&self, section: &str, key: &str) -> bool {
        self.value(section, key).is_some()
    }

    pub fn get_str(&self, section: &str, key: &str) -> Result<&str> {
        self.require(section, key)?
            .as_str()
            .with_context(|| format!("setting [{section}] {key} is not a string"))
    }

    pub fn get_int(&self, section: &str, key: &str) -> Result<i64> {
        let value = self.require(section, key)?;
        if let Some(number) = value.as_integer() {
            return Ok(number);
        }
        value
            .as_str()
            .and_then(|text| text.trim().parse::<i64>().ok())
            .with_context(|| format!("setting [{section}] {key} is not an integer"))
    }

    /// Accepts TOML booleans and the textual `true`/`True`/`false`/`False` forms.
    pub fn get_bool(&self, section: &str, key: &str) -> Result<bool> {
        let value = self.require(section, key)?;
        if let Some(flag) = value.as_bool() {
            return Ok(flag);
        }
        value
            .as_str()
            .and_then(parse_flag)
            .with_context(|| format!("setting [{section}] {key} is not a boolean"))
    }

    pub fn section_entries(&self, section: &str) -> Vec<(String, String)> {
        let Some(table) = self.table.get(section).and_then(|value| value.as_table()) else {
            return Vec::new();
        };
        table
            .iter()
            .map(|(key, value)| {
                let rendered = match value.as_str() {
                    Some(text) => text.to_string(),
                    None => value.to_string(),
                };
                (key.clone(), rendered)
            })
            .collect()
    }

    fn value(&self, section: &str, key: &str) -> Option<&toml::Value> {
        self.table.get(section)?.as_table()?.get(key)
    }

    fn require(&self, section: &str, key: &str) -> Result<&toml::Value> {
        self.value(section, key)
            .with_context(|| format!("missing setting [{section}] {key}"))
    }

    fn section_value(&self, section: &str) -> Option<toml::Value> {
        self.table.get(section).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct UpdateConfig {
    #[serde(deserialize_with = "deserialize_flag")]
    pub auto_update: bool,
    #[serde(deserialize_with = "deserialize_flag")]
    pub update_fork: bool,
    pub upstream: String,
    pub origin: String,
    pub repository_url: String,
    pub legacy_repository_urls: Vec<String>,
    pub mainline_branch: String,
    pub baseline_version: String,
    pub exempt_paths: Vec<String>,
    pub step_timeout_secs: Option<u64>,
    /// A file tracked by the working copy whose change on pull requests a relaunch,
    /// relative to the install home. Without it only the running binary is watched,
    /// which a pull never rewrites.
    pub updater_path: Option<PathBuf>,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            auto_update: false,
            update_fork: false,
            upstream: "upstream".to_string(),
            origin: "origin".to_string(),
            repository_url: DEFAULT_REPOSITORY_URL.to_string(),
            legacy_repository_urls: Vec::new(),
            mainline_branch: "master".to_string(),
            baseline_version: DEFAULT_BASELINE_VERSION.to_string(),
            exempt_paths: vec!["configs".to_string()],
            step_timeout_secs: None,
            updater_path: None,
        }
    }
}

impl UpdateConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let Some(section) = settings.section_value("update") else {
            return Ok(Self::default());
        };
        let config = section
            .try_into::<UpdateConfig>()
            .context("failed parsing [update] settings")?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::from_settings(&Settings::from_toml_str(content)?)
    }

    /// A missing file yields defaults, which leave auto update disabled.
    pub fn load(layout: &InstallLayout) -> Result<Self> {
        let path = layout.config_path();
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).with_context(|| {
            format!("config-invalid: failed reading config {}", path.display())
        })?;
        Self::from_toml_str(&content)
            .with_context(|| format!("config-invalid: failed parsing config {}", path.display()))
    }

    pub fn baseline(&self) -> Result<VersionTag> {
        VersionTag::parse(&self.baseline_version).context("invalid baseline_version")
    }

    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs.map(Duration::from_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.upstream.trim().is_empty() {
            anyhow::bail!("upstream remote name must not be empty");
        }
        if self.origin.trim().is_empty() {
            anyhow::bail!("origin remote name must not be empty");
        }
        if self.repository_url.trim().is_empty() {
            anyhow::bail!("repository_url must not be empty");
        }
        if self.mainline_branch.trim().is_empty() {
            anyhow::bail!("mainline_branch must not be empty");
        }
        self.baseline()?;
        Ok(())
    }
}

fn parse_flag(text: &str) -> Option<bool> {
    match text.trim() {
        "true" | "True" => Some(true),
        "false" | "False" => Some(false),
        _ => None,
    }
}

fn deserialize_flag<'de, D>(deserializer: D) -> std::result::Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    match Flag::deserialize(deserializer)? {
        Flag::Bool(flag) => Ok(flag),
        Flag::Text(text) => parse_flag(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid boolean flag '{text}'"))),
    }
}
