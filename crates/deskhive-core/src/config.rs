use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::escalation::DEFAULT_MAX_ATTEMPTS;

/// Which session store backs conversation state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionBackend {
    Memory,
    #[default]
    Sqlite,
}

fn default_db_path() -> String {
    "sessions.db3".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub backend: SessionBackend,
    #[serde(default = "default_db_path")]
    pub db_path: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            backend: SessionBackend::default(),
            db_path: default_db_path(),
        }
    }
}

impl SessionConfig {
    /// Database location, resolved against the config root when relative.
    pub fn resolve_db_path(&self, root: &Path) -> PathBuf {
        let path = Path::new(&self.db_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            root.join(path)
        }
    }
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EscalationConfig {
    /// Not-helpful attempts tolerated before escalation triggers.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
        }
    }
}

fn default_kb_results() -> usize {
    3
}

fn default_ticket_results() -> usize {
    3
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_kb_results")]
    pub kb_results: usize,
    #[serde(default = "default_ticket_results")]
    pub ticket_results: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            kb_results: default_kb_results(),
            ticket_results: default_ticket_results(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DeskhiveConfig {
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub escalation: EscalationConfig,
    #[serde(default)]
    pub search: SearchConfig,
}

/// Expand `${VAR}` references from the environment; unset variables
/// resolve to the empty string.
pub fn resolve_env_var(raw: &str) -> String {
    let mut output = String::new();
    let mut rest = raw;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);

        let candidate = &rest[start + 2..];
        let Some(end) = candidate.find('}') else {
            output.push_str(&rest[start..]);
            return output;
        };

        let key = &candidate[..end];
        output.push_str(&std::env::var(key).unwrap_or_default());
        rest = &candidate[end + 1..];
    }

    output.push_str(rest);
    output
}

/// Load `deskhive.yaml` from the config root. A missing file yields the
/// defaults so a fresh checkout runs without any setup.
pub fn load_config(root: &Path) -> Result<DeskhiveConfig> {
    let path = root.join("deskhive.yaml");
    if !path.exists() {
        return Ok(DeskhiveConfig::default());
    }

    let mut config: DeskhiveConfig = read_yaml_file(&path)?;
    config.session.db_path = resolve_env_var(&config.session.db_path);
    Ok(config)
}

fn read_yaml_file<T>(path: &Path) -> Result<T>
where
    T: for<'de> Deserialize<'de>,
{
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_yaml::from_str(&content)
        .with_context(|| format!("failed to parse yaml file: {}", path.display()))
}
