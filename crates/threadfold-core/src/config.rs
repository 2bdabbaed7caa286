use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(default)]
    pub instance: InstanceConfig,
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub output: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for InstanceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            access_token: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Page size sent upstream; `None` leaves the server default.
    #[serde(default)]
    pub page_limit: Option<u32>,
    /// Threads added by each "newer"/"older" step.
    #[serde(default = "default_threads_per_load")]
    pub threads_per_load: usize,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_limit: None,
            threads_per_load: default_threads_per_load(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectiveConfig {
    pub user: UserConfig,
    pub base_url: String,
    pub access_token: Option<String>,
    pub resolved_output: String,
}

/// Default location: `<config dir>/threadfold/config.toml`.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("threadfold/config.toml"))
}

pub fn load_user_config_from(path: &Path) -> Result<UserConfig> {
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(path) = user_config_path() else {
        return Ok(UserConfig::default());
    };
    load_user_config_from(&path)
}

/// Layer environment and CLI overrides on top of the user config file.
///
/// Precedence for each setting, highest first: CLI flag, environment
/// (`THREADFOLD_INSTANCE`, `THREADFOLD_TOKEN`, `FORMAT`), config file, default.
pub fn resolve_config(
    config_path: Option<&Path>,
    cli_instance: Option<&str>,
    cli_json: bool,
) -> Result<EffectiveConfig> {
    let user = match config_path {
        Some(path) => load_user_config_from(path)?,
        None => load_user_config()?,
    };

    let base_url = cli_instance
        .map(str::to_string)
        .or_else(|| env::var("THREADFOLD_INSTANCE").ok())
        .unwrap_or_else(|| user.instance.base_url.clone());
    let access_token = env::var("THREADFOLD_TOKEN")
        .ok()
        .or_else(|| user.instance.access_token.clone());

    let env_format = env::var("FORMAT").ok();
    let resolved_output = resolve_output(
        cli_json,
        user.output.clone(),
        env_format,
        std::io::stdout().is_terminal(),
    );

    Ok(EffectiveConfig {
        user,
        base_url: normalize_base_url(&base_url),
        access_token,
        resolved_output,
    })
}

fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
    is_tty: bool,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" => Some("pretty"),
            "text" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if is_tty { "pretty" } else { "text" }.to_string()
}

/// Accept `example.social` as shorthand for `https://example.social`.
fn normalize_base_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

fn default_base_url() -> String {
    "https://mastodon.social".to_string()
}

const fn default_threads_per_load() -> usize {
    1
}
