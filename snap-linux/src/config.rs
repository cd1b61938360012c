//! Load config from file and environment.

use serde::Deserialize;
use snap_core::AnalysisKind;
use std::path::PathBuf;

/// Daemon configuration. File: ~/.config/snaplink/config.toml or /etc/snaplink/config.toml.
/// Env overrides: SNAPLINK_LISTEN_PORT, SNAPLINK_OUTPUT_DIR, SNAPLINK_API_KEY, SNAPLINK_ANALYSIS.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// UDP port the camera link delivers messages to (default 45690).
    #[serde(default = "default_listen_port")]
    pub listen_port: u16,
    /// Datagrams longer than this are dropped (default 1024).
    #[serde(default = "default_max_message_len")]
    pub max_message_len: usize,
    /// Directory completed photos are written to.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Vision model API key. `TEST_MODE` answers locally (the default); empty disables analysis.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    #[serde(default = "default_api_url")]
    pub api_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Prompt used for every received photo.
    #[serde(default)]
    pub analysis: AnalysisKind,
    /// Text-to-speech program, e.g. `espeak -s 150`. Analysis text is appended as the last argument.
    /// Unset prints to stdout.
    #[serde(default)]
    pub playback_command: Option<String>,
    #[serde(default)]
    pub receiver: snap_core::Config,
}

fn default_listen_port() -> u16 {
    45690
}
fn default_max_message_len() -> usize {
    1024
}
fn default_output_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(h) => PathBuf::from(h).join("Pictures/snaplink"),
        None => PathBuf::from("snaplink-photos"),
    }
}
fn default_api_key() -> String {
    snap_core::analysis::TEST_MODE_KEY.to_string()
}
fn default_api_url() -> String {
    "https://api.openai.com/v1/chat/completions".to_string()
}
fn default_model() -> String {
    "gpt-4o".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_port: default_listen_port(),
            max_message_len: default_max_message_len(),
            output_dir: default_output_dir(),
            api_key: default_api_key(),
            api_url: default_api_url(),
            model: default_model(),
            analysis: AnalysisKind::default(),
            playback_command: None,
            receiver: snap_core::Config::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },
}

/// Load config: merge default, then config file (if present), then env vars.
pub fn load() -> Result<Config, ConfigError> {
    let c = load_file()?.unwrap_or_default();
    apply_env(c, |k| std::env::var(k).ok())
}

/// Apply env overrides through `lookup` (a seam so tests need not touch the process env).
pub fn apply_env(
    mut c: Config,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Config, ConfigError> {
    if let Some(s) = lookup("SNAPLINK_LISTEN_PORT") {
        c.listen_port = s.trim().parse().map_err(|_| ConfigError::Env {
            var: "SNAPLINK_LISTEN_PORT",
            value: s.clone(),
        })?;
    }
    if let Some(s) = lookup("SNAPLINK_OUTPUT_DIR") {
        c.output_dir = PathBuf::from(s);
    }
    if let Some(s) = lookup("SNAPLINK_API_KEY") {
        c.api_key = s;
    }
    if let Some(s) = lookup("SNAPLINK_ANALYSIS") {
        c.analysis = s.parse().map_err(|_| ConfigError::Env {
            var: "SNAPLINK_ANALYSIS",
            value: s.clone(),
        })?;
    }
    Ok(c)
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/snaplink/config.toml"));
    }
    out.push(PathBuf::from("/etc/snaplink/config.toml"));
    out
}

/// First existing config file wins; a broken one is an error rather than silently skipped.
fn load_file() -> Result<Option<Config>, ConfigError> {
    for p in config_paths() {
        if p.exists() {
            let s = std::fs::read_to_string(&p).map_err(|source| ConfigError::Read {
                path: p.clone(),
                source,
            })?;
            return parse(&s)
                .map(Some)
                .map_err(|source| ConfigError::Parse { path: p, source });
        }
    }
    Ok(None)
}

pub fn parse(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(s)
}
