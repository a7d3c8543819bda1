use anyhow::{Context, Result};
use std::env;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_LANGUAGE: &str = "Bahasa Indonesia";
pub const PLACEHOLDER_API_KEY: &str = "YOUR_GEMINI_API_KEY_HERE";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Axum,
    Raw,
}

/// Process-wide settings, read once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct Config {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_api_base: String,
    pub gemini_enabled: bool,
    pub language: String,
    pub analyze_timeout: Duration,
    pub bind_addr: SocketAddr,
    pub transport: Transport,
    pub max_body_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_api_base: DEFAULT_API_BASE.to_string(),
            gemini_enabled: true,
            language: DEFAULT_LANGUAGE.to_string(),
            analyze_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            transport: Transport::Axum,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes `std::env`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();

        let gemini_api_key = lookup("GEMINI_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty() && key != PLACEHOLDER_API_KEY);

        let gemini_enabled = match lookup("GEMINI_ENABLED") {
            Some(value) => parse_bool(&value)
                .with_context(|| format!("GEMINI_ENABLED has an invalid value: {}", value))?,
            None => defaults.gemini_enabled,
        };

        let analyze_timeout = match lookup("ANALYZE_TIMEOUT_SECS") {
            Some(value) => Duration::from_secs(
                value
                    .trim()
                    .parse::<u64>()
                    .with_context(|| format!("ANALYZE_TIMEOUT_SECS must be a number, got {}", value))?,
            ),
            None => defaults.analyze_timeout,
        };

        let host = match lookup("HOST") {
            Some(value) => {
                let value = value.trim().trim_start_matches('[').trim_end_matches(']');
                value
                    .parse::<IpAddr>()
                    .with_context(|| format!("HOST must be an IP address, got {}", value))?
            }
            None => defaults.bind_addr.ip(),
        };
        let port = match lookup("PORT") {
            Some(value) => value
                .trim()
                .parse::<u16>()
                .with_context(|| format!("PORT must be a valid port, got {}", value))?,
            None => defaults.bind_addr.port(),
        };
        let bind_addr = SocketAddr::new(host, port);

        let transport = match lookup("TRANSPORT").as_deref().map(str::trim) {
            None | Some("") | Some("axum") => Transport::Axum,
            Some("raw") => Transport::Raw,
            Some(other) => anyhow::bail!("TRANSPORT must be 'axum' or 'raw', got {}", other),
        };

        let max_body_bytes = match lookup("MAX_BODY_BYTES") {
            Some(value) => value
                .trim()
                .parse::<usize>()
                .with_context(|| format!("MAX_BODY_BYTES must be a number, got {}", value))?,
            None => defaults.max_body_bytes,
        };

        Ok(Self {
            gemini_api_key,
            gemini_model: lookup("GEMINI_MODEL")
                .filter(|m| !m.trim().is_empty())
                .unwrap_or(defaults.gemini_model),
            gemini_api_base: lookup("GEMINI_API_BASE")
                .map(|base| base.trim_end_matches('/').to_string())
                .filter(|base| !base.is_empty())
                .unwrap_or(defaults.gemini_api_base),
            gemini_enabled,
            language: lookup("ANALYSIS_LANGUAGE")
                .filter(|l| !l.trim().is_empty())
                .unwrap_or(defaults.language),
            analyze_timeout,
            bind_addr,
            transport,
            max_body_bytes,
        })
    }

    pub fn api_key_set(&self) -> bool {
        self.gemini_api_key.is_some()
    }

    /// True when requests should reach the model instead of demo mode.
    pub fn gemini_available(&self) -> bool {
        self.gemini_enabled && self.api_key_set()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
