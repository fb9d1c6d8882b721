// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Configuration for the contact relay.
//!
//! Everything is read once at startup from environment-style key/value
//! pairs. Empty values are treated as unset.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Configuration errors. All of them are fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Configuration for the contact relay service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address (default: 0.0.0.0:8080)
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Outbound relay settings
    pub smtp: SmtpConfig,

    /// Addresses used on outgoing mail
    pub mail: MailConfig,

    /// Origins allowed to read responses cross-origin
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// SMTP relay endpoint and credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct SmtpConfig {
    pub host: String,

    /// Submission port (default: 587)
    #[serde(default = "default_smtp_port")]
    pub port: u16,

    pub username: String,

    #[serde(skip_serializing)]
    pub password: String,

    /// Name announced in EHLO (default: localhost)
    #[serde(default = "default_hello_name")]
    pub hello_name: String,

    /// TCP connect timeout in seconds (default: 15)
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

/// Fixed notification recipient and envelope sender.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Where contact notifications go (default: info@landofirm.com)
    #[serde(default = "default_mail_to")]
    pub to: String,

    /// Sender for both notification and confirmation
    pub from: String,
}

/// Sliding-window limiter policy. Fixed for the process lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum accepted requests per key inside one window (default: 5)
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,

    /// Window length in seconds (default: 3600)
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// Interval between background sweeps in seconds (default: 60)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

// Default value functions
fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["https://landofirm.com".to_string()]
}

fn default_smtp_port() -> u16 {
    587
}

fn default_hello_name() -> String {
    "localhost".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    15
}

fn default_mail_to() -> String {
    "info@landofirm.com".to_string()
}

fn default_max_requests() -> usize {
    5
}

fn default_window_secs() -> u64 {
    3600
}

fn default_cleanup_interval_secs() -> u64 {
    60
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

impl RateLimitConfig {
    /// Get the rate window duration
    pub fn window_duration(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Get the sweep interval
    pub fn cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cleanup_interval_secs)
    }
}

impl SmtpConfig {
    /// `host:port` as dialed by the sender.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

// Keeps the password out of logs.
impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("hello_name", &self.hello_name)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .finish()
    }
}

impl Config {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::Missing(key));

        let host = required("SMTP_HOST")?;
        let username = required("SMTP_USER")?;
        let password = required("SMTP_PASS")?;

        let port: u16 = parse_or(&get, "PORT", 8080)?;

        let smtp = SmtpConfig {
            host,
            port: parse_or(&get, "SMTP_PORT", default_smtp_port())?,
            password,
            hello_name: get("SMTP_HELO_NAME").unwrap_or_else(default_hello_name),
            connect_timeout_secs: parse_or(
                &get,
                "SMTP_CONNECT_TIMEOUT_SECS",
                default_connect_timeout_secs(),
            )?,
            username: username.clone(),
        };

        let mail = MailConfig {
            to: get("MAIL_TO").unwrap_or_else(default_mail_to),
            from: get("MAIL_FROM").unwrap_or(username),
        };

        let allowed_origins = match get("ALLOWED_ORIGINS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(str::to_string)
                .collect(),
            None => default_allowed_origins(),
        };

        let rate_limit = RateLimitConfig {
            max_requests: parse_or(&get, "RATE_LIMIT_MAX", default_max_requests())?,
            window_secs: parse_nonzero(&get, "RATE_LIMIT_WINDOW_SECS", default_window_secs())?,
            cleanup_interval_secs: parse_nonzero(
                &get,
                "RATE_LIMIT_CLEANUP_SECS",
                default_cleanup_interval_secs(),
            )?,
        };

        Ok(Self {
            bind_addr: format!("0.0.0.0:{port}"),
            smtp,
            mail,
            allowed_origins,
            rate_limit,
        })
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid { key, value: raw }),
        None => Ok(default),
    }
}

// A zero window admits everything and a zero sweep period cannot tick.
fn parse_nonzero<G>(get: &G, key: &'static str, default: u64) -> Result<u64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match parse_or(get, key, default)? {
        0 => Err(ConfigError::Invalid {
            key,
            value: "0".to_string(),
        }),
        secs => Ok(secs),
    }
}
