//! Configuration management for Turnstile.
//!
//! Configuration comes from an optional YAML file, overridden by
//! `TURNSTILE__<SECTION>__<KEY>` environment variables, e.g.
//! `TURNSTILE__SERVER__LISTEN_ADDR=0.0.0.0:8080`.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, TurnstileError};
use crate::ratelimit::LimitConfig;
use crate::report::ReportingBackend;
use crate::session::{default_accounts, UserAccount};

/// Main configuration for the Turnstile service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnstileConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Rate limiting configuration
    #[serde(default)]
    pub rate_limiting: RateLimitingConfig,

    /// Session configuration
    #[serde(default)]
    pub session: SessionConfig,

    /// Alert reporting configuration
    #[serde(default)]
    pub reporting: ReportingConfig,

    /// Accounts served by the built-in user directory
    #[serde(default = "default_accounts")]
    pub users: Vec<UserAccount>,
}

impl Default for TurnstileConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            rate_limiting: RateLimitingConfig::default(),
            session: SessionConfig::default(),
            reporting: ReportingConfig::default(),
            users: default_accounts(),
        }
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP listen address
    #[serde(default = "default_listen_addr")]
    pub listen_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
        }
    }
}

fn default_listen_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 3000))
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitingConfig {
    /// Gate in front of all traffic
    #[serde(default = "default_general_limit")]
    pub general: LimitConfig,

    /// API endpoints
    #[serde(default = "default_api_limit")]
    pub api: LimitConfig,

    /// Authentication endpoints
    #[serde(default = "default_auth_limit")]
    pub auth: LimitConfig,

    /// How often expired records are swept, in seconds
    #[serde(default = "default_limiter_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for RateLimitingConfig {
    fn default() -> Self {
        Self {
            general: default_general_limit(),
            api: default_api_limit(),
            auth: default_auth_limit(),
            sweep_interval_secs: default_limiter_sweep_interval(),
        }
    }
}

impl RateLimitingConfig {
    /// Sweep interval as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_general_limit() -> LimitConfig {
    LimitConfig::new(200, Duration::from_secs(60))
}

fn default_api_limit() -> LimitConfig {
    LimitConfig::new(100, Duration::from_secs(60))
}

fn default_auth_limit() -> LimitConfig {
    LimitConfig::new(5, Duration::from_secs(60))
}

fn default_limiter_sweep_interval() -> u64 {
    300
}

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Session lifetime in seconds
    #[serde(default = "default_session_ttl")]
    pub ttl_secs: u64,

    /// How often expired sessions are swept, in seconds
    #[serde(default = "default_session_sweep_interval")]
    pub sweep_interval_secs: u64,

    /// Mark the session cookie `Secure` (set when served over TLS)
    #[serde(default)]
    pub secure_cookie: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_session_ttl(),
            sweep_interval_secs: default_session_sweep_interval(),
            secure_cookie: false,
        }
    }
}

impl SessionConfig {
    /// Session lifetime as a `Duration`.
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Sweep interval as a `Duration`.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

fn default_session_ttl() -> u64 {
    7 * 24 * 60 * 60
}

fn default_session_sweep_interval() -> u64 {
    60 * 60
}

/// Alert reporting configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportingConfig {
    /// Reporter backend
    #[serde(default)]
    pub backend: ReportingBackend,
}

impl TurnstileConfig {
    /// Load configuration from an optional YAML file plus environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path).format(::config::FileFormat::Yaml),
            );
        }

        let config: TurnstileConfig = builder
            .add_source(
                ::config::Environment::with_prefix("TURNSTILE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| TurnstileError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: TurnstileConfig = serde_yaml::from_str(yaml)
            .map_err(|e| TurnstileError::Config(format!("Failed to parse configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the services cannot run with.
    pub fn validate(&self) -> Result<()> {
        let limits = [
            ("general", &self.rate_limiting.general),
            ("api", &self.rate_limiting.api),
            ("auth", &self.rate_limiting.auth),
        ];
        for (name, limit) in limits {
            if limit.capacity == 0 {
                return Err(TurnstileError::Config(format!(
                    "rate_limiting.{}.capacity must be greater than zero",
                    name
                )));
            }
            if limit.window_ms == 0 {
                return Err(TurnstileError::Config(format!(
                    "rate_limiting.{}.window_ms must be greater than zero",
                    name
                )));
            }
        }

        let positive = [
            ("rate_limiting.sweep_interval_secs", self.rate_limiting.sweep_interval_secs),
            ("session.ttl_secs", self.session.ttl_secs),
            ("session.sweep_interval_secs", self.session.sweep_interval_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(TurnstileError::Config(format!(
                    "{} must be greater than zero",
                    name
                )));
            }
        }

        Ok(())
    }
}
