//! # Application State and Configuration
//!
//! Shared state for the Axum application, passed to all route handlers via
//! the `State` extractor, plus [`AppConfig::from_env`].

use std::sync::Arc;

use thiserror::Error;

use campus_state::WorkflowPolicy;

use crate::auth::{AccessPolicy, SignedTokenProvider, TokenSecret};
use crate::persistence::{MemoryPersistence, Persistence};
use crate::workflow::{PagingConfig, ResourceLifecycle};

/// Startup configuration errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable was set to a value that cannot be used.
    #[error("invalid {var}: {reason}")]
    Invalid {
        /// Environment variable name.
        var: &'static str,
        /// What was wrong.
        reason: String,
    },
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Application configuration.
///
/// Custom `Debug` redacts the token secret and database URL.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// HMAC secret for bearer tokens. `None` means generate an ephemeral one.
    pub token_secret: Option<TokenSecret>,
    /// Workflow policy switches.
    pub policy: WorkflowPolicy,
    /// Access policy switches.
    pub access: AccessPolicy,
    /// Page-size defaults and limits.
    pub paging: PagingConfig,
    /// PostgreSQL URL; in-memory persistence when `None`.
    pub database_url: Option<String>,
    /// Log output format.
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("token_secret", &self.token_secret.as_ref().map(|_| "[REDACTED]"))
            .field("policy", &self.policy)
            .field("access", &self.access)
            .field("paging", &self.paging)
            .field("database_url", &self.database_url.as_ref().map(|_| "[REDACTED]"))
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            token_secret: None,
            policy: WorkflowPolicy::default(),
            access: AccessPolicy::default(),
            paging: PagingConfig::default(),
            database_url: None,
            log_format: LogFormat::Text,
        }
    }
}

impl AppConfig {
    /// Build configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match get("PORT") {
            Some(v) => parse_num::<u16>("PORT", &v)?,
            None => defaults.port,
        };

        let token_secret = match get("CAMPUS_TOKEN_SECRET") {
            Some(v) => Some(TokenSecret::new(v.into_bytes()).ok_or_else(|| {
                ConfigError::Invalid {
                    var: "CAMPUS_TOKEN_SECRET",
                    reason: format!("must be at least {} bytes", TokenSecret::MIN_LEN),
                }
            })?),
            None => None,
        };

        let policy = WorkflowPolicy {
            allow_resubmit_rejected: match get("CAMPUS_ALLOW_RESUBMIT_REJECTED") {
                Some(v) => parse_bool("CAMPUS_ALLOW_RESUBMIT_REJECTED", &v)?,
                None => false,
            },
        };
        let access = AccessPolicy {
            admin_may_update: match get("CAMPUS_ADMIN_MAY_UPDATE") {
                Some(v) => parse_bool("CAMPUS_ADMIN_MAY_UPDATE", &v)?,
                None => false,
            },
        };

        let default_page_size = match get("CAMPUS_DEFAULT_PAGE_SIZE") {
            Some(v) => parse_num::<u32>("CAMPUS_DEFAULT_PAGE_SIZE", &v)?,
            None => defaults.paging.default_page_size,
        };
        let max_page_size = match get("CAMPUS_MAX_PAGE_SIZE") {
            Some(v) => parse_num::<u32>("CAMPUS_MAX_PAGE_SIZE", &v)?,
            None => defaults.paging.max_page_size,
        };
        if max_page_size == 0 {
            return Err(ConfigError::Invalid {
                var: "CAMPUS_MAX_PAGE_SIZE",
                reason: "must be at least 1".to_string(),
            });
        }
        if default_page_size == 0 || default_page_size > max_page_size {
            return Err(ConfigError::Invalid {
                var: "CAMPUS_DEFAULT_PAGE_SIZE",
                reason: format!("must be between 1 and {max_page_size}"),
            });
        }

        let log_format = match get("LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("text") => LogFormat::Text,
            Some("json") => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    var: "LOG_FORMAT",
                    reason: format!("expected 'text' or 'json', got '{other}'"),
                })
            }
        };

        Ok(Self {
            port,
            token_secret,
            policy,
            access,
            paging: PagingConfig {
                default_page_size,
                max_page_size,
            },
            database_url: get("DATABASE_URL"),
            log_format,
        })
    }
}

fn parse_num<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got '{other}'"),
        }),
    }
}

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The resource lifecycle manager.
    pub lifecycle: ResourceLifecycle,
    /// Issuer and verifier of bearer tokens.
    pub tokens: Arc<SignedTokenProvider>,
    /// Configuration the state was built from.
    pub config: Arc<AppConfig>,
}

impl AppState {
    /// In-memory state with default configuration and an ephemeral secret.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), Arc::new(MemoryPersistence::new()))
    }

    /// Build state from configuration over the given persistence backend.
    ///
    /// Without a configured token secret, an ephemeral one is generated and
    /// tokens stop validating on restart.
    pub fn with_config(config: AppConfig, store: Arc<dyn Persistence>) -> Self {
        let secret = match &config.token_secret {
            Some(secret) => secret.clone(),
            None => {
                tracing::warn!(
                    "CAMPUS_TOKEN_SECRET not set, using an ephemeral secret. \
                     Issued tokens will not survive restarts."
                );
                TokenSecret::generate()
            }
        };
        let lifecycle = ResourceLifecycle::new(store)
            .with_policy(config.policy)
            .with_access_policy(config.access)
            .with_paging(config.paging);
        Self {
            lifecycle,
            tokens: Arc::new(SignedTokenProvider::new(secret)),
            config: Arc::new(config),
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.port, 8080);
        assert!(config.token_secret.is_none());
        assert!(!config.policy.allow_resubmit_rejected);
        assert!(!config.access.admin_may_update);
        assert_eq!(config.paging, PagingConfig::default());
        assert_eq!(config.log_format, LogFormat::Text);
        assert!(config.database_url.is_none());
    }

    #[test]
    fn reads_every_variable() {
        let config = AppConfig::from_lookup(lookup(&[
            ("PORT", "9090"),
            ("CAMPUS_TOKEN_SECRET", "a-long-enough-secret"),
            ("CAMPUS_ALLOW_RESUBMIT_REJECTED", "true"),
            ("CAMPUS_ADMIN_MAY_UPDATE", "1"),
            ("CAMPUS_DEFAULT_PAGE_SIZE", "20"),
            ("CAMPUS_MAX_PAGE_SIZE", "50"),
            ("DATABASE_URL", "postgres://localhost/campus"),
            ("LOG_FORMAT", "json"),
        ]))
        .unwrap();
        assert_eq!(config.port, 9090);
        assert!(config.token_secret.is_some());
        assert!(config.policy.allow_resubmit_rejected);
        assert!(config.access.admin_may_update);
        assert_eq!(config.paging.default_page_size, 20);
        assert_eq!(config.paging.max_page_size, 50);
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.database_url.is_some());
    }

    #[test]
    fn bad_values_are_errors() {
        for (var, value) in [
            ("PORT", "eighty"),
            ("CAMPUS_TOKEN_SECRET", "short"),
            ("CAMPUS_ALLOW_RESUBMIT_REJECTED", "maybe"),
            ("CAMPUS_DEFAULT_PAGE_SIZE", "0"),
            ("CAMPUS_MAX_PAGE_SIZE", "0"),
            ("LOG_FORMAT", "xml"),
        ] {
            let err = AppConfig::from_lookup(lookup(&[(var, value)])).unwrap_err();
            let ConfigError::Invalid { var: got, .. } = &err;
            assert_eq!(*got, var, "{var}={value} gave {err}");
        }
    }

    #[test]
    fn default_page_size_must_fit_max() {
        let err = AppConfig::from_lookup(lookup(&[
            ("CAMPUS_DEFAULT_PAGE_SIZE", "30"),
            ("CAMPUS_MAX_PAGE_SIZE", "20"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("CAMPUS_DEFAULT_PAGE_SIZE"));
    }

    #[test]
    fn debug_redacts_secrets() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CAMPUS_TOKEN_SECRET", "a-long-enough-secret"),
            ("DATABASE_URL", "postgres://user:hunter2@db/campus"),
        ]))
        .unwrap();
        let debug = format!("{config:?}");
        assert!(!debug.contains("a-long-enough-secret"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
