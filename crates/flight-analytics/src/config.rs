//! # Analyzer Configuration
//!
//! Environment-based configuration for the analytics engine. Object-storage
//! credentials come from the ambient environment, never from the dataset.

use crate::error::{AnalyticsError, Result};
use std::env;

/// Analyzer configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// DuckDB worker threads (engine default when unset)
    pub threads: Option<usize>,

    /// Object storage connection
    pub s3: S3Config,

    /// Logging level
    pub log_level: String,

    /// Emit diagnostics as JSON
    pub log_json: bool,
}

/// S3-compatible object storage configuration
#[derive(Clone, Default)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub use_ssl: bool,
    /// Static credentials; the AWS credential chain is used when absent
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub session_token: Option<String>,
}

impl S3Config {
    /// Whether a static key pair is configured.
    pub const fn has_static_credentials(&self) -> bool {
        self.access_key_id.is_some() && self.secret_access_key.is_some()
    }
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("use_ssl", &self.use_ssl)
            .field("static_credentials", &self.has_static_credentials())
            .finish()
    }
}

impl AnalyzerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let threads = match lookup("FLIGHT_ENGINE_THREADS") {
            Some(raw) => {
                let threads: usize = raw.trim().parse().map_err(|_| {
                    AnalyticsError::Config(format!("FLIGHT_ENGINE_THREADS='{raw}' is not a count"))
                })?;
                if threads == 0 {
                    return Err(AnalyticsError::Config(
                        "FLIGHT_ENGINE_THREADS must be at least 1".to_string(),
                    ));
                }
                Some(threads)
            }
            None => None,
        };

        Ok(Self {
            threads,

            s3: S3Config {
                endpoint: lookup("FLIGHT_S3_ENDPOINT")
                    .unwrap_or_else(|| "s3.amazonaws.com".to_string()),
                region: lookup("FLIGHT_S3_REGION")
                    .or_else(|| lookup("AWS_REGION"))
                    .unwrap_or_else(|| "us-east-1".to_string()),
                use_ssl: lookup("FLIGHT_S3_USE_SSL")
                    .map(|v| v == "true" || v == "1")
                    .unwrap_or(true),
                access_key_id: lookup("AWS_ACCESS_KEY_ID"),
                secret_access_key: lookup("AWS_SECRET_ACCESS_KEY"),
                session_token: lookup("AWS_SESSION_TOKEN"),
            },

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            log_json: lookup("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            threads: None,
            s3: S3Config {
                endpoint: "s3.amazonaws.com".to_string(),
                region: "us-east-1".to_string(),
                use_ssl: true,
                ..S3Config::default()
            },
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}
