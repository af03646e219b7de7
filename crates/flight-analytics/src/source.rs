//! Dataset locations accepted by the analyzer.

use crate::error::AnalyticsError;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where a telemetry CSV lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// File on the local filesystem
    Local(PathBuf),
    /// Object in S3-compatible storage, normalized to `s3://bucket/key`
    ObjectStore { uri: String },
}

impl DataSource {
    /// Location string handed to DuckDB's CSV reader.
    pub fn location(&self) -> String {
        match self {
            Self::Local(path) => path.display().to_string(),
            Self::ObjectStore { uri } => uri.clone(),
        }
    }

    pub const fn is_remote(&self) -> bool {
        matches!(self, Self::ObjectStore { .. })
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.location())
    }
}

impl FromStr for DataSource {
    type Err = AnalyticsError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AnalyticsError::InvalidSource(raw.to_string()));
        }

        let object_path = raw
            .strip_prefix("s3://")
            .or_else(|| raw.strip_prefix("s3a://"));

        match object_path {
            Some(path) => {
                let (bucket, key) = path
                    .split_once('/')
                    .ok_or_else(|| AnalyticsError::InvalidSource(raw.to_string()))?;
                if bucket.is_empty() || key.is_empty() {
                    return Err(AnalyticsError::InvalidSource(raw.to_string()));
                }
                Ok(Self::ObjectStore {
                    uri: format!("s3://{bucket}/{key}"),
                })
            }
            None if raw.contains("://") => Err(AnalyticsError::InvalidSource(raw.to_string())),
            None => Ok(Self::Local(PathBuf::from(raw))),
        }
    }
}
