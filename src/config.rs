//! Configuration types for qblast

use crate::error::{Error, Result};
use crate::types::{Database, JobRequest, OutputFormat, Program};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Default service endpoint
pub const DEFAULT_ENDPOINT: &str = "https://blast.ncbi.nlm.nih.gov/Blast.cgi";

/// Poll loop policy
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PollConfig {
    /// Fixed delay between status checks (default: 60 seconds)
    #[serde(default = "default_poll_interval", with = "duration_serde")]
    pub interval: Duration,

    /// Delay before the first status check (default: 10 seconds)
    #[serde(default = "default_initial_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Give up polling after this long (None = poll until cancelled)
    #[serde(default, with = "optional_duration_serde")]
    pub deadline: Option<Duration>,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            initial_delay: default_initial_delay(),
            deadline: None,
        }
    }
}

/// Main configuration for [`JobClient`](crate::JobClient)
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Service endpoint (default: NCBI BLAST URL API)
    #[serde(default = "default_endpoint")]
    pub endpoint: Url,

    /// Client identifier sent as the User-Agent header (default: "qblast/<version>")
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Timeout for a single HTTP request (default: 300 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub request_timeout: Duration,

    /// Poll loop policy
    #[serde(default)]
    pub poll: PollConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            poll: PollConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from a JSON document, filling in defaults for missing keys
    pub fn from_json(json: &str) -> Result<Self> {
        let config: ClientConfig = serde_json::from_str(json).map_err(|e| Error::Config {
            message: format!("invalid client configuration: {}", e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Check settings that serde cannot check on its own
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.cannot_be_a_base() || !matches!(self.endpoint.scheme(), "http" | "https")
        {
            return Err(Error::Config {
                message: format!("endpoint must be an http(s) URL, got {}", self.endpoint),
                key: Some("endpoint".to_string()),
            });
        }
        if self.poll.interval.is_zero() {
            return Err(Error::Config {
                message: "poll interval must be greater than zero".to_string(),
                key: Some("poll.interval".to_string()),
            });
        }
        Ok(())
    }
}

/// Search settings as supplied by a front end (command line, config file)
///
/// Values are plain strings so that unsupported names surface as
/// [`Error::Validation`] from [`QueryConfig::validate`] rather than as a
/// deserialization failure.
#[derive(Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    /// Database name (default: "nt")
    #[serde(default = "default_database")]
    pub database: String,

    /// Program name (default: "blastn")
    #[serde(default = "default_program")]
    pub program: String,

    /// Output format name (default: "json")
    #[serde(default = "default_output_format")]
    pub output_format: String,

    /// Enable megablast (default: false)
    #[serde(default)]
    pub megablast: bool,

    /// API key from the credential store
    #[serde(default)]
    pub api_key: Option<String>,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            database: default_database(),
            program: default_program(),
            output_format: default_output_format(),
            megablast: false,
            api_key: None,
        }
    }
}

impl std::fmt::Debug for QueryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryConfig")
            .field("database", &self.database)
            .field("program", &self.program)
            .field("output_format", &self.output_format)
            .field("megablast", &self.megablast)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl QueryConfig {
    /// Validate the names and build the request for `query`
    ///
    /// Fails with [`Error::Validation`] on the first unsupported output format,
    /// database or program. No request is sent.
    pub fn validate(&self, query: impl Into<String>) -> Result<(JobRequest, OutputFormat)> {
        let output_format: OutputFormat = self.output_format.parse()?;
        let database: Database = self.database.parse()?;
        let program: Program = self.program.parse()?;

        let mut request = JobRequest::new(database, program, query).with_megablast(self.megablast);
        if let Some(key) = &self.api_key {
            request = request.with_credential(key.clone());
        }
        Ok((request, output_format))
    }
}

#[allow(clippy::expect_used)]
fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL")
}

fn default_user_agent() -> String {
    format!("qblast/{}", env!("CARGO_PKG_VERSION"))
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_poll_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_initial_delay() -> Duration {
    Duration::from_secs(10)
}

fn default_database() -> String {
    Database::default().as_str().to_string()
}

fn default_program() -> String {
    Program::default().as_str().to_string()
}

fn default_output_format() -> String {
    OutputFormat::default().as_str().to_string()
}

// Duration serialization helper (whole seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

// Optional Duration serialization helper
mod optional_duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match duration {
            Some(d) => serializer.serialize_some(&d.as_secs()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Duration>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = Option::<u64>::deserialize(deserializer)?;
        Ok(secs.map(Duration::from_secs))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
        assert_eq!(config.poll.interval, Duration::from_secs(60));
        assert_eq!(config.poll.initial_delay, Duration::from_secs(10));
        assert!(config.poll.deadline.is_none());
        assert!(config.user_agent.starts_with("qblast/"));
        config.validate().unwrap();
    }

    #[test]
    fn test_from_json_fills_missing_keys() {
        let config =
            ClientConfig::from_json(r#"{"poll": {"interval": 5, "deadline": 600}}"#).unwrap();
        assert_eq!(config.poll.interval, Duration::from_secs(5));
        assert_eq!(config.poll.initial_delay, Duration::from_secs(10));
        assert_eq!(config.poll.deadline, Some(Duration::from_secs(600)));
        assert_eq!(config.endpoint.as_str(), DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_from_json_rejects_non_http_endpoint() {
        let err = ClientConfig::from_json(r#"{"endpoint": "mailto:someone@example.com"}"#)
            .unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("endpoint")),
            other => panic!("expected config error, got {other:?}"),
        }
    }

    #[test]
    fn test_zero_interval_rejected() {
        let mut config = ClientConfig::default();
        config.poll.interval = Duration::ZERO;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_query_config_validate() {
        let query = QueryConfig {
            database: "swissprot".into(),
            program: "blastp".into(),
            output_format: "tab".into(),
            megablast: true,
            api_key: Some("key".into()),
        };
        let (request, format) = query.validate(">p\nMKV").unwrap();
        assert_eq!(request.database(), Database::Swissprot);
        assert_eq!(request.program(), Program::Blastp);
        assert!(request.megablast());
        assert_eq!(request.credential(), Some("key"));
        assert_eq!(format, OutputFormat::Tab);
    }

    #[test]
    fn test_query_config_rejects_unknown_database() {
        let query = QueryConfig {
            database: "genbank".into(),
            ..Default::default()
        };
        let err = query.validate("ACGT").unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert!(err.to_string().contains("genbank"));
    }

    #[test]
    fn test_query_config_debug_hides_api_key() {
        let query = QueryConfig {
            api_key: Some("hunter2".into()),
            ..Default::default()
        };
        assert!(!format!("{query:?}").contains("hunter2"));
    }
}
