//! Configuration handling for the DB Agent Server.
//!
//! This module provides configuration management via CLI arguments and environment variables.

use crate::models::Provider;
use clap::Parser;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_SERVER_HOST: &str = "0.0.0.0";
pub const DEFAULT_SERVER_PORT: u16 = 8080;
pub const DEFAULT_SCHEMA_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_SCHEMA_CACHE_TTL_STR: &str = "1h";
pub const DEFAULT_MAX_TURNS: usize = 8;
pub const DEFAULT_QUERY_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_PROVIDER_TIMEOUT_SECS: u64 = 120;

pub const DEFAULT_GOOGLE_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com";

/// Parse a Go-style duration string such as `45s`, `30m`, `1h30m` or `1.5h`.
///
/// Accepted units: `ns`, `us` (or `µs`), `ms`, `s`, `m`, `h`. A bare `0` is
/// zero. Negative durations are rejected.
pub fn parse_go_duration(input: &str) -> Option<Duration> {
    let s = input.trim();
    if s.is_empty() {
        return None;
    }
    if s == "0" || s == "+0" {
        return Some(Duration::ZERO);
    }

    let mut rest = s.strip_prefix('+').unwrap_or(s);
    if rest.starts_with('-') {
        return None;
    }

    let mut total_secs = 0f64;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        if number_len == 0 {
            return None;
        }
        let value: f64 = rest[..number_len].parse().ok()?;
        rest = &rest[number_len..];

        let unit_len = rest
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(rest.len());
        let factor = match &rest[..unit_len] {
            "ns" => 1e-9,
            "us" | "µs" | "μs" => 1e-6,
            "ms" => 1e-3,
            "s" => 1.0,
            "m" => 60.0,
            "h" => 3600.0,
            _ => return None,
        };
        total_secs += value * factor;
        rest = &rest[unit_len..];
    }

    Duration::try_from_secs_f64(total_secs).ok()
}

/// Resolve the schema cache TTL, falling back to one hour when the value is
/// empty, malformed or not positive.
pub fn resolve_cache_ttl(raw: &str) -> Duration {
    match parse_go_duration(raw) {
        Some(ttl) if !ttl.is_zero() => ttl,
        Some(_) => DEFAULT_SCHEMA_CACHE_TTL,
        None => {
            if !raw.trim().is_empty() {
                warn!(value = %raw, "Invalid SCHEMA_CACHE_TTL, using 1h");
            }
            DEFAULT_SCHEMA_CACHE_TTL
        }
    }
}

/// Runtime configuration handed to the agent pool.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// API key per provider. A provider is configured when its key is non-empty.
    pub providers: HashMap<Provider, String>,
    /// Overrides for provider API endpoints.
    pub base_urls: HashMap<Provider, String>,
    pub schema_cache_ttl: Duration,
    pub max_turns: usize,
    pub query_timeout: Duration,
    pub connect_timeout: Duration,
    pub provider_timeout: Duration,
}

impl AgentConfig {
    /// Configuration with no providers and default limits.
    pub fn new() -> Self {
        Self {
            providers: HashMap::new(),
            base_urls: HashMap::new(),
            schema_cache_ttl: DEFAULT_SCHEMA_CACHE_TTL,
            max_turns: DEFAULT_MAX_TURNS,
            query_timeout: Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
            provider_timeout: Duration::from_secs(DEFAULT_PROVIDER_TIMEOUT_SECS),
        }
    }

    /// Set the API key for a provider.
    pub fn with_provider(mut self, provider: Provider, api_key: impl Into<String>) -> Self {
        self.providers.insert(provider, api_key.into());
        self
    }

    /// Point a provider at a different endpoint.
    pub fn with_base_url(mut self, provider: Provider, base_url: impl Into<String>) -> Self {
        self.base_urls.insert(provider, base_url.into());
        self
    }

    pub fn with_schema_cache_ttl(mut self, ttl: Duration) -> Self {
        self.schema_cache_ttl = ttl;
        self
    }

    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    /// API key for a provider, if configured.
    pub fn api_key(&self, provider: Provider) -> Option<&str> {
        self.providers
            .get(&provider)
            .map(String::as_str)
            .filter(|key| !key.is_empty())
    }

    pub fn is_configured(&self, provider: Provider) -> bool {
        self.api_key(provider).is_some()
    }

    /// Endpoint for a provider, trailing slash removed.
    pub fn base_url(&self, provider: Provider) -> &str {
        let url = self
            .base_urls
            .get(&provider)
            .map(String::as_str)
            .filter(|url| !url.is_empty())
            .unwrap_or(match provider {
                Provider::Google => DEFAULT_GOOGLE_BASE_URL,
                Provider::OpenAI => DEFAULT_OPENAI_BASE_URL,
            });
        url.trim_end_matches('/')
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for the DB Agent Server.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "db-agent-server",
    about = "LLM agent server that introspects SQL databases and proposes queries",
    version,
    author
)]
pub struct Config {
    /// Google Gemini API key
    #[arg(long, env = "GOOGLE_API_KEY", hide_env_values = true)]
    pub google_api_key: Option<String>,

    /// OpenAI API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Google API endpoint
    #[arg(long, default_value = DEFAULT_GOOGLE_BASE_URL, env = "GOOGLE_BASE_URL")]
    pub google_base_url: String,

    /// OpenAI API endpoint
    #[arg(long, default_value = DEFAULT_OPENAI_BASE_URL, env = "OPENAI_BASE_URL")]
    pub openai_base_url: String,

    /// How long a session's cached schema stays valid (e.g. 30m, 1h30m)
    #[arg(
        long,
        default_value = DEFAULT_SCHEMA_CACHE_TTL_STR,
        env = "SCHEMA_CACHE_TTL"
    )]
    pub schema_cache_ttl: String,

    /// HTTP host to bind to
    #[arg(long, default_value = DEFAULT_SERVER_HOST, env = "SERVER_HOST")]
    pub host: String,

    /// HTTP port to bind to
    #[arg(long, default_value_t = DEFAULT_SERVER_PORT, env = "SERVER_PORT")]
    pub port: u16,

    /// Maximum model round trips per chat request
    #[arg(long, default_value_t = DEFAULT_MAX_TURNS, env = "AGENT_MAX_TURNS")]
    pub max_turns: usize,

    /// Schema extraction timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_QUERY_TIMEOUT_SECS,
        env = "QUERY_TIMEOUT"
    )]
    pub query_timeout: u64,

    /// Database connection timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS,
        env = "CONNECT_TIMEOUT"
    )]
    pub connect_timeout: u64,

    /// LLM provider request timeout in seconds
    #[arg(
        long,
        default_value_t = DEFAULT_PROVIDER_TIMEOUT_SECS,
        env = "PROVIDER_TIMEOUT"
    )]
    pub provider_timeout: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,

    /// Enable JSON logging format
    #[arg(long, env = "JSON_LOGS")]
    pub json_logs: bool,
}

impl Config {
    /// Parse configuration from command line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Create a default configuration (useful for testing).
    pub fn default_config() -> Self {
        Self {
            google_api_key: None,
            openai_api_key: None,
            google_base_url: DEFAULT_GOOGLE_BASE_URL.to_string(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            schema_cache_ttl: DEFAULT_SCHEMA_CACHE_TTL_STR.to_string(),
            host: DEFAULT_SERVER_HOST.to_string(),
            port: DEFAULT_SERVER_PORT,
            max_turns: DEFAULT_MAX_TURNS,
            query_timeout: DEFAULT_QUERY_TIMEOUT_SECS,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT_SECS,
            log_level: "info".to_string(),
            json_logs: false,
        }
    }

    /// Get the HTTP bind address.
    pub fn http_bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the query timeout as a Duration.
    pub fn query_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.query_timeout)
    }

    /// Get the connection timeout as a Duration.
    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }

    /// Build the agent pool configuration.
    pub fn agent_config(&self) -> AgentConfig {
        let mut agent_config = AgentConfig::new()
            .with_schema_cache_ttl(resolve_cache_ttl(&self.schema_cache_ttl))
            .with_max_turns(self.max_turns)
            .with_base_url(Provider::Google, &self.google_base_url)
            .with_base_url(Provider::OpenAI, &self.openai_base_url);

        for (provider, key) in [
            (Provider::Google, &self.google_api_key),
            (Provider::OpenAI, &self.openai_api_key),
        ] {
            if let Some(key) = key.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
                agent_config = agent_config.with_provider(provider, key);
            }
        }

        agent_config.query_timeout = self.query_timeout_duration();
        agent_config.connect_timeout = self.connect_timeout_duration();
        agent_config.provider_timeout = Duration::from_secs(self.provider_timeout);
        agent_config
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host, DEFAULT_SERVER_HOST);
        assert_eq!(config.port, DEFAULT_SERVER_PORT);
        assert_eq!(config.http_bind_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_parse_go_duration() {
        assert_eq!(parse_go_duration("45s"), Some(Duration::from_secs(45)));
        assert_eq!(parse_go_duration("30m"), Some(Duration::from_secs(1800)));
        assert_eq!(parse_go_duration("1h30m"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_go_duration("1.5h"), Some(Duration::from_secs(5400)));
        assert_eq!(parse_go_duration("250ms"), Some(Duration::from_millis(250)));
        assert_eq!(parse_go_duration("0"), Some(Duration::ZERO));
    }

    #[test]
    fn test_parse_go_duration_rejects_malformed() {
        assert_eq!(parse_go_duration(""), None);
        assert_eq!(parse_go_duration("abc"), None);
        assert_eq!(parse_go_duration("10"), None);
        assert_eq!(parse_go_duration("5d"), None);
        assert_eq!(parse_go_duration("-5m"), None);
        assert_eq!(parse_go_duration("h"), None);
    }

    #[test]
    fn test_resolve_cache_ttl_fallbacks() {
        assert_eq!(resolve_cache_ttl(""), DEFAULT_SCHEMA_CACHE_TTL);
        assert_eq!(resolve_cache_ttl("invalid"), DEFAULT_SCHEMA_CACHE_TTL);
        assert_eq!(resolve_cache_ttl("0s"), DEFAULT_SCHEMA_CACHE_TTL);
        assert_eq!(resolve_cache_ttl("30m"), Duration::from_secs(1800));
    }

    #[test]
    fn test_agent_config_ignores_blank_keys() {
        let config = Config {
            google_api_key: Some("  ".to_string()),
            openai_api_key: Some("sk-test".to_string()),
            ..Config::default()
        };
        let agent_config = config.agent_config();
        assert!(!agent_config.is_configured(Provider::Google));
        assert!(agent_config.is_configured(Provider::OpenAI));
        assert_eq!(agent_config.api_key(Provider::OpenAI), Some("sk-test"));
    }

    #[test]
    fn test_agent_config_timeouts() {
        let config = Config {
            query_timeout: 60,
            connect_timeout: 15,
            schema_cache_ttl: "10m".to_string(),
            ..Config::default()
        };
        let agent_config = config.agent_config();
        assert_eq!(agent_config.query_timeout, Duration::from_secs(60));
        assert_eq!(agent_config.connect_timeout, Duration::from_secs(15));
        assert_eq!(agent_config.schema_cache_ttl, Duration::from_secs(600));
    }

    #[test]
    fn test_base_url_trims_trailing_slash() {
        let agent_config =
            AgentConfig::new().with_base_url(Provider::OpenAI, "http://localhost:9000/");
        assert_eq!(
            agent_config.base_url(Provider::OpenAI),
            "http://localhost:9000"
        );
        assert_eq!(
            agent_config.base_url(Provider::Google),
            DEFAULT_GOOGLE_BASE_URL
        );
    }
}
