use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default User-Agent string for HTTP requests
pub const DEFAULT_USER_AGENT: &str = concat!("async-network/", env!("CARGO_PKG_VERSION"));

/// Default maximum buffered response body (10 MB)
pub const DEFAULT_MAX_BODY_SIZE: usize = 10 * 1024 * 1024;

/// Default number of redirects followed before giving up
pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Orchestrator configuration.
///
/// Durations use humantime notation (`"10s"`, `"1m 30s"`):
///
/// ```yaml
/// time_out: 5s
/// resource_time_out: 2m
/// base_url: https://api.example.com/v1
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NetworkingConfig {
    /// Per-request timeout (default: 10 seconds)
    #[serde(with = "humantime_duration")]
    pub time_out: Duration,

    /// Timeout for the whole exchange including the body (default: 60 seconds)
    #[serde(with = "humantime_duration")]
    pub resource_time_out: Duration,

    /// Prefix for relative request URLs (default: empty)
    pub base_url: String,
}

impl Default for NetworkingConfig {
    fn default() -> Self {
        Self {
            time_out: Duration::from_secs(10),
            resource_time_out: Duration::from_secs(60),
            base_url: String::new(),
        }
    }
}

/// TLS root certificate configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Use Mozilla's root certificates (webpki-roots, no OS dependency)
    #[default]
    WebPki,
    /// Use OS native root certificate store
    Native,
}

/// Transport security configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Require TLS for all connections (HTTPS only)
    #[default]
    TlsOnly,
    /// Allow plain HTTP connections (mock servers in tests)
    AllowInsecureHttp,
}

/// Configuration of the default [`HyperTransport`](crate::HyperTransport).
#[derive(Debug, Clone)]
pub struct HyperTransportConfig {
    /// Timeout for receiving the response head (default: 10 seconds)
    pub request_timeout: Duration,

    /// Timeout for the whole exchange, body included (default: 60 seconds)
    pub resource_timeout: Duration,

    /// Maximum response body size in bytes, after decompression (default: 10 MB)
    pub max_body_size: usize,

    /// User-Agent header value, sent unless the request sets its own
    pub user_agent: String,

    /// Transport security mode (default: `TlsOnly`)
    pub transport: TransportSecurity,

    /// TLS root certificate strategy (default: `WebPki`)
    pub tls_roots: TlsRootConfig,

    /// Redirects to follow; `0` returns 3xx responses as-is (default: 10)
    pub max_redirects: usize,
}

impl Default for HyperTransportConfig {
    fn default() -> Self {
        Self::from_networking(&NetworkingConfig::default())
    }
}

impl HyperTransportConfig {
    /// Transport configuration using the timeouts of `config`.
    #[must_use]
    pub fn from_networking(config: &NetworkingConfig) -> Self {
        Self {
            request_timeout: config.time_out,
            resource_timeout: config.resource_time_out,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::default(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Create configuration for testing with mock servers (allows insecure HTTP)
    ///
    /// **WARNING**: This configuration allows plain HTTP connections.
    /// Use only for local testing with mock servers, never in production.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            resource_timeout: Duration::from_secs(10),
            max_body_size: 1024 * 1024,
            transport: TransportSecurity::AllowInsecureHttp,
            ..Self::default()
        }
    }
}

/// `Duration` as a humantime string.
mod humantime_duration {
    use serde::{Deserialize, Deserializer, Serializer, de};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(&humantime::format_duration(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let text = String::deserialize(d)?;
        humantime::parse_duration(&text)
            .map_err(|_| de::Error::invalid_value(de::Unexpected::Str(&text), &"a duration"))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_networking_config_default() {
        let config = NetworkingConfig::default();
        assert_eq!(config.time_out, Duration::from_secs(10));
        assert_eq!(config.resource_time_out, Duration::from_secs(60));
        assert!(config.base_url.is_empty());
    }

    #[test]
    fn test_networking_config_humantime() {
        let config: NetworkingConfig = serde_json::from_str(
            r#"{"time_out": "1s 500ms", "base_url": "https://api.example.com"}"#,
        )
        .unwrap();
        assert_eq!(config.time_out, Duration::from_millis(1500));
        assert_eq!(config.resource_time_out, Duration::from_secs(60));
        assert_eq!(config.base_url, "https://api.example.com");
    }

    #[test]
    fn test_networking_config_serialize() {
        let config = NetworkingConfig {
            time_out: Duration::from_secs(90),
            ..NetworkingConfig::default()
        };
        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["time_out"], "1m 30s");
        assert_eq!(value["resource_time_out"], "1m");

        let back: NetworkingConfig = serde_json::from_value(value).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_networking_config_rejects_unknown_fields() {
        let result = serde_json::from_str::<NetworkingConfig>(r#"{"timeout": "1s"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_networking_config_rejects_bad_duration() {
        let result = serde_json::from_str::<NetworkingConfig>(r#"{"time_out": "soon"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_transport_config_from_networking() {
        let networking = NetworkingConfig {
            time_out: Duration::from_secs(3),
            resource_time_out: Duration::from_secs(30),
            base_url: String::new(),
        };
        let config = HyperTransportConfig::from_networking(&networking);
        assert_eq!(config.request_timeout, Duration::from_secs(3));
        assert_eq!(config.resource_timeout, Duration::from_secs(30));
        assert_eq!(config.max_body_size, DEFAULT_MAX_BODY_SIZE);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert_eq!(config.transport, TransportSecurity::TlsOnly);
        assert_eq!(config.tls_roots, TlsRootConfig::WebPki);
        assert_eq!(config.max_redirects, DEFAULT_MAX_REDIRECTS);
    }

    #[test]
    fn test_transport_config_for_testing() {
        let config = HyperTransportConfig::for_testing();
        assert_eq!(config.transport, TransportSecurity::AllowInsecureHttp);
        assert_eq!(config.max_body_size, 1024 * 1024);
    }
}
