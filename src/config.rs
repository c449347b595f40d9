//! Client configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{KvError, Result};

/// Name of the configuration group used when none is given.
pub const DEFAULT_GROUP_NAME: &str = "default";

const DEFAULT_ADDRESS: &str = "127.0.0.1:6379";

/// Settings for one client group.
///
/// The facade never reads these fields; they are handed to the registered
/// adapter factory as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Server address, `host:port`. Comma separated for cluster seeds.
    pub address: String,
    /// Logical database index.
    pub db: u32,
    /// ACL user name.
    pub user: String,
    /// Password.
    pub pass: String,
    /// Minimum number of idle connections kept by the adapter's pool.
    pub min_idle: u32,
    /// Maximum number of idle connections.
    pub max_idle: u32,
    /// Maximum number of open connections, 0 for adapter default.
    pub max_active: u32,
    /// Maximum lifetime of a pooled connection.
    #[serde(with = "duration")]
    pub max_conn_lifetime: Duration,
    /// How long an idle connection may stay in the pool.
    #[serde(with = "duration")]
    pub idle_timeout: Duration,
    /// How long to wait for a free pooled connection.
    #[serde(with = "duration")]
    pub wait_timeout: Duration,
    /// Dial timeout.
    #[serde(with = "duration")]
    pub dial_timeout: Duration,
    /// Read timeout.
    #[serde(with = "duration")]
    pub read_timeout: Duration,
    /// Write timeout.
    #[serde(with = "duration")]
    pub write_timeout: Duration,
    /// Sentinel master name; enables sentinel mode when non-empty.
    pub master_name: String,
    /// Connect over TLS.
    pub tls: bool,
    /// Skip TLS certificate verification.
    pub tls_skip_verify: bool,
    /// Route read-only commands to replicas.
    pub slave_only: bool,
    /// Treat `address` as cluster seeds.
    pub cluster: bool,
    /// Protocol version, 2 or 3.
    pub protocol: u8,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            address: DEFAULT_ADDRESS.to_owned(),
            db: 0,
            user: String::new(),
            pass: String::new(),
            min_idle: 0,
            max_idle: 10,
            max_active: 0,
            max_conn_lifetime: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(10),
            wait_timeout: Duration::from_secs(10),
            dial_timeout: Duration::ZERO,
            read_timeout: Duration::ZERO,
            write_timeout: Duration::ZERO,
            master_name: String::new(),
            tls: false,
            tls_skip_verify: false,
            slave_only: false,
            cluster: false,
            protocol: 3,
        }
    }
}

impl Config {
    /// Builds a configuration from a loosely typed key/value map.
    ///
    /// Missing keys take their defaults. Durations accept integer seconds
    /// or strings such as `"500ms"`, `"10s"`, `"1m"`.
    pub fn from_map(map: serde_json::Map<String, serde_json::Value>) -> Result<Config> {
        let config: Config = serde_json::from_value(serde_json::Value::Object(map))
            .map_err(|e| KvError::InvalidConfiguration(e.to_string()))?;
        if config.address.trim().is_empty() {
            return Err(KvError::InvalidConfiguration(
                "address cannot be empty".to_owned(),
            ));
        }
        if !matches!(config.protocol, 2 | 3) {
            return Err(KvError::InvalidConfiguration(format!(
                "unsupported protocol version {}",
                config.protocol
            )));
        }
        Ok(config)
    }

    /// Splits `address` into its individual seed addresses.
    pub fn addresses(&self) -> Vec<&str> {
        self.address
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .collect()
    }
}

/// Durations deserialize from integer or fractional seconds, or from
/// humantime strings such as `"250ms"` and `"1m 30s"`. They serialize as
/// humantime strings.
mod duration {
    use std::time::Duration;

    use serde::{de, Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Secs(u64),
        FracSecs(f64),
        Text(#[serde(with = "humantime_serde")] Duration),
    }

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        humantime_serde::serialize(d, s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        match Repr::deserialize(d)? {
            Repr::Secs(secs) => Ok(Duration::from_secs(secs)),
            Repr::FracSecs(secs) => Duration::try_from_secs_f64(secs).map_err(de::Error::custom),
            Repr::Text(d) => Ok(d),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn from_map_fills_defaults() {
        let config = Config::from_map(map(json!({ "address": "10.0.0.1:6380", "db": 2 }))).unwrap();
        assert_eq!(config.address, "10.0.0.1:6380");
        assert_eq!(config.db, 2);
        assert_eq!(config.idle_timeout, Duration::from_secs(10));
        assert_eq!(config.protocol, 3);
    }

    #[test]
    fn durations_accept_numbers_and_units() {
        let config = Config::from_map(map(json!({
            "idleTimeout": 30,
            "waitTimeout": "250ms",
            "maxConnLifetime": "2m",
            "dialTimeout": 1.5,
        })))
        .unwrap();
        assert_eq!(config.idle_timeout, Duration::from_secs(30));
        assert_eq!(config.wait_timeout, Duration::from_millis(250));
        assert_eq!(config.max_conn_lifetime, Duration::from_secs(120));
        assert_eq!(config.dial_timeout, Duration::from_millis(1500));
    }

    #[test]
    fn from_map_rejects_bad_input() {
        let err = Config::from_map(map(json!({ "address": "" }))).unwrap_err();
        assert!(matches!(err, KvError::InvalidConfiguration(_)));
        assert!(Config::from_map(map(json!({ "db": "zero" }))).is_err());
        assert!(Config::from_map(map(json!({ "idleTimeout": "5 fortnights" }))).is_err());
        assert!(Config::from_map(map(json!({ "protocol": 4 }))).is_err());
    }

    #[test]
    fn cluster_addresses_split() {
        let config = Config {
            address: "a:1, b:2,,c:3".to_owned(),
            ..Config::default()
        };
        assert_eq!(config.addresses(), vec!["a:1", "b:2", "c:3"]);
    }

    #[test]
    fn sub_second_durations_survive_serialization() {
        let config = Config {
            wait_timeout: Duration::from_millis(250),
            read_timeout: Duration::from_micros(1500),
            max_conn_lifetime: Duration::from_secs(90),
            ..Config::default()
        };
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["waitTimeout"], json!("250ms"));
        let back: Config = serde_json::from_value(json).unwrap();
        assert_eq!(back, config);
    }
}
