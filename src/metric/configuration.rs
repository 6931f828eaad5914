//! Typed views over a target's raw JSON configuration.
//!
//! Decoding happens in two phases. [`Configuration::decode`] turns the stored
//! JSON object into the field family of the declared probe type, accepting
//! integers and booleans either natively or as strings. [`Configuration::validate`]
//! then checks the fields that probe type cannot run without. Both phases run
//! before any network I/O.

use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

use super::ProbeType;

/// Configuration decode or validation failure.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[error("configuration is not valid JSON: {0}")]
    Json(String),
    #[error("configuration must be a JSON object")]
    NotAnObject,
    #[error("invalid {field}: {reason}")]
    InvalidField { field: &'static str, reason: String },
    #[error("{field} is required for {probe_type}")]
    Missing {
        field: &'static str,
        probe_type: ProbeType,
    },
    #[error("{field} must be a positive integer for {probe_type}")]
    NotPositive {
        field: &'static str,
        probe_type: ProbeType,
    },
    #[error("{0}")]
    Invalid(String),
}

/// Groups of probe types that read the same configuration fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFamily {
    HealthCheck,
    Pod,
    Pvc,
    Connection,
    Certificate,
    Kafka,
}

/// A decoded configuration, one variant per field family.
///
/// Serializes back to the same flat JSON object it was decoded from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Configuration {
    HealthCheck(HealthCheckConfig),
    Pod(PodConfig),
    Pvc(PvcConfig),
    Connection(ConnectionConfig),
    Certificate(CertificateConfig),
    Kafka(KafkaConfig),
}

/// Text fields are `None` when the payload omits them, so an explicit empty
/// string survives a decode and re-encode. The same-named accessors read them
/// as `&str`, empty when absent.
macro_rules! text_fields {
    ($ty:ty { $($field:ident),+ $(,)? }) => {
        impl $ty {
            $(
                pub fn $field(&self) -> &str {
                    self.$field.as_deref().unwrap_or_default()
                }
            )+
        }
    };
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HealthCheckConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_status: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PodConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_label_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PvcConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pod_label_selector: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pvc_name: Option<String>,
    /// Mount path inside the pod; discovered from the pod spec when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pvc_mount_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
}

/// Shared by the Redis, PostgreSQL, MySQL, MongoDB and Kong probes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectionConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_port: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_database: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_ssl: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_timeout: Option<i64>,
    /// MongoDB auth database (default: admin)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_auth_source: Option<String>,
    /// Redis logical database (default: 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_db: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kong_admin_url: Option<String>,
}

impl ConnectionConfig {
    pub fn port(&self) -> u16 {
        self.connection_port
            .and_then(|p| u16::try_from(p).ok())
            .unwrap_or(0)
    }

    pub fn ssl(&self) -> bool {
        self.connection_ssl.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CertificateConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_name: Option<String>,
    /// Overrides the application namespace when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ingress_namespace: Option<String>,
    /// Defaults to the secret referenced by the ingress's first TLS entry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tls_secret_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KafkaConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_bootstrap_servers: Option<String>,
    /// Every group known to the cluster when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_consumer_group: Option<String>,
    /// Every topic visible on the cluster when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_topic: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_security_protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_sasl_mechanism: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_sasl_username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_sasl_password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kafka_lag_threshold: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<i64>,
}

text_fields!(HealthCheckConfig { health_check_url, method });
text_fields!(PodConfig { pod_label_selector, container_name });
text_fields!(PvcConfig { pod_label_selector, container_name, pvc_name, pvc_mount_path });
text_fields!(ConnectionConfig {
    connection_host,
    connection_username,
    connection_password,
    connection_database,
    connection_auth_source,
    kong_admin_url,
});
text_fields!(CertificateConfig { ingress_name, ingress_namespace, tls_secret_name });
text_fields!(KafkaConfig {
    kafka_bootstrap_servers,
    kafka_consumer_group,
    kafka_topic,
    kafka_security_protocol,
    kafka_sasl_mechanism,
    kafka_sasl_username,
    kafka_sasl_password,
});

/// SASL mechanisms the lag probe can authenticate with.
pub const SASL_MECHANISMS: [&str; 3] = ["PLAIN", "SCRAM-SHA-256", "SCRAM-SHA-512"];

impl KafkaConfig {
    /// Whether SASL authentication should be configured.
    pub fn uses_sasl(&self) -> bool {
        !self.kafka_sasl_mechanism().is_empty()
            || self.kafka_security_protocol().to_ascii_uppercase().starts_with("SASL")
    }
}

impl Configuration {
    /// Decode a raw JSON payload into the field family of `probe_type`.
    ///
    /// An empty payload or `null` decodes to the family's defaults.
    pub fn decode(probe_type: ProbeType, raw: &str) -> Result<Self, ConfigurationError> {
        let value: Value = if raw.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(raw).map_err(|e| ConfigurationError::Json(e.to_string()))?
        };
        Self::decode_value(probe_type, &value)
    }

    /// Decode an already-parsed JSON value.
    pub fn decode_value(probe_type: ProbeType, value: &Value) -> Result<Self, ConfigurationError> {
        let empty = Map::new();
        let fields = Fields(match value {
            Value::Object(map) => map,
            Value::Null => &empty,
            _ => return Err(ConfigurationError::NotAnObject),
        });

        let config = match probe_type.family() {
            ConfigFamily::HealthCheck => Configuration::HealthCheck(HealthCheckConfig {
                health_check_url: fields.string("health_check_url")?,
                method: fields.string("method")?,
                expected_status: fields.int("expected_status")?,
                timeout_seconds: fields.int("timeout_seconds")?,
            }),
            ConfigFamily::Pod => Configuration::Pod(PodConfig {
                pod_label_selector: fields.string("pod_label_selector")?,
                container_name: fields.string("container_name")?,
                timeout_seconds: fields.int("timeout_seconds")?,
            }),
            ConfigFamily::Pvc => Configuration::Pvc(PvcConfig {
                pod_label_selector: fields.string("pod_label_selector")?,
                container_name: fields.string("container_name")?,
                pvc_name: fields.string("pvc_name")?,
                pvc_mount_path: fields.string("pvc_mount_path")?,
                timeout_seconds: fields.int("timeout_seconds")?,
            }),
            ConfigFamily::Connection => Configuration::Connection(ConnectionConfig {
                connection_host: fields.string("connection_host")?,
                connection_port: fields.int("connection_port")?,
                connection_username: fields.string("connection_username")?,
                connection_password: fields.string("connection_password")?,
                connection_database: fields.string("connection_database")?,
                connection_ssl: fields.boolean("connection_ssl")?,
                connection_timeout: fields.int("connection_timeout")?,
                connection_auth_source: fields.string("connection_auth_source")?,
                connection_db: fields.int("connection_db")?,
                kong_admin_url: fields.string("kong_admin_url")?,
            }),
            ConfigFamily::Certificate => Configuration::Certificate(CertificateConfig {
                ingress_name: fields.string("ingress_name")?,
                ingress_namespace: fields.string("ingress_namespace")?,
                tls_secret_name: fields.string("tls_secret_name")?,
                warning_days: fields.int("warning_days")?,
                timeout_seconds: fields.int("timeout_seconds")?,
            }),
            ConfigFamily::Kafka => Configuration::Kafka(KafkaConfig {
                kafka_bootstrap_servers: fields.string("kafka_bootstrap_servers")?,
                kafka_consumer_group: fields.string("kafka_consumer_group")?,
                kafka_topic: fields.string("kafka_topic")?,
                kafka_security_protocol: fields.string("kafka_security_protocol")?,
                kafka_sasl_mechanism: fields.string("kafka_sasl_mechanism")?,
                kafka_sasl_username: fields.string("kafka_sasl_username")?,
                kafka_sasl_password: fields.string("kafka_sasl_password")?,
                kafka_lag_threshold: fields.int("kafka_lag_threshold")?,
                timeout_seconds: fields.int("timeout_seconds")?,
            }),
        };

        Ok(config)
    }

    /// Decode and validate in one step.
    pub fn parse(probe_type: ProbeType, raw: &str) -> Result<Self, ConfigurationError> {
        let config = Self::decode(probe_type, raw)?;
        config.validate(probe_type)?;
        Ok(config)
    }

    /// Check that the fields `probe_type` needs are present and sane.
    pub fn validate(&self, probe_type: ProbeType) -> Result<(), ConfigurationError> {
        use ConfigurationError::{Missing, NotPositive};

        let require = |value: &str, field: &'static str| {
            if value.trim().is_empty() {
                Err(Missing { field, probe_type })
            } else {
                Ok(())
            }
        };
        let positive = |value: Option<i64>, field: &'static str| match value {
            Some(v) if v > 0 => Ok(()),
            _ => Err(NotPositive { field, probe_type }),
        };

        match (probe_type, self) {
            (ProbeType::HealthCheck, Configuration::HealthCheck(c)) => {
                require(c.health_check_url(), "health_check_url")
            }
            (_, Configuration::Pod(c)) => require(c.pod_label_selector(), "pod_label_selector"),
            (_, Configuration::Pvc(c)) => {
                require(c.pvc_name(), "pvc_name")?;
                require(c.pod_label_selector(), "pod_label_selector")
            }
            (ProbeType::PostgreSQLConnection | ProbeType::MySQLConnection, Configuration::Connection(c)) => {
                require(c.connection_host(), "connection_host")?;
                positive(c.connection_port, "connection_port")?;
                require(c.connection_username(), "connection_username")?;
                require(c.connection_database(), "connection_database")?;
                positive(c.connection_timeout, "connection_timeout")
            }
            (ProbeType::MongoDBConnection, Configuration::Connection(c)) => {
                require(c.connection_host(), "connection_host")?;
                positive(c.connection_port, "connection_port")?;
                require(c.connection_username(), "connection_username")?;
                require(c.connection_password(), "connection_password")?;
                require(c.connection_database(), "connection_database")?;
                positive(c.connection_timeout, "connection_timeout")
            }
            (ProbeType::RedisConnection, Configuration::Connection(c)) => {
                require(c.connection_host(), "connection_host")?;
                positive(c.connection_port, "connection_port")?;
                positive(c.connection_timeout, "connection_timeout")
            }
            (ProbeType::KongConnection, Configuration::Connection(c)) => {
                if c.kong_admin_url().trim().is_empty()
                    && (c.connection_host().trim().is_empty() || c.connection_port.unwrap_or(0) <= 0)
                {
                    return Err(ConfigurationError::Invalid(format!(
                        "kong_admin_url or connection_host+connection_port are required for {}",
                        probe_type
                    )));
                }
                positive(c.connection_timeout, "connection_timeout")
            }
            (_, Configuration::Certificate(c)) => {
                require(c.ingress_name(), "ingress_name")?;
                if let Some(days) = c.warning_days {
                    if days < 0 {
                        return Err(NotPositive { field: "warning_days", probe_type });
                    }
                }
                Ok(())
            }
            (_, Configuration::Kafka(c)) => {
                require(c.kafka_bootstrap_servers(), "kafka_bootstrap_servers")?;
                if c.uses_sasl() && !SASL_MECHANISMS.contains(&c.kafka_sasl_mechanism()) {
                    return Err(ConfigurationError::InvalidField {
                        field: "kafka_sasl_mechanism",
                        reason: format!(
                            "unsupported SASL mechanism {:?} (expected one of {})",
                            c.kafka_sasl_mechanism(),
                            SASL_MECHANISMS.join(", ")
                        ),
                    });
                }
                if let Some(threshold) = c.kafka_lag_threshold {
                    if threshold < 0 {
                        return Err(NotPositive { field: "kafka_lag_threshold", probe_type });
                    }
                }
                Ok(())
            }
            (_, other) => Err(ConfigurationError::Invalid(format!(
                "{:?} configuration does not apply to {}",
                other.family(),
                probe_type
            ))),
        }
    }

    pub fn family(&self) -> ConfigFamily {
        match self {
            Configuration::HealthCheck(_) => ConfigFamily::HealthCheck,
            Configuration::Pod(_) => ConfigFamily::Pod,
            Configuration::Pvc(_) => ConfigFamily::Pvc,
            Configuration::Connection(_) => ConfigFamily::Connection,
            Configuration::Certificate(_) => ConfigFamily::Certificate,
            Configuration::Kafka(_) => ConfigFamily::Kafka,
        }
    }

    /// The timeout declared by the payload itself, if any.
    pub fn timeout(&self) -> Option<Duration> {
        let secs = match self {
            Configuration::HealthCheck(c) => c.timeout_seconds,
            Configuration::Pod(c) => c.timeout_seconds,
            Configuration::Pvc(c) => c.timeout_seconds,
            Configuration::Connection(c) => c.connection_timeout,
            Configuration::Certificate(c) => c.timeout_seconds,
            Configuration::Kafka(c) => c.timeout_seconds,
        };
        secs.filter(|s| *s > 0).map(|s| Duration::from_secs(s as u64))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }
}

/// Field accessors over the raw JSON object.
struct Fields<'a>(&'a Map<String, Value>);

impl Fields<'_> {
    fn present(&self, field: &str) -> Option<&Value> {
        self.0.get(field).filter(|v| !v.is_null())
    }

    fn string(&self, field: &'static str) -> Result<Option<String>, ConfigurationError> {
        match self.present(field) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.clone())),
            Some(other) => Err(ConfigurationError::InvalidField {
                field,
                reason: format!("expected a string, got {}", json_kind(other)),
            }),
        }
    }

    fn int(&self, field: &'static str) -> Result<Option<i64>, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidField { field, reason };
        match self.present(field) {
            None => Ok(None),
            Some(Value::Number(n)) => n
                .as_i64()
                .map(Some)
                .ok_or_else(|| invalid(format!("invalid integer value: {}", n))),
            Some(Value::String(s)) => s
                .parse::<i64>()
                .map(Some)
                .map_err(|_| invalid(format!("invalid numeric string: {}", s))),
            Some(other) => Err(invalid(format!(
                "invalid integer value: got {}",
                json_kind(other)
            ))),
        }
    }

    fn boolean(&self, field: &'static str) -> Result<Option<bool>, ConfigurationError> {
        let invalid = |reason: String| ConfigurationError::InvalidField { field, reason };
        match self.present(field) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(Value::String(s)) => parse_bool(s)
                .map(Some)
                .ok_or_else(|| invalid(format!("invalid boolean string: {}", s))),
            Some(other) => Err(invalid(format!(
                "invalid boolean value: got {}",
                json_kind(other)
            ))),
        }
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn connection(raw: &str) -> ConnectionConfig {
        match Configuration::decode(ProbeType::PostgreSQLConnection, raw).unwrap() {
            Configuration::Connection(c) => c,
            other => panic!("unexpected family: {:?}", other),
        }
    }

    #[test]
    fn test_port_accepts_numeric_string() {
        let c = connection(r#"{"connection_port": "5432"}"#);
        assert_eq!(c.connection_port, Some(5432));
        let c = connection(r#"{"connection_port": 5432}"#);
        assert_eq!(c.connection_port, Some(5432));
    }

    #[test]
    fn test_bad_numeric_string_names_field() {
        let err = Configuration::decode(
            ProbeType::PostgreSQLConnection,
            r#"{"connection_port": "notanumber"}"#,
        )
        .unwrap_err();
        assert_eq!(
            err,
            ConfigurationError::InvalidField {
                field: "connection_port",
                reason: "invalid numeric string: notanumber".to_string(),
            }
        );
        assert!(err.to_string().contains("connection_port"));
    }

    #[test]
    fn test_tolerant_booleans() {
        assert_eq!(connection(r#"{"connection_ssl": "true"}"#).connection_ssl, Some(true));
        assert_eq!(connection(r#"{"connection_ssl": false}"#).connection_ssl, Some(false));

        let err = Configuration::decode(ProbeType::RedisConnection, r#"{"connection_ssl": 3}"#)
            .unwrap_err();
        assert!(err.to_string().starts_with("invalid connection_ssl"));
    }

    #[test]
    fn test_rejects_non_object_and_wrong_shapes() {
        assert_eq!(
            Configuration::decode(ProbeType::PodStatus, "[1,2]").unwrap_err(),
            ConfigurationError::NotAnObject
        );
        let err = Configuration::decode(ProbeType::HealthCheck, r#"{"expected_status": [200]}"#)
            .unwrap_err();
        assert!(err.to_string().contains("expected_status"));
        let err = Configuration::decode(ProbeType::PodStatus, r#"{"pod_label_selector": 7}"#)
            .unwrap_err();
        assert!(err.to_string().contains("pod_label_selector"));
    }

    #[test]
    fn test_null_fields_take_defaults() {
        let c = connection(r#"{"connection_port": null, "connection_host": null}"#);
        assert_eq!(c.connection_port, None);
        assert_eq!(c.connection_host, None);
        assert!(c.connection_host().is_empty());
    }

    #[test]
    fn test_reencode_preserves_present_fields() {
        let raw = json!({
            "connection_host": "db.internal",
            "connection_port": 5432,
            "connection_username": "monitor",
            "connection_database": "app",
            "connection_ssl": true,
            "connection_timeout": 5
        });
        let config = Configuration::decode_value(ProbeType::PostgreSQLConnection, &raw).unwrap();
        let encoded = serde_json::to_value(&config).unwrap();
        assert_eq!(encoded, raw);
    }

    #[test]
    fn test_reencode_keeps_explicit_empty_strings() {
        let raw = r#"{"pod_label_selector":"app=x","container_name":""}"#;
        let config = Configuration::decode(ProbeType::PodStatus, raw).unwrap();
        match &config {
            Configuration::Pod(c) => {
                assert_eq!(c.container_name, Some(String::new()));
                assert_eq!(c.container_name(), "");
            }
            other => panic!("unexpected family: {:?}", other),
        }
        assert_eq!(config.to_json(), raw);

        // Absent fields stay absent.
        let config = Configuration::decode(ProbeType::PodStatus, r#"{"pod_label_selector":"app=x"}"#)
            .unwrap();
        assert_eq!(config.to_json(), r#"{"pod_label_selector":"app=x"}"#);
    }

    #[test]
    fn test_relational_validation() {
        let base = json!({
            "connection_host": "db",
            "connection_port": 5432,
            "connection_username": "u",
            "connection_database": "d",
            "connection_timeout": 5
        });
        let ok = Configuration::decode_value(ProbeType::MySQLConnection, &base).unwrap();
        assert!(ok.validate(ProbeType::MySQLConnection).is_ok());

        let mut zero_port = base.clone();
        zero_port["connection_port"] = json!(0);
        let err = Configuration::decode_value(ProbeType::PostgreSQLConnection, &zero_port)
            .unwrap()
            .validate(ProbeType::PostgreSQLConnection)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "connection_port must be a positive integer for PostgreSQLConnection"
        );

        let mut no_timeout = base.clone();
        no_timeout.as_object_mut().unwrap().remove("connection_timeout");
        let err = Configuration::decode_value(ProbeType::PostgreSQLConnection, &no_timeout)
            .unwrap()
            .validate(ProbeType::PostgreSQLConnection)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::NotPositive { field: "connection_timeout", .. }));
    }

    #[test]
    fn test_mongodb_requires_password() {
        let raw = json!({
            "connection_host": "mongo",
            "connection_port": "27017",
            "connection_username": "u",
            "connection_database": "d",
            "connection_timeout": "5"
        });
        let err = Configuration::decode_value(ProbeType::MongoDBConnection, &raw)
            .unwrap()
            .validate(ProbeType::MongoDBConnection)
            .unwrap_err();
        assert_eq!(err.to_string(), "connection_password is required for MongoDBConnection");
    }

    #[test]
    fn test_kong_accepts_admin_url_or_host_port() {
        let with_url = Configuration::parse(
            ProbeType::KongConnection,
            r#"{"kong_admin_url": "http://kong:8001", "connection_timeout": 3}"#,
        );
        assert!(with_url.is_ok());

        let with_host = Configuration::parse(
            ProbeType::KongConnection,
            r#"{"connection_host": "kong", "connection_port": 8001, "connection_timeout": 3}"#,
        );
        assert!(with_host.is_ok());

        let neither = Configuration::parse(ProbeType::KongConnection, r#"{"connection_timeout": 3}"#);
        assert!(neither.is_err());
    }

    #[test]
    fn test_kafka_validation() {
        let err = Configuration::parse(ProbeType::KafkaConsumerLag, r#"{"kafka_topic": "orders"}"#)
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "kafka_bootstrap_servers is required for KafkaConsumerLag"
        );

        let err = Configuration::parse(
            ProbeType::KafkaConsumerLag,
            r#"{"kafka_bootstrap_servers": "kafka:9092", "kafka_security_protocol": "SASL_SSL", "kafka_sasl_mechanism": "GSSAPI"}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("kafka_sasl_mechanism"));

        let ok = Configuration::parse(
            ProbeType::KafkaConsumerLag,
            r#"{"kafka_bootstrap_servers": "kafka:9092", "kafka_sasl_mechanism": "SCRAM-SHA-512", "kafka_lag_threshold": "250"}"#,
        )
        .unwrap();
        match ok {
            Configuration::Kafka(k) => assert_eq!(k.kafka_lag_threshold, Some(250)),
            other => panic!("unexpected family: {:?}", other),
        }
    }

    #[test]
    fn test_timeout_from_payload() {
        let config = Configuration::decode(ProbeType::HealthCheck, r#"{"timeout_seconds": "7"}"#)
            .unwrap();
        assert_eq!(config.timeout(), Some(Duration::from_secs(7)));
        let config = Configuration::decode(ProbeType::HealthCheck, "{}").unwrap();
        assert_eq!(config.timeout(), None);
    }

    #[test]
    fn test_pod_probes_need_selector() {
        let err = Configuration::parse(ProbeType::PodCpuUsage, "{}").unwrap_err();
        assert_eq!(err.to_string(), "pod_label_selector is required for PodCpuUsage");
        assert!(Configuration::parse(ProbeType::PvcUsage, r#"{"pod_label_selector": "app=db"}"#).is_err());
    }
}
