//! HTTP health probe implementation.

use async_trait::async_trait;
use reqwest::Method;
use std::time::Instant;

use super::{elapsed_ms, Probe, ProbeContext, ProbeError};
use crate::metric::{ConfigFamily, Configuration, HealthCheckValue, HealthStatus, MetricValue};

/// Single-request reachability check. Transport failures are recorded in
/// the result rather than returned as errors.
pub struct HealthCheckProbe {
    client: reqwest::Client,
}

impl HealthCheckProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HealthCheckProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Probe for HealthCheckProbe {
    async fn run(
        &self,
        ctx: &ProbeContext,
        config: &Configuration,
    ) -> Result<MetricValue, ProbeError> {
        let Configuration::HealthCheck(cfg) = config else {
            return Err(ProbeError::wrong_family(ConfigFamily::HealthCheck, config));
        };

        let method = if cfg.method().is_empty() {
            Method::GET
        } else {
            Method::from_bytes(cfg.method().to_ascii_uppercase().as_bytes()).map_err(|_| {
                ProbeError::Config(crate::metric::ConfigurationError::InvalidField {
                    field: "method",
                    reason: format!("invalid HTTP method: {}", cfg.method()),
                })
            })?
        };
        let expected = cfg.expected_status.filter(|s| *s > 0).unwrap_or(200);

        let mut value = HealthCheckValue::default();
        let start = Instant::now();
        let response = self
            .client
            .request(method, cfg.health_check_url())
            .timeout(ctx.remaining())
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                value.response_time_ms = elapsed_ms(start);
                value.error_message = Some(if e.is_timeout() {
                    format!("request timed out after {}s", ctx.timeout.as_secs())
                } else {
                    format!("request failed: {}", e)
                });
                return Ok(value.into());
            }
        };

        let code = response.status().as_u16();
        // Drain the body so the timing covers the full transfer.
        let _ = response.bytes().await;
        value.response_time_ms = elapsed_ms(start);
        value.status_code = Some(code);

        if i64::from(code) == expected {
            value.status = HealthStatus::Up;
        } else {
            value.error_message = Some(format!(
                "unexpected status code: got {}, expected {}",
                code, expected
            ));
        }

        Ok(value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::ProbeType;
    use crate::probe::tests::app;
    use crate::probe::ProbeSettings;
    use axum::{http::StatusCode, routing::get, Router};
    use std::time::Duration;

    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn check(raw: &str) -> HealthCheckValue {
        let config = Configuration::parse(ProbeType::HealthCheck, raw).unwrap();
        let ctx = ProbeContext::new(app(), &config, ProbeSettings::default());
        match HealthCheckProbe::new().run(&ctx, &config).await.unwrap() {
            MetricValue::HealthCheck(v) => v,
            other => panic!("unexpected value: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_health_check_up() {
        let base = serve(Router::new().route("/healthz", get(|| async { "ok" }))).await;
        let v = check(&format!(r#"{{"health_check_url":"{}/healthz"}}"#, base)).await;
        assert_eq!(v.status, HealthStatus::Up);
        assert_eq!(v.status_code, Some(200));
        assert!(v.error_message.is_none());
    }

    #[tokio::test]
    async fn test_health_check_unexpected_status() {
        let base = serve(Router::new().route(
            "/healthz",
            get(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        ))
        .await;
        let v = check(&format!(r#"{{"health_check_url":"{}/healthz"}}"#, base)).await;
        assert_eq!(v.status, HealthStatus::Down);
        assert_eq!(v.status_code, Some(503));
        assert_eq!(
            v.error_message.as_deref(),
            Some("unexpected status code: got 503, expected 200")
        );
    }

    #[tokio::test]
    async fn test_health_check_custom_expected_status() {
        let base = serve(Router::new().route("/", get(|| async { StatusCode::NO_CONTENT }))).await;
        let v = check(&format!(
            r#"{{"health_check_url":"{}/","expected_status":"204","method":"get"}}"#,
            base
        ))
        .await;
        assert_eq!(v.status, HealthStatus::Up);
    }

    #[tokio::test]
    async fn test_health_check_timeout_is_recorded() {
        let base = serve(Router::new().route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "late"
            }),
        ))
        .await;
        let v = check(&format!(
            r#"{{"health_check_url":"{}/slow","timeout_seconds":1}}"#,
            base
        ))
        .await;
        assert_eq!(v.status, HealthStatus::Down);
        assert_eq!(v.status_code, None);
        assert!(v.error_message.unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn test_health_check_connection_refused() {
        let v = check(r#"{"health_check_url":"http://127.0.0.1:1/","timeout_seconds":1}"#).await;
        assert_eq!(v.status, HealthStatus::Down);
        assert!(v.error_message.unwrap().starts_with("request failed"));
    }
}
