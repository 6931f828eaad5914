//! Ingress TLS certificate probe.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use k8s_openapi::api::networking::v1::Ingress;
use std::sync::Arc;
use x509_parser::prelude::*;

use super::{Probe, ProbeContext, ProbeError};
use crate::cluster::{ClusterApi, ClusterError};
use crate::metric::{CertificateStatus, CertificateValue, ConfigFamily, Configuration, MetricValue};

/// Classify an expiry date relative to `now`.
///
/// Returns the status and the whole days left (negative once expired).
pub fn classify_certificate(
    not_after: DateTime<Utc>,
    now: DateTime<Utc>,
    warning_days: i64,
) -> (CertificateStatus, i64) {
    let days = (not_after - now).num_days();
    let status = if now > not_after {
        CertificateStatus::Expired
    } else if days <= warning_days {
        CertificateStatus::ExpiringSoon
    } else {
        CertificateStatus::Valid
    };
    (status, days)
}

fn common_name(name: &X509Name<'_>) -> String {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// Parse a PEM leaf certificate and classify it.
pub fn parse_certificate(
    pem: &[u8],
    now: DateTime<Utc>,
    warning_days: i64,
) -> Result<CertificateValue, String> {
    let (_, pem) = x509_parser::pem::parse_x509_pem(pem)
        .map_err(|e| format!("failed to decode PEM certificate: {}", e))?;
    let cert = pem
        .parse_x509()
        .map_err(|e| format!("failed to parse certificate: {}", e))?;

    let not_after = DateTime::from_timestamp(cert.validity().not_after.timestamp(), 0)
        .ok_or_else(|| "certificate expiry out of range".to_string())?;
    let (status, days) = classify_certificate(not_after, now, warning_days);

    let subject = common_name(cert.subject());
    let mut domains: Vec<String> = cert
        .subject_alternative_name()
        .ok()
        .flatten()
        .map(|san| {
            san.value
                .general_names
                .iter()
                .filter_map(|name| match name {
                    GeneralName::DNSName(dns) => Some(dns.to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();
    if domains.is_empty() && !subject.is_empty() {
        domains.push(subject.clone());
    }

    Ok(CertificateValue {
        certificate_status: status,
        certificate_expiration: Some(not_after),
        certificate_days_to_expire: Some(days),
        certificate_issuer: common_name(cert.issuer()),
        certificate_subject: subject,
        certificate_domains: domains,
        certificate_error: None,
    })
}

/// Hostnames declared on the ingress, TLS hosts first.
pub fn ingress_hosts(ingress: &Ingress) -> Vec<String> {
    let Some(spec) = ingress.spec.as_ref() else {
        return Vec::new();
    };

    let mut hosts: Vec<String> = spec
        .tls
        .iter()
        .flatten()
        .flat_map(|tls| tls.hosts.iter().flatten().cloned())
        .collect();
    for host in spec.rules.iter().flatten().filter_map(|r| r.host.as_ref()) {
        if !host.is_empty() && !hosts.contains(host) {
            hosts.push(host.clone());
        }
    }
    hosts
}

fn unavailable(status: CertificateStatus, message: String) -> MetricValue {
    CertificateValue {
        certificate_status: status,
        certificate_error: Some(message),
        ..Default::default()
    }
    .into()
}

pub struct CertificateProbe {
    cluster: Arc<dyn ClusterApi>,
}

impl CertificateProbe {
    pub fn new(cluster: Arc<dyn ClusterApi>) -> Self {
        Self { cluster }
    }

    async fn call<T>(
        &self,
        ctx: &ProbeContext,
        fut: impl std::future::Future<Output = Result<T, ClusterError>>,
    ) -> Result<Result<T, ClusterError>, ProbeError> {
        tokio::time::timeout(ctx.remaining(), fut)
            .await
            .map_err(|_| ProbeError::Timeout(ctx.timeout))
    }
}

#[async_trait]
impl Probe for CertificateProbe {
    async fn run(
        &self,
        ctx: &ProbeContext,
        config: &Configuration,
    ) -> Result<MetricValue, ProbeError> {
        let Configuration::Certificate(cfg) = config else {
            return Err(ProbeError::wrong_family(ConfigFamily::Certificate, config));
        };
        let namespace = if cfg.ingress_namespace().is_empty() {
            ctx.application.namespace.as_str()
        } else {
            cfg.ingress_namespace()
        };
        let warning_days = cfg
            .warning_days
            .filter(|d| *d > 0)
            .unwrap_or(ctx.settings.certificate_warning_days);

        let ingress = match self
            .call(ctx, self.cluster.get_ingress(namespace, cfg.ingress_name()))
            .await?
        {
            Ok(ingress) => ingress,
            Err(e) => {
                return Ok(unavailable(
                    CertificateStatus::NotFound,
                    format!("ingress not found: {}", e),
                ))
            }
        };

        let secret_name = if cfg.tls_secret_name().is_empty() {
            let first = ingress
                .spec
                .as_ref()
                .and_then(|s| s.tls.as_ref())
                .and_then(|tls| tls.first())
                .and_then(|tls| tls.secret_name.clone());
            match first {
                Some(name) => name,
                None => {
                    return Ok(unavailable(
                        CertificateStatus::NotFound,
                        "no TLS configuration found in ingress".to_string(),
                    ))
                }
            }
        } else {
            cfg.tls_secret_name().to_string()
        };

        let secret = match self
            .call(ctx, self.cluster.get_secret(namespace, &secret_name))
            .await?
        {
            Ok(secret) => secret,
            Err(e) => {
                return Ok(unavailable(
                    CertificateStatus::NotFound,
                    format!("TLS secret not found: {}", e),
                ))
            }
        };

        let Some(cert) = secret.data.as_ref().and_then(|d| d.get("tls.crt")) else {
            return Ok(unavailable(
                CertificateStatus::Error,
                "tls.crt not found in secret".to_string(),
            ));
        };

        let mut value = match parse_certificate(&cert.0, Utc::now(), warning_days) {
            Ok(v) => v,
            Err(e) => return Ok(unavailable(CertificateStatus::Error, e)),
        };
        if value.certificate_domains.is_empty() {
            value.certificate_domains = ingress_hosts(&ingress);
        }

        Ok(value.into())
    }
}
