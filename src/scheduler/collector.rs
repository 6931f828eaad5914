//! One collection pass over every configured target.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::alert::{AlertEngine, AlertSubject};
use crate::db::{Catalog, DbError, HistoryStore, Target};
use crate::metric::{Configuration, ConfigurationError, MetricValue, ProbeType};
use crate::probe::{ProbeContext, ProbeError, ProbeRegistry, ProbeSettings};

/// Slack given to a probe past its own deadline before the pass gives up on it.
const PROBE_GRACE: Duration = Duration::from_secs(1);

#[derive(Error, Debug)]
pub enum CollectError {
    #[error("unknown metric type: {0}")]
    UnknownType(String),
    #[error("failed to get application {id}: {source}")]
    Application {
        id: i64,
        #[source]
        source: DbError,
    },
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("no probe registered for {0}")]
    NoProbe(ProbeType),
    #[error(transparent)]
    Probe(#[from] ProbeError),
    #[error("failed to store result: {0}")]
    Store(#[from] DbError),
}

/// Counts for one pass, for logging and tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PassSummary {
    pub targets: usize,
    pub collected: usize,
    pub failed: usize,
}

pub struct Collector {
    catalog: Arc<dyn Catalog>,
    history: Arc<dyn HistoryStore>,
    registry: ProbeRegistry,
    alerts: AlertEngine,
    settings: ProbeSettings,
}

impl Collector {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        history: Arc<dyn HistoryStore>,
        registry: ProbeRegistry,
        alerts: AlertEngine,
        settings: ProbeSettings,
    ) -> Self {
        Self {
            catalog,
            history,
            registry,
            alerts,
            settings,
        }
    }

    /// Probe every target in list order. A failing target never stops the pass.
    pub async fn run_pass(&self) -> PassSummary {
        tracing::info!("Starting metric collection");

        let targets = match self.catalog.list_targets() {
            Ok(t) => t,
            Err(e) => {
                tracing::error!("Failed to list targets: {}", e);
                return PassSummary::default();
            }
        };

        let mut summary = PassSummary {
            targets: targets.len(),
            ..Default::default()
        };
        for target in &targets {
            match self.process(target).await {
                Ok(()) => summary.collected += 1,
                Err(e) => {
                    summary.failed += 1;
                    tracing::error!(
                        target_id = target.id,
                        metric_type = %target.metric_type,
                        "Failed to collect metric: {}",
                        e
                    );
                }
            }
        }

        tracing::info!(
            "Metric collection completed: {} collected, {} failed",
            summary.collected,
            summary.failed
        );
        summary
    }

    async fn process(&self, target: &Target) -> Result<(), CollectError> {
        let probe_type: ProbeType = target
            .metric_type
            .parse()
            .map_err(|_| CollectError::UnknownType(target.metric_type.clone()))?;
        let application = self
            .catalog
            .get_application(target.application_id)
            .map_err(|source| CollectError::Application {
                id: target.application_id,
                source,
            })?;
        let subject = AlertSubject {
            target,
            application: &application,
            probe_type,
        };

        match self.collect(&subject).await {
            Ok(value) => {
                // The gate reads earlier history, so evaluate before appending.
                self.alerts.on_result(&subject, &value).await;
                self.history.append_history(target.id, &value)?;
                tracing::debug!(
                    target_id = target.id,
                    application = %application.name,
                    metric_type = %probe_type,
                    "Metric collected"
                );
                Ok(())
            }
            Err(e) => {
                self.alerts.on_collection_error(&subject, &e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn collect(&self, subject: &AlertSubject<'_>) -> Result<MetricValue, CollectError> {
        let config = Configuration::parse(subject.probe_type, &subject.target.configuration)?;
        let probe = self
            .registry
            .get(subject.probe_type)
            .ok_or(CollectError::NoProbe(subject.probe_type))?;

        let ctx = ProbeContext::new(subject.application.clone(), &config, self.settings.clone());
        match tokio::time::timeout(ctx.timeout + PROBE_GRACE, probe.run(&ctx, &config)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(ProbeError::Timeout(ctx.timeout).into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::fake::RecordingNotifier;
    use crate::alert::AlertSettings;
    use crate::cluster::fake::FakeCluster;
    use crate::db::{Application, Project, Store};
    use crate::probe::kafka::RdKafkaFactory;
    use crate::probe::Probe;
    use async_trait::async_trait;
    use axum::{http::StatusCode, routing::get, Router};
    use chrono::Utc;
    use tempfile::NamedTempFile;

    /// Catalog that can hold targets the store would reject.
    struct StaticCatalog {
        targets: Vec<Target>,
        application: Application,
    }

    impl Catalog for StaticCatalog {
        fn list_targets(&self) -> Result<Vec<Target>, DbError> {
            Ok(self.targets.clone())
        }

        fn get_application(&self, id: i64) -> Result<Application, DbError> {
            if id == self.application.id {
                Ok(self.application.clone())
            } else {
                Err(DbError::NotFound)
            }
        }

        fn get_project(&self, _id: i64) -> Result<Project, DbError> {
            Err(DbError::NotFound)
        }
    }

    struct BrokenProbe;

    #[async_trait]
    impl Probe for BrokenProbe {
        async fn run(&self, _: &ProbeContext, _: &Configuration) -> Result<MetricValue, ProbeError> {
            Err(ProbeError::Failed("cluster unreachable".into()))
        }
    }

    fn engine(store: &Store, notifier: Arc<RecordingNotifier>) -> AlertEngine {
        let shared = Arc::new(store.clone());
        AlertEngine::new(
            AlertSettings {
                enabled: true,
                dedup_window: chrono::Duration::minutes(10),
                failure_threshold: 3,
            },
            shared.clone(),
            shared.clone(),
            shared,
            notifier,
        )
    }

    fn standard_registry() -> ProbeRegistry {
        ProbeRegistry::standard(Arc::new(FakeCluster::default()), Arc::new(RdKafkaFactory))
    }

    fn target(id: i64, application_id: i64, metric_type: &str, configuration: &str) -> Target {
        Target {
            id,
            application_id,
            metric_type: metric_type.to_string(),
            configuration: configuration.to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    async fn serve_unavailable() -> String {
        let app = Router::new().route("/healthz", get(|| async { StatusCode::SERVICE_UNAVAILABLE }));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}/healthz", addr)
    }

    #[tokio::test]
    async fn test_three_failing_ticks_send_one_alert() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let project = store.add_project("Shop").unwrap();
        let app = store
            .add_application(Some(project.id), "storefront", "web")
            .unwrap();
        let url = serve_unavailable().await;
        let target = store
            .add_target(
                app.id,
                ProbeType::HealthCheck,
                &format!(r#"{{"health_check_url":"{}","expected_status":200}}"#, url),
            )
            .unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let shared = Arc::new(store.clone());
        let collector = Collector::new(
            shared.clone(),
            shared,
            standard_registry(),
            engine(&store, notifier.clone()),
            ProbeSettings::default(),
        );

        for tick in 1..=3 {
            let summary = collector.run_pass().await;
            assert_eq!(summary.collected, 1);
            let expected = if tick < 3 { 0 } else { 1 };
            assert_eq!(notifier.count(), expected, "after tick {}", tick);
        }

        // Further failures stay inside the dedup window.
        collector.run_pass().await;
        assert_eq!(notifier.count(), 1);

        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent[0].project, "Shop");
        assert_eq!(sent[0].metric, "HealthCheck");
        assert!(sent[0].reason.starts_with("status 503"));
        assert_eq!(store.list_recent_history(target.id, 10).unwrap().len(), 4);
        assert_eq!(store.alert_records(target.id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_bad_targets_do_not_stop_the_pass() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let application = Application {
            id: 7,
            project_id: None,
            name: "worker".into(),
            namespace: "jobs".into(),
        };
        let catalog = StaticCatalog {
            targets: vec![
                target(1, 7, "DiskLatency", "{}"),
                target(2, 99, "HealthCheck", r#"{"health_check_url":"http://x"}"#),
                target(3, 7, "RedisConnection", r#"{"connection_port":"notanumber"}"#),
                target(4, 7, "HealthCheck", r#"{"health_check_url":"http://127.0.0.1:1/"}"#),
            ],
            application,
        };

        let notifier = Arc::new(RecordingNotifier::default());
        let mut registry = standard_registry();
        registry.register(ProbeType::HealthCheck, BrokenProbe);
        let collector = Collector::new(
            Arc::new(catalog),
            Arc::new(store.clone()),
            registry,
            engine(&store, notifier.clone()),
            ProbeSettings::default(),
        );

        let summary = collector.run_pass().await;
        assert_eq!(
            summary,
            PassSummary {
                targets: 4,
                collected: 0,
                failed: 4
            }
        );

        // Invalid Redis config and the broken health probe both raise
        // collection-error alerts; the unknown type and missing app do not.
        let sent = notifier.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|a| a.title == "Metric collection error"));
        assert_eq!(sent[0].project, "N/A");
        assert!(sent[0].reason.contains("connection_port"));
        assert_eq!(sent[1].reason, "cluster unreachable");
        assert!(store.list_recent_history(4, 10).unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_connection_failure_is_stored_as_result() {
        let tmp = NamedTempFile::new().unwrap();
        let store = Store::new(tmp.path()).unwrap();
        let app = store.add_application(None, "cache", "infra").unwrap();
        let target = store
            .add_target(
                app.id,
                ProbeType::RedisConnection,
                r#"{"connection_host":"127.0.0.1","connection_port":1,"connection_timeout":1}"#,
            )
            .unwrap();

        let notifier = Arc::new(RecordingNotifier::default());
        let shared = Arc::new(store.clone());
        let collector = Collector::new(
            shared.clone(),
            shared,
            standard_registry(),
            engine(&store, notifier.clone()),
            ProbeSettings::default(),
        );

        assert_eq!(collector.run_pass().await.collected, 1);
        // Connection probes alert on the first failure.
        assert_eq!(notifier.count(), 1);
        assert_eq!(notifier.sent.lock().unwrap()[0].title, "Metric failure detected");
        let history = store.list_recent_history(target.id, 1).unwrap();
        assert!(history[0].value.contains(r#""connection_status":"failed""#));
    }
}
