//! Backend connection probes: Redis, PostgreSQL, MySQL, MongoDB and Kong.
//!
//! Each probe connects, pings, and then makes a best-effort attempt to read
//! the server version. Transport failures never escape the probe: they are
//! classified as `failed` or `timeout` in the returned record.

use async_trait::async_trait;
use std::future::Future;
use std::time::Instant;

use super::{elapsed_ms, Probe, ProbeContext, ProbeError};
use crate::metric::{
    ConfigFamily, Configuration, ConnectionConfig, ConnectionStatus, ConnectionValue, MetricValue,
};

/// A driver error reduced to what the classifier needs.
#[derive(Debug)]
struct DialError {
    message: String,
    timeout: bool,
}

impl From<redis::RedisError> for DialError {
    fn from(e: redis::RedisError) -> Self {
        Self {
            timeout: e.is_timeout(),
            message: e.to_string(),
        }
    }
}

impl From<sqlx::Error> for DialError {
    fn from(e: sqlx::Error) -> Self {
        let timeout = match &e {
            sqlx::Error::PoolTimedOut => true,
            sqlx::Error::Io(io) => io.kind() == std::io::ErrorKind::TimedOut,
            _ => false,
        };
        Self {
            timeout,
            message: e.to_string(),
        }
    }
}

impl From<mongodb::error::Error> for DialError {
    fn from(e: mongodb::error::Error) -> Self {
        let timeout = matches!(*e.kind, mongodb::error::ErrorKind::ServerSelection { .. });
        Self {
            timeout,
            message: e.to_string(),
        }
    }
}

impl From<reqwest::Error> for DialError {
    fn from(e: reqwest::Error) -> Self {
        Self {
            timeout: e.is_timeout(),
            message: e.to_string(),
        }
    }
}

fn timed_out(start: Instant) -> ConnectionValue {
    ConnectionValue {
        connection_status: ConnectionStatus::Timeout,
        connection_time_ms: elapsed_ms(start),
        connection_error: Some("connection timeout".to_string()),
        ..Default::default()
    }
}

fn failed(start: Instant, message: String) -> ConnectionValue {
    ConnectionValue {
        connection_status: ConnectionStatus::Failed,
        connection_time_ms: elapsed_ms(start),
        connection_error: Some(message),
        ..Default::default()
    }
}

/// Time spent establishing the session and answering the first ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Timings {
    connect_ms: u64,
    ping_ms: u64,
}

/// Connect, then ping, both under the probe deadline.
///
/// The connect time stops before the ping starts. Returns the pinged session
/// or the finished failure record.
async fn dial<T, U, C, P, PF>(
    ctx: &ProbeContext,
    start: Instant,
    connect: C,
    ping: P,
) -> Result<(U, Timings), ConnectionValue>
where
    C: Future<Output = Result<T, DialError>>,
    P: FnOnce(T) -> PF,
    PF: Future<Output = Result<U, DialError>>,
{
    let session = async {
        let conn = connect.await?;
        let connect_ms = elapsed_ms(start);
        let ping_start = Instant::now();
        let session = ping(conn).await?;
        let ping_ms = elapsed_ms(ping_start);
        Ok::<_, DialError>((session, Timings { connect_ms, ping_ms }))
    };

    match tokio::time::timeout(ctx.remaining(), session).await {
        Err(_) => Err(timed_out(start)),
        Ok(Err(e)) if e.timeout => Err(timed_out(start)),
        Ok(Err(e)) => Err(failed(start, e.message)),
        Ok(Ok(session)) => Ok(session),
    }
}

fn connected(timings: Timings) -> ConnectionValue {
    ConnectionValue {
        connection_status: ConnectionStatus::Connected,
        connection_time_ms: timings.connect_ms,
        connection_ping_time_ms: Some(timings.ping_ms),
        ..Default::default()
    }
}

fn connection_config(config: &Configuration) -> Result<&ConnectionConfig, ProbeError> {
    match config {
        Configuration::Connection(c) => Ok(c),
        other => Err(ProbeError::wrong_family(ConfigFamily::Connection, other)),
    }
}

/// Extract `redis_version` from an `INFO server` reply.
pub fn parse_redis_version(info: &str) -> Option<String> {
    info.lines()
        .find_map(|line| line.strip_prefix("redis_version:"))
        .map(|v| v.trim().to_string())
}

pub struct RedisProbe;

#[async_trait]
impl Probe for RedisProbe {
    async fn run(
        &self,
        ctx: &ProbeContext,
        config: &Configuration,
    ) -> Result<MetricValue, ProbeError> {
        let cfg = connection_config(config)?;
        let start = Instant::now();

        let host = cfg.connection_host().to_string();
        let port = cfg.port();
        let addr = if cfg.ssl() {
            redis::ConnectionAddr::TcpTls {
                host,
                port,
                insecure: false,
                tls_params: None,
            }
        } else {
            redis::ConnectionAddr::Tcp(host, port)
        };
        let info = redis::ConnectionInfo {
            addr,
            redis: redis::RedisConnectionInfo {
                db: cfg.connection_db.unwrap_or(0),
                username: Some(cfg.connection_username().to_string()).filter(|u| !u.is_empty()),
                password: Some(cfg.connection_password().to_string()).filter(|p| !p.is_empty()),
                ..Default::default()
            },
        };

        let session = dial(
            ctx,
            start,
            async {
                let client = redis::Client::open(info)?;
                Ok::<_, DialError>(client.get_multiplexed_async_connection().await?)
            },
            |mut conn: redis::aio::MultiplexedConnection| async move {
                let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
                Ok::<_, DialError>((conn, pong))
            },
        )
        .await;

        let ((mut conn, pong), timings) = match session {
            Ok(s) => s,
            Err(value) => return Ok(value.into()),
        };

        let mut value = connected(timings);
        value.connection_info = Some(pong);
        let info = tokio::time::timeout(ctx.remaining(), async {
            let info: redis::RedisResult<String> =
                redis::cmd("INFO").arg("server").query_async(&mut conn).await;
            info
        })
        .await;
        if let Ok(Ok(info)) = info {
            value.connection_version =
                Some(parse_redis_version(&info).unwrap_or_else(|| "unknown".to_string()));
        }

        Ok(value.into())
    }
}

pub struct PostgresProbe;

#[async_trait]
impl Probe for PostgresProbe {
    async fn run(
        &self,
        ctx: &ProbeContext,
        config: &Configuration,
    ) -> Result<MetricValue, ProbeError> {
        use sqlx::postgres::{PgConnectOptions, PgSslMode};
        use sqlx::{Connection, PgConnection};

        let cfg = connection_config(config)?;
        let start = Instant::now();
        let options = PgConnectOptions::new()
            .host(cfg.connection_host())
            .port(cfg.port())
            .username(cfg.connection_username())
            .password(cfg.connection_password())
            .database(cfg.connection_database())
            .ssl_mode(if cfg.ssl() {
                PgSslMode::Require
            } else {
                PgSslMode::Disable
            });

        let session = dial(
            ctx,
            start,
            async { Ok::<_, DialError>(PgConnection::connect_with(&options).await?) },
            |mut conn: PgConnection| async move {
                conn.ping().await?;
                Ok::<_, DialError>(conn)
            },
        )
        .await;
        let (mut conn, timings) = match session {
            Ok(s) => s,
            Err(value) => return Ok(value.into()),
        };

        let mut value = connected(timings);
        let details = tokio::time::timeout(ctx.remaining(), async {
            let version = sqlx::query_scalar::<_, String>("SELECT version()")
                .fetch_one(&mut conn)
                .await
                .ok();
            let size = sqlx::query_scalar::<_, i64>("SELECT pg_database_size($1)")
                .bind(cfg.connection_database())
                .fetch_one(&mut conn)
                .await
                .ok();
            (version, size)
        })
        .await;
        if let Ok((version, size)) = details {
            value.connection_version = version;
            value.connection_info = size.map(|s| format!("Database size: {} bytes", s));
        }
        let _ = tokio::time::timeout(ctx.remaining(), conn.close()).await;

        Ok(value.into())
    }
}

pub struct MySqlProbe;

#[async_trait]
impl Probe for MySqlProbe {
    async fn run(
        &self,
        ctx: &ProbeContext,
        config: &Configuration,
    ) -> Result<MetricValue, ProbeError> {
        use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
        use sqlx::{Connection, MySqlConnection};

        let cfg = connection_config(config)?;
        let start = Instant::now();
        let options = MySqlConnectOptions::new()
            .host(cfg.connection_host())
            .port(cfg.port())
            .username(cfg.connection_username())
            .password(cfg.connection_password())
            .database(cfg.connection_database())
            .ssl_mode(if cfg.ssl() {
                MySqlSslMode::Required
            } else {
                MySqlSslMode::Disabled
            });

        let session = dial(
            ctx,
            start,
            async { Ok::<_, DialError>(MySqlConnection::connect_with(&options).await?) },
            |mut conn: MySqlConnection| async move {
                conn.ping().await?;
                Ok::<_, DialError>(conn)
            },
        )
        .await;
        let (mut conn, timings) = match session {
            Ok(s) => s,
            Err(value) => return Ok(value.into()),
        };

        let mut value = connected(timings);
        let details = tokio::time::timeout(ctx.remaining(), async {
            let version = sqlx::query_scalar::<_, String>("SELECT VERSION()")
                .fetch_one(&mut conn)
                .await
                .ok();
            let size = sqlx::query_scalar::<_, i64>(
                "SELECT CAST(COALESCE(SUM(data_length + index_length), 0) AS SIGNED)
                 FROM information_schema.tables WHERE table_schema = ?",
            )
            .bind(cfg.connection_database())
            .fetch_one(&mut conn)
            .await
            .ok();
            (version, size)
        })
        .await;
        if let Ok((version, size)) = details {
            value.connection_version = version;
            value.connection_info = size.map(|s| format!("Database size: {} bytes", s));
        }
        let _ = tokio::time::timeout(ctx.remaining(), conn.close()).await;

        Ok(value.into())
    }
}

pub struct MongoProbe;

#[async_trait]
impl Probe for MongoProbe {
    async fn run(
        &self,
        ctx: &ProbeContext,
        config: &Configuration,
    ) -> Result<MetricValue, ProbeError> {
        use mongodb::bson::doc;
        use mongodb::options::{ClientOptions, Credential, ServerAddress, Tls, TlsOptions};

        let cfg = connection_config(config)?;
        let start = Instant::now();

        let mut credential = Credential::default();
        credential.username = Some(cfg.connection_username().to_string());
        credential.password = Some(cfg.connection_password().to_string());
        credential.source = Some(if cfg.connection_auth_source().is_empty() {
            "admin".to_string()
        } else {
            cfg.connection_auth_source().to_string()
        });

        let mut options = ClientOptions::default();
        options.hosts = vec![ServerAddress::Tcp {
            host: cfg.connection_host().to_string(),
            port: Some(cfg.port()),
        }];
        options.credential = Some(credential);
        options.connect_timeout = Some(ctx.timeout);
        options.server_selection_timeout = Some(ctx.timeout);
        if cfg.ssl() {
            options.tls = Some(Tls::Enabled(TlsOptions::default()));
        }

        let database = cfg.connection_database().to_string();
        // The driver connects lazily, so server selection happens in the ping.
        let session = dial(
            ctx,
            start,
            async { Ok::<_, DialError>(mongodb::Client::with_options(options)?) },
            |client: mongodb::Client| {
                let database = database.clone();
                async move {
                client.database(&database).run_command(doc! { "ping": 1 }).await?;
                Ok::<_, DialError>(client)
                }
            },
        )
        .await;
        let (client, timings) = match session {
            Ok(s) => s,
            Err(value) => return Ok(value.into()),
        };

        let mut value = connected(timings);
        let status = tokio::time::timeout(
            ctx.remaining(),
            client
                .database(&database)
                .run_command(doc! { "serverStatus": 1 }),
        )
        .await;
        if let Ok(Ok(status)) = status {
            value.connection_version = status.get_str("version").ok().map(str::to_string);
            value.connection_info = status
                .get_str("host")
                .ok()
                .map(|h| format!("Connected to: {}", h));
        }

        Ok(value.into())
    }
}

/// Kong admin API health probe; any 2xx from `/status` counts as connected.
pub struct KongProbe {
    client: reqwest::Client,
}

impl KongProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for KongProbe {
    fn default() -> Self {
        Self::new()
    }
}

/// Base URL of the Kong admin API for a configuration.
pub fn kong_base_url(cfg: &ConnectionConfig) -> String {
    if !cfg.kong_admin_url().is_empty() {
        return cfg.kong_admin_url().trim_end_matches('/').to_string();
    }
    let scheme = if cfg.ssl() { "https" } else { "http" };
    format!("{}://{}:{}", scheme, cfg.connection_host(), cfg.port())
}

#[async_trait]
impl Probe for KongProbe {
    async fn run(
        &self,
        ctx: &ProbeContext,
        config: &Configuration,
    ) -> Result<MetricValue, ProbeError> {
        let cfg = connection_config(config)?;
        let start = Instant::now();

        let mut request = self
            .client
            .get(format!("{}/status", kong_base_url(cfg)))
            .timeout(ctx.remaining());
        if !cfg.connection_username().is_empty() && !cfg.connection_password().is_empty() {
            request = request.basic_auth(cfg.connection_username(), Some(cfg.connection_password()));
        }

        let session = dial(
            ctx,
            start,
            async { Ok::<_, DialError>(request.send().await?) },
            |response: reqwest::Response| async move { Ok::<_, DialError>(response) },
        )
        .await;
        let (response, timings) = match session {
            Ok(s) => s,
            Err(value) => return Ok(value.into()),
        };

        let code = response.status();
        let mut value = connected(timings);
        // One HTTP round trip; there is no separate ping.
        value.connection_ping_time_ms = None;
        if code.is_success() {
            value.connection_info = Some(format!("HTTP Status: {}", code.as_u16()));
            value.connection_version = response
                .headers()
                .get(reqwest::header::SERVER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
        } else {
            value.connection_status = ConnectionStatus::Failed;
            value.connection_error = Some(format!("HTTP Status: {}", code.as_u16()));
        }

        Ok(value.into())
    }
}
