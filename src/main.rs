//! Endpoint Admin - data layer and edge functions of the endpoint security dashboard
//!
//! Serves the `check-openai-models` edge function and health endpoints, and
//! can verify connectivity of the dashboard data layer against the hosted
//! backend.

use std::env;
use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, Level};

use config::LogFormat;
use endpoint_admin::{api, config, hooks::PoliciesQuery, services::Dashboard, AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    // Check for --help flag
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        print_help();
        return Ok(());
    }

    // Check for --version flag
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        println!("endpoint-admin {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // Load configuration first (before logging, so we know log format)
    let config = AppConfig::load().context("Failed to load configuration")?;

    // The guard must be kept alive for the duration of the program
    // to ensure log messages are flushed to files
    let _log_guard = init_logging(&config);

    info!("Endpoint Admin starting up");

    // Check for --check-backend flag
    if args.iter().any(|arg| arg == "--check-backend") {
        return check_backend(&config).await;
    }

    let state = AppState::new(config.clone()).context("Failed to initialize application state")?;
    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address configuration")?;

    info!("Starting HTTP server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    info!("HTTP server is ready to accept connections");

    axum::serve(listener, app)
        .await
        .context("HTTP server error")?;

    Ok(())
}

/// Connect the dashboard data layer and run one organization-scoped read
async fn check_backend(config: &AppConfig) -> Result<()> {
    let dashboard = Dashboard::connect(config).await?;

    let Some(organization_id) = dashboard.tenant().current() else {
        println!("Connected, but no organization is visible to this session");
        return Ok(());
    };

    let policies = dashboard
        .queries
        .fetch_query(&PoliciesQuery)
        .await
        .context("Failed to list policies")?
        .unwrap_or_default();

    println!(
        "Connected. Organization {} has {} polic{}",
        organization_id,
        policies.len(),
        if policies.len() == 1 { "y" } else { "ies" }
    );
    Ok(())
}

/// Initialize the logging/tracing infrastructure
fn init_logging(config: &AppConfig) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    use config::LogTarget;
    use tracing_subscriber::{prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    let log_config = &config.logging;

    match &log_config.target {
        LogTarget::Console => {
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_console_logging(subscriber, &log_config.format);
            None
        }
        LogTarget::File => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_file_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
        LogTarget::Both => {
            let (writer, guard) = create_file_writer(log_config);
            let subscriber = tracing_subscriber::registry().with(env_filter);
            init_both_logging(subscriber, &log_config.format, writer);
            Some(guard)
        }
    }
}

/// Create a file writer with optional daily rotation
fn create_file_writer(
    log_config: &config::LoggingConfig,
) -> (
    tracing_appender::non_blocking::NonBlocking,
    tracing_appender::non_blocking::WorkerGuard,
) {
    if let Err(e) = std::fs::create_dir_all(&log_config.log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_config.log_dir, e
        );
    }

    let file_appender = if log_config.daily_rotation {
        tracing_appender::rolling::daily(&log_config.log_dir, &log_config.log_prefix)
    } else {
        tracing_appender::rolling::never(&log_config.log_dir, &log_config.log_prefix)
    };

    tracing_appender::non_blocking(file_appender)
}

fn init_console_logging<S>(subscriber: S, format: &LogFormat)
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(fmt::layer().with_target(true).with_thread_ids(false))
                .init();
        }
    }
}

fn init_file_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false).with_writer(writer))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
        }
    }
}

/// Console and file output in the same format
fn init_both_logging<S>(
    subscriber: S,
    format: &LogFormat,
    writer: tracing_appender::non_blocking::NonBlocking,
) where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a> + Send + Sync,
{
    use tracing_subscriber::{fmt, prelude::*};

    match format {
        LogFormat::Json => {
            subscriber
                .with(fmt::layer().json().with_target(true))
                .with(fmt::layer().json().with_target(true).with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            subscriber
                .with(fmt::layer().compact().with_target(false))
                .with(fmt::layer().compact().with_target(false).with_writer(writer))
                .init();
        }
        LogFormat::Pretty => {
            subscriber
                .with(fmt::layer().with_target(true))
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
        }
    }
}

/// Create the application router with all routes and middleware
fn create_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    api::routes().with_state(state).layer(trace_layer)
}

/// Print help message
fn print_help() {
    println!(
        r#"Endpoint Admin {}

USAGE:
    endpoint-admin [OPTIONS]

OPTIONS:
    -h, --help              Print this help message
    -V, --version           Print version information
    --check-backend         Connect to the configured backend, select the
                            initial organization and list its policies,
                            then exit.

ENVIRONMENT:
    ENDPOINT_ADMIN_CONFIG       Path to configuration file (default: config.yaml)
    ENDPOINT_ADMIN_HOST         Listen address
    ENDPOINT_ADMIN_PORT         Listen port
    BACKEND_URL                 Hosted backend project URL
    BACKEND_ANON_KEY            Public API key of the backend
    OPENAI_BASE_URL             Model listing upstream
    DEFAULT_ORGANIZATION_ID     Organization selected at start
    ENDPOINT_ADMIN_LOG_FORMAT   pretty, json or compact

CONFIGURATION:
    The application looks for configuration files in the following order:
    1. Path specified by ENDPOINT_ADMIN_CONFIG environment variable
    2. ./config.yaml or ./config/config.yaml
    3. /etc/endpoint-admin/config.yaml
    4. <user config dir>/endpoint-admin/config.yaml"#,
        env!("CARGO_PKG_VERSION")
    );
}
