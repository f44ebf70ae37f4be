use anyhow::{bail, Context, Result};
use clap::Parser;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wyvern_indexer::{Api, ChainFixture, Indexer, IndexerConfig};

const MAX_EVENTS_ENV: &str = "WYVERN_MAX_EVENTS";

/// Trimmed, non-empty value of an environment variable.
fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Span exporter for `OTEL_EXPORTER_OTLP_ENDPOINT`, sampled by `OTEL_SAMPLING_RATE`.
fn otlp_tracer(endpoint: String) -> Result<opentelemetry_sdk::trace::SdkTracer> {
    let service_name =
        env_value("OTEL_SERVICE_NAME").unwrap_or_else(|| env!("CARGO_PKG_NAME").to_string());
    let rate = env_value("OTEL_SAMPLING_RATE")
        .and_then(|value| value.parse::<f64>().ok())
        .map_or(1.0, |value| value.clamp(0.0, 1.0));
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_http()
        .with_endpoint(endpoint)
        .build()
        .context("failed to build OTLP exporter")?;
    let provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
        .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(rate))
        .with_resource(
            opentelemetry_sdk::Resource::builder_empty()
                .with_attributes([opentelemetry::KeyValue::new("service.name", service_name)])
                .build(),
        )
        .with_batch_exporter(exporter)
        .build();
    let tracer = provider.tracer(env!("CARGO_PKG_NAME"));
    opentelemetry::global::set_tracer_provider(provider);
    Ok(tracer)
}

fn init_tracing(level: LevelFilter) -> Result<()> {
    let otel = env_value("OTEL_EXPORTER_OTLP_ENDPOINT")
        .map(otlp_tracer)
        .transpose()?
        .map(|tracer| tracing_opentelemetry::layer().with_tracer(tracer));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(level))
        .with(otel)
        .init();
    Ok(())
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database holding projected entities.
    #[arg(long)]
    db: PathBuf,

    /// JSON-lines event log to ingest.
    #[arg(long)]
    events: Option<PathBuf>,

    /// JSON chain fixture (required with --events).
    #[arg(long)]
    chain: Option<PathBuf>,

    /// Host interface to bind (default: localhost).
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Serve the read API once ingestion finishes.
    #[arg(long, default_value_t = false)]
    serve: bool,

    /// Stop ingestion after this many events (must be > 0 when set).
    #[arg(long)]
    max_events: Option<usize>,

    /// Most verbose level written to stdout (off, error, warn, info, debug, trace).
    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn build_config(args: &Args) -> Result<IndexerConfig> {
    build_config_with_env(args, std::env::var(MAX_EVENTS_ENV).ok())
}

fn build_config_with_env(args: &Args, max_events_env: Option<String>) -> Result<IndexerConfig> {
    let max_events = match max_events_env.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(
            raw.parse::<usize>()
                .with_context(|| format!("invalid {MAX_EVENTS_ENV}: {raw}"))?,
        ),
        _ => args.max_events,
    };
    if let Some(0) = max_events {
        bail!("max_events must be > 0 when set");
    }
    if args.events.is_some() && args.chain.is_none() {
        bail!("--chain is required when --events is given");
    }

    Ok(IndexerConfig {
        db_path: args.db.clone(),
        events_path: args.events.clone(),
        chain_path: args.chain.clone(),
        host: args.host,
        port: args.port,
        serve: args.serve,
        max_events,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse args
    let args = Args::parse();

    // Create logger
    init_tracing(args.log_level)?;

    let config = build_config(&args)?;
    info!(db = %config.db_path.display(), "opening entity store");
    let indexer = Arc::new(Indexer::open(config.clone())?);

    if let (Some(events), Some(chain)) = (&config.events_path, &config.chain_path) {
        let fixture = ChainFixture::load(chain)?;
        let ingest = indexer.clone();
        let events = events.clone();
        let stats = tokio::task::spawn_blocking(move || ingest.ingest_file(&events, &fixture))
            .await
            .context("ingestion task failed")??;
        info!(
            applied = stats.applied,
            skipped = stats.skipped,
            already_indexed = stats.already_indexed,
            "ingestion finished"
        );
    }

    if !config.serve {
        return Ok(());
    }

    let app = Api::new(indexer).router();

    // Start server
    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on {}", addr);
    axum::serve(listener, app)
        .await
        .context("axum server error")?;

    Ok(())
}
