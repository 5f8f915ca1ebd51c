//! imagegen-relay entry point.
//!
//! This binary is the composition root. Responsibilities:
//!
//! 1. **Wire observability**: install `tracing-subscriber` with an
//!    `EnvFilter` (`RUST_LOG`, default `info`) and a JSON layer. When
//!    `OTEL_EXPORTER_OTLP_ENDPOINT` is set, spans are also exported over OTLP.
//! 2. **Load configuration**: [`gateway::GatewayConfig::from_env`]. Invalid
//!    configuration stops start-up before the socket is bound.
//! 3. **Serve** until Ctrl-C, then drain in-flight requests and flush spans.

use anyhow::Context;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::TracerProvider;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const SERVICE_NAME: &str = "imagegen-relay";
const OTLP_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let tracer_provider = init_tracing()?;

    let config = gateway::GatewayConfig::from_env().context("invalid configuration")?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_addr = %config.bind_addr,
        volcengine_protocol = ?config.providers.volcengine_protocol,
        poll_interval_ms = config.providers.poll_interval.as_millis() as u64,
        "starting relay"
    );

    gateway::serve(config, shutdown_signal())
        .await
        .context("server error")?;

    info!("relay stopped");
    if let Some(provider) = tracer_provider {
        provider
            .shutdown()
            .context("failed to flush OpenTelemetry spans")?;
    }
    Ok(())
}

/// Installs the global subscriber. Returns the OTLP provider when one was
/// configured so `main` can flush it on exit.
fn init_tracing() -> anyhow::Result<Option<TracerProvider>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let provider = match std::env::var(OTLP_ENDPOINT_VAR) {
        Ok(endpoint) if !endpoint.trim().is_empty() => {
            let exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .build()
                .context("failed to build OTLP span exporter")?;
            Some(
                TracerProvider::builder()
                    .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
                    .build(),
            )
        }
        _ => None,
    };
    let otel_layer = provider
        .as_ref()
        .map(|p| tracing_opentelemetry::layer().with_tracer(p.tracer(SERVICE_NAME)));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .with(otel_layer)
        .try_init()
        .context("failed to install tracing subscriber")?;

    Ok(provider)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
