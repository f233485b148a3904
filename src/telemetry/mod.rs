// SPDX-License-Identifier: MIT

//! OpenTelemetry initialization and structured logging.
//!
//! Sets up three pipelines at startup:
//! - structured JSON logs via `tracing-subscriber`
//! - request/DB spans exported over OTLP (gRPC) to the collector
//! - metrics exported over OTLP, mirrored by the in-process registry
//!   that backs the Prometheus `/metrics` endpoint

pub mod metrics;

pub use metrics::MetricsRegistry;

use anyhow::Context;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use opentelemetry_sdk::Resource;
use opentelemetry_semantic_conventions::attribute::{
    DEPLOYMENT_ENVIRONMENT_NAME, SERVICE_NAMESPACE, SERVICE_VERSION,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;

/// Handle to the installed telemetry providers.
///
/// Kept alive for the process lifetime; `shutdown()` flushes pending
/// spans and metric batches before exit.
pub struct Telemetry {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

impl Telemetry {
    /// Flush and shut down both export pipelines.
    pub fn shutdown(&self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            tracing::warn!(error = %e, "Failed to shut down tracer provider");
        }
        if let Err(e) = self.meter_provider.shutdown() {
            tracing::warn!(error = %e, "Failed to shut down meter provider");
        }
    }
}

/// Initialize OTLP export and structured JSON logging.
///
/// The OTLP exporters connect lazily, so a missing collector does not
/// prevent startup; spans are dropped until it becomes reachable.
pub fn init(config: &Config) -> anyhow::Result<Telemetry> {
    let resource = Resource::builder()
        .with_service_name(config.service_name.clone())
        .with_attributes([
            KeyValue::new(SERVICE_VERSION, config.service_version.clone()),
            KeyValue::new(DEPLOYMENT_ENVIRONMENT_NAME, config.environment.clone()),
            KeyValue::new(SERVICE_NAMESPACE, "web-app"),
        ])
        .build();

    let span_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(config.otel_collector_url.clone())
        .build()
        .context("failed building OTLP span exporter")?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(span_exporter)
        .with_resource(resource.clone())
        .build();

    let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(config.otel_collector_url.clone())
        .build()
        .context("failed building OTLP metric exporter")?;

    let meter_provider = SdkMeterProvider::builder()
        .with_periodic_exporter(metric_exporter)
        .with_resource(resource)
        .build();

    let tracer = tracer_provider.tracer("learntrack");
    global::set_tracer_provider(tracer_provider.clone());
    global::set_meter_provider(meter_provider.clone());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("learntrack=debug".parse().expect("valid directive"))
                .add_directive("info".parse().expect("valid directive")),
        )
        .with(fmt_layer)
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .try_init()
        .context("failed to initialize tracing subscriber")?;

    tracing::info!(
        collector = %config.otel_collector_url,
        service = %config.service_name,
        "OpenTelemetry initialized"
    );

    Ok(Telemetry {
        tracer_provider,
        meter_provider,
    })
}
