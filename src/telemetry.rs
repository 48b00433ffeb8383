use std::env;
use std::sync::OnceLock;

use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{MetricExporter, SpanExporter};
use opentelemetry_sdk::{Resource, metrics::SdkMeterProvider, trace::SdkTracerProvider};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_opentelemetry::{MetricsLayer, OpenTelemetryLayer};
use tracing_subscriber::Layer;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

/// Directory under the working directory that receives the run log
pub const LOG_DIR: &str = ".arkereso";

const OTLP_ENDPOINT_VAR: &str = "OTEL_EXPORTER_OTLP_ENDPOINT";

fn get_resource() -> Resource {
    static RESOURCE: OnceLock<Resource> = OnceLock::new();
    RESOURCE
        .get_or_init(|| Resource::builder().with_service_name("arkereso").build())
        .clone()
}

fn init_traces() -> anyhow::Result<SdkTracerProvider> {
    let exporter = SpanExporter::builder().with_http().build()?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(get_resource())
        .build())
}

fn init_metrics() -> anyhow::Result<SdkMeterProvider> {
    let exporter = MetricExporter::builder().with_http().build()?;

    Ok(SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .with_resource(get_resource())
        .build())
}

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the tracing subscriber: console, `.arkereso/run.log` and, when an
/// OTLP endpoint is configured, trace and metric export.
pub fn init_tracing_subscriber() -> anyhow::Result<OtelGuard> {
    let log_dir = env::current_dir()?.join(LOG_DIR);
    std::fs::create_dir_all(&log_dir)?;
    let file_appender = RollingFileAppender::new(Rotation::NEVER, log_dir, "run.log");

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_filter(default_filter());

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(default_filter());

    let providers = if env::var_os(OTLP_ENDPOINT_VAR).is_some() {
        Some((init_traces()?, init_metrics()?))
    } else {
        None
    };

    let otel_layers = providers.as_ref().map(|(tracer_provider, meter_provider)| {
        let tracer = tracer_provider.tracer("arkereso");
        MetricsLayer::new(meter_provider.clone()).and_then(OpenTelemetryLayer::new(tracer))
    });

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .with(otel_layers)
        .try_init()?;

    let (tracer_provider, meter_provider) = providers.unzip();
    Ok(OtelGuard {
        tracer_provider,
        meter_provider,
    })
}

/// Flushes and shuts down the OpenTelemetry providers on drop
pub struct OtelGuard {
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
}

impl Drop for OtelGuard {
    fn drop(&mut self) {
        if let Some(tracer_provider) = self.tracer_provider.take() {
            if let Err(err) = tracer_provider.shutdown() {
                eprintln!("{err:?}");
            }
        }
        if let Some(meter_provider) = self.meter_provider.take() {
            if let Err(err) = meter_provider.shutdown() {
                eprintln!("{err:?}");
            }
        }
    }
}
