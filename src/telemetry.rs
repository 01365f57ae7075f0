use crate::config::{LogFormat, TelemetryConfig};
use opentelemetry::{KeyValue, global};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    propagation::TraceContextPropagator,
    trace::SdkTracerProvider,
};
use opentelemetry_semantic_conventions::resource::{SERVICE_NAME, SERVICE_VERSION};
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE: &str = "alumniconnect-chat";

fn default_filter() -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into())
        .add_directive("sqlx=warn".parse().expect("Invalid filter directive"))
        .add_directive("hyper=warn".parse().expect("Invalid filter directive"))
        .add_directive("tower=warn".parse().expect("Invalid filter directive"))
}

fn service_resource() -> Resource {
    Resource::builder()
        .with_attributes(vec![
            KeyValue::new(SERVICE_NAME, SERVICE),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
        ])
        .build()
}

/// Installs the tracing subscriber and, when an OTLP endpoint is configured,
/// the OpenTelemetry trace and metric providers behind the `global` handles.
pub fn init_telemetry(config: &TelemetryConfig) -> anyhow::Result<()> {
    let otel_layer = match &config.otlp_endpoint {
        Some(endpoint) => {
            global::set_text_map_propagator(TraceContextPropagator::new());
            let resource = service_resource();

            let span_exporter = opentelemetry_otlp::SpanExporter::builder()
                .with_http()
                .with_endpoint(format!("{endpoint}/v1/traces"))
                .build()?;
            let tracer_provider = SdkTracerProvider::builder()
                .with_resource(resource.clone())
                .with_batch_exporter(span_exporter)
                .build();
            let tracer = opentelemetry::trace::TracerProvider::tracer(&tracer_provider, SERVICE);
            global::set_tracer_provider(tracer_provider);

            let metric_exporter = opentelemetry_otlp::MetricExporter::builder()
                .with_http()
                .with_endpoint(format!("{endpoint}/v1/metrics"))
                .build()?;
            let meter_provider = SdkMeterProvider::builder()
                .with_resource(resource)
                .with_reader(PeriodicReader::builder(metric_exporter).build())
                .build();
            global::set_meter_provider(meter_provider);

            Some(OpenTelemetryLayer::new(tracer))
        }
        None => None,
    };

    // Option<Layer> is itself a Layer, so the OTLP stage is a no-op when unset.
    let registry = Registry::default().with(default_filter()).with(otel_layer);

    match config.log_format {
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
    }

    Ok(())
}

/// Flushes buffered telemetry before the process exits.
pub fn shutdown_telemetry() {
    // The batch exporters flush when the global providers drop at exit.
}
