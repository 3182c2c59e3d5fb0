use color_eyre::Result;
use color_eyre::eyre::WrapErr;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const SERVICE_NAME: &str = "shazam-playlist-sync";

/// Install the global subscriber.
///
/// Events go to stderr through the fmt layer. When `otlp_endpoint` is set,
/// spans are also exported over gRPC and the returned provider must be shut
/// down before exit to flush them.
pub fn init_tracing(
    tracing_level: &str,
    otlp_endpoint: Option<&str>,
) -> Result<Option<SdkTracerProvider>> {
    let filter_layer =
        EnvFilter::try_new(tracing_level).wrap_err("Failed to create tracing filter")?;
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let Some(otlp_endpoint) = otlp_endpoint else {
        tracing_subscriber::registry()
            .with(filter_layer)
            .with(fmt_layer)
            .init();
        return Ok(None);
    };

    let resource = Resource::builder()
        .with_attributes(vec![KeyValue::new(
            opentelemetry_semantic_conventions::resource::SERVICE_NAME,
            SERVICE_NAME,
        )])
        .build();

    let otlp_exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(otlp_endpoint)
        .build()
        .wrap_err("Failed to create OTLP span exporter")?;

    let tracer_provider = SdkTracerProvider::builder()
        .with_batch_exporter(otlp_exporter)
        .with_resource(resource)
        .build();
    opentelemetry::global::set_tracer_provider(tracer_provider.clone());
    let tracer = opentelemetry::global::tracer(SERVICE_NAME);

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(tracing_opentelemetry::layer().with_tracer(tracer))
        .init();

    Ok(Some(tracer_provider))
}
