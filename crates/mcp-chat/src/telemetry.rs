use std::collections::HashMap;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::{
    ExporterBuildError, Protocol, SpanExporter, WithExportConfig,
    WithHttpConfig,
};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

const LOGFIRE_TRACES_ENDPOINT: &str =
    "https://logfire-api.pydantic.dev/v1/traces";
const SERVICE_NAME: &str = "mcp-chat";

/// Keeps the span exporter alive, flush it with [`Telemetry::shutdown`].
pub struct Telemetry {
    provider: Option<SdkTracerProvider>,
}

impl Telemetry {
    pub fn shutdown(self) {
        let Some(provider) = self.provider else {
            return;
        };
        if let Err(err) = provider.shutdown() {
            eprintln!("failed to flush traces: {err}");
        }
    }
}

/// Installs the global subscriber: logs to stderr filtered by `RUST_LOG`
/// (`info` by default), plus span export to Logfire if `LOGFIRE_TOKEN` is
/// set.
///
/// Must be called outside of the tokio runtime, the exporter uses a
/// blocking HTTP client.
pub fn init() -> Telemetry {
    let filter_layer = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = fmt::layer().with_writer(std::io::stderr);

    let provider = std::env::var("LOGFIRE_TOKEN")
        .ok()
        .filter(|token| !token.is_empty())
        .and_then(|token| match logfire_provider(token) {
            Ok(provider) => Some(provider),
            Err(err) => {
                eprintln!("failed to set up Logfire export: {err}");
                None
            }
        });
    let otel_layer = provider.as_ref().map(|provider| {
        tracing_opentelemetry::layer().with_tracer(provider.tracer(SERVICE_NAME))
    });

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .with(otel_layer)
        .init();

    Telemetry { provider }
}

fn logfire_provider(
    token: String,
) -> Result<SdkTracerProvider, ExporterBuildError> {
    let exporter = SpanExporter::builder()
        .with_http()
        .with_protocol(Protocol::HttpBinary)
        .with_endpoint(LOGFIRE_TRACES_ENDPOINT)
        .with_headers(HashMap::from([("Authorization".to_owned(), token)]))
        .build()?;
    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(Resource::builder().with_service_name(SERVICE_NAME).build())
        .build())
}
