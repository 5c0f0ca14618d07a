use std::time::Duration;

use opentelemetry::{KeyValue, global};
use opentelemetry_appender_tracing::layer::OpenTelemetryTracingBridge;
use opentelemetry_otlp::{self, Protocol, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::logs::SdkLoggerProvider;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::util::env::Var;
use crate::var;

pub type Result<T> = core::result::Result<T, Box<dyn std::error::Error>>;

const DEFAULT_FILTER: &str = "ecoroute_server=debug,tower_http=debug,axum=debug,sqlx=info,info";

#[derive(Debug, Clone)]
pub struct Telemetry {
    pub tracer_name: &'static str,
    pub base_resource: Resource,
    pub collector_url: &'static str,

    providers: Option<Providers>,
}

#[derive(Debug, Clone)]
struct Providers {
    logger: SdkLoggerProvider,
    tracer: SdkTracerProvider,
    meter: SdkMeterProvider,
}

impl Telemetry {
    pub async fn new() -> Result<Telemetry> {
        let collector_url = var!(Var::OtelExporterEndpoint).await?;
        let tracer_name = var!(Var::ApiTracerName).await?;
        let service_name = var!(Var::ApiServiceName).await?;
        let service_version = env!("CARGO_PKG_VERSION");

        let base_resource = base_attrs(service_name, service_version);

        // An empty collector url means no OTLP collection; the exporters
        // would otherwise batch and retry against a dead endpoint forever.
        let providers = if collector_url.is_empty() {
            None
        } else {
            Some(Providers {
                logger: build_logger_provider(collector_url, base_resource.clone())?,
                tracer: build_tracer_provider(collector_url, base_resource.clone())?,
                meter: build_meter_provider(collector_url, base_resource.clone())?,
            })
        };

        Ok(Self {
            base_resource,
            tracer_name,
            collector_url,
            providers,
        })
    }

    pub fn register(self) -> Self {
        match &self.providers {
            Some(providers) => {
                global::set_tracer_provider(providers.tracer.clone());
                let tracer = global::tracer(self.tracer_name);
                let trace_layer = tracing_opentelemetry::layer().with_tracer(tracer);

                let log_layer = OpenTelemetryTracingBridge::new(&providers.logger);
                let meter_layer = tracing_opentelemetry::MetricsLayer::new(providers.meter.clone());

                tracing_subscriber::registry()
                    .with(trace_layer)
                    .with(log_layer)
                    .with(meter_layer)
                    .with(EnvFilter::new(DEFAULT_FILTER))
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_target(true)
                            .with_thread_ids(true)
                            .with_line_number(true),
                    )
                    .init();
            }
            None => {
                tracing_subscriber::registry()
                    .with(EnvFilter::new(DEFAULT_FILTER))
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_target(true)
                            .with_thread_ids(true)
                            .with_line_number(true),
                    )
                    .init();
            }
        }

        self
    }

    pub fn shutdown(self) {
        let Some(providers) = self.providers else {
            return;
        };

        if let Err(e) = providers.meter.shutdown() {
            eprintln!("error during metering shutdown: {e:?}");
        } else {
            println!("metering shut down ok");
        }

        if let Err(e) = providers.logger.shutdown() {
            eprintln!("error during logging shutdown: {e:?}");
        } else {
            println!("logging shut down ok");
        }

        if let Err(e) = providers.tracer.shutdown() {
            eprintln!("error during tracing shutdown: {e:?}");
        } else {
            println!("tracing shut down ok");
        }
    }
}

pub fn build_logger_provider(
    collector_url: &str,
    base_resource: Resource,
) -> Result<SdkLoggerProvider> {
    let exporter = opentelemetry_otlp::LogExporter::builder()
        .with_tonic()
        .with_protocol(Protocol::Grpc)
        .with_endpoint(Endpoint::Logs.to_url(collector_url))
        .with_timeout(Duration::from_secs(5))
        .build()?;

    Ok(SdkLoggerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(base_resource.clone())
        .build())
}

pub fn build_tracer_provider(
    collector_url: &str,
    base_resource: Resource,
) -> Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_protocol(Protocol::Grpc)
        .with_endpoint(Endpoint::Traces.to_url(collector_url))
        .with_timeout(Duration::from_secs(5))
        .build()?;

    let provider = SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(base_resource.clone())
        .build();

    global::set_tracer_provider(provider.clone());

    Ok(provider)
}

pub fn build_meter_provider(
    collector_url: &str,
    base_resource: Resource,
) -> Result<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_protocol(Protocol::Grpc)
        .with_endpoint(Endpoint::Metrics.to_url(collector_url))
        .with_timeout(Duration::from_secs(5))
        .build()?;

    Ok(SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .with_resource(base_resource.clone())
        .build())
}

fn base_attrs(name: &'static str, version: &'static str) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new("service.name", name),
            KeyValue::new("service.version", version),
        ])
        .build()
}

enum Endpoint {
    Logs,
    Traces,
    Metrics,
}

impl Endpoint {
    pub fn to_url(&self, collector_endpoint: &str) -> String {
        let location: &str = match self {
            Endpoint::Logs => "/v1/logs",
            Endpoint::Traces => "/v1/traces",
            Endpoint::Metrics => "/v1/metrics",
        };
        format!("{collector_endpoint}{location}")
    }
}
