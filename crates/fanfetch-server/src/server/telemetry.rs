//! # Telemetry Features
//!
//! Console logging through `tracing_subscriber::fmt` is always installed. On
//! top of it the crate can export OpenTelemetry data:
//!
//! - `tracing` (default): spans and events via `tracing-opentelemetry`.
//! - `metrics`: counters and histograms for batches and fetched URLs.
//! - `stdout`: the OpenTelemetry stdout exporter for either signal.
//!
//! `stdout` without `tracing` or `metrics` is rejected at compile time.
//!
//! ## Metrics
//!
//! | name | kind | meaning |
//! |---|---|---|
//! | `requests` | counter | collect requests received |
//! | `batches_inflight` | up/down counter | admitted batches not yet finished |
//! | `batches_rejected` | counter | batches refused by the admission gate |
//! | `batch_errors` | counter | batches that ended in an error |
//! | `batch_duration` | histogram (ms) | end-to-end batch latency |
//! | `urls_fetched` | counter | successful fetches |
//! | `urls_per_batch` | histogram | batch sizes after validation |
//!
//! The helper functions at the bottom compile to no-ops when `metrics` is off.
//!
//! ```bash
//! cargo run --features tracing,metrics,stdout
//! ```

// Disallow using `stdout` without `tracing` or `metrics`
#[cfg(all(feature = "stdout", not(any(feature = "tracing", feature = "metrics"))))]
compile_error!(
    "The 'stdout' feature requires at least one of 'tracing' or 'metrics' to be enabled."
);

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "metrics")]
use opentelemetry::metrics::{Counter, Histogram, Meter, UpDownCounter};
#[cfg(feature = "metrics")]
use opentelemetry_sdk::metrics as sdkmetrics;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry::{InstrumentationScope, KeyValue};
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_sdk::Resource;
#[cfg(any(feature = "metrics", feature = "tracing"))]
use opentelemetry_semantic_conventions as semvcns;

#[cfg(feature = "tracing")]
use opentelemetry::trace::TracerProvider;
#[cfg(feature = "tracing")]
use opentelemetry_sdk::propagation::TraceContextPropagator;
#[cfg(feature = "tracing")]
use opentelemetry_sdk::trace as sdktrace;

const SERVICE_NAME: &str = "fanfetch";

pub struct TelemetryProviders {
    #[cfg(feature = "tracing")]
    pub tracer_provider: sdktrace::SdkTracerProvider,
    #[cfg(feature = "metrics")]
    pub meter_provider: sdkmetrics::SdkMeterProvider,
}

impl TelemetryProviders {
    /// Flushes and shuts down every enabled provider. Failures are reported on
    /// stderr since the subscriber may already be gone.
    pub fn shutdown(&self) {
        #[cfg(feature = "tracing")]
        {
            if let Err(err) = self.tracer_provider.force_flush() {
                eprintln!("Error flushing traces: {err:#?}");
            }
            if let Err(err) = self.tracer_provider.shutdown() {
                eprintln!("Error shutting down tracer: {err:#?}");
            }
        }

        #[cfg(feature = "metrics")]
        {
            if let Err(err) = self.meter_provider.force_flush() {
                eprintln!("Error flushing metrics: {err:#?}");
            }
            if let Err(err) = self.meter_provider.shutdown() {
                eprintln!("Error shutting down meter: {err:#?}");
            }
        }
    }
}

pub fn init_telemetry() -> anyhow::Result<TelemetryProviders> {
    #[cfg(feature = "tracing")]
    opentelemetry::global::set_text_map_propagator(TraceContextPropagator::new());

    #[cfg(feature = "tracing")]
    let tracer_provider = init_tracer();

    #[cfg(feature = "metrics")]
    let meter_provider = init_metrics();

    #[cfg(any(feature = "metrics", feature = "tracing"))]
    let scope = InstrumentationScope::builder(SERVICE_NAME)
        .with_version(env!("CARGO_PKG_VERSION"))
        .with_schema_url(semvcns::SCHEMA_URL)
        .build();

    // The fmt layer prints spans/events to the console regardless of which
    // exporters are compiled in.
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            tracing_subscriber::fmt::layer()
                .with_thread_ids(true)
                .with_line_number(true)
                .with_target(false)
                .with_timer(tracing_subscriber::fmt::time::ChronoLocal::rfc_3339())
                .with_file(true),
        );

    #[cfg(feature = "tracing")]
    let registry = {
        opentelemetry::global::set_tracer_provider(tracer_provider.clone());
        registry.with(
            tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer_with_scope(scope.clone()))
                .with_error_records_to_exceptions(true),
        )
    };

    #[cfg(feature = "metrics")]
    let registry = {
        opentelemetry::global::set_meter_provider(meter_provider.clone());
        let meter = opentelemetry::global::meter_with_scope(scope);
        init_metric_handles(meter);

        registry.with(tracing_opentelemetry::MetricsLayer::new(
            meter_provider.clone(),
        ))
    };

    registry.try_init()?;

    Ok(TelemetryProviders {
        #[cfg(feature = "tracing")]
        tracer_provider,
        #[cfg(feature = "metrics")]
        meter_provider,
    })
}

#[cfg(any(feature = "metrics", feature = "tracing"))]
fn resource() -> Resource {
    Resource::builder()
        .with_service_name(SERVICE_NAME)
        .with_schema_url(
            [KeyValue::new(
                semvcns::resource::SERVICE_VERSION,
                env!("CARGO_PKG_VERSION"),
            )],
            semvcns::SCHEMA_URL,
        )
        .build()
}

#[cfg(feature = "metrics")]
fn init_metrics() -> sdkmetrics::SdkMeterProvider {
    let builder = sdkmetrics::SdkMeterProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::MetricExporter;
        let exporter = MetricExporter::default();
        let reader = opentelemetry_sdk::metrics::PeriodicReader::builder(exporter)
            .with_interval(std::time::Duration::from_secs(5))
            .build();

        builder.with_reader(reader)
    };

    builder.build()
}

#[cfg(feature = "tracing")]
fn init_tracer() -> sdktrace::SdkTracerProvider {
    let builder = sdktrace::SdkTracerProvider::builder().with_resource(resource());

    #[cfg(feature = "stdout")]
    let builder = {
        use opentelemetry_stdout::SpanExporter;
        let exporter = SpanExporter::default();
        let batch = sdktrace::BatchSpanProcessor::builder(exporter)
            .with_batch_config(
                sdktrace::BatchConfigBuilder::default()
                    .with_scheduled_delay(std::time::Duration::from_secs(5))
                    .with_max_queue_size(2048)
                    .build(),
            )
            .build();
        builder.with_span_processor(batch)
    };

    builder.build()
}

#[cfg(feature = "metrics")]
static REQUESTS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static BATCHES_INFLIGHT: OnceLock<UpDownCounter<i64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static BATCHES_REJECTED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static BATCH_ERRORS: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static BATCH_DURATION_MS: OnceLock<Histogram<f64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static URLS_FETCHED: OnceLock<Counter<u64>> = OnceLock::new();
#[cfg(feature = "metrics")]
static URLS_PER_BATCH: OnceLock<Histogram<f64>> = OnceLock::new();

#[cfg(feature = "metrics")]
fn init_metric_handles(meter: Meter) {
    let _ = REQUESTS.set(
        meter
            .u64_counter("requests")
            .with_description("Total collect requests")
            .build(),
    );

    let _ = BATCHES_INFLIGHT.set(
        meter
            .i64_up_down_counter("batches_inflight")
            .with_description("Admitted batches still being processed")
            .build(),
    );

    let _ = BATCHES_REJECTED.set(
        meter
            .u64_counter("batches_rejected")
            .with_description("Batches refused by admission control")
            .build(),
    );

    let _ = BATCH_ERRORS.set(
        meter
            .u64_counter("batch_errors")
            .with_description("Batches that failed validation or fetching")
            .build(),
    );

    let _ = BATCH_DURATION_MS.set(
        meter
            .f64_histogram("batch_duration")
            .with_unit("ms")
            .with_description("End-to-end batch duration")
            .build(),
    );

    let _ = URLS_FETCHED.set(
        meter
            .u64_counter("urls_fetched")
            .with_description("Total URLs fetched successfully")
            .build(),
    );

    let _ = URLS_PER_BATCH.set(
        meter
            .f64_histogram("urls_per_batch")
            .with_description("URLs submitted per batch")
            .build(),
    );
}

#[cfg(feature = "metrics")]
pub fn increment_requests() {
    if let Some(counter) = REQUESTS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_requests() {}

#[cfg(feature = "metrics")]
pub fn increment_batches_inflight() {
    if let Some(counter) = BATCHES_INFLIGHT.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_batches_inflight() {}

#[cfg(feature = "metrics")]
pub fn decrement_batches_inflight() {
    if let Some(counter) = BATCHES_INFLIGHT.get() {
        counter.add(-1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn decrement_batches_inflight() {}

#[cfg(feature = "metrics")]
pub fn increment_batches_rejected() {
    if let Some(counter) = BATCHES_REJECTED.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_batches_rejected() {}

#[cfg(feature = "metrics")]
pub fn increment_batch_errors() {
    if let Some(counter) = BATCH_ERRORS.get() {
        counter.add(1, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_batch_errors() {}

#[cfg(feature = "metrics")]
pub fn record_batch_duration(duration_ms: f64) {
    if let Some(histogram) = BATCH_DURATION_MS.get() {
        histogram.record(duration_ms, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_batch_duration(_duration_ms: f64) {}

#[cfg(feature = "metrics")]
pub fn increment_urls_fetched(count: u64) {
    if let Some(counter) = URLS_FETCHED.get() {
        counter.add(count, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn increment_urls_fetched(_count: u64) {}

#[cfg(feature = "metrics")]
pub fn record_urls_per_batch(count: f64) {
    if let Some(histogram) = URLS_PER_BATCH.get() {
        histogram.record(count, &[]);
    }
}

#[cfg(not(feature = "metrics"))]
pub fn record_urls_per_batch(_count: f64) {}
