//! Tracing subscriber initialization with structured logging and optional
//! OpenTelemetry trace export.
//!
//! # Usage
//!
//! ```no_run
//! use simsearch_observe::tracing_setup::{TracingOptions, init_tracing};
//!
//! // Human-readable logs at the CLI's default level
//! init_tracing(&TracingOptions::default()).unwrap();
//! ```

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use std::sync::OnceLock;

/// Stores the OTel tracer provider so it can be shut down cleanly on exit.
static TRACER_PROVIDER: OnceLock<SdkTracerProvider> = OnceLock::new();

/// Output format of the `fmt` layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    /// One JSON object per event, for log shipping from the server.
    Json,
}

#[derive(Debug, Clone)]
pub struct TracingOptions {
    /// Filter used when `RUST_LOG` is unset (e.g. `"info,simsearch=debug"`).
    pub default_filter: String,
    pub format: LogFormat,
    /// Bridge spans to OpenTelemetry with a stdout exporter.
    pub enable_otel: bool,
}

impl Default for TracingOptions {
    fn default() -> Self {
        Self {
            default_filter: "warn".to_string(),
            format: LogFormat::Pretty,
            enable_otel: false,
        }
    }
}

impl TracingOptions {
    /// Default filter for a CLI verbosity count (`-v`, `-vv`).
    pub fn for_verbosity(verbose: u8, quiet: bool) -> Self {
        let default_filter = match verbose {
            0 if quiet => "error",
            0 => "warn",
            1 => "info,simsearch_core=debug,simsearch_infra=debug",
            _ => "trace",
        };
        Self {
            default_filter: default_filter.to_string(),
            ..Self::default()
        }
    }

    fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.default_filter))
    }
}

/// Initialize the global tracing subscriber.
///
/// - Always installs a `fmt` layer (pretty or JSON) with span close timing.
/// - When `enable_otel` is set, additionally bridges tracing spans to
///   OpenTelemetry using a stdout exporter.
/// - `RUST_LOG` overrides `default_filter`.
///
/// # Errors
///
/// Returns an error if the global subscriber has already been set.
pub fn init_tracing(options: &TracingOptions) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = options.env_filter();

    let otel_layer = if options.enable_otel {
        let provider = SdkTracerProvider::builder()
            .with_simple_exporter(opentelemetry_stdout::SpanExporter::default())
            .build();
        let tracer = provider.tracer("simsearch");

        // Store the provider for shutdown and register it globally.
        let _ = TRACER_PROVIDER.set(provider.clone());
        opentelemetry::global::set_tracer_provider(provider);
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer);

    match options.format {
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()?,
    }

    Ok(())
}

/// Flush pending traces and shut down the OpenTelemetry tracer provider.
///
/// Safe to call even when OTel was not enabled (no-op in that case).
pub fn shutdown_tracing() {
    if let Some(provider) = TRACER_PROVIDER.get() {
        if let Err(e) = provider.shutdown() {
            eprintln!("Warning: OTel tracer provider shutdown error: {e}");
        }
    }
}
