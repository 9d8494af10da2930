//! Output layers for console and file logging

use tracing::Subscriber;
use tracing_subscriber::{fmt::MakeWriter, layer::Layer, registry::LookupSpan};

use crate::config::JsonlConfig;

/// Boxed layer over the registry, so output layers can be chosen at runtime
pub type BoxedLayer<S> = Box<dyn Layer<S> + Send + Sync + 'static>;

/// JSONL formatting layer writing to `writer`
pub fn jsonl_layer<S, W>(writer: W, config: &JsonlConfig) -> BoxedLayer<S>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
    W: for<'writer> MakeWriter<'writer> + Send + Sync + 'static,
{
    tracing_subscriber::fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(config.include_spans)
        .flatten_event(config.flatten_events)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_writer(writer)
        .boxed()
}

/// Human-readable layer for the console
pub fn pretty_layer<S>(ansi: bool) -> BoxedLayer<S>
where
    S: Subscriber + for<'lookup> LookupSpan<'lookup>,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(ansi)
        .with_target(true)
        .boxed()
}
