//! A thin wrapper around the `prometheus` crate that never panics.
//!
//! Every metric is created behind a `Result` and registration failures (most commonly a
//! duplicate name) are swallowed by the `try_create_*`/`inc_*`/`set_*` helpers below, so a typo
//! in a metric name degrades to "metric missing" rather than crashing the binary that happens to
//! observe it first.

use prometheus::{
    HistogramOpts, HistogramTimer, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
};

pub use prometheus::{Encoder, Histogram, IntCounter, Result, TextEncoder};

pub fn try_create_int_counter(name: &str, help: &str) -> Result<prometheus::IntCounter> {
    let opts = Opts::new(name, help);
    let counter = prometheus::IntCounter::with_opts(opts)?;
    prometheus::register(Box::new(counter.clone()))?;
    Ok(counter)
}

pub fn try_create_int_counter_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntCounterVec> {
    let opts = Opts::new(name, help);
    let counter = IntCounterVec::new(opts, label_names)?;
    prometheus::register(Box::new(counter.clone()))?;
    Ok(counter)
}

pub fn try_create_int_gauge(name: &str, help: &str) -> Result<IntGauge> {
    let opts = Opts::new(name, help);
    let gauge = IntGauge::with_opts(opts)?;
    prometheus::register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

pub fn try_create_int_gauge_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<IntGaugeVec> {
    let opts = Opts::new(name, help);
    let gauge = IntGaugeVec::new(opts, label_names)?;
    prometheus::register(Box::new(gauge.clone()))?;
    Ok(gauge)
}

pub fn try_create_histogram_vec(
    name: &str,
    help: &str,
    label_names: &[&str],
) -> Result<HistogramVec> {
    let opts = HistogramOpts::new(name, help);
    let histogram = HistogramVec::new(opts, label_names)?;
    prometheus::register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

pub fn try_create_histogram(name: &str, help: &str) -> Result<prometheus::Histogram> {
    let opts = HistogramOpts::new(name, help);
    let histogram = prometheus::Histogram::with_opts(opts)?;
    prometheus::register(Box::new(histogram.clone()))?;
    Ok(histogram)
}

pub fn start_timer(histogram: &Result<prometheus::Histogram>) -> Option<HistogramTimer> {
    histogram.as_ref().ok().map(|h| h.start_timer())
}

pub fn inc_counter(counter: &Result<prometheus::IntCounter>) {
    if let Ok(counter) = counter {
        counter.inc();
    }
}

pub fn inc_counter_vec(counter: &Result<IntCounterVec>, label_values: &[&str]) {
    if let Ok(counter) = counter {
        counter.with_label_values(label_values).inc();
    }
}

pub fn set_gauge(gauge: &Result<IntGauge>, value: i64) {
    if let Ok(gauge) = gauge {
        gauge.set(value);
    }
}

pub fn set_gauge_vec(gauge: &Result<IntGaugeVec>, label_values: &[&str], value: i64) {
    if let Ok(gauge) = gauge {
        gauge.with_label_values(label_values).set(value);
    }
}

pub fn observe(histogram: &Result<HistogramVec>, label_values: &[&str], value: f64) {
    if let Ok(histogram) = histogram {
        histogram.with_label_values(label_values).observe(value);
    }
}

pub fn start_timer_vec(histogram: &Result<HistogramVec>, label_values: &[&str]) -> Option<HistogramTimer> {
    histogram
        .as_ref()
        .ok()
        .map(|h| h.with_label_values(label_values).start_timer())
}

/// Gathers every registered metric and renders it in the Prometheus text exposition format, the
/// form the HTTP metrics endpoint serves directly.
pub fn gather_text() -> String {
    let metric_families = prometheus::gather();
    let mut buffer = vec![];
    let encoder = TextEncoder::new();
    if encoder.encode(&metric_families, &mut buffer).is_err() {
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}
