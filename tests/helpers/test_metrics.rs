//! An in-memory metrics recorder for asserting on counters and gauges.
//!
//! Series are keyed by name plus sorted labels, e.g.
//! `inspections_total{status=success}`.

use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct TestMetrics {
    counters: Arc<Mutex<HashMap<String, u64>>>,
    gauges: Arc<Mutex<HashMap<String, f64>>>,
}

impl TestMetrics {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn counter(&self, series: &str) -> u64 {
        self.counters.lock().unwrap().get(series).copied().unwrap_or(0)
    }

    pub fn gauge(&self, series: &str) -> Option<f64> {
        self.gauges.lock().unwrap().get(series).copied()
    }
}

fn series(key: &Key) -> String {
    let mut labels: Vec<String> = key
        .labels()
        .map(|label| format!("{}={}", label.key(), label.value()))
        .collect();
    if labels.is_empty() {
        return key.name().to_string();
    }
    labels.sort();
    format!("{}{{{}}}", key.name(), labels.join(","))
}

impl Recorder for TestMetrics {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}
    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(SeriesCounter {
            series: series(key),
            counters: self.counters.clone(),
        }))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(SeriesGauge {
            series: series(key),
            gauges: self.gauges.clone(),
        }))
    }

    fn register_histogram(&self, _key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::noop()
    }
}

#[derive(Debug)]
struct SeriesCounter {
    series: String,
    counters: Arc<Mutex<HashMap<String, u64>>>,
}

impl metrics::CounterFn for SeriesCounter {
    fn increment(&self, value: u64) {
        *self
            .counters
            .lock()
            .unwrap()
            .entry(self.series.clone())
            .or_insert(0) += value;
    }

    fn absolute(&self, value: u64) {
        self.counters
            .lock()
            .unwrap()
            .insert(self.series.clone(), value);
    }
}

#[derive(Debug)]
struct SeriesGauge {
    series: String,
    gauges: Arc<Mutex<HashMap<String, f64>>>,
}

impl metrics::GaugeFn for SeriesGauge {
    fn increment(&self, value: f64) {
        *self
            .gauges
            .lock()
            .unwrap()
            .entry(self.series.clone())
            .or_insert(0.0) += value;
    }

    fn decrement(&self, value: f64) {
        self.increment(-value);
    }

    fn set(&self, value: f64) {
        self.gauges.lock().unwrap().insert(self.series.clone(), value);
    }
}
