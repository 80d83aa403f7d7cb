//! Build and apply statistics for bag-of-words transforms.
//!
//! A [`MetricsCollector`] is a cheap, cloneable handle around a shared map of
//! named [`Metric`]s. Attach one to a
//! [`BagOfWordsTransformer`](crate::transform::BagOfWordsTransformer) and it
//! records:
//!
//! - `bow_build_time` / `bow_apply_time`: wall time in milliseconds
//! - `bow_build_rows` / `bow_apply_rows`: rows processed (accumulating)
//! - `bow_output_columns`: total dictionary size after the last build
//! - `bow_nnz`: total distinct-token count over all rows and columns
//!
//! # Example
//!
//! ```no_run
//! use ironbow::*;
//! use ironbow::metrics::MetricsCollector;
//!
//! # fn main() -> anyhow::Result<()> {
//! let frame = StringFrame::from_column(["a b", "b c"]);
//! let mut t = BagOfWordsTransformer::new(TransformConfig::default())?;
//! t.set_metrics(MetricsCollector::new());
//! t.build(&frame)?;
//! let _ = t.encode_dense(&frame)?;
//! if let Some(m) = t.metrics() {
//!     m.print();
//!     m.save_to_file("metrics.json")?;
//! }
//! # Ok(())
//! # }
//! ```

use anyhow::{Context, Result};
use serde_json::{Value, json};
use std::any::Any;
use std::collections::HashMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A named value that can be reported as JSON.
pub trait Metric: Send + Sync + Any {
    fn name(&self) -> &str;

    fn value(&self) -> Value;

    fn description(&self) -> Option<&str> {
        None
    }

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Thread-safe collection of metrics keyed by name.
#[derive(Clone, Default)]
pub struct MetricsCollector {
    inner: Arc<Mutex<HashMap<String, Box<dyn Metric>>>>,
}

impl MetricsCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a metric, replacing any metric with the same name.
    ///
    /// # Panics
    ///
    /// Panics if the collector's lock is poisoned.
    pub fn register(&self, metric: Box<dyn Metric>) {
        let mut inner = self.inner.lock().unwrap();
        inner.insert(metric.name().to_string(), metric);
    }

    /// Add `value` to a counter, creating it if absent.
    ///
    /// A non-counter metric under the same name is replaced.
    ///
    /// # Panics
    ///
    /// Panics if the collector's lock is poisoned.
    pub fn increment_counter(&self, name: &str, value: u64) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(counter) = inner
            .get_mut(name)
            .and_then(|m| m.as_any_mut().downcast_mut::<CounterMetric>())
        {
            counter.count += value;
            return;
        }
        inner.insert(
            name.to_string(),
            Box::new(CounterMetric::with_value(name, value)),
        );
    }

    /// Set a counter to `value`.
    ///
    /// # Panics
    ///
    /// Panics if the collector's lock is poisoned.
    pub fn set_counter(&self, name: &str, value: u64) {
        self.register(Box::new(CounterMetric::with_value(name, value)));
    }

    /// Set a gauge to `value`.
    ///
    /// # Panics
    ///
    /// Panics if the collector's lock is poisoned.
    pub fn set_gauge(&self, name: &str, value: f64) {
        self.register(Box::new(GaugeMetric::new(name, value)));
    }

    /// Record a duration as a millisecond gauge.
    ///
    /// # Panics
    ///
    /// Panics if the collector's lock is poisoned.
    pub fn record_duration(&self, name: &str, elapsed: Duration) {
        self.register(Box::new(
            GaugeMetric::new(name, elapsed.as_secs_f64() * 1000.0)
                .with_description("wall time in milliseconds"),
        ));
    }

    /// Name → value of every metric.
    ///
    /// # Panics
    ///
    /// Panics if the collector's lock is poisoned.
    #[must_use]
    pub fn snapshot(&self) -> HashMap<String, Value> {
        let inner = self.inner.lock().unwrap();
        inner
            .iter()
            .map(|(name, metric)| (name.clone(), metric.value()))
            .collect()
    }

    /// All metrics as a JSON object of `{ value, description? }` entries.
    ///
    /// # Panics
    ///
    /// Panics if the collector's lock is poisoned.
    #[must_use]
    pub fn to_json(&self) -> Value {
        let inner = self.inner.lock().unwrap();
        let mut metrics_json = serde_json::Map::new();
        for (name, metric) in inner.iter() {
            let mut metric_obj = serde_json::Map::new();
            metric_obj.insert("value".to_string(), metric.value());
            if let Some(desc) = metric.description() {
                metric_obj.insert("description".to_string(), json!(desc));
            }
            metrics_json.insert(name.clone(), Value::Object(metric_obj));
        }
        Value::Object(metrics_json)
    }

    /// Print all metrics to stdout, sorted by name.
    ///
    /// # Panics
    ///
    /// Panics if the collector's lock is poisoned.
    pub fn print(&self) {
        println!("\n======== Bag-of-Words Metrics ========");
        let inner = self.inner.lock().unwrap();
        let mut sorted: Vec<_> = inner.iter().collect();
        sorted.sort_by_key(|(name, _)| *name);
        for (name, metric) in sorted {
            if let Some(desc) = metric.description() {
                println!("{}: {} ({})", name, metric.value(), desc);
            } else {
                println!("{}: {}", name, metric.value());
            }
        }
        drop(inner);
        println!("======================================\n");
    }

    /// Save [`Self::to_json`] to a pretty-printed JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or written.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let formatted = serde_json::to_string_pretty(&self.to_json())?;
        let mut file = File::create(path).with_context(|| format!("create {}", path.display()))?;
        file.write_all(formatted.as_bytes())
            .with_context(|| format!("write {}", path.display()))?;
        Ok(())
    }
}

/// A monotonically accumulated count.
pub struct CounterMetric {
    name: String,
    count: u64,
}

impl CounterMetric {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_value(name, 0)
    }

    pub fn with_value(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl Metric for CounterMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Value {
        json!(self.count)
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A single floating-point reading.
pub struct GaugeMetric {
    name: String,
    value: f64,
    description: Option<String>,
}

impl GaugeMetric {
    pub fn new(name: impl Into<String>, value: f64) -> Self {
        Self {
            name: name.into(),
            value,
            description: None,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

impl Metric for GaugeMetric {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self) -> Value {
        json!(self.value)
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
