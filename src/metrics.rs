use parking_lot::RwLock;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Something that contributes named counters to a metrics snapshot.
pub trait MetricsSource: Send + Sync {
    fn apply(&self, out: &mut BTreeMap<String, u64>);
}

/// Receives metrics sources; how they are exported is up to the implementation.
pub trait MetricsSink {
    fn register(&self, source: Arc<dyn MetricsSource>);
}

/// In-memory sink that reads every registered source on demand.
#[derive(Default)]
pub struct MetricsRegistry {
    sources: RwLock<Vec<Arc<dyn MetricsSource>>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        let mut out = BTreeMap::new();
        for source in self.sources.read().iter() {
            source.apply(&mut out);
        }
        out
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self.snapshot()).unwrap_or(Value::Null)
    }
}

impl MetricsSink for MetricsRegistry {
    fn register(&self, source: Arc<dyn MetricsSource>) {
        self.sources.write().push(source);
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl MetricsSink for NoopMetrics {
    fn register(&self, _source: Arc<dyn MetricsSource>) {}
}
