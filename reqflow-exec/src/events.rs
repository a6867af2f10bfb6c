use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use uuid::Uuid;

use reqflow_core::TestResultStatus;

#[derive(Debug, Clone)]
pub enum Event {
    RegionStarted {
        run_id: Uuid,
        region: String,
    },
    RegionSkipped {
        run_id: Uuid,
        region: String,
    },
    RegionFinished {
        run_id: Uuid,
        region: String,
        succeeded: bool,
        cancelled: bool,
    },
    StreamMessage {
        run_id: Uuid,
        region: String,
        label: String,
        status_code: u16,
    },
    TestRecorded {
        run_id: Uuid,
        region: String,
        status: TestResultStatus,
        message: String,
    },
    CacheInvalidated {
        run_id: Uuid,
        region: String,
        env: String,
    },
}

impl Event {
    pub fn run_id(&self) -> Uuid {
        match self {
            Event::RegionStarted { run_id, .. }
            | Event::RegionSkipped { run_id, .. }
            | Event::RegionFinished { run_id, .. }
            | Event::StreamMessage { run_id, .. }
            | Event::TestRecorded { run_id, .. }
            | Event::CacheInvalidated { run_id, .. } => *run_id,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Event::RegionStarted { run_id, region } => {
                json!({ "type": "region.started", "run_id": run_id.to_string(), "region": region })
            }
            Event::RegionSkipped { run_id, region } => {
                json!({ "type": "region.skipped", "run_id": run_id.to_string(), "region": region })
            }
            Event::RegionFinished { run_id, region, succeeded, cancelled } => {
                json!({ "type": "region.finished", "run_id": run_id.to_string(), "region": region, "succeeded": succeeded, "cancelled": cancelled })
            }
            Event::StreamMessage { run_id, region, label, status_code } => {
                json!({ "type": "stream.message", "run_id": run_id.to_string(), "region": region, "label": label, "status_code": status_code })
            }
            Event::TestRecorded { run_id, region, status, message } => {
                json!({ "type": "test.recorded", "run_id": run_id.to_string(), "region": region, "status": status.to_string(), "message": message })
            }
            Event::CacheInvalidated { run_id, region, env } => {
                json!({ "type": "cache.invalidated", "run_id": run_id.to_string(), "region": region, "env": env })
            }
        }
    }
}

#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: Event);
}

pub struct CompositeEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl Default for CompositeEventSink {
    fn default() -> Self {
        Self::new()
    }
}

impl CompositeEventSink {
    pub fn new() -> Self {
        Self { sinks: Vec::new() }
    }

    pub fn add(&mut self, sink: Arc<dyn EventSink>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[async_trait]
impl EventSink for CompositeEventSink {
    async fn emit(&self, event: Event) {
        for sink in &self.sinks {
            sink.emit(event.clone()).await;
        }
    }
}

/// One JSON object per line on stdout.
pub struct StdoutEventSink;

#[async_trait]
impl EventSink for StdoutEventSink {
    async fn emit(&self, event: Event) {
        println!("{}", serde_json::to_string(&event.to_json()).unwrap_or_default());
    }
}

pub struct TracingEventSink;

#[async_trait]
impl EventSink for TracingEventSink {
    async fn emit(&self, event: Event) {
        match &event {
            Event::RegionSkipped { run_id, region } => {
                tracing::info!(%run_id, region = %region, "region skipped");
            }
            Event::RegionFinished { run_id, region, succeeded, cancelled } => {
                tracing::info!(%run_id, region = %region, succeeded, cancelled, "region finished");
            }
            Event::TestRecorded { run_id, region, status, message } if status.is_failure() => {
                tracing::warn!(%run_id, region = %region, %status, "{message}");
            }
            other => tracing::debug!(run_id = %other.run_id(), event = %other.to_json(), "event"),
        }
    }
}

pub struct NoOpEventSink;

#[async_trait]
impl EventSink for NoOpEventSink {
    async fn emit(&self, _event: Event) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct Recording(Mutex<Vec<Event>>);

    #[async_trait]
    impl EventSink for Recording {
        async fn emit(&self, event: Event) {
            self.0.lock().push(event);
        }
    }

    #[tokio::test]
    async fn composite_forwards_to_every_sink() {
        let a = Arc::new(Recording::default());
        let b = Arc::new(Recording::default());
        let mut composite = CompositeEventSink::new();
        composite.add(a.clone());
        composite.add(b.clone());
        let run_id = Uuid::new_v4();
        composite
            .emit(Event::RegionStarted {
                run_id,
                region: "login".into(),
            })
            .await;
        assert_eq!(a.0.lock().len(), 1);
        assert_eq!(b.0.lock()[0].run_id(), run_id);
    }

    #[test]
    fn json_shape_has_type_and_run_id() {
        let run_id = Uuid::new_v4();
        let v = Event::CacheInvalidated {
            run_id,
            region: "get".into(),
            env: "dev".into(),
        }
        .to_json();
        assert_eq!(v["type"], "cache.invalidated");
        assert_eq!(v["run_id"], run_id.to_string());
        assert_eq!(v["env"], "dev");
    }
}
