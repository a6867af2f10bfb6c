use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use reqflow_exec::{Event, EventSink, Progress};

/// One line on stderr per finished region.
#[derive(Default)]
pub struct ProgressEventSink {
    passed: AtomicUsize,
    failed: AtomicUsize,
    skipped: AtomicUsize,
    skipped_names: Mutex<HashSet<String>>,
}

impl ProgressEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> String {
        format!(
            "✓{} ✗{} -{}",
            self.passed.load(Ordering::Relaxed),
            self.failed.load(Ordering::Relaxed),
            self.skipped.load(Ordering::Relaxed)
        )
    }
}

#[async_trait]
impl EventSink for ProgressEventSink {
    async fn emit(&self, event: Event) {
        match event {
            Event::RegionSkipped { region, .. } => {
                self.skipped.fetch_add(1, Ordering::Relaxed);
                eprintln!("- {region} (skipped)");
                self.skipped_names.lock().insert(region);
            }
            Event::RegionFinished {
                region,
                succeeded,
                cancelled,
                ..
            } => {
                // a skipped region also reports finished
                if self.skipped_names.lock().remove(&region) {
                    return;
                }
                if cancelled {
                    eprintln!("! {region} (cancelled)");
                } else if succeeded {
                    self.passed.fetch_add(1, Ordering::Relaxed);
                    eprintln!("✓ {region}");
                } else {
                    self.failed.fetch_add(1, Ordering::Relaxed);
                    eprintln!("✗ {region}");
                }
            }
            _ => {}
        }
    }
}

/// Cancels `progress` on the first Ctrl-C. Abort the handle once the run is over.
pub fn cancel_on_ctrl_c(progress: &Progress) -> tokio::task::JoinHandle<()> {
    let progress = progress.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling run");
            progress.cancel();
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn skipped_regions_are_not_counted_twice() {
        let sink = ProgressEventSink::new();
        let run_id = Default::default();
        sink.emit(Event::RegionSkipped {
            run_id,
            region: "a".into(),
        })
        .await;
        sink.emit(Event::RegionFinished {
            run_id,
            region: "a".into(),
            succeeded: false,
            cancelled: false,
        })
        .await;
        sink.emit(Event::RegionFinished {
            run_id,
            region: "b".into(),
            succeeded: true,
            cancelled: false,
        })
        .await;
        assert_eq!(sink.summary(), "✓1 ✗0 -1");
    }
}
