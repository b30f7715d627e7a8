//! Lifecycle events emitted during provisioning
//!
//! Consumed by whatever UI hosts the library. Events are keyed by a task
//! identifier derived from the (version, backend) pair so the UI can track
//! several provisioning tasks at once.

use serde::Serialize;
use tracing::{error, info};

/// Task identifier for one provisioning attempt:
/// `llamacpp-<version>-<backend>` with dots replaced by dashes.
pub fn download_task_id(version: &str, backend: &str) -> String {
    format!("llamacpp-{version}-{backend}").replace('.', "-")
}

/// Events a provisioning attempt emits over its lifetime.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DownloadEvent {
    Progress {
        id: String,
        percent: f64,
        transferred: u64,
        total: u64,
    },
    /// Batch cancelled before completion. Not a failure.
    Stopped { id: String },
    Success { id: String },
    Error { id: String, message: String },
}

/// Sink for lifecycle events.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DownloadEvent);
}

/// Default sink that forwards events to the tracing subscriber.
#[derive(Debug, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: DownloadEvent) {
        match &event {
            DownloadEvent::Progress {
                id,
                percent,
                transferred,
                total,
            } => {
                tracing::debug!(%id, transferred, total, "download progress {percent:.1}%");
            }
            DownloadEvent::Stopped { id } => info!(%id, "download stopped"),
            DownloadEvent::Success { id } => info!(%id, "download succeeded"),
            DownloadEvent::Error { id, message } => error!(%id, "download failed: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_id_replaces_dots() {
        assert_eq!(
            download_task_id("v1.0.0", "win-avx2-x64"),
            "llamacpp-v1-0-0-win-avx2-x64"
        );
        assert_eq!(
            download_task_id("b7523", "linux-cuda-12-common_cpus-x64"),
            "llamacpp-b7523-linux-cuda-12-common_cpus-x64"
        );
    }
}
