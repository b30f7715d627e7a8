//! Backend artifact provisioning
//!
//! Downloads a backend archive (plus the matching CUDA runtime when the
//! backend needs one and it is not already present), extracts both into the
//! versioned install directory, and reports the lifecycle over an
//! [`EventSink`]. A failed primary download is retried once against the
//! mirror; cancellation is terminal and never retried.

use crate::archive::decompress;
use crate::config::BackendConfig;
use crate::cuda::{cuda_requirement, is_cuda_runtime_installed};
use crate::download::{DownloadItem, DownloadTransport};
use crate::error::Result;
use crate::events::{DownloadEvent, EventSink, download_task_id};
use crate::hardware::OsFamily;
use crate::layout;
use crate::proxy::load_proxy_config;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;
use tracing::{info, warn};

/// Terminal state of one provisioning run. Errors are returned separately;
/// a `Stopped` outcome is a user action, not a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallOutcome {
    /// All archives downloaded and extracted; the backend is ready to run.
    Installed,
    /// The batch was cancelled before completing.
    Stopped,
}

/// Downloads and installs backend builds into the data directory.
pub struct ArtifactProvisioner {
    config: BackendConfig,
    os: OsFamily,
    transport: Arc<dyn DownloadTransport>,
    events: Arc<dyn EventSink>,
}

impl ArtifactProvisioner {
    pub fn new(
        config: BackendConfig,
        os: OsFamily,
        transport: Arc<dyn DownloadTransport>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            os,
            transport,
            events,
        }
    }

    /// Provision one `(version, backend)` pair.
    ///
    /// Primary source first; any non-cancellation error is retried once
    /// against the mirror. A mirror failure or a cancellation error is
    /// emitted as a [`DownloadEvent::Error`] and returned.
    pub async fn install(&self, version: &str, backend: &str) -> Result<InstallOutcome> {
        let task_id = download_task_id(version, backend);

        for mirror in [false, true] {
            match self.attempt(version, backend, &task_id, mirror).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if !mirror && !err.is_cancelled() => {
                    warn!(%task_id, "primary download failed, retrying via mirror: {err}");
                }
                Err(err) => {
                    self.events.emit(DownloadEvent::Error {
                        id: task_id.clone(),
                        message: err.to_string(),
                    });
                    return Err(err);
                }
            }
        }
        unreachable!("mirror attempt returns or errors")
    }

    async fn attempt(
        &self,
        version: &str,
        backend: &str,
        task_id: &str,
        mirror: bool,
    ) -> Result<InstallOutcome> {
        let backend_dir = layout::backend_dir(&self.config.data_dir, version, backend);
        tokio::fs::create_dir_all(&backend_dir).await?;

        let proxy = load_proxy_config(&self.config.data_dir);

        let mut items = vec![DownloadItem {
            url: self.config.backend_archive_url(version, backend, mirror),
            save_path: backend_dir.join("backend.tar.gz"),
            proxy: proxy.clone(),
        }];

        // The CUDA runtime ships as a separate archive; skip it when it is
        // already installed (or migrated in from the legacy location).
        if let Some(cuda) = cuda_requirement(backend) {
            if let Some(platform) = self.os.cudart_platform() {
                if !is_cuda_runtime_installed(&backend_dir, &self.config.data_dir, self.os, cuda) {
                    items.push(DownloadItem {
                        url: self.config.cudart_archive_url(
                            version,
                            platform,
                            cuda.archive_token(),
                            mirror,
                        ),
                        save_path: backend_dir
                            .join("build")
                            .join("bin")
                            .join(format!("cuda{}.tar.gz", cuda.major())),
                        proxy: proxy.clone(),
                    });
                }
            }
        }

        info!(%task_id, mirror, "provisioning {} artifact(s)", items.len());

        // The transport reports batch progress; the last observation tells
        // cancellation (short of total) apart from completion (at total).
        let last_progress: Arc<Mutex<Option<(u64, u64)>>> = Arc::new(Mutex::new(None));
        let sink = self.events.clone();
        let id = task_id.to_string();

        let progress_state = last_progress.clone();
        let on_progress = move |transferred: u64, total: u64| {
            if let Ok(mut last) = progress_state.lock() {
                *last = Some((transferred, total));
            }
            let percent = if total > 0 {
                transferred as f64 / total as f64 * 100.0
            } else {
                0.0
            };
            sink.emit(DownloadEvent::Progress {
                id: id.clone(),
                percent,
                transferred,
                total,
            });
        };

        self.transport
            .download_files(&items, task_id, &on_progress)
            .await?;

        let completed = matches!(
            last_progress.lock().ok().and_then(|last| *last),
            Some((transferred, total)) if transferred == total
        );

        if !completed {
            // Cooperative cancellation: the transport returned Ok with the
            // batch short of its total. Partial files stay on disk.
            self.events.emit(DownloadEvent::Stopped {
                id: task_id.to_string(),
            });
            return Ok(InstallOutcome::Stopped);
        }

        for item in &items {
            let output_dir: PathBuf = item
                .save_path
                .parent()
                .map(PathBuf::from)
                .unwrap_or_else(|| backend_dir.clone());
            decompress(&item.save_path, &output_dir)?;
            tokio::fs::remove_file(&item.save_path).await?;
        }

        info!(%task_id, "backend installed at {}", backend_dir.display());
        self.events.emit(DownloadEvent::Success {
            id: task_id.to_string(),
        });
        Ok(InstallOutcome::Installed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::download::ProgressCallback;
    use crate::error::Error;
    use async_trait::async_trait;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Collects emitted events for assertions.
    #[derive(Default)]
    struct RecordingSink {
        events: Mutex<Vec<DownloadEvent>>,
    }

    impl EventSink for RecordingSink {
        fn emit(&self, event: DownloadEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    impl RecordingSink {
        fn events(&self) -> Vec<DownloadEvent> {
            self.events.lock().unwrap().clone()
        }
    }

    fn tiny_archive(entry_name: &str) -> Vec<u8> {
        let encoder = GzEncoder::new(Vec::new(), Compression::default());
        let mut builder = tar::Builder::new(encoder);
        let content = b"binary";
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, entry_name, content.as_slice())
            .unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    enum Behavior {
        /// Write a valid archive per item and complete the batch.
        Complete,
        /// Report partial progress and return Ok, like a cancelled stream.
        CancelCooperatively,
        /// Cancelled stream that never learned the batch total (no
        /// Content-Length): progress carries `total == 0`.
        CancelWithUnknownTotal,
        /// Fail with the given error.
        Fail(fn() -> Error),
    }

    struct MockTransport {
        behaviors: Vec<Behavior>,
        calls: AtomicUsize,
    }

    impl MockTransport {
        fn new(behaviors: Vec<Behavior>) -> Self {
            Self {
                behaviors,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DownloadTransport for MockTransport {
        async fn download_files(
            &self,
            items: &[DownloadItem],
            _task_id: &str,
            on_progress: ProgressCallback<'_>,
        ) -> crate::error::Result<()> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviors[call.min(self.behaviors.len() - 1)] {
                Behavior::Complete => {
                    for item in items {
                        if let Some(parent) = item.save_path.parent() {
                            std::fs::create_dir_all(parent)?;
                        }
                        std::fs::write(&item.save_path, tiny_archive("llama-server"))?;
                    }
                    on_progress(50, 100);
                    on_progress(100, 100);
                    Ok(())
                }
                Behavior::CancelCooperatively => {
                    on_progress(40, 100);
                    Ok(())
                }
                Behavior::CancelWithUnknownTotal => {
                    // Partial file on disk, as a real cancelled stream leaves
                    for item in items {
                        if let Some(parent) = item.save_path.parent() {
                            std::fs::create_dir_all(parent)?;
                        }
                        std::fs::write(&item.save_path, b"trunc")?;
                    }
                    on_progress(5, 0);
                    Ok(())
                }
                Behavior::Fail(make) => Err(make()),
            }
        }
    }

    fn provisioner(
        data_dir: &TempDir,
        transport: MockTransport,
    ) -> (ArtifactProvisioner, Arc<RecordingSink>) {
        let sink = Arc::new(RecordingSink::default());
        let provisioner = ArtifactProvisioner::new(
            BackendConfig::new(data_dir.path()),
            OsFamily::Linux,
            Arc::new(transport),
            sink.clone(),
        );
        (provisioner, sink)
    }

    #[tokio::test]
    async fn test_install_extracts_and_removes_archive() {
        let dir = TempDir::new().unwrap();
        let (provisioner, sink) = provisioner(&dir, MockTransport::new(vec![Behavior::Complete]));

        let outcome = provisioner
            .install("b7524", "linux-common_cpus-x64")
            .await
            .unwrap();

        assert_eq!(outcome, InstallOutcome::Installed);
        let backend_dir = layout::backend_dir(dir.path(), "b7524", "linux-common_cpus-x64");
        assert!(backend_dir.join("llama-server").exists());
        assert!(!backend_dir.join("backend.tar.gz").exists());
        assert!(matches!(
            sink.events().last(),
            Some(DownloadEvent::Success { .. })
        ));
    }

    #[tokio::test]
    async fn test_primary_failure_retries_via_mirror() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new(vec![
            Behavior::Fail(|| Error::Download("HTTP 503".to_string())),
            Behavior::Complete,
        ]);
        let (provisioner, sink) = provisioner(&dir, transport);

        let outcome = provisioner
            .install("b7524", "linux-common_cpus-x64")
            .await
            .unwrap();

        assert_eq!(outcome, InstallOutcome::Installed);
        // The failed primary attempt must not surface an error event
        assert!(
            !sink
                .events()
                .iter()
                .any(|e| matches!(e, DownloadEvent::Error { .. }))
        );
    }

    #[tokio::test]
    async fn test_mirror_failure_emits_error() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new(vec![
            Behavior::Fail(|| Error::Download("HTTP 503".to_string())),
            Behavior::Fail(|| Error::Download("HTTP 404".to_string())),
        ]);
        let (provisioner, sink) = provisioner(&dir, transport);

        let result = provisioner.install("b7524", "linux-common_cpus-x64").await;

        assert!(result.is_err());
        assert!(matches!(
            sink.events().last(),
            Some(DownloadEvent::Error { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancellation_error_is_not_retried() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new(vec![
            Behavior::Fail(|| Error::Cancelled),
            Behavior::Complete,
        ]);
        let (provisioner, sink) = provisioner(&dir, transport);

        let result = provisioner.install("b7524", "linux-common_cpus-x64").await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert!(matches!(
            sink.events().last(),
            Some(DownloadEvent::Error { .. })
        ));
    }

    #[tokio::test]
    async fn test_cooperative_cancellation_stops_without_error() {
        let dir = TempDir::new().unwrap();
        let (provisioner, sink) =
            provisioner(&dir, MockTransport::new(vec![Behavior::CancelCooperatively]));

        let outcome = provisioner
            .install("b7524", "linux-common_cpus-x64")
            .await
            .unwrap();

        assert_eq!(outcome, InstallOutcome::Stopped);
        assert!(matches!(
            sink.events().last(),
            Some(DownloadEvent::Stopped { .. })
        ));
    }

    #[tokio::test]
    async fn test_cancelled_unknown_length_batch_is_stopped_not_retried() {
        let dir = TempDir::new().unwrap();
        let transport = MockTransport::new(vec![Behavior::CancelWithUnknownTotal]);
        let (provisioner, sink) = provisioner(&dir, transport);

        let outcome = provisioner
            .install("b7524", "linux-common_cpus-x64")
            .await
            .unwrap();

        // A truncated archive from a cancelled batch must never reach
        // extraction or trigger the mirror retry
        assert_eq!(outcome, InstallOutcome::Stopped);
        assert!(matches!(
            sink.events().last(),
            Some(DownloadEvent::Stopped { .. })
        ));
        assert!(
            !sink
                .events()
                .iter()
                .any(|e| matches!(e, DownloadEvent::Error { .. }))
        );
    }
}
