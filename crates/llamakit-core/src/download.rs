//! Multi-file download transport
//!
//! The provisioner treats the transport as an interface boundary: a batch of
//! items, one task identifier, one batch-level progress callback. The
//! default implementation streams over `reqwest`; hosts with their own
//! download manager implement [`DownloadTransport`] instead.

use crate::error::{Error, Result};
use crate::proxy::ProxyConfig;
use async_trait::async_trait;
use futures::StreamExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// One artifact to fetch: a URL, where to save it, and an optional proxy.
/// Consumed once by the transport, then discarded.
#[derive(Debug, Clone)]
pub struct DownloadItem {
    pub url: String,
    pub save_path: PathBuf,
    pub proxy: Option<ProxyConfig>,
}

/// Batch progress callback: `(transferred, total)` in bytes. The final
/// invocation of a completed batch reports `transferred == total`.
pub type ProgressCallback<'a> = &'a (dyn Fn(u64, u64) + Send + Sync);

/// Byte-moving collaborator for provisioning.
///
/// Cancellation is signalled externally; a cancelled batch returns `Ok` with
/// the progress callback left short of the total, or `Err(Error::Cancelled)`
/// for transports that surface aborts as errors. Either way the caller must
/// not treat cancellation as a failure.
#[async_trait]
pub trait DownloadTransport: Send + Sync {
    async fn download_files(
        &self,
        items: &[DownloadItem],
        task_id: &str,
        on_progress: ProgressCallback<'_>,
    ) -> Result<()>;
}

/// Streaming HTTP transport over `reqwest`.
#[derive(Debug, Default)]
pub struct HttpDownloader {
    cancel: Arc<AtomicBool>,
}

impl HttpDownloader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flag that cancels the in-flight batch when set. Cooperative: checked
    /// between chunks, cancels the whole batch, never individual items.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    fn client_for(proxy: Option<&ProxyConfig>) -> Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("llamakit/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(3600));
        if let Some(proxy) = proxy {
            builder = proxy.apply(builder);
        }
        Ok(builder.build()?)
    }

    /// Sum of `Content-Length` over the batch; items that do not report a
    /// length count as zero.
    async fn batch_total(client: &reqwest::Client, items: &[DownloadItem]) -> u64 {
        let mut total = 0;
        for item in items {
            match client.head(&item.url).send().await {
                Ok(response) => total += response.content_length().unwrap_or(0),
                Err(err) => debug!("HEAD {} failed: {err}", item.url),
            }
        }
        total
    }
}

#[async_trait]
impl DownloadTransport for HttpDownloader {
    async fn download_files(
        &self,
        items: &[DownloadItem],
        task_id: &str,
        on_progress: ProgressCallback<'_>,
    ) -> Result<()> {
        // One batch shares one proxy; items carry it so host-provided
        // transports can stay stateless.
        let client = Self::client_for(items.first().and_then(|i| i.proxy.as_ref()))?;

        let total = Self::batch_total(&client, items).await;
        let mut transferred = 0u64;

        for item in items {
            debug!(%task_id, url = %item.url, "downloading to {}", item.save_path.display());

            let response = client.get(&item.url).send().await?;
            if !response.status().is_success() {
                return Err(Error::Download(format!(
                    "HTTP {} for {}",
                    response.status(),
                    item.url
                )));
            }

            if let Some(parent) = item.save_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            let mut file = tokio::fs::File::create(&item.save_path).await?;

            let stream = response.bytes_stream();
            let cancelled = write_stream(
                &mut file,
                stream,
                &self.cancel,
                &mut transferred,
                total,
                on_progress,
            )
            .await?;

            if cancelled {
                warn!(%task_id, "download cancelled");
                // Cancellation is not a failure; the caller sees the
                // batch stop short of its total.
                return Ok(());
            }

            file.sync_all().await?;
        }

        // Final invocation always closes the batch at 100%, even when no
        // Content-Length was available up front.
        on_progress(transferred, transferred);
        Ok(())
    }
}

/// Stream chunks into `file`, reporting batch progress against the
/// authoritative `total` (0 when unknown). Returns `true` when the cancel
/// flag stopped the stream early.
///
/// The reported total is never clamped to `transferred`: only the final
/// close-out call after the whole batch finishes may report
/// `transferred == total`, so a cancelled batch with an unknown length
/// cannot be mistaken for a completed one.
async fn write_stream<S, B, E>(
    file: &mut tokio::fs::File,
    mut stream: S,
    cancel: &AtomicBool,
    transferred: &mut u64,
    total: u64,
    on_progress: ProgressCallback<'_>,
) -> Result<bool>
where
    S: futures::Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    Error: From<E>,
{
    while let Some(chunk) = stream.next().await {
        if cancel.load(Ordering::Relaxed) {
            file.flush().await?;
            return Ok(true);
        }

        let chunk = chunk?;
        file.write_all(chunk.as_ref()).await?;
        *transferred += chunk.as_ref().len() as u64;
        on_progress(*transferred, total);
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_cancel_handle_is_shared() {
        let transport = HttpDownloader::new();
        let handle = transport.cancel_handle();
        assert!(!transport.cancel.load(Ordering::Relaxed));
        handle.store(true, Ordering::Relaxed);
        assert!(transport.cancel.load(Ordering::Relaxed));
    }

    fn chunks(sizes: &[usize]) -> futures::stream::Iter<std::vec::IntoIter<Result<Vec<u8>>>> {
        futures::stream::iter(
            sizes
                .iter()
                .map(|&n| Ok(vec![0u8; n]))
                .collect::<Vec<_>>()
                .into_iter(),
        )
    }

    #[tokio::test]
    async fn test_cancelled_stream_with_unknown_total_stays_short() {
        let tmp = tempfile::tempdir().unwrap();
        let mut file = tokio::fs::File::create(tmp.path().join("out")).await.unwrap();

        let cancel = AtomicBool::new(false);
        let observed: Mutex<Vec<(u64, u64)>> = Mutex::new(Vec::new());
        let on_progress = |transferred: u64, total: u64| {
            observed.lock().unwrap().push((transferred, total));
            // Cancel after the first chunk lands
            cancel.store(true, Ordering::Relaxed);
        };

        let mut transferred = 0;
        let cancelled = write_stream(
            &mut file,
            chunks(&[4, 4, 4]),
            &cancel,
            &mut transferred,
            0,
            &on_progress,
        )
        .await
        .unwrap();

        assert!(cancelled);
        let observed = observed.lock().unwrap();
        assert_eq!(*observed, vec![(4, 0)]);
        // No observation of a cancelled unknown-length batch may look complete
        assert!(observed.iter().all(|(t, total)| t != total));
    }

    #[tokio::test]
    async fn test_completed_stream_reports_authoritative_total() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out");
        let mut file = tokio::fs::File::create(&path).await.unwrap();

        let cancel = AtomicBool::new(false);
        let observed: Mutex<Vec<(u64, u64)>> = Mutex::new(Vec::new());
        let on_progress = |transferred: u64, total: u64| {
            observed.lock().unwrap().push((transferred, total));
        };

        let mut transferred = 0;
        let cancelled = write_stream(
            &mut file,
            chunks(&[4, 4]),
            &cancel,
            &mut transferred,
            8,
            &on_progress,
        )
        .await
        .unwrap();
        file.sync_all().await.unwrap();

        assert!(!cancelled);
        assert_eq!(transferred, 8);
        assert_eq!(*observed.lock().unwrap(), vec![(4, 8), (8, 8)]);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 8);
    }
}
