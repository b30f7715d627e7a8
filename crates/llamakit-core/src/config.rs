//! Configuration for catalog sources and the data directory

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// How many of the most recent releases the remote catalog considers.
/// Business policy, not a correctness constraint.
pub const DEFAULT_RELEASE_CAP: usize = 10;

/// Source coordinates and local paths used by resolution and provisioning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Application data directory holding the `llamacpp/` tree.
    pub data_dir: PathBuf,

    /// GitHub owner of the release repository.
    pub release_owner: String,
    /// GitHub repository publishing the backend archives.
    pub release_repo: String,
    /// GitHub API base URL.
    pub api_base: String,
    /// Base URL for release artifact downloads.
    pub download_base: String,
    /// Mirror CDN base URL, used when the primary source fails.
    pub cdn_base: String,

    /// Number of most-recent releases to consider.
    pub release_cap: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::new(),
            release_owner: "ggml-org".to_string(),
            release_repo: "llama.cpp".to_string(),
            api_base: "https://api.github.com".to_string(),
            download_base: "https://github.com".to_string(),
            cdn_base: "https://catalog.jan.ai".to_string(),
            release_cap: DEFAULT_RELEASE_CAP,
        }
    }
}

impl BackendConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    /// Primary release catalog endpoint (GitHub API).
    pub fn primary_catalog_url(&self) -> String {
        format!(
            "{}/repos/{}/{}/releases",
            self.api_base, self.release_owner, self.release_repo
        )
    }

    /// Mirrored release catalog endpoint, same payload wrapped in
    /// `{"releases": [...]}`.
    pub fn mirror_catalog_url(&self) -> String {
        format!("{}/llama.cpp/releases/releases.json", self.cdn_base)
    }

    /// Download URL of the backend archive for one (version, backend) pair.
    pub fn backend_archive_url(&self, version: &str, backend: &str, mirror: bool) -> String {
        let filename = format!("llama-{version}-bin-{backend}.tar.gz");
        if mirror {
            format!("{}/llama.cpp/releases/{version}/{filename}", self.cdn_base)
        } else {
            format!(
                "{}/{}/{}/releases/download/{version}/{filename}",
                self.download_base, self.release_owner, self.release_repo
            )
        }
    }

    /// Download URL of the CUDA runtime archive matching a backend archive.
    pub fn cudart_archive_url(
        &self,
        version: &str,
        platform: &str,
        cuda_token: &str,
        mirror: bool,
    ) -> String {
        let filename = format!("cudart-llama-bin-{platform}-{cuda_token}-x64.tar.gz");
        if mirror {
            format!("{}/llama.cpp/releases/{version}/{filename}", self.cdn_base)
        } else {
            format!(
                "{}/{}/{}/releases/download/{version}/{filename}",
                self.download_base, self.release_owner, self.release_repo
            )
        }
    }
}
