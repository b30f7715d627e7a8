//! Remote release catalog with primary → mirror fallback
//!
//! The primary source is the GitHub releases API; the mirror serves the same
//! payload wrapped in `{"releases": [...]}` from a CDN. Any primary failure
//! (transport error or non-2xx) falls through to the mirror exactly once.
//! Only release assets matching a supported backend name, directly or via
//! legacy-name migration, make it into the catalog.

use crate::backend::migrate_legacy;
use crate::catalog::BackendDescriptor;
use crate::config::BackendConfig;
use crate::error::{Error, Result};
use crate::proxy::load_proxy_config;
use crate::version::compare_versions;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

/// One release asset as published by the catalog source.
#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub name: String,
}

/// One release: a tag plus its downloadable assets.
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub tag_name: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Deserialize)]
struct MirrorIndex {
    releases: Vec<Release>,
}

pub struct RemoteCatalogFetcher {
    config: BackendConfig,
    client: reqwest::Client,
}

impl RemoteCatalogFetcher {
    pub fn new(config: BackendConfig) -> Self {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("llamakit/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30));
        if let Some(proxy) = load_proxy_config(&config.data_dir) {
            builder = proxy.apply(builder);
        }
        let client = builder.build().unwrap_or_default();

        Self { config, client }
    }

    /// Published descriptors matching the supported backend list.
    pub async fn fetch(&self, supported: &[String]) -> Result<Vec<BackendDescriptor>> {
        let mut releases = self.fetch_releases().await?;

        // Newest tag first, then keep the configured window
        releases.sort_by(|a, b| compare_versions(&b.tag_name, &a.tag_name));
        releases.truncate(self.config.release_cap);

        Ok(filter_releases(&releases, supported))
    }

    /// Fetch the raw release list, primary first, mirror on any failure.
    /// Both sources exhausted is an error; the caller decides whether that
    /// is fatal.
    async fn fetch_releases(&self) -> Result<Vec<Release>> {
        let primary_url = self.config.primary_catalog_url();
        let primary_err = match self.get_json::<Vec<Release>>(&primary_url).await {
            Ok(releases) => return Ok(releases),
            Err(err) => err,
        };

        let mirror_url = self.config.mirror_catalog_url();
        warn!("Primary release catalog failed ({primary_err}), trying mirror");

        match self.get_json::<MirrorIndex>(&mirror_url).await {
            Ok(index) => Ok(index.releases),
            Err(mirror_err) => Err(Error::CatalogUnavailable {
                primary: primary_err.to_string(),
                mirror: mirror_err.to_string(),
            }),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("GET {url}");
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(Error::Download(format!("HTTP {} for {url}", response.status())));
        }
        Ok(response.json::<T>().await?)
    }
}

/// Extract the backend token from a release asset filename of the form
/// `llama-{version}-bin-{backend}.tar.gz`.
fn asset_backend<'a>(asset_name: &'a str, version: &str) -> Option<&'a str> {
    let prefix = format!("llama-{version}-bin-");
    asset_name
        .strip_prefix(prefix.as_str())?
        .strip_suffix(".tar.gz")
}

/// Filter releases down to assets the host supports.
///
/// An asset matches either by its literal backend name or because its
/// migrated (consolidated) name is supported. In the migration case the
/// original name is kept: that is the name that exists on the server.
pub fn filter_releases(releases: &[Release], supported: &[String]) -> Vec<BackendDescriptor> {
    let mut descriptors = Vec::new();

    for release in releases {
        for asset in &release.assets {
            let Some(backend) = asset_backend(&asset.name, &release.tag_name) else {
                continue;
            };

            let matches = supported.iter().any(|s| s == backend)
                || supported.iter().any(|s| *s == migrate_legacy(backend));

            if matches {
                descriptors.push(BackendDescriptor::new(&release.tag_name, backend));
            }
        }
    }

    descriptors
}
