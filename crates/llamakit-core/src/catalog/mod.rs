//! Backend catalog: remote releases and local installs merged into one
//! inventory
//!
//! The remote catalog and the local scan are independent sources; they meet
//! only at [`merge_catalogs`]. Local entries win key collisions because they
//! are ground truth about what can run today.

pub mod local;
pub mod remote;
pub mod selection;

use crate::backend::supported_backends;
use crate::config::BackendConfig;
use crate::error::Result;
use crate::hardware::{FeatureMatrix, SystemProfile};
use crate::version::compare_versions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::warn;

/// One published or installed backend build. The `(version, backend)` pair
/// is the natural primary key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    pub version: String,
    pub backend: String,
}

impl BackendDescriptor {
    pub fn new(version: impl Into<String>, backend: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            backend: backend.into(),
        }
    }

    fn key(&self) -> String {
        format!("{}|{}", self.version, self.backend)
    }
}

/// Union remote and local inventories, deduplicated by `(version, backend)`.
///
/// Local entries override remote ones on collision. Keyed map, not nested
/// scanning: the input can be dozens of releases times several variants.
/// Result is sorted newest version first, backend name ascending within a
/// version.
pub fn merge_catalogs(
    remote: Vec<BackendDescriptor>,
    local: Vec<BackendDescriptor>,
) -> Vec<BackendDescriptor> {
    let mut merged_map: HashMap<String, BackendDescriptor> = HashMap::new();

    for entry in remote {
        merged_map.insert(entry.key(), entry);
    }
    // Local second: ground truth wins the key collision
    for entry in local {
        merged_map.insert(entry.key(), entry);
    }

    let mut merged: Vec<BackendDescriptor> = merged_map.into_values().collect();
    merged.sort_by(|a, b| {
        compare_versions(&b.version, &a.version).then_with(|| a.backend.cmp(&b.backend))
    });
    merged
}

/// Build the full inventory for the host described by `profile`.
///
/// Remote fetch and local scan run concurrently and join here. A dead remote
/// catalog (primary and mirror both down) degrades to local-only inventory;
/// a failed local scan propagates.
pub async fn build_inventory(
    config: &BackendConfig,
    profile: &SystemProfile,
    features: &FeatureMatrix,
) -> Result<Vec<BackendDescriptor>> {
    let supported = supported_backends(profile, features);

    let fetcher = remote::RemoteCatalogFetcher::new(config.clone());
    let (remote_result, local_result) = tokio::join!(fetcher.fetch(&supported), async {
        local::scan_installed(&config.data_dir, profile.os)
    });

    let remote = match remote_result {
        Ok(remote) => remote,
        Err(err) => {
            warn!("Remote catalog unavailable, using local inventory only: {err}");
            Vec::new()
        }
    };

    Ok(merge_catalogs(remote, local_result?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(version: &str, backend: &str) -> BackendDescriptor {
        BackendDescriptor::new(version, backend)
    }

    #[test]
    fn test_merge_dedup_and_sort() {
        let remote = vec![d("b7523", "backend-a"), d("b7523", "backend-b")];
        let local = vec![d("b7523", "backend-a"), d("b7524", "backend-c")];

        let merged = merge_catalogs(remote, local);

        assert_eq!(merged.len(), 3);
        // Newest version first
        assert_eq!(merged[0], d("b7524", "backend-c"));
        // Backend ascending within the same version
        assert_eq!(merged[1], d("b7523", "backend-a"));
        assert_eq!(merged[2], d("b7523", "backend-b"));
    }

    #[test]
    fn test_merge_bounds() {
        let remote = vec![d("1", "a"), d("1", "b"), d("2", "a")];
        let local = vec![d("1", "a"), d("3", "a")];

        let merged = merge_catalogs(remote.clone(), local.clone());
        assert!(merged.len() <= remote.len() + local.len());

        let mut keys: Vec<String> = merged.iter().map(BackendDescriptor::key).collect();
        keys.sort();
        keys.dedup();
        assert_eq!(keys.len(), merged.len(), "every key appears at most once");
    }

    #[test]
    fn test_merge_empty_sides() {
        assert!(merge_catalogs(vec![], vec![]).is_empty());
        assert_eq!(merge_catalogs(vec![d("1", "a")], vec![]).len(), 1);
        assert_eq!(merge_catalogs(vec![], vec![d("1", "a")]).len(), 1);
    }
}
