//! Default-choice heuristics over a merged catalog
//!
//! The UI stores its choice as one `"{version}/{backend}"` string. This
//! module validates that shape, picks a sensible default from the merged
//! catalog, answers update checks, and decides when a stored legacy backend
//! type should be migrated to its consolidated successor.

use crate::backend::migrate_legacy;
use crate::catalog::BackendDescriptor;
use crate::error::{Error, Result};
use crate::version::{build_number, compare_versions};
use serde::Serialize;
use tracing::{info, warn};

/// Split and validate a stored `"{version}/{backend}"` selection string.
pub fn parse_selection(selection: &str) -> Result<(String, String)> {
    let mut parts = selection.splitn(2, '/');
    let version = parts.next().unwrap_or("").trim();
    let backend = parts.next().unwrap_or("").trim();

    if version.is_empty() || backend.is_empty() {
        return Err(Error::InvalidSelection(selection.to_string()));
    }

    Ok((version.to_string(), backend.to_string()))
}

/// Newest catalog entry whose migrated backend name equals `backend_type`,
/// as a `"{version}/{backend}"` string keeping the original backend name.
pub fn find_latest_for_type(
    descriptors: &[BackendDescriptor],
    backend_type: &str,
) -> Option<String> {
    descriptors
        .iter()
        .filter(|d| migrate_legacy(&d.backend) == backend_type)
        .max_by(|a, b| compare_versions(&a.version, &b.version))
        .map(|d| format!("{}/{}", d.version, d.backend))
}

/// Accelerator/ISA category of a backend name, used for priority ordering.
fn backend_category(backend: &str) -> Option<&'static str> {
    if backend.contains("cuda-13-common_cpus") || backend.contains("cu13.0") {
        return Some("cuda-cu13.0");
    }
    if backend.contains("cuda-12-common_cpus") || backend.contains("cu12.0") {
        return Some("cuda-cu12.0");
    }
    if backend.contains("cuda-11-common_cpus") || backend.contains("cu11.7") {
        return Some("cuda-cu11.7");
    }
    if backend.contains("vulkan") {
        return Some("vulkan");
    }
    if backend.contains("common_cpus") {
        return Some("common_cpus");
    }
    if backend.contains("avx512") {
        return Some("avx512");
    }
    if backend.contains("avx2") {
        return Some("avx2");
    }
    if backend.contains("avx") && !backend.contains("noavx") {
        return Some("avx");
    }
    if backend.contains("noavx") {
        return Some("noavx");
    }
    if backend.ends_with("arm64") {
        return Some("arm64");
    }
    if backend.ends_with("x64") {
        return Some("x64");
    }
    None
}

/// Best default pick from a merged (already sorted) catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BestBackend {
    pub selection: String,
    pub version: String,
    pub backend: String,
}

/// Pick the most capable backend available.
///
/// Accelerated categories lead; Vulkan drops to last when GPU memory is too
/// small to be worth it. Falls back to the newest entry when no category
/// matches.
pub fn best_backend(
    descriptors: &[BackendDescriptor],
    has_enough_gpu_memory: bool,
) -> Option<BestBackend> {
    let priorities: &[&str] = if has_enough_gpu_memory {
        &[
            "cuda-cu13.0",
            "cuda-cu12.0",
            "cuda-cu11.7",
            "vulkan",
            "common_cpus",
            "avx512",
            "avx2",
            "avx",
            "noavx",
            "arm64",
            "x64",
        ]
    } else {
        &[
            "cuda-cu13.0",
            "cuda-cu12.0",
            "cuda-cu11.7",
            "common_cpus",
            "avx512",
            "avx2",
            "avx",
            "noavx",
            "arm64",
            "x64",
            "vulkan",
        ]
    };

    for category in priorities {
        if let Some(best) = descriptors
            .iter()
            .find(|d| backend_category(&d.backend) == Some(category))
        {
            info!(
                "Best available backend: {}/{} (category {category})",
                best.version, best.backend
            );
            return Some(BestBackend {
                selection: format!("{}/{}", best.version, best.backend),
                version: best.version.clone(),
                backend: best.backend.clone(),
            });
        }
    }

    // No category matched at all; newest entry is still better than nothing
    descriptors.first().map(|fallback| BestBackend {
        selection: format!("{}/{}", fallback.version, fallback.backend),
        version: fallback.version.clone(),
        backend: fallback.backend.clone(),
    })
}

/// Outcome of an update check for the stored selection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpdateCheck {
    pub update_needed: bool,
    pub new_version: Option<String>,
    pub target_selection: Option<String>,
}

impl UpdateCheck {
    fn none() -> Self {
        Self {
            update_needed: false,
            new_version: None,
            target_selection: None,
        }
    }
}

/// Whether a newer build of the stored backend type exists in the catalog.
pub fn check_for_updates(
    current_selection: &str,
    descriptors: &[BackendDescriptor],
) -> Result<UpdateCheck> {
    let (current_version, current_backend) = parse_selection(current_selection)?;
    let backend_type = migrate_legacy(&current_backend);

    let Some(target) = find_latest_for_type(descriptors, &backend_type) else {
        warn!("No available versions for backend type {backend_type}");
        return Ok(UpdateCheck::none());
    };

    let (latest_version, _) = parse_selection(&target)?;

    if build_number(&latest_version) > build_number(&current_version) {
        info!("New backend build available: {current_version} -> {latest_version}");
        Ok(UpdateCheck {
            update_needed: true,
            new_version: Some(latest_version),
            target_selection: Some(target),
        })
    } else {
        Ok(UpdateCheck::none())
    }
}

/// Consolidated backend type to migrate a stored legacy type to, if the
/// consolidated type is actually available in the catalog. `None` when the
/// stored type is already current or no migration target exists yet.
pub fn migration_target(
    stored_backend_type: &str,
    descriptors: &[BackendDescriptor],
) -> Option<String> {
    let mapped = migrate_legacy(stored_backend_type);
    if mapped == stored_backend_type {
        return None;
    }

    let available = descriptors
        .iter()
        .any(|d| migrate_legacy(&d.backend) == mapped);

    if available {
        info!("Stored backend '{stored_backend_type}' migrates to '{mapped}'");
        Some(mapped)
    } else {
        warn!("Migration of '{stored_backend_type}' skipped: '{mapped}' not available");
        None
    }
}
