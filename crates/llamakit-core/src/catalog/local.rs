//! Local installation scanner
//!
//! Walks `<data-dir>/llamacpp/backends/<version>/<backend>` and reports every
//! pair whose server executable is actually present. Directories without the
//! executable are partial or corrupted downloads and are silently excluded.

use crate::catalog::BackendDescriptor;
use crate::error::Result;
use crate::hardware::OsFamily;
use crate::layout;
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Installed `(version, backend)` pairs under the data directory.
pub fn scan_installed(data_dir: &Path, os: OsFamily) -> Result<Vec<BackendDescriptor>> {
    let mut local = Vec::new();
    let backends_root = layout::backends_root(data_dir);

    if !backends_root.exists() {
        return Ok(local);
    }

    for version_entry in fs::read_dir(&backends_root)? {
        let version_path = version_entry?.path();
        if !version_path.is_dir() {
            continue;
        }
        let Some(version) = version_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };

        for backend_entry in fs::read_dir(&version_path)? {
            let backend_path = backend_entry?.path();
            let Some(backend) = backend_path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };

            if layout::is_backend_installed(&backend_path, os) {
                local.push(BackendDescriptor::new(version, backend));
            } else {
                debug!("Skipping partial install at {}", backend_path.display());
            }
        }
    }

    Ok(local)
}

/// Remove installed copies of `backend_type` older than `latest_version`.
///
/// Removal failures are logged and skipped; cleanup never blocks an upgrade.
/// Returns the paths that were removed.
pub fn remove_old_versions(
    data_dir: &Path,
    os: OsFamily,
    latest_version: &str,
    backend_type: &str,
) -> Result<Vec<std::path::PathBuf>> {
    let mut removed = Vec::new();
    let backends_root = layout::backends_root(data_dir);

    if !backends_root.exists() {
        return Ok(removed);
    }

    for version_entry in fs::read_dir(&backends_root)? {
        let version_path = version_entry?.path();
        let Some(version) = version_path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if version == latest_version {
            continue;
        }

        let backend_path = version_path.join(backend_type);
        if layout::is_backend_installed(&backend_path, os) {
            match fs::remove_dir_all(&backend_path) {
                Ok(()) => {
                    info!("Removed old {backend_type} install at {}", backend_path.display());
                    removed.push(backend_path);
                }
                Err(err) => {
                    tracing::warn!(
                        "Failed to remove old install at {}: {err}",
                        backend_path.display()
                    );
                }
            }
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;

    fn host_exe() -> &'static str {
        OsFamily::host().unwrap().server_exe_name()
    }

    fn install_backend(data_dir: &Path, version: &str, backend: &str) {
        let bin = layout::backend_dir(data_dir, version, backend)
            .join("build")
            .join("bin");
        fs::create_dir_all(&bin).unwrap();
        File::create(bin.join(host_exe())).unwrap();
    }

    #[test]
    fn test_scan_missing_root_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let os = OsFamily::host().unwrap();
        assert!(scan_installed(tmp.path(), os).unwrap().is_empty());
    }

    #[test]
    fn test_scan_reports_only_complete_installs() {
        let tmp = tempfile::tempdir().unwrap();
        let os = OsFamily::host().unwrap();

        install_backend(tmp.path(), "b7523", "backend-a");
        // Partial install: directory exists, no executable
        fs::create_dir_all(layout::backend_dir(tmp.path(), "b7523", "backend-empty")).unwrap();

        let result = scan_installed(tmp.path(), os).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0], BackendDescriptor::new("b7523", "backend-a"));
    }

    #[test]
    fn test_scan_spans_versions() {
        let tmp = tempfile::tempdir().unwrap();
        let os = OsFamily::host().unwrap();

        install_backend(tmp.path(), "b7523", "linux-common_cpus-x64");
        install_backend(tmp.path(), "b7524", "linux-common_cpus-x64");

        let result = scan_installed(tmp.path(), os).unwrap();
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn test_remove_old_versions_keeps_latest() {
        let tmp = tempfile::tempdir().unwrap();
        let os = OsFamily::host().unwrap();

        install_backend(tmp.path(), "b7523", "linux-common_cpus-x64");
        install_backend(tmp.path(), "b7524", "linux-common_cpus-x64");
        install_backend(tmp.path(), "b7523", "linux-vulkan-common_cpus-x64");

        let removed =
            remove_old_versions(tmp.path(), os, "b7524", "linux-common_cpus-x64").unwrap();

        assert_eq!(removed.len(), 1);
        assert!(!layout::backend_dir(tmp.path(), "b7523", "linux-common_cpus-x64").exists());
        // Latest version untouched
        assert!(layout::backend_dir(tmp.path(), "b7524", "linux-common_cpus-x64").exists());
        // Other backend types untouched
        assert!(layout::backend_dir(tmp.path(), "b7523", "linux-vulkan-common_cpus-x64").exists());
    }
}
