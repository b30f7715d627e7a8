//! CUDA runtime dependency resolution
//!
//! Backend archives do not bundle the CUDA runtime; it ships as a separate
//! tarball per CUDA major version. Older installs kept one shared copy under
//! `<data-dir>/llamacpp/lib`, current installs keep it next to the backend
//! executable in `build/bin`. The resolver checks both and migrates the
//! legacy copy forward when it finds one.

use crate::hardware::OsFamily;
use crate::layout;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

/// CUDA major versions a backend can depend on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CudaVersion {
    V11,
    V12,
    V13,
}

impl CudaVersion {
    pub fn major(&self) -> u8 {
        match self {
            CudaVersion::V11 => 11,
            CudaVersion::V12 => 12,
            CudaVersion::V13 => 13,
        }
    }

    /// Full runtime version shipped for this major (`11.7`, `12.0`, `13.0`).
    pub fn runtime_version(&self) -> &'static str {
        match self {
            CudaVersion::V11 => "11.7",
            CudaVersion::V12 => "12.0",
            CudaVersion::V13 => "13.0",
        }
    }

    /// Marker token used in legacy backend names and runtime archive names.
    pub fn archive_token(&self) -> &'static str {
        match self {
            CudaVersion::V11 => "cu11.7",
            CudaVersion::V12 => "cu12.0",
            CudaVersion::V13 => "cu13.0",
        }
    }
}

/// CUDA dependency of a backend identifier, if any.
///
/// Recognizes both legacy markers (`cu11.7`, `cu12.0`, `cu13.0`) and
/// consolidated ones (`cuda-11`, `cuda-12`, `cuda-13`).
pub fn cuda_requirement(backend: &str) -> Option<CudaVersion> {
    if backend.contains("cu13.0") || backend.contains("cuda-13") {
        return Some(CudaVersion::V13);
    }
    if backend.contains("cu12.0") || backend.contains("cuda-12") {
        return Some(CudaVersion::V12);
    }
    if backend.contains("cu11.7") || backend.contains("cuda-11") {
        return Some(CudaVersion::V11);
    }
    None
}

/// Shared-library filename of the CUDA runtime for one OS/version pair.
/// macOS has no CUDA runtime.
pub fn cudart_libname(os: OsFamily, version: CudaVersion) -> Option<&'static str> {
    match (os, version) {
        (OsFamily::Windows, CudaVersion::V11) => Some("cudart64_110.dll"),
        (OsFamily::Windows, CudaVersion::V12) => Some("cudart64_12.dll"),
        (OsFamily::Windows, CudaVersion::V13) => Some("cudart64_13.dll"),
        (OsFamily::Linux, CudaVersion::V11) => Some("libcudart.so.11.0"),
        (OsFamily::Linux, CudaVersion::V12) => Some("libcudart.so.12"),
        (OsFamily::Linux, CudaVersion::V13) => Some("libcudart.so.13"),
        (OsFamily::Macos, _) => None,
    }
}

/// Whether the CUDA runtime for `version` is present for the backend at
/// `backend_dir`, migrating it from the legacy shared location if needed.
///
/// A failed migration is logged and reported as "not present" so the caller
/// re-downloads the runtime instead of hard-failing.
pub fn is_cuda_runtime_installed(
    backend_dir: &Path,
    data_dir: &Path,
    os: OsFamily,
    version: CudaVersion,
) -> bool {
    let Some(libname) = cudart_libname(os, version) else {
        return false;
    };

    let new_path = backend_dir.join("build").join("bin").join(libname);
    if new_path.exists() {
        return true;
    }

    let old_path = layout::legacy_lib_dir(data_dir).join(libname);
    if !old_path.exists() {
        return false;
    }

    let target_dir = backend_dir.join("build").join("bin");
    if !target_dir.exists() {
        if let Err(err) = fs::create_dir_all(&target_dir) {
            warn!("Failed to create {}: {err}", target_dir.display());
            return false;
        }
    }

    match fs::rename(&old_path, &new_path) {
        Ok(()) => {
            info!("Migrated {libname} from legacy lib directory to {}", new_path.display());
            true
        }
        Err(err) => {
            warn!("Failed to move legacy CUDA runtime {libname}: {err}");
            false
        }
    }
}
