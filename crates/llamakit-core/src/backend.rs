//! Backend identifier grammar, legacy-name migration and host support selection
//!
//! Backend identifiers are strings at every I/O boundary (release asset
//! names, directory names, stored settings). Internally the current
//! consolidated grammar is a small tagged union so the selector and renderer
//! stay exhaustive-match-checkable:
//!
//! `{os}-[cuda-{11|12|13}-|vulkan-]{common_cpus}-{arch}`
//!
//! The legacy grammar additionally carries per-ISA tokens (`avx`, `avx2`,
//! `avx512`, `noavx`) and `cu{major.minor}` CUDA markers; those names only
//! ever enter through [`migrate_legacy`].

use crate::cuda::CudaVersion;
use crate::hardware::{Arch, FeatureMatrix, OsFamily, SystemProfile};

/// Accelerator component of a consolidated backend identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accelerator {
    Cpu,
    Cuda(CudaVersion),
    Vulkan,
}

/// A backend identifier in the current consolidated grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendId {
    pub os: OsFamily,
    pub accelerator: Accelerator,
    pub arch: Arch,
}

impl BackendId {
    pub fn cpu(os: OsFamily, arch: Arch) -> Self {
        Self {
            os,
            accelerator: Accelerator::Cpu,
            arch,
        }
    }

    /// Render to the external string form.
    ///
    /// macOS and ARM never had per-ISA variants and use the short
    /// `{os}-{arch}` placeholder form instead of `common_cpus`.
    pub fn render(&self) -> String {
        let prefix = self.os.backend_prefix();
        let arch = self.arch.as_str();

        if self.os == OsFamily::Macos {
            return format!("macos-{arch}");
        }
        if self.arch == Arch::Arm64 {
            return format!("{prefix}{arch}");
        }

        match self.accelerator {
            Accelerator::Cpu => format!("{prefix}common_cpus-{arch}"),
            Accelerator::Cuda(v) => format!("{prefix}cuda-{}-common_cpus-{arch}", v.major()),
            Accelerator::Vulkan => format!("{prefix}vulkan-common_cpus-{arch}"),
        }
    }
}

impl std::fmt::Display for BackendId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render())
    }
}

/// Map a legacy backend identifier to its consolidated equivalent.
///
/// Total and side-effect-free: tokens that match no legacy pattern pass
/// through unchanged (already consolidated, or macOS/ARM which never had
/// per-ISA variants). This passthrough is the compatibility fallback, not an
/// error path.
pub fn migrate_legacy(backend: &str) -> String {
    let os_prefix = if backend.starts_with("win-") {
        "win-"
    } else if backend.starts_with("linux-") {
        "linux-"
    } else {
        ""
    };

    // Architecture suffix, defaulting to x64
    let arch_suffix = if backend.contains("-arm64") {
        "arm64"
    } else {
        "x64"
    };

    // GPU backends first: the CUDA marker wins over any ISA token
    if backend.contains("cuda-cu12.0") {
        // e.g. 'linux-avx2-cuda-cu12.0-x64' -> 'linux-cuda-12-common_cpus-x64'
        return format!("{os_prefix}cuda-12-common_cpus-{arch_suffix}");
    }
    if backend.contains("cuda-cu11.7") {
        // e.g. 'win-noavx-cuda-cu11.7-x64' -> 'win-cuda-11-common_cpus-x64'
        return format!("{os_prefix}cuda-11-common_cpus-{arch_suffix}");
    }
    if backend.contains("vulkan") {
        // Already the consolidated name
        if backend.contains("vulkan-common_cpus") {
            return backend.to_string();
        }
        // e.g. 'linux-vulkan-x64' -> 'linux-vulkan-common_cpus-x64'
        return format!("{os_prefix}vulkan-common_cpus-{arch_suffix}");
    }

    // CPU-only legacy names. 'avx-' and 'noavx-' need the arch suffix so
    // they do not also match 'avx2' / 'avx512'.
    let is_legacy_cpu = backend.contains("avx512")
        || backend.contains("avx2")
        || backend.contains(&format!("avx-{arch_suffix}"))
        || backend.contains(&format!("noavx-{arch_suffix}"));

    if is_legacy_cpu {
        // e.g. 'win-avx512-x64' -> 'win-common_cpus-x64'
        return format!("{os_prefix}common_cpus-{arch_suffix}");
    }

    backend.to_string()
}

/// Backend identifiers the host is eligible to run.
///
/// Never empty: unsupported OS/arch pairs (Windows/Linux ARM) yield their
/// single architecture placeholder. Order only feeds default-choice
/// heuristics downstream.
///
/// Note: on Windows the Vulkan entry is gated on `cuda13 && vulkan`. That
/// coupling is inherited behavior, kept until upstream intent is clear.
pub fn supported_backends(profile: &SystemProfile, features: &FeatureMatrix) -> Vec<String> {
    let os = profile.os;
    let arch = profile.arch;
    let mut supported: Vec<BackendId> = Vec::new();

    match (os, arch) {
        (OsFamily::Windows, Arch::X64) => {
            supported.push(BackendId::cpu(os, arch));
            if features.cuda11 {
                supported.push(BackendId {
                    os,
                    accelerator: Accelerator::Cuda(CudaVersion::V11),
                    arch,
                });
            }
            if features.cuda12 {
                supported.push(BackendId {
                    os,
                    accelerator: Accelerator::Cuda(CudaVersion::V12),
                    arch,
                });
            }
            if features.cuda13 && features.vulkan {
                supported.push(BackendId {
                    os,
                    accelerator: Accelerator::Vulkan,
                    arch,
                });
            }
        }
        (OsFamily::Linux, Arch::X64) => {
            supported.push(BackendId::cpu(os, arch));
            if features.cuda11 {
                supported.push(BackendId {
                    os,
                    accelerator: Accelerator::Cuda(CudaVersion::V11),
                    arch,
                });
            }
            if features.cuda12 {
                supported.push(BackendId {
                    os,
                    accelerator: Accelerator::Cuda(CudaVersion::V12),
                    arch,
                });
            }
            if features.vulkan {
                supported.push(BackendId {
                    os,
                    accelerator: Accelerator::Vulkan,
                    arch,
                });
            }
        }
        // Not yet supported: single placeholder, never an empty list
        (OsFamily::Windows | OsFamily::Linux, Arch::Arm64) => {
            supported.push(BackendId::cpu(os, arch));
        }
        (OsFamily::Macos, _) => {
            supported.push(BackendId::cpu(os, arch));
        }
    }

    supported.iter().map(BackendId::render).collect()
}
