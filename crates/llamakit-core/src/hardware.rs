//! Host hardware profiling
//!
//! Takes one immutable snapshot of the host (OS, architecture, CPU
//! extensions, GPUs) and derives the boolean feature matrix the backend
//! selector works from. GPU facts come from filesystem/process probes
//! (`nvidia-smi`, `vulkaninfo`) rather than linking to GPU libraries at
//! compile time, keeping the crate lightweight.

use crate::error::{Error, Result};
use crate::version::compare_versions;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::env::consts;

/// Operating-system family of the host machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Windows,
    Linux,
    Macos,
}

impl OsFamily {
    /// Family of the running host, or a hardware-query error on anything else.
    pub fn host() -> Result<Self> {
        match consts::OS {
            "windows" => Ok(OsFamily::Windows),
            "linux" => Ok(OsFamily::Linux),
            "macos" => Ok(OsFamily::Macos),
            other => Err(Error::HardwareQuery(format!(
                "unsupported operating system: {other}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OsFamily::Windows => "windows",
            OsFamily::Linux => "linux",
            OsFamily::Macos => "macos",
        }
    }

    /// Prefix used in backend identifiers (`win-`, `linux-`, none for macOS).
    pub fn backend_prefix(&self) -> &'static str {
        match self {
            OsFamily::Windows => "win-",
            OsFamily::Linux => "linux-",
            OsFamily::Macos => "",
        }
    }

    /// Platform token used in CUDA runtime archive names.
    pub fn cudart_platform(&self) -> Option<&'static str> {
        match self {
            OsFamily::Windows => Some("win"),
            OsFamily::Linux => Some("linux"),
            OsFamily::Macos => None,
        }
    }

    /// Name of the backend server executable on this OS.
    pub fn server_exe_name(&self) -> &'static str {
        match self {
            OsFamily::Windows => "llama-server.exe",
            _ => "llama-server",
        }
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU architecture of the host machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    X64,
    Arm64,
}

impl Arch {
    pub fn host() -> Result<Self> {
        match consts::ARCH {
            "x86_64" => Ok(Arch::X64),
            "aarch64" => Ok(Arch::Arm64),
            other => Err(Error::HardwareQuery(format!(
                "unsupported architecture: {other}"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X64 => "x64",
            Arch::Arm64 => "arm64",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts about one GPU device.
///
/// A present `compute_capability` implies an NVIDIA device; a present
/// `vulkan_api_version` implies the Vulkan loader found the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GpuInfo {
    pub driver_version: String,
    pub compute_capability: Option<String>,
    pub vulkan_api_version: Option<String>,
}

/// Immutable snapshot of the host, taken once per resolution pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemProfile {
    pub os: OsFamily,
    pub arch: Arch,
    pub cpu_extensions: Vec<String>,
    pub gpus: Vec<GpuInfo>,
    /// Total system RAM in bytes
    pub total_memory_bytes: u64,
    /// Available system RAM in bytes at detection time
    pub available_memory_bytes: u64,
}

impl SystemProfile {
    /// Detect the host profile.
    ///
    /// There is no safe default hardware profile; a failed query is fatal to
    /// the whole resolution pass.
    pub fn detect() -> Result<Self> {
        let os = OsFamily::host()?;
        let arch = Arch::host()?;

        let mut sys = sysinfo::System::new();
        sys.refresh_memory();

        Ok(Self {
            os,
            arch,
            cpu_extensions: detect_cpu_extensions(),
            gpus: detect_gpus(os),
            total_memory_bytes: sys.total_memory(),
            available_memory_bytes: sys.available_memory(),
        })
    }

    fn has_extension(&self, name: &str) -> bool {
        self.cpu_extensions.iter().any(|e| e == name)
    }
}

/// Derived boolean capability set. Never persisted; recomputed per pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    pub avx: bool,
    pub avx2: bool,
    pub avx512: bool,
    pub cuda11: bool,
    pub cuda12: bool,
    pub cuda13: bool,
    pub vulkan: bool,
}

/// Minimum NVIDIA driver versions per CUDA major version.
/// https://docs.nvidia.com/deploy/cuda-compatibility/#cuda-11-and-later-defaults-to-minor-version-compatibility
fn min_cuda_drivers(os: OsFamily) -> Option<(&'static str, &'static str, &'static str)> {
    match os {
        OsFamily::Linux => Some(("450.80.02", "525.60.13", "580")),
        OsFamily::Windows => Some(("452.39", "527.41", "580")),
        OsFamily::Macos => None,
    }
}

impl FeatureMatrix {
    /// Derive the feature matrix from a system profile.
    ///
    /// Each CUDA flag is evaluated independently against its own minimum
    /// driver version; `cuda12` does not imply `cuda11`.
    pub fn from_profile(profile: &SystemProfile) -> Self {
        let mut features = FeatureMatrix {
            avx: profile.has_extension("avx"),
            avx2: profile.has_extension("avx2"),
            avx512: profile.has_extension("avx512"),
            ..Default::default()
        };

        let minimums = min_cuda_drivers(profile.os);

        for gpu in &profile.gpus {
            if gpu.compute_capability.is_some() {
                if let Some((min11, min12, min13)) = minimums {
                    let driver = gpu.driver_version.as_str();
                    if compare_versions(driver, min11) != Ordering::Less {
                        features.cuda11 = true;
                    }
                    if compare_versions(driver, min12) != Ordering::Less {
                        features.cuda12 = true;
                    }
                    if compare_versions(driver, min13) != Ordering::Less {
                        features.cuda13 = true;
                    }
                }
            }

            if gpu.vulkan_api_version.is_some() {
                features.vulkan = true;
            }
        }

        features
    }
}

#[cfg(target_arch = "x86_64")]
fn detect_cpu_extensions() -> Vec<String> {
    let mut extensions = Vec::new();
    if is_x86_feature_detected!("avx") {
        extensions.push("avx".to_string());
    }
    if is_x86_feature_detected!("avx2") {
        extensions.push("avx2".to_string());
    }
    if is_x86_feature_detected!("avx512f") {
        extensions.push("avx512".to_string());
    }
    extensions
}

#[cfg(not(target_arch = "x86_64"))]
fn detect_cpu_extensions() -> Vec<String> {
    Vec::new()
}

/// Probe GPUs via `nvidia-smi` and `vulkaninfo`. Probe failures mean
/// "no such device", never an error.
fn detect_gpus(os: OsFamily) -> Vec<GpuInfo> {
    let mut gpus = detect_nvidia_gpus();

    if let Some(api_version) = detect_vulkan_api_version(os) {
        if gpus.is_empty() {
            gpus.push(GpuInfo {
                driver_version: "0.0".to_string(),
                compute_capability: None,
                vulkan_api_version: Some(api_version),
            });
        } else {
            for gpu in &mut gpus {
                gpu.vulkan_api_version = Some(api_version.clone());
            }
        }
    }

    gpus
}

/// Query NVIDIA devices with `nvidia-smi`, one CSV line per GPU.
fn detect_nvidia_gpus() -> Vec<GpuInfo> {
    let output = match std::process::Command::new("nvidia-smi")
        .args([
            "--query-gpu=driver_version,compute_cap",
            "--format=csv,noheader",
        ])
        .output()
    {
        Ok(output) if output.status.success() => output,
        _ => return Vec::new(),
    };

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .filter_map(|line| {
            let mut fields = line.split(',').map(str::trim);
            let driver = fields.next()?.to_string();
            if driver.is_empty() {
                return None;
            }
            let compute_cap = fields.next().unwrap_or("").to_string();
            Some(GpuInfo {
                driver_version: driver,
                compute_capability: (!compute_cap.is_empty()).then_some(compute_cap),
                vulkan_api_version: None,
            })
        })
        .collect()
}

/// Check for a working Vulkan loader. macOS builds ship Metal instead.
fn detect_vulkan_api_version(os: OsFamily) -> Option<String> {
    if os == OsFamily::Macos {
        return None;
    }

    let output = std::process::Command::new("vulkaninfo")
        .arg("--summary")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    stdout
        .lines()
        .find(|line| line.contains("apiVersion"))
        .and_then(|line| line.split_whitespace().last())
        .map(|v| v.trim_matches(|c| c == '(' || c == ')').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nvidia_gpu(driver: &str) -> GpuInfo {
        GpuInfo {
            driver_version: driver.to_string(),
            compute_capability: Some("8.6".to_string()),
            vulkan_api_version: None,
        }
    }

    fn profile(os: OsFamily, extensions: &[&str], gpus: Vec<GpuInfo>) -> SystemProfile {
        SystemProfile {
            os,
            arch: Arch::X64,
            cpu_extensions: extensions.iter().map(|s| s.to_string()).collect(),
            gpus,
            total_memory_bytes: 16 << 30,
            available_memory_bytes: 8 << 30,
        }
    }

    #[test]
    fn test_features_cpu_only() {
        let p = profile(OsFamily::Linux, &["avx", "avx2"], vec![]);
        let features = FeatureMatrix::from_profile(&p);

        assert!(features.avx);
        assert!(features.avx2);
        assert!(!features.avx512);
        assert!(!features.cuda11);
        assert!(!features.vulkan);
    }

    #[test]
    fn test_features_cuda_linux() {
        // Driver 530 clears the CUDA 11 and 12 minimums on Linux, not 13.
        let p = profile(OsFamily::Linux, &[], vec![nvidia_gpu("530.00")]);
        let features = FeatureMatrix::from_profile(&p);

        assert!(features.cuda11);
        assert!(features.cuda12);
        assert!(!features.cuda13);
    }

    #[test]
    fn test_features_cuda_flags_are_independent() {
        // Windows driver between the CUDA 11 and CUDA 12 minimums.
        let p = profile(OsFamily::Windows, &[], vec![nvidia_gpu("500.00")]);
        let features = FeatureMatrix::from_profile(&p);

        assert!(features.cuda11);
        assert!(!features.cuda12);
        assert!(!features.cuda13);
    }

    #[test]
    fn test_features_vulkan_without_nvidia() {
        let p = profile(
            OsFamily::Windows,
            &[],
            vec![GpuInfo {
                driver_version: "0.0".to_string(),
                compute_capability: None,
                vulkan_api_version: Some("1.3".to_string()),
            }],
        );
        let features = FeatureMatrix::from_profile(&p);

        assert!(features.vulkan);
        assert!(!features.cuda11);
    }

    #[test]
    fn test_features_no_cuda_on_macos() {
        let p = profile(OsFamily::Macos, &[], vec![nvidia_gpu("600.00")]);
        let features = FeatureMatrix::from_profile(&p);

        assert!(!features.cuda11);
        assert!(!features.cuda12);
        assert!(!features.cuda13);
    }
}
