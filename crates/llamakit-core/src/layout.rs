//! On-disk layout of installed backends
//!
//! The directory shape is load-bearing compatibility surface:
//!
//! ```text
//! <data-dir>/llamacpp/backends/<version>/<backend>/            backend root
//! <data-dir>/llamacpp/backends/<version>/<backend>/build/bin/  preferred exe location
//! <data-dir>/llamacpp/lib/                                     legacy shared CUDA runtime
//! ```

use crate::hardware::OsFamily;
use std::path::{Path, PathBuf};

/// Engine directory under the application data dir.
pub const ENGINE_DIR: &str = "llamacpp";

/// Root holding one directory per installed version.
pub fn backends_root(data_dir: &Path) -> PathBuf {
    data_dir.join(ENGINE_DIR).join("backends")
}

/// Directory of one (version, backend) install.
pub fn backend_dir(data_dir: &Path, version: &str, backend: &str) -> PathBuf {
    backends_root(data_dir).join(version).join(backend)
}

/// Legacy shared location for CUDA runtime libraries, predating per-backend
/// `build/bin` placement.
pub fn legacy_lib_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(ENGINE_DIR).join("lib")
}

/// Path of the server executable for an installed backend.
///
/// Prefers `build/bin/<exe>`; archives without a `build` directory unpack the
/// executable at the backend root instead.
pub fn server_exe_path(backend_dir: &Path, os: OsFamily) -> PathBuf {
    let exe_name = os.server_exe_name();
    let build_path = backend_dir.join("build").join("bin").join(exe_name);
    if build_path.exists() {
        return build_path;
    }
    backend_dir.join(exe_name)
}

/// Whether a backend directory holds a usable install (executable present).
///
/// A directory without the executable is a partial or corrupted download and
/// must not be reported as usable.
pub fn is_backend_installed(backend_dir: &Path, os: OsFamily) -> bool {
    if !backend_dir.is_dir() {
        return false;
    }

    let exe_name = os.server_exe_name();
    backend_dir.join("build").join("bin").join(exe_name).exists()
        || backend_dir.join(exe_name).exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::{self, File};

    #[test]
    fn test_backend_dir_layout() {
        let dir = backend_dir(Path::new("/data"), "b7523", "win-common_cpus-x64");
        assert_eq!(
            dir,
            Path::new("/data/llamacpp/backends/b7523/win-common_cpus-x64")
        );
        assert_eq!(
            legacy_lib_dir(Path::new("/data")),
            Path::new("/data/llamacpp/lib")
        );
    }

    #[test]
    fn test_installed_check_prefers_build_bin() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = tmp.path().join("linux-common_cpus-x64");
        let bin = backend.join("build").join("bin");
        fs::create_dir_all(&bin).unwrap();

        assert!(!is_backend_installed(&backend, OsFamily::Linux));

        File::create(bin.join("llama-server")).unwrap();
        assert!(is_backend_installed(&backend, OsFamily::Linux));
        assert_eq!(
            server_exe_path(&backend, OsFamily::Linux),
            bin.join("llama-server")
        );
    }

    #[test]
    fn test_installed_check_falls_back_to_root_exe() {
        let tmp = tempfile::tempdir().unwrap();
        let backend = tmp.path().join("win-common_cpus-x64");
        fs::create_dir_all(&backend).unwrap();
        File::create(backend.join("llama-server.exe")).unwrap();

        assert!(is_backend_installed(&backend, OsFamily::Windows));
        assert_eq!(
            server_exe_path(&backend, OsFamily::Windows),
            backend.join("llama-server.exe")
        );
    }

    #[test]
    fn test_missing_directory_is_not_installed() {
        assert!(!is_backend_installed(
            Path::new("/does/not/exist"),
            OsFamily::Linux
        ));
    }
}
