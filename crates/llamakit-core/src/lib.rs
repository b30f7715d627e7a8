//! llamakit-core: llama.cpp inference backend provisioning
//!
//! Resolves which prebuilt `llama.cpp` server backends a host can run,
//! merges the published release catalog with what is already installed,
//! and downloads, extracts, and lays out backend builds (plus their CUDA
//! runtimes) under the application data directory.
//!
//! # Overview
//!
//! - [`hardware`]: host OS/arch/CPU-extension/GPU probing and the derived
//!   feature matrix
//! - [`backend`]: backend identifier grammar, legacy-name migration, and
//!   the supported-backend set for a host
//! - [`catalog`]: remote release catalog (with CDN mirror fallback), local
//!   install scanning, merge, and default-selection heuristics
//! - [`provision`]: download + extract pipeline with lifecycle events
//!
//! # Example
//!
//! ```no_run
//! use llamakit_core::catalog::build_inventory;
//! use llamakit_core::config::BackendConfig;
//! use llamakit_core::hardware::{FeatureMatrix, SystemProfile};
//!
//! # async fn run() -> llamakit_core::Result<()> {
//! let config = BackendConfig::new("/home/user/.local/share/app");
//! let profile = SystemProfile::detect()?;
//! let features = FeatureMatrix::from_profile(&profile);
//! let inventory = build_inventory(&config, &profile, &features).await?;
//! for entry in &inventory {
//!     println!("{}/{}", entry.version, entry.backend);
//! }
//! # Ok(())
//! # }
//! ```

pub mod archive;
pub mod backend;
pub mod catalog;
pub mod config;
pub mod cuda;
pub mod download;
pub mod error;
pub mod events;
pub mod hardware;
pub mod layout;
pub mod provision;
pub mod proxy;
pub mod version;

pub use backend::{migrate_legacy, supported_backends};
pub use catalog::{BackendDescriptor, build_inventory, merge_catalogs};
pub use config::BackendConfig;
pub use download::{DownloadTransport, HttpDownloader};
pub use error::{Error, Result};
pub use events::{DownloadEvent, EventSink, TracingEventSink};
pub use hardware::{FeatureMatrix, SystemProfile};
pub use provision::{ArtifactProvisioner, InstallOutcome};
pub use version::compare_versions;
