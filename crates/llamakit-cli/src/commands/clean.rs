use anyhow::bail;
use colored::Colorize;
use llamakit_core::catalog::{local, selection};
use llamakit_core::config::BackendConfig;
use llamakit_core::hardware::OsFamily;

pub fn run(config: BackendConfig, backend_type: &str) -> anyhow::Result<()> {
    let os = OsFamily::host()?;
    let installed = local::scan_installed(&config.data_dir, os)?;

    let Some(latest) = selection::find_latest_for_type(&installed, backend_type) else {
        bail!("no installed versions of {backend_type}");
    };
    let (latest_version, _) = selection::parse_selection(&latest)?;

    let removed = local::remove_old_versions(&config.data_dir, os, &latest_version, backend_type)?;

    if removed.is_empty() {
        println!("Nothing to clean; {latest} is the only installed version");
    } else {
        for path in &removed {
            println!("{} {}", "removed".green(), path.display());
        }
        println!("Kept {}", latest.bold());
    }

    Ok(())
}
