use colored::Colorize;
use llamakit_core::catalog::{build_inventory, local};
use llamakit_core::config::BackendConfig;
use llamakit_core::hardware::{FeatureMatrix, SystemProfile};
use std::collections::HashSet;

pub async fn run(config: BackendConfig, json: bool) -> anyhow::Result<()> {
    let profile = SystemProfile::detect()?;
    let features = FeatureMatrix::from_profile(&profile);

    let inventory = build_inventory(&config, &profile, &features).await?;
    let installed: HashSet<(String, String)> =
        local::scan_installed(&config.data_dir, profile.os)?
            .into_iter()
            .map(|d| (d.version, d.backend))
            .collect();

    if json {
        println!("{}", serde_json::to_string_pretty(&inventory)?);
        return Ok(());
    }

    if inventory.is_empty() {
        println!("{}", "No backends available for this machine".yellow());
        return Ok(());
    }

    for entry in &inventory {
        let marker = if installed.contains(&(entry.version.clone(), entry.backend.clone())) {
            "installed".green().to_string()
        } else {
            String::new()
        };
        println!("{}/{} {marker}", entry.version, entry.backend);
    }

    Ok(())
}
