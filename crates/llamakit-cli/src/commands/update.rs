use colored::Colorize;
use llamakit_core::catalog::{build_inventory, selection};
use llamakit_core::config::BackendConfig;
use llamakit_core::hardware::{FeatureMatrix, SystemProfile};

pub async fn run(config: BackendConfig, current: &str) -> anyhow::Result<()> {
    let profile = SystemProfile::detect()?;
    let features = FeatureMatrix::from_profile(&profile);
    let inventory = build_inventory(&config, &profile, &features).await?;

    let check = selection::check_for_updates(current, &inventory)?;
    if check.update_needed {
        println!(
            "{} {} is available (currently {current})",
            "Update:".green().bold(),
            check.target_selection.unwrap_or_default()
        );
    } else {
        println!("{current} is up to date");
    }

    Ok(())
}
