use colored::Colorize;
use llamakit_core::backend::supported_backends;
use llamakit_core::hardware::{FeatureMatrix, SystemProfile};

pub fn run() -> anyhow::Result<()> {
    let profile = SystemProfile::detect()?;
    let features = FeatureMatrix::from_profile(&profile);

    println!("{}", "Host".bold());
    println!("  os:    {}", profile.os.as_str());
    println!("  arch:  {}", profile.arch.as_str());
    println!(
        "  memory: {:.1} GiB total, {:.1} GiB available",
        profile.total_memory_bytes as f64 / (1 << 30) as f64,
        profile.available_memory_bytes as f64 / (1 << 30) as f64
    );
    println!(
        "  cpu extensions: {}",
        if profile.cpu_extensions.is_empty() {
            "none".dimmed().to_string()
        } else {
            profile.cpu_extensions.join(", ")
        }
    );

    println!("{}", "GPUs".bold());
    if profile.gpus.is_empty() {
        println!("  {}", "none detected".dimmed());
    }
    for gpu in &profile.gpus {
        println!(
            "  driver {} compute {} vulkan {}",
            gpu.driver_version,
            gpu.compute_capability.as_deref().unwrap_or("-"),
            gpu.vulkan_api_version.as_deref().unwrap_or("-")
        );
    }

    println!("{}", "Features".bold());
    let flag = |on: bool| {
        if on {
            "yes".green().to_string()
        } else {
            "no".dimmed().to_string()
        }
    };
    println!("  cuda 11: {}", flag(features.cuda11));
    println!("  cuda 12: {}", flag(features.cuda12));
    println!("  cuda 13: {}", flag(features.cuda13));
    println!("  vulkan:  {}", flag(features.vulkan));

    println!("{}", "Supported backends".bold());
    for backend in supported_backends(&profile, &features) {
        println!("  {backend}");
    }

    Ok(())
}
