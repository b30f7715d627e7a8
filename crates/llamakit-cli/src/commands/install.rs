use colored::Colorize;
use llamakit_core::catalog::selection::parse_selection;
use llamakit_core::config::BackendConfig;
use llamakit_core::events::{DownloadEvent, EventSink};
use llamakit_core::hardware::OsFamily;
use llamakit_core::provision::{ArtifactProvisioner, InstallOutcome};
use llamakit_core::{HttpDownloader, layout};
use std::io::Write;
use std::sync::Arc;

/// Prints download progress on one line and a final status.
struct ConsoleSink;

impl EventSink for ConsoleSink {
    fn emit(&self, event: DownloadEvent) {
        match event {
            DownloadEvent::Progress {
                percent,
                transferred,
                total,
                ..
            } => {
                print!(
                    "\r  {percent:5.1}% ({} / {} MiB)",
                    transferred >> 20,
                    total >> 20
                );
                let _ = std::io::stdout().flush();
            }
            DownloadEvent::Stopped { .. } => println!("\n{}", "stopped".yellow()),
            DownloadEvent::Success { .. } => println!("\n{}", "done".green()),
            DownloadEvent::Error { message, .. } => {
                println!("\n{} {message}", "error:".red());
            }
        }
    }
}

pub async fn run(config: BackendConfig, selection: &str) -> anyhow::Result<()> {
    let (version, backend) = parse_selection(selection)?;
    let os = OsFamily::host()?;

    println!("Installing {}", selection.bold());

    let provisioner = ArtifactProvisioner::new(
        config.clone(),
        os,
        Arc::new(HttpDownloader::new()),
        Arc::new(ConsoleSink),
    );

    match provisioner.install(&version, &backend).await? {
        InstallOutcome::Installed => {
            let dir = layout::backend_dir(&config.data_dir, &version, &backend);
            println!("Installed to {}", dir.display().to_string().bold());
        }
        InstallOutcome::Stopped => {
            println!("{}", "Installation was cancelled".yellow());
        }
    }

    Ok(())
}
