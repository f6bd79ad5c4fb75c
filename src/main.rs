use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use outpost::config::Config;
use outpost::gateway::{AssetManifest, AssetRequest, DetachedHost, Gateway};

#[derive(Parser, Debug)]
#[command(name = "outpost")]
#[command(about = "An offline-first asset cache gateway")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/outpost/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Seed the asset store from the configured manifest
  Install,

  /// Resolve one URL through the store-first policy
  Fetch {
    /// URL or same-origin path to resolve
    url: String,

    /// Treat the request as a full-page navigation
    #[arg(long)]
    navigate: bool,

    /// Write the body to a file instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,
  },
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _log_guard = init_tracing();

  let config = Config::load(args.config.as_deref())?;
  let gateway = Gateway::from_config(&config)?;

  match args.command {
    Command::Install => {
      let manifest = AssetManifest::from(config.manifest.clone());
      let stored = gateway.install(&manifest).await?;
      println!("seeded {} of {} assets", stored, manifest.paths.len());
    }

    Command::Fetch {
      url,
      navigate,
      output,
    } => {
      // One-shot host: no older instance holds any session
      gateway.activate(&DetachedHost)?;

      let request = if navigate {
        AssetRequest::navigate(url)
      } else {
        AssetRequest::get(url)
      };

      let Some(response) = gateway.handle(&request).await else {
        return Err(eyre!(
          "Request is not interceptable (non-GET or cross-origin); nothing to resolve"
        ));
      };

      tracing::info!(status = %response.status, content_type = %response.content_type, "resolved");

      match output {
        Some(path) => std::fs::write(&path, &response.body)
          .map_err(|e| eyre!("Failed to write {}: {}", path.display(), e))?,
        None => std::io::stdout()
          .write_all(&response.body)
          .map_err(|e| eyre!("Failed to write body: {}", e))?,
      }

      // The store refresh after a network hit is detached from the response
      // path; give it a moment before the runtime tears down
      tokio::time::sleep(Duration::from_millis(50)).await;
    }
  }

  Ok(())
}

fn init_tracing() -> tracing_appender::non_blocking::WorkerGuard {
  let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());

  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
    )
    .with_writer(writer)
    .init();

  guard
}
