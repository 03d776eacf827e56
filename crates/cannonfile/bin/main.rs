use cannonfile::Outcome;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "update-cannonfile-version")]
#[command(about = "Writes the package.json version into cannonfile.toml", long_about = None)]
struct Args {
    /// Project root holding package.json and cannonfile.toml
    #[arg(long, default_value = ".")]
    root: PathBuf,
}

fn main() -> eyre::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    match cannonfile::sync_dir(&args.root)? {
        Outcome::InSync { .. } => {
            tracing::info!("Cannonfile is already in-sync with the Node.js package.")
        }
        Outcome::Updated { version } => {
            tracing::info!("Updated Cannonfile version to {}", version)
        }
    }

    Ok(())
}
