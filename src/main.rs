use anyhow::Result;
use clap::Parser;

use ecolens_rs::app::launch;
use ecolens_rs::cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let mode = args.run_mode();
    let config = args.into_config();

    launch(&config, mode).await
}
