use anyhow::Result;
use clap::Parser;
use spendwise::cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    Cli::parse().run().await
}
