use anyhow::Result;
use music_advisor::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
