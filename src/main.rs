use anyhow::Result;
use onleave::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
