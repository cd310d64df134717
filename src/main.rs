use anyhow::Result;
use study_tutor::cli;

#[tokio::main]
async fn main() -> Result<()> {
    cli::run().await
}
