mod cli;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // RUST_LOG pisa el filtro por defecto
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("msa_client=debug,reqwest=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    cli::run().await
}
