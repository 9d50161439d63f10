//! legendary - main entry point

use clap::Parser;
use legendary::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // MLFLOW_* settings may live in a .env file
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "legendary=info".into()),
        )
        .init();

    let cli = Cli::parse();
    cli::run(cli).await
}
