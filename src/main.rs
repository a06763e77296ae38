use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,teloxide=warn".parse().unwrap());
    tracing_subscriber::fmt().with_env_filter(filter).init();

    dabo::cli::run().await
}
