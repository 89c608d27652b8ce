use std::sync::Arc;

use clap::Parser;
use thiserror::Error;
use tracing::info;
use tracing_subscriber::EnvFilter;

use pbigate::auth::AzureTokenProvider;
use pbigate::configuration::{ConfigurationError, Settings};
use pbigate::gateway::{HttpGateway, TransportError};
use pbigate::powerbi::PowerBi;
use pbigate::routes;
use pbigate::sink::LocalDirSink;

#[derive(Parser)]
#[command(name = "pbigate")]
#[command(about = "HTTP automation gateway for the Power BI REST API")]
struct Args {
    #[arg(short, long, default_value = "8080")]
    port: u16,

    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
}

#[derive(Error, Debug)]
enum StartupError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Client(#[from] TransportError),
    #[error("failed to bind or serve: {0}")]
    Io(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let settings = Settings::from_env()?;

    let tokens = Arc::new(AzureTokenProvider::new(settings.authority_base_url()));
    let gateway = Arc::new(HttpGateway::new()?);
    let sink = Arc::new(LocalDirSink::new(settings.export_directory()));
    let api = Arc::new(PowerBi::new(
        tokens,
        gateway,
        sink,
        settings.api_base_url(),
    ));

    let app = routes::router(api);

    let bind_addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("pbigate listening on {}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
