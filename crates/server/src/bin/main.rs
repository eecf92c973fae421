//! Binary entry point for the tokengate authorizer.

use tokengate_server::cmd::App;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();
    if let Err(e) = App::run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
