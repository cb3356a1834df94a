use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Strangler Fig Proxy — stable ingress for incremental monolith migration
#[derive(Parser)]
#[command(name = "strangler-proxy", version, about)]
struct Cli {
    /// Override the listen port (takes precedence over the PORT variable)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> strangler_proxy::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level)),
        )
        .init();

    tracing::info!("Strangler Fig Proxy v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration once; it stays immutable for the process lifetime
    let mut config = strangler_proxy::config::ProxyConfig::from_env()?;
    if let Some(port) = cli.port {
        config.listen_port = port;
    }

    tracing::info!(port = config.listen_port, "Listen port");
    tracing::info!(url = config.monolith_url, "Monolith URL");
    tracing::info!(url = config.movies_service_url, "Movies service URL");
    tracing::info!(url = config.events_service_url, "Events service URL");
    tracing::info!(
        enabled = config.gradual_migration,
        percent = config.movies_migration_percent,
        "Gradual migration"
    );

    let proxy = strangler_proxy::ProxyServer::new(config)?;
    proxy.start().await?;

    tracing::info!("Proxy ready — press Ctrl+C to stop");
    proxy.wait_for_shutdown().await;

    Ok(())
}
