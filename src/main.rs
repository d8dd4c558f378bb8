use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use ups_proxy::config::config_search_paths;
use ups_proxy::{build_router, AppState, CarrierEnvironment, ProxyConfig, ProxyError};

#[derive(Parser)]
#[command(
    name = "ups-proxy",
    about = "CORS-friendly proxy for the UPS tracking, track alert and OAuth APIs",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Default carrier environment: production or test (overrides config and UPS_ENV)
    #[arg(short, long)]
    environment: Option<String>,

    /// Log filter directive, used when RUST_LOG is unset
    #[arg(long, default_value = "ups_proxy=info,tower_http=info")]
    log_filter: String,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = ProxyConfig::find_and_load(cli.config.as_deref())?;
    config.apply_env()?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(ref name) = cli.environment {
        config.environment = CarrierEnvironment::from_name(name).ok_or_else(|| {
            ProxyError::config(format!(
                "Unknown environment '{name}'. Expected 'test' or 'production'"
            ))
        })?;
    }

    info!("ups-proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("  Environment:  {}", config.environment);
    info!("  Production:   {}", config.carrier.production_url);
    info!("  Sandbox:      {}", config.carrier.test_url);
    info!("  Tracking API: {:?}", config.carrier.track_api);
    info!("  Timeout:      {}s", config.timeout_secs);
    info!("  Port:         {}", config.port);

    let client = reqwest::Client::builder()
        .timeout(config.timeout())
        .build()?;

    let port = config.port;
    let state = Arc::new(AppState { config, client });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{port}");
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
