use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use teloxide::Bot;
use tracing::{error, info};

use herald_core::HeraldConfig;
use herald_dispatch::{BroadcastService, Dispatcher};
use herald_registry::DestinationRegistry;
use herald_telegram::{TelegramAdapter, TelegramSender};

mod app;
mod http;

/// Telegram channel broadcaster.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Config file (default: $HERALD_CONFIG, then ~/.herald/herald.toml).
    #[arg(long, short)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "herald=info,herald_registry=info,herald_dispatch=info,herald_telegram=info,tower_http=info".into()
            }),
        )
        .init();

    // explicit flag > HERALD_CONFIG env > ~/.herald/herald.toml
    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("HERALD_CONFIG").ok());
    let config = HeraldConfig::load(config_path.as_deref())?;

    let bot = Bot::new(&config.telegram.bot_token);
    let registry = Arc::new(DestinationRegistry::new());
    let service = Arc::new(BroadcastService::new(
        Arc::clone(&registry),
        Dispatcher::new(config.dispatch.clone()),
        Arc::new(TelegramSender::new(bot.clone())),
    ));
    info!(
        pool_size = config.dispatch.pool_size,
        send_timeout_ms = config.dispatch.send_timeout_ms,
        backoff_ceiling_ms = config.dispatch.backoff_ceiling_ms,
        "broadcast service ready"
    );

    let adapter = TelegramAdapter::new(bot, &config.telegram, Arc::clone(&service))?;

    if config.health.enabled {
        let addr: SocketAddr = format!("{}:{}", config.health.bind, config.health.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let router = app::build_router(Arc::new(app::AppState::new(Arc::clone(&service))));
        info!("health endpoint listening on {}", addr);
        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                error!(error = %e, "health server stopped");
            }
        });
    }

    adapter.run().await;
    info!("telegram dispatcher stopped, shutting down");
    Ok(())
}
