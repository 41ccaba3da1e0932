use notepad_sync::app::{build_router, open_store};
use notepad_sync::config::Config;
use notepad_sync::state::AppState;
use std::panic;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    // Set panic hook for better error messages
    panic::set_hook(Box::new(|info| {
        eprintln!("PANIC: {info}");
    }));

    // Configuration is read first so its log level can seed the filter
    let loaded = Config::load();
    let log_level = loaded
        .as_ref()
        .map(|config| config.log_level.clone())
        .unwrap_or_else(|_| Config::default().log_level);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("notepad_sync={log_level},tower_http=debug,axum::rejection=trace,info").into()
        }))
        .init();

    info!("Starting server...");

    let config = loaded.unwrap_or_else(|e| {
        error!("Failed to load configuration: {}", e);
        warn!("Using default configuration");
        Config::default()
    });

    if config.announce_departures {
        info!("Departure notices enabled");
    }

    let service_name = config.service_name.clone();
    let store = open_store(&config).await;
    let address = config.server_address();
    let app = build_router(AppState::new(store, config));

    let listener = match tokio::net::TcpListener::bind(&address).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", address, e);
            std::process::exit(1);
        }
    };

    info!("🚀 {} running on http://{}", service_name, address);
    info!("📡 WebSocket available at ws://{}/ws", address);
    info!("📚 Swagger UI available at http://{}/swagger", address);

    if let Err(e) = axum::serve(listener, app).await {
        error!("Server error: {}", e);
        std::process::exit(1);
    }
}
