use std::net::SocketAddr;

use api_server::http::{AppState, HealthInfo, build_router};
use shared::assistant::AssistantService;
use shared::config::{GatewayConfig, load_dotenv};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "api_server=info,shared=info,axum=info";

#[tokio::main]
async fn main() {
    let dotenv_result = load_dotenv();
    init_tracing();

    if let Err(err) = dotenv_result {
        error!("{err}");
        std::process::exit(1);
    }

    let config = match GatewayConfig::from_env() {
        Ok(cfg) => cfg,
        Err(err) => {
            error!("failed to read config: {err}");
            std::process::exit(1);
        }
    };

    let assistant = match AssistantService::from_config(&config) {
        Ok(assistant) => assistant,
        Err(err) => {
            error!("failed to build upstream clients: {err}");
            std::process::exit(1);
        }
    };

    if config.credentials.is_none() {
        error!("AWS credentials are not configured; Bedrock calls will fail");
    }

    let app = build_router(AppState {
        assistant,
        health: HealthInfo::from_config(&config),
    });

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid API_BIND_ADDR {}: {err}", config.bind_addr);
            std::process::exit(1);
        }
    };

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!("failed to bind {addr}: {err}");
            std::process::exit(1);
        }
    };

    info!(
        model = %config.model_id,
        knowledge_base_id = %config.knowledge_base_id,
        region = %config.aws_region,
        "inference gateway listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("server stopped: {err}");
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    match signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            error!("failed to listen for shutdown signal: {err}");
            std::future::pending::<()>().await;
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let json = std::env::var("LOG_FORMAT")
        .map(|value| value.trim().eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .flatten_event(true)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
