use clap::Parser;
use dotenvy::dotenv;
use picserver::config::AnalyzerConfig;
use picserver::{AppState, create_app};
use std::net::SocketAddr;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides BIND_ADDRESS)
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "picserver=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut config = AnalyzerConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(bind) = args.bind {
        config.bind_address = bind;
    }

    info!(
        "🛡️  Analyzer Config: Staging={}, Timeout={}s, Strict Status={}, Extended Heuristics={}",
        config.staging_dir.display(),
        config.request_timeout_secs,
        config.strict_status,
        config.extended_heuristics
    );

    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port).parse()?;
    let state = AppState::new(config);
    info!("🧪 Heuristics: {}", state.analysis.battery().names().join(", "));

    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("✅ HTTP Server started on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("🛑 HTTP Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, stopping HTTP Server...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, stopping HTTP Server...");
        },
    }
}
