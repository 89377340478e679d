use mongo_api_template::{
    AppState, MongoRepository, RepositoryState,
    config::{AppConfig, Env},
    create_router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// The asynchronous entry point: configuration, logging, document store,
/// router, and the HTTP server with graceful shutdown.
#[tokio::main]
async fn main() {
    // Load .env before any configuration is read.
    dotenv::dotenv().ok();
    // Fails fast on missing production secrets.
    let config = AppConfig::load();

    // RUST_LOG wins; otherwise sensible defaults for local work.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "mongo_api_template=debug,tower_http=info,axum=trace".into());

    // Pretty output for humans locally, JSON for log aggregators in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // Document store connection. The driver connects lazily, so ping once to
    // surface a bad MONGO_URI at startup instead of on the first request.
    let client = mongodb::Client::with_uri_str(&config.mongo_uri)
        .await
        .expect("FATAL: invalid MONGO_URI");
    let db = client.database(&config.db_name);
    db.run_command(bson::doc! { "ping": 1 })
        .await
        .expect("FATAL: failed to reach MongoDB. Check MONGO_URI.");

    let repo = Arc::new(MongoRepository::new(db)) as RepositoryState;
    let app_state = AppState::new(repo, config.clone());
    let app = create_router(app_state);

    let listener = TcpListener::bind(("0.0.0.0", config.api_port))
        .await
        .expect("FATAL: failed to bind API port");

    tracing::info!("Listening on 0.0.0.0:{}", config.api_port);
    tracing::info!(
        "API documentation available at: http://localhost:{}/swagger-ui",
        config.api_port
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("Shutdown complete.");
}

/// Resolves when SIGINT (ctrl-c) or SIGTERM arrives, letting in-flight requests
/// drain before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
