use portal_cereri::{api, config, db};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    // Open once at startup so migrations run before the first request
    let db_path = config::database_path();
    if let Err(e) = db::open_database(&db_path) {
        tracing::error!("Cannot initialize database at {}: {e}", db_path.display());
        std::process::exit(1);
    }
    tracing::info!("Database ready at {}", db_path.display());

    let ctx = api::ApiContext::new(db_path);
    let mut server = match api::server::start_api_server(ctx, config::bind_addr()).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{e}");
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on http://{}", server.addr);

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Cannot listen for shutdown signal: {e}");
    }
    server.shutdown();
}
