use coachdesk_billing::StripeCheckoutClient;
use coachdesk_media::HttpObjectSigner;
use coachdesk_server::{
    auth::HttpSessionResolver,
    config::ServerConfig,
    db::{PgProfileRepository, PgSubscriptionRepository},
    routes::create_router,
    state::{AppSettings, AppState, Backends},
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().expect("failed to load configuration");
    tracing::info!("Loaded configuration");

    // Create database connection pool
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .expect("failed to run migrations");

    let http = reqwest::Client::new();
    let signer = HttpObjectSigner::new(
        http.clone(),
        &config.storage.storage_url,
        config.storage.service_key.clone(),
        config.storage.bucket.clone(),
    )
    .expect("invalid storage configuration");

    let backends = Backends {
        sessions: Arc::new(HttpSessionResolver::new(http.clone(), &config.identity)),
        profiles: Arc::new(PgProfileRepository::new(db_pool.clone())),
        subscriptions: Arc::new(PgSubscriptionRepository::new(db_pool)),
        signer: Arc::new(signer),
        checkout: Arc::new(StripeCheckoutClient::new(
            http,
            config.payments.api_base.clone(),
            config.payments.secret_key.clone(),
        )),
    };

    let settings = AppSettings::from_config(&config);
    tracing::info!(unlisted_paths = ?settings.unlisted_paths, "Role gate configured");

    let app = create_router(Arc::new(AppState::new(backends, settings)));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("failed to bind to address");

    tracing::info!("listening on http://{}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
