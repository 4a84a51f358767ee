//! # Auth Server
//!
//! The HTTP host binary for the `auth_server` library: an embeddable OAuth
//! 2.1 / OpenID Connect authorization server and session/credential engine.
//!
//! ## Initialization sequence
//!
//! 1. Load configuration from the environment ([`shared::config::AppConfig`]).
//! 2. Initialize structured logging ([`shared::tracing_config`]).
//! 3. Create the PostgreSQL pool and wrap it in [`auth_server::storage::postgres::PostgresAdapter`].
//! 4. Connect to Redis for the session mirror (`secondaryStorage`).
//! 5. Build the [`auth_server::context::AuthContext`] via [`auth_server::context::AuthBuilder`].
//! 6. Assemble [`auth_server::api::AppState`] and start the HTTP server.

use std::sync::Arc;

use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use tracing::info;

use shared::config::AppConfig;
use shared::{database, tracing_config};
use shared::redis_client::RedisClient;

use auth_server::api::{self, AppState};
use auth_server::context::AuthBuilder;
use auth_server::oauth::grants::ciba::HttpNotifier;
use auth_server::session::SessionService;
use auth_server::storage::internal::InternalAdapter;
use auth_server::storage::postgres::PostgresAdapter;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::from_env().expect("failed to load configuration");

    tracing_config::init_tracing(&config.service_name, config.is_production());

    info!(
        service = %config.service_name,
        host = %config.server.host,
        port = %config.server.port,
        "starting auth-server"
    );

    let db_pool = database::create_pool(&config.database).await.expect("failed to create database pool");

    let redis = RedisClient::new(&config.redis).await.ok();
    if redis.is_none() {
        tracing::warn!("redis unavailable; sessions will not be mirrored to secondaryStorage");
    }

    let raw_adapter: Arc<dyn auth_server::storage::adapter::Adapter> = Arc::new(PostgresAdapter::new(db_pool));

    let auth = AuthBuilder::new(config.auth.clone(), raw_adapter.clone())
        .build()
        .await
        .expect("failed to build auth context");
    let auth = Arc::new(auth);

    let sessions = SessionService::new(InternalAdapter::new(raw_adapter), redis);
    let ciba_notifier = Arc::new(HttpNotifier::new(None));

    let app_state = web::Data::new(AppState::new(auth, sessions, ciba_notifier));

    let server_host = config.server.host.clone();
    let server_port = config.server.port;
    let trusted_origins = config.auth.trusted_origins.clone();

    info!("server listening on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        let mut cors = Cors::default().allow_any_method().allow_any_header().max_age(3600);
        cors = if trusted_origins.is_empty() {
            cors.allow_any_origin()
        } else {
            trusted_origins.iter().fold(cors, |cors, origin| cors.allowed_origin(origin))
        };

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .app_data(app_state.clone())
            .configure(api::routes::configure)
    })
    .bind((server_host, server_port))?
    .run()
    .await
}
