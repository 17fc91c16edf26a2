//! Wishbox Backend
//!
//! Shared gift-registry service: wishlists, reservations and group-gift
//! contributions over REST, with live updates pushed to viewers over WebSocket.

mod api;
mod auth;
mod config;
mod db;
mod errors;
mod hub;
mod models;
mod slug;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use hub::{BroadcastHub, EventEmitter};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub hub: Arc<BroadcastHub>,
    pub events: EventEmitter,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(repo: Repository, config: Config) -> Self {
        let hub = Arc::new(BroadcastHub::new());
        Self {
            repo: Arc::new(repo),
            events: EventEmitter::new(Arc::clone(&hub)),
            hub,
            config: Arc::new(config),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Wishbox Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Warn if PSK is not configured
    if config.api_psk.is_none() {
        tracing::warn!("No API PSK configured (WISHBOX_API_PSK). Authentication is disabled!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let bind_addr = config.bind_addr;
    let state = AppState::new(Repository::new(pool), config);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Clone PSK for the auth layer
    let psk = state.config.api_psk.clone();

    // API routes
    let api_routes = Router::new()
        // Wishlists
        .route(
            "/wishlists",
            get(api::list_wishlists).post(api::create_wishlist),
        )
        .route(
            "/wishlists/{slug}",
            get(api::get_wishlist)
                .patch(api::update_wishlist)
                .delete(api::delete_wishlist),
        )
        // Items
        .route("/wishlists/{slug}/items", post(api::create_item))
        .route(
            "/wishlists/{slug}/items/{item_id}",
            patch(api::update_item).delete(api::delete_item),
        )
        // Reservations and contributions
        .route(
            "/wishlists/{slug}/items/{item_id}/reserve",
            post(api::reserve_item).delete(api::cancel_reservation),
        )
        .route(
            "/wishlists/{slug}/items/{item_id}/contribute",
            post(api::contribute),
        )
        // Apply PSK auth middleware
        .layer(middleware::from_fn(move |req, next| {
            auth::psk_auth_layer(psk.clone(), req, next)
        }));

    // Health check and push connections (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/ws/{slug}", get(api::wishlist_socket));

    Router::new()
        .nest("/api", api_routes)
        .merge(public_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
