//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        cache::RedisCacheAdapter, content_llm::OpenAiContentAdapter, db::DbAdapter,
        storage::HttpStorageAdapter, vision_llm::OpenAiVisionAdapter,
    },
    config::Config,
    error::ApiError,
    web::{
        auth::{login_handler, logout_handler, signup_handler},
        get_photo_handler, get_progress_handler, list_badges_handler, list_photos_handler,
        middleware::require_auth,
        rest::ApiDoc,
        state::AppState,
        translate_image_handler,
    },
};
use async_openai::{config::OpenAIConfig, Client};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;
use tower_http::cors::CorsLayer;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Database & Run Migrations ---
    info!("Connecting to database...");
    let db_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await?;
    let db_adapter = Arc::new(DbAdapter::new(db_pool.clone()));
    info!("Running database migrations...");
    db_adapter.run_migrations().await?;
    info!("Database migrations complete.");

    // --- 3. Connect the Translation Cache (degraded mode without Redis) ---
    let cache_adapter = match &config.redis_url {
        Some(redis_url) => {
            let connection = RedisCacheAdapter::connect(redis_url).await;
            if connection.is_some() {
                info!("Translation cache connected.");
            }
            Arc::new(RedisCacheAdapter::new(connection))
        }
        None => {
            warn!("REDIS_URL not set; translation cache disabled.");
            Arc::new(RedisCacheAdapter::disabled())
        }
    };

    // --- 4. Initialize Service Adapters ---
    let storage_adapter = Arc::new(HttpStorageAdapter::new(
        reqwest::Client::new(),
        config.storage_base_url.clone(),
        config.storage_api_key.clone(),
    ));

    let openai_config = OpenAIConfig::new().with_api_key(
        config
            .openai_api_key
            .as_ref()
            .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?,
    );
    let openai_client = Client::with_config(openai_config);

    let vision_adapter = Arc::new(OpenAiVisionAdapter::new(
        openai_client.clone(),
        config.vision_model.clone(),
    ));
    let content_adapter = Arc::new(OpenAiContentAdapter::new(
        openai_client.clone(),
        config.content_model.clone(),
    ));

    // --- 5. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        db: db_adapter,
        cache: cache_adapter,
        storage: storage_adapter,
        vision_adapter,
        content_adapter,
        config: config.clone(),
    });

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 6. Create the Web Router ---
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/auth/signup", post(signup_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/translate/image", post(translate_image_handler))
        .route("/user/progress", get(get_progress_handler))
        .route("/user/badges", get(list_badges_handler))
        .route("/photos", get(list_photos_handler))
        .route("/photos/{id}", get(get_photo_handler))
        .layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_auth,
        ));

    // Combine API routes. The body limit sits above the pipeline's own
    // 8 MiB image check to bound multipart overhead.
    let api_router = Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 7. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
