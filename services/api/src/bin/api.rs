//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        FirebaseStorageAdapter, FirestoreAdapter, GeminiChatAdapter, GeminiClient,
        GeminiQuizAdapter, GeminiSummaryAdapter, GoogleSentimentAdapter, GoogleVisionAdapter,
        GoogleWorkspaceAdapter,
    },
    config::Config,
    error::ApiError,
    web::{
        create_study_session_handler, export_calendar_handler, export_doc_handler,
        export_form_handler, generate_quiz_handler, generate_summary_handler, rest::ApiDoc,
        state::AppState, ws_handler,
    },
};
use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Build the Shared HTTP Client ---
    // Every adapter talks to a third-party endpoint with no latency bound,
    // so the client carries a hard per-request timeout.
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.adapter_timeout_secs))
        .build()?;

    // --- 3. Initialize Service Adapters ---
    let gemini = GeminiClient::new(
        http.clone(),
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
    );

    let storage = Arc::new(FirebaseStorageAdapter::new(
        http.clone(),
        config.storage_bucket.clone(),
    ));
    let extractor = Arc::new(GoogleVisionAdapter::new(
        http.clone(),
        config.vision_api_key.clone(),
    ));
    let summarizer = Arc::new(GeminiSummaryAdapter::new(
        gemini.clone(),
        config.summarize_input_cap,
    ));
    let quiz_gen = Arc::new(GeminiQuizAdapter::new(
        gemini.clone(),
        config.quiz_question_count,
    ));
    let chat = Arc::new(GeminiChatAdapter::new(gemini, config.chat_history));

    if config.language_api_key.is_none() {
        warn!("LANGUAGE_API_KEY is not set; sentiment scoring will degrade to neutral.");
    }
    let sentiment = Arc::new(GoogleSentimentAdapter::new(
        http.clone(),
        config.language_api_key.clone(),
    ));
    let sessions = Arc::new(FirestoreAdapter::new(
        http.clone(),
        config.firestore_project.clone(),
        config.firebase_api_key.clone(),
    ));
    let exporter = Arc::new(GoogleWorkspaceAdapter::new(http));

    // --- 4. Build the Shared AppState ---
    let app_state = Arc::new(AppState {
        config: config.clone(),
        storage,
        extractor,
        summarizer,
        quiz_gen,
        chat,
        sentiment,
        sessions,
        exporter,
    });

    let cors = CorsLayer::new()
        .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT]);

    // --- 5. Create the Web Router ---
    let api_router = Router::new()
        .route("/study/sessions", post(create_study_session_handler))
        .route("/study/summary", post(generate_summary_handler))
        .route("/study/quiz", post(generate_quiz_handler))
        .route("/study/export/docs", post(export_doc_handler))
        .route("/study/export/form", post(export_form_handler))
        .route("/study/export/calendar", post(export_calendar_handler))
        .route("/chat/ws", get(ws_handler))
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors)
        .with_state(app_state);

    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
