use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use menu_extractor_api::{Error, ItemRecord, MenuService, ServiceConfig, SourceError, Table};
use serde::Deserialize;
use serde_json::json;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

type SharedService = Arc<MenuService>;

/// Menu PDFs with photos easily exceed axum's 2 MB default.
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

#[derive(Deserialize)]
struct PageParams {
    url: String,
}

#[derive(Deserialize)]
struct UploadParams {
    filename: String,
}

#[derive(Deserialize)]
struct AnalysisRequest {
    items: Vec<ItemRecord>,
    #[serde(default)]
    label: Option<String>,
}

fn error_response(err: Error) -> Response {
    let (status, category) = match &err {
        Error::Source(source) => {
            let status = match source {
                SourceError::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                SourceError::Network(_) | SourceError::Status(_) => StatusCode::BAD_GATEWAY,
                SourceError::Read(_) | SourceError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            };
            (status, source.category())
        }
        Error::NothingToAnalyze => (StatusCode::BAD_REQUEST, "request"),
        Error::History(_) => (StatusCode::INTERNAL_SERVER_ERROR, "history"),
        Error::Config { .. } | Error::InvalidSettings(_) | Error::Pattern(_) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "config")
        }
    };
    tracing::warn!(%status, category, error = %err, "request failed");
    (status, Json(json!({ "error": err.to_string(), "category": category }))).into_response()
}

async fn items_from_text(Extension(service): Extension<SharedService>, body: String) -> Response {
    Json(service.items_from_text(&body)).into_response()
}

async fn items_from_pdf(Extension(service): Extension<SharedService>, body: Bytes) -> Response {
    match service.items_from_pdf(body.to_vec()).await {
        Ok(items) => Json(items).into_response(),
        Err(err) => error_response(err),
    }
}

async fn items_from_page(
    Extension(service): Extension<SharedService>,
    Query(params): Query<PageParams>,
) -> Response {
    match service.items_from_page(&params.url).await {
        Ok(items) => Json(items).into_response(),
        Err(err) => error_response(err),
    }
}

async fn items_from_table(
    Extension(service): Extension<SharedService>,
    Json(table): Json<Table>,
) -> Response {
    match service.items_from_table(&table) {
        Ok(items) => Json(items).into_response(),
        Err(err) => error_response(err),
    }
}

async fn items_from_upload(
    Extension(service): Extension<SharedService>,
    Query(params): Query<UploadParams>,
    body: Bytes,
) -> Response {
    match service.items_from_upload(&body, &params.filename) {
        Ok(items) => Json(items).into_response(),
        Err(err) => error_response(err),
    }
}

async fn analyze(
    Extension(service): Extension<SharedService>,
    Json(request): Json<AnalysisRequest>,
) -> Response {
    match service.analyze(request.items, request.label).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => error_response(err),
    }
}

async fn history(Extension(service): Extension<SharedService>) -> impl IntoResponse {
    match service.history().await {
        Ok(entries) => Json(entries).into_response(),
        Err(err) => error_response(err),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "menu_extractor_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // reqwest and rustls must agree on one process-wide crypto provider.
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    let config = ServiceConfig::from_env();
    let service: SharedService = Arc::new(MenuService::from_config(&config)?);

    let app = Router::new()
        .route("/items/text", post(items_from_text))
        .route("/items/pdf", post(items_from_pdf))
        .route("/items/page", get(items_from_page))
        .route("/items/table", post(items_from_table))
        .route("/items/table/upload", post(items_from_upload))
        .route("/analysis", post(analyze))
        .route("/history", get(history))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(Extension(service))
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!("Listening on http://{}", config.bind_addr);
    axum::serve(listener, app).await?;

    Ok(())
}
