mod config;
mod models;
mod services;
mod utils;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::{HeaderValue, StatusCode, header},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use models::BookBrief;
use services::pipeline::{Pipeline, PipelineError};
use services::renderer::{CmarkConverter, Renderer, WkhtmltopdfEngine};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Clone)]
struct AppState {
    pipeline: Arc<Pipeline>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let config = config::AppConfig::from_env()?;

    let llm_client = Arc::new(services::llm::LLMClient::new(&config.llm)?);
    let renderer = Renderer::new(
        Arc::new(CmarkConverter),
        Arc::new(WkhtmltopdfEngine::new(config.pdf_engine_bin.clone())),
    );
    let pipeline = Pipeline::new(
        llm_client,
        renderer,
        config.output_dir.clone(),
        config.max_retries,
    );

    let app_state = AppState {
        pipeline: Arc::new(pipeline),
    };
    let app = build_router(app_state);

    let listener = TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(
        model = %config.llm.model,
        output_dir = %config.output_dir.display(),
        "Listening on {}",
        listener.local_addr()?
    );
    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/book", post(generate_book))
        .route("/health", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::AllowMethods::any())
                .allow_headers(tower_http::cors::AllowHeaders::any()),
        )
}

async fn index() -> Html<&'static str> {
    Html(
        r#"
    <!DOCTYPE html>
    <html>
    <head>
        <title>Bookpress</title>
        <meta charset="utf-8">
        <style>
            body { font-family: Arial, sans-serif; margin: 40px; }
            .info-box { background-color: #f0f8ff; padding: 20px; border-radius: 8px; margin: 20px 0; }
            .endpoint { background-color: #f5f5f5; padding: 10px; margin: 10px 0; border-radius: 4px; font-family: monospace; }
        </style>
    </head>
    <body>
        <h1>Bookpress</h1>

        <div class="info-box">
            <h2>Service Information</h2>
            <p>This service writes a complete eBook from a short brief and returns it as a PDF.</p>
            <p>Chapters are outlined first, then written one after another so each builds on the ones before it.</p>
        </div>

        <h2>Available Endpoints:</h2>
        <div class="endpoint">GET / - This information page</div>
        <div class="endpoint">GET /health - Health check</div>
        <div class="endpoint">POST /api/book - Generate a book and download it as PDF</div>

        <h2>How to Use:</h2>
        <p>POST a JSON body to /api/book:</p>
        <div class="endpoint">{"title": "...", "topic": "...", "chapters": 5, "num_words": 800, "target_audience": "...", "author": "...", "book_description": "..."}</div>
        <p>Generation can take several minutes for long books.</p>
    </body>
    </html>
    "#,
    )
}

async fn health_check() -> &'static str {
    "OK"
}

struct AppError {
    status: StatusCode,
    message: String,
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(e) => Self {
                status: StatusCode::BAD_REQUEST,
                message: e.to_string(),
            },
            PipelineError::Render(_) => Self {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "failed to generate book".to_string(),
            },
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: rejection.body_text(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

async fn generate_book(
    State(state): State<AppState>,
    brief: Result<Json<BookBrief>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(brief) = brief?;
    let book = state.pipeline.run(brief).await?;

    let disposition = HeaderValue::from_str(&utils::content_disposition(&book.file_name))
        .map_err(|e| AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("invalid download name: {e}"),
        })?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
            (
                http::HeaderName::from_static("x-degraded-chapters"),
                HeaderValue::from(book.degraded_chapters),
            ),
        ],
        book.pdf,
    )
        .into_response())
}
