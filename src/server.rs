//! HTTP layer: landing page, the section endpoint and static assets.

use std::path::PathBuf;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::SectionError;
use crate::excerpt::{load_section, Window};

/// Score served by `/section.xml`, inside the static directory.
pub const SCORE_FILE: &str = "MozaVeilSample.xml";

const MUSICXML_CONTENT_TYPE: &str = "application/vnd.recordare.musicxml+xml";
const INDEX_HTML: &str = include_str!("../templates/index.html");

#[derive(Clone)]
pub struct AppState {
    pub static_dir: PathBuf,
    pub score_path: PathBuf,
}

impl AppState {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            static_dir: config.static_dir.clone(),
            score_path: config.static_dir.join(SCORE_FILE),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/section.xml", get(section))
        .nest_service("/static", ServeDir::new(&state.static_dir))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ---------- handlers ----------
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

/// A fresh random section of the score on every request.
pub async fn section(State(state): State<AppState>) -> Response {
    let path = state.score_path.clone();
    // Parsing and slicing are synchronous file + CPU work
    let rendered = tokio::task::spawn_blocking(move || {
        load_section(&path, &mut rand::thread_rng())
            .map(|section| (section.window, section.to_musicxml()))
    })
    .await;

    match rendered {
        Ok(Ok((window, xml))) => musicxml(window, xml),
        Ok(Err(e)) => e.into_response(),
        Err(e) => {
            error!("section task failed: {e}");
            plain_text(StatusCode::INTERNAL_SERVER_ERROR, "Failed to build section".to_string())
        }
    }
}

// ---------- responses ----------
fn musicxml(window: Window, xml: String) -> Response {
    info!(start = window.start, end = window.end, "serving section");
    ([(header::CONTENT_TYPE, MUSICXML_CONTENT_TYPE)], xml).into_response()
}

fn plain_text(status: StatusCode, message: String) -> Response {
    (
        status,
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        message,
    )
        .into_response()
}

impl IntoResponse for SectionError {
    fn into_response(self) -> Response {
        let status = match self {
            // Unreadable score: our fault, not the request's
            SectionError::Load(_) => StatusCode::INTERNAL_SERVER_ERROR,
            SectionError::InsufficientParts | SectionError::InsufficientMeasures { .. } => {
                StatusCode::BAD_REQUEST
            }
        };
        error!(status = status.as_u16(), "ERROR: {self}");
        plain_text(status, self.to_string())
    }
}
