//! Execution service HTTP API
//!
//! - `POST /execute` runs one submission against one stdin
//! - `POST /verify` grades a submission against a problem's test cases
//! - `GET /languages` lists the supported languages and their tool status
//! - `GET /health` liveness probe

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::Error;
use crate::harness::{FileTestCases, Harness, TestCase, Verification};
use crate::sandbox::{decode_source, ExecutionResult, Sandbox};

/// Shared state of the HTTP service
#[derive(Clone)]
pub struct AppState {
    sandbox: Arc<Sandbox>,
    harness: Harness,
}

impl AppState {
    /// State for a sandbox and the stored test cases it grades against
    pub fn new(sandbox: Arc<Sandbox>, harness: Harness) -> Self {
        AppState { sandbox, harness }
    }

    /// In-process sandbox plus file-backed test cases from configuration
    pub fn from_config(config: &Config) -> Self {
        let sandbox = Arc::new(Sandbox::new(&config.sandbox));
        let source = Arc::new(FileTestCases::new(config.harness.test_cases_dir.clone()));
        let harness = Harness::new(sandbox.clone(), source);
        AppState { sandbox, harness }
    }

    pub fn sandbox(&self) -> &Arc<Sandbox> {
        &self.sandbox
    }
}

// ---- Error Handling ----

pub struct AppError(Error);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        let message = match self.0 {
            Error::InvalidInput(message) => message,
            other => other.to_string(),
        };
        let body = Json(serde_json::json!({ "error": message }));
        (status, body).into_response()
    }
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError(err)
    }
}

const MISSING_FIELDS: &str = "Missing language or source_code";

/// Pull the two mandatory fields out of a request body
fn required(language: Option<String>, source_code: Option<String>) -> Result<(String, String), AppError> {
    match (language, source_code) {
        (Some(language), Some(source_code)) if !language.is_empty() && !source_code.is_empty() => {
            Ok((language, source_code))
        }
        _ => Err(AppError(Error::InvalidInput(MISSING_FIELDS.to_string()))),
    }
}

// ---- Handlers ----

#[derive(Debug, Deserialize)]
pub struct ExecuteBody {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub source_code: Option<String>,
    #[serde(default)]
    pub input: Option<String>,
}

async fn execute(
    State(state): State<AppState>,
    Json(body): Json<ExecuteBody>,
) -> Result<Json<ExecutionResult>, AppError> {
    let (language, source_code) = required(body.language, body.source_code)?;

    let source_code = decode_source(&source_code);
    let stdin = body.input.unwrap_or_default();

    let result = match state.sandbox.run_source(&language, &source_code, &stdin).await {
        Ok(result) => result,
        Err(e) => {
            warn!("Execution failed for {}: {}", language, e);
            let message = state.sandbox.sanitizer().sanitize(&e.to_string());
            ExecutionResult::system_error(message)
        }
    };

    Ok(Json(result))
}

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub source_code: Option<String>,
    #[serde(default)]
    pub problem_id: i64,
    #[serde(default)]
    pub test_cases: Option<Vec<TestCase>>,
}

async fn verify(
    State(state): State<AppState>,
    Json(body): Json<VerifyBody>,
) -> Result<Json<Verification>, AppError> {
    let (language, source_code) = required(body.language, body.source_code)?;
    let source_code = decode_source(&source_code);

    let verification = state
        .harness
        .verify(&language, &source_code, body.problem_id, body.test_cases)
        .await;
    Ok(Json(verification))
}

#[derive(Debug, Serialize)]
pub struct LanguageStatus {
    pub language: &'static str,
    pub available: bool,
    pub missing_tools: Vec<String>,
}

async fn languages(State(state): State<AppState>) -> Json<Vec<LanguageStatus>> {
    let registry = state.sandbox.registry();
    let mut statuses = Vec::new();
    for language in registry.languages() {
        let missing_tools = registry.resolve(language).await.missing_tools();
        statuses.push(LanguageStatus {
            language: language.as_str(),
            available: missing_tools.is_empty(),
            missing_tools,
        });
    }
    Json(statuses)
}

async fn health() -> &'static str {
    "OK"
}

/// Build the service router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/execute", post(execute))
        .route("/verify", post(verify))
        .route("/languages", get(languages))
        .route("/health", get(health))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
}

/// Bind and serve until the process is stopped
pub async fn serve(state: AppState, bind: &str, port: u16) -> crate::error::Result<()> {
    let addr: std::net::SocketAddr = format!("{}:{}", bind, port)
        .parse()
        .map_err(|e| Error::Config(format!("Invalid bind address {}:{}: {}", bind, port, e)))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Execution service listening on http://{}", addr);

    axum::serve(listener, build_router(state)).await?;
    Ok(())
}
