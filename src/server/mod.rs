pub mod error;
pub mod pages;

use crate::{catalog::Catalog, config::Config, dispatcher::Dispatcher, naming::JobId};
use anyhow::{Context, Result};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::header,
    response::{Html, IntoResponse, Redirect},
    routing::{get, post},
};
use error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Clone)]
pub struct AppState {
    pub catalog: Catalog,
    pub dispatcher: Dispatcher,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    #[serde(default)]
    pub secret_key: Option<String>,
    #[serde(default)]
    pub urls: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub message: &'static str,
    #[serde(rename = "requestId")]
    pub request_id: JobId,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_jobs))
        .route("/analyze", post(analyze))
        .route("/requests/{job_id}", get(list_reports))
        .route("/report/{job_id}/{filename}", get(view_report))
        .route("/delete/{job_id}", get(delete_job))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(cfg: &Config, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .with_context(|| "http server")?;
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown requested; in-flight jobs are abandoned");
    }
}

async fn analyze(
    State(state): State<AppState>,
    Json(req): Json<SubmitRequest>,
) -> ApiResult<Json<SubmitResponse>> {
    let job = state
        .dispatcher
        .dispatch(req.secret_key.as_deref(), req.urls)?;
    Ok(Json(SubmitResponse {
        message: "Analysis started",
        request_id: job,
    }))
}

async fn list_jobs(State(state): State<AppState>) -> ApiResult<Html<String>> {
    let jobs = tokio::task::spawn_blocking(move || state.catalog.list_jobs()).await??;
    Ok(Html(pages::job_list(&jobs)))
}

async fn list_reports(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Html<String>> {
    let job = JobId::parse(&job_id)
        .ok_or_else(|| ApiError::bad_request(format!("invalid name: {job_id:?}")))?;
    let files = tokio::task::spawn_blocking(move || state.catalog.list_reports(&job_id)).await??;
    Ok(Html(pages::report_list(&job, &files)))
}

async fn view_report(
    State(state): State<AppState>,
    Path((job_id, filename)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let bytes =
        tokio::task::spawn_blocking(move || state.catalog.fetch_report(&job_id, &filename))
            .await??;
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], bytes))
}

async fn delete_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Redirect> {
    tokio::task::spawn_blocking(move || state.catalog.delete_job(&job_id)).await??;
    Ok(Redirect::to("/"))
}
