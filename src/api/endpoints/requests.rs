//! Request lifecycle endpoints.
//!
//! - `POST /api/requests` — submit a new request
//! - `GET /api/requests` — list (optional `cnp` filter, `limit` cap)
//! - `GET /api/requests/pending` — doctor work queue
//! - `GET /api/requests/:id` — detail (never includes the PDF blob)
//! - `POST /api/requests/:id/approve`, `POST /api/requests/:id/reject`
//! - `GET /api/requests/:id/pdf` — the stored document
//! - `DELETE /api/requests/:id`, `DELETE /api/requests`

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::config;
use crate::lifecycle;
use crate::models::{NewRequest, Request, RequestSummary};

#[derive(Deserialize)]
pub struct CreateRequestBody {
    #[serde(flatten)]
    pub request: NewRequest,
    /// Client-prepared draft document, base64-encoded. Required for
    /// inscriere, ignored for trimitere.
    #[serde(default)]
    pub pdf_data: Option<String>,
}

#[derive(Serialize)]
pub struct RequestResponse {
    pub request: Request,
}

/// `POST /api/requests` — validate and store a submission.
pub async fn create(
    State(ctx): State<ApiContext>,
    Json(body): Json<CreateRequestBody>,
) -> Result<(StatusCode, Json<RequestResponse>), ApiError> {
    let mut new = body.request;
    if let Some(encoded) = body.pdf_data.as_deref().filter(|s| !s.is_empty()) {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| ApiError::BadRequest(format!("pdf_data is not valid base64: {e}")))?;
        new.draft_pdf = Some(bytes);
    }

    let conn = ctx.open_db()?;
    let request = lifecycle::create(&conn, new)?;
    Ok((StatusCode::CREATED, Json(RequestResponse { request })))
}

#[derive(Deserialize)]
pub struct ListParams {
    /// Exact-match patient filter.
    pub cnp: Option<String>,
    pub limit: Option<u32>,
}

#[derive(Serialize)]
pub struct PatientRequestsResponse {
    pub requests: Vec<RequestSummary>,
}

#[derive(Serialize)]
pub struct AdminRequestsResponse {
    pub requests: Vec<Request>,
}

/// `GET /api/requests` — all requests, or one patient's with `?cnp=`.
///
/// The admin view gets full rows (address, identity document); the
/// patient view gets the slim summary.
pub async fn list(
    State(ctx): State<ApiContext>,
    Query(params): Query<ListParams>,
) -> Result<Response, ApiError> {
    let conn = ctx.open_db()?;
    match params.cnp.as_deref().filter(|c| !c.is_empty()) {
        Some(cnp) => {
            let requests = lifecycle::list_by_patient(&conn, cnp)?;
            Ok(Json(PatientRequestsResponse { requests }).into_response())
        }
        None => {
            let requests =
                lifecycle::list_all(&conn, params.limit.unwrap_or(config::DEFAULT_LIST_LIMIT))?;
            Ok(Json(AdminRequestsResponse { requests }).into_response())
        }
    }
}

#[derive(Serialize)]
pub struct PendingResponse {
    pub count: usize,
    pub requests: Vec<Request>,
}

/// `GET /api/requests/pending` — the doctor's work queue.
pub async fn pending(State(ctx): State<ApiContext>) -> Result<Json<PendingResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let (count, requests) = lifecycle::list_pending(&conn)?;
    Ok(Json(PendingResponse { count, requests }))
}

/// `GET /api/requests/:id` — full request, blob excluded.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<RequestResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let request = lifecycle::get_by_id(&conn, id)?;
    Ok(Json(RequestResponse { request }))
}

/// `POST /api/requests/:id/approve` — generate the document and flip
/// the status. 409 when the request is no longer pending.
pub async fn approve(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<RequestResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let request = lifecycle::approve(&conn, id)?;
    Ok(Json(RequestResponse { request }))
}

/// `POST /api/requests/:id/reject` — terminal, no document produced.
pub async fn reject(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<Json<RequestResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let request = lifecycle::reject(&conn, id)?;
    Ok(Json(RequestResponse { request }))
}

/// `GET /api/requests/:id/pdf` — the stored document as a download.
///
/// 404 `NOT_FOUND` for an unknown request; 404 `PDF_NOT_READY` for a
/// request that was never approved.
pub async fn pdf(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let conn = ctx.open_db()?;
    let bytes = lifecycle::get_pdf(&conn, id)?.ok_or(ApiError::PdfNotReady)?;

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"request-{id}.pdf\""),
            ),
        ],
        bytes,
    ))
}

/// `DELETE /api/requests/:id` — admin removal, any status.
pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    let conn = ctx.open_db()?;
    lifecycle::delete(&conn, id)?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Serialize)]
pub struct DeleteAllResponse {
    pub deleted: u64,
}

/// `DELETE /api/requests` — admin wipe; reports how many rows went.
pub async fn remove_all(
    State(ctx): State<ApiContext>,
) -> Result<Json<DeleteAllResponse>, ApiError> {
    let conn = ctx.open_db()?;
    let deleted = lifecycle::delete_all(&conn)?;
    Ok(Json(DeleteAllResponse { deleted }))
}
