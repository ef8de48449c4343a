//! On-demand document rendering.
//!
//! `POST /api/generate-pdf` renders the enrollment form server-side
//! for clients without their own generator, so a headless submission
//! can fetch its draft here and attach it as `pdf_data`. The practice
//! fields stay blank; they are filled in at approval.

use axum::Json;
use base64::Engine;
use serde::Serialize;

use crate::api::error::ApiError;
use crate::models::{NewRequest, RequestType};
use crate::pdf;

#[derive(Serialize)]
pub struct GeneratedPdfResponse {
    /// Draft form bytes, base64-encoded for re-submission as `pdf_data`.
    pub pdf_data: String,
}

/// `POST /api/generate-pdf` — render the enrollment draft form.
pub async fn generate(
    Json(body): Json<NewRequest>,
) -> Result<Json<GeneratedPdfResponse>, ApiError> {
    if body.kind != RequestType::Inscriere {
        return Err(ApiError::BadRequest(
            "draft documents exist for inscriere requests only".into(),
        ));
    }
    if body
        .signature_data_url
        .as_deref()
        .map_or(true, |s| s.trim().is_empty())
    {
        return Err(ApiError::BadRequest(
            "signature_data_url is required".into(),
        ));
    }

    let bytes = pdf::generate_draft(&body.as_unsaved_request()).map_err(|e| match e {
        pdf::DocumentError::Signature(msg) => ApiError::BadRequest(msg),
        pdf::DocumentError::Render(msg) => ApiError::Internal(msg),
    })?;

    Ok(Json(GeneratedPdfResponse {
        pdf_data: base64::engine::general_purpose::STANDARD.encode(bytes),
    }))
}
