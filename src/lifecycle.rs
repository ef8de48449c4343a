//! Request lifecycle engine.
//!
//! Every request moves through `pending` → `approved` | `rejected`,
//! at most once. Approval renders the final document before the status
//! flips; the flip itself is a conditional update in the repository,
//! so a lost race never overwrites another transition's outcome.

use chrono::{Local, Utc};
use rusqlite::Connection;
use thiserror::Error;
use tracing::info;

use crate::db::{repository, DatabaseError};
use crate::models::{NewRequest, Request, RequestStatus, RequestSummary, RequestType};
use crate::pdf::{self, ApprovalDocument, DocumentError, RegistrationFields};

#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error("request {0} not found")]
    NotFound(i64),

    #[error("request {id} is {status}, not pending")]
    NotPending { id: i64, status: RequestStatus },

    #[error("document generation failed: {0}")]
    Document(#[from] DocumentError),

    #[error("database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Validate and store a new request. Returns the stored row.
pub fn create(conn: &Connection, mut new: NewRequest) -> Result<Request, LifecycleError> {
    validate_new(&new)?;

    // Referrals never carry a signature or draft document, whatever
    // the client sent.
    if new.kind == RequestType::Trimitere {
        new.signature_data_url = None;
        new.draft_pdf = None;
    }

    let id = repository::insert_request(conn, &new, Utc::now())?;
    info!(id, kind = %new.kind, "request created");
    get_by_id(conn, id)
}

fn validate_new(new: &NewRequest) -> Result<(), LifecycleError> {
    let required = |value: &str, field: &str| {
        if value.trim().is_empty() {
            Err(LifecycleError::Validation(format!("{field} is required")))
        } else {
            Ok(())
        }
    };

    required(&new.patient_name, "patient_name")?;
    required(&new.patient_cnp, "patient_cnp")?;
    required(&new.doctor_name, "doctor_name")?;

    match new.kind {
        RequestType::Inscriere => {
            match new.signature_data_url.as_deref() {
                Some(s) if !s.trim().is_empty() => {}
                _ => {
                    return Err(LifecycleError::Validation(
                        "signature_data_url is required for inscriere".into(),
                    ))
                }
            }
            match &new.draft_pdf {
                Some(bytes) if !bytes.is_empty() => {}
                _ => {
                    return Err(LifecycleError::Validation(
                        "draft pdf_data is required for inscriere".into(),
                    ))
                }
            }
        }
        RequestType::Trimitere => match new.referral_specialty.as_deref() {
            Some(s) if !s.trim().is_empty() => {}
            _ => {
                return Err(LifecycleError::Validation(
                    "referral_specialty is required for trimitere".into(),
                ))
            }
        },
    }
    Ok(())
}

/// Approve a pending request: render its document, then commit the
/// status flip and blob in one conditional update.
///
/// The render happens first so a generation failure leaves the row
/// untouched and the approval retryable.
pub fn approve(conn: &Connection, id: i64) -> Result<Request, LifecycleError> {
    let request = get_by_id(conn, id)?;
    if request.status != RequestStatus::Pending {
        return Err(LifecycleError::NotPending {
            id,
            status: request.status,
        });
    }

    let approval = approval_document(&request)?;
    let pdf_bytes = pdf::generate(&request, &approval)?;

    let updated = repository::mark_approved(conn, id, &pdf_bytes, Utc::now())?;
    if updated == 0 {
        // Lost the race; report whatever state won it.
        let current = get_by_id(conn, id)?;
        return Err(LifecycleError::NotPending {
            id,
            status: current.status,
        });
    }

    info!(id, kind = %request.kind, "request approved");
    get_by_id(conn, id)
}

/// The document an approval must produce, with the type-specific
/// inputs checked up front.
fn approval_document(request: &Request) -> Result<ApprovalDocument, LifecycleError> {
    let today = Local::now().date_naive();
    match request.kind {
        RequestType::Inscriere => {
            let signature = request
                .signature_data_url
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| {
                    LifecycleError::Validation("request has no signature to print".into())
                })?;
            Ok(ApprovalDocument::Enrollment {
                signature_data_url: signature.to_string(),
                registration: RegistrationFields::registered_on(today),
            })
        }
        RequestType::Trimitere => {
            let specialty = request
                .referral_specialty
                .as_deref()
                .filter(|s| !s.trim().is_empty())
                .ok_or_else(|| {
                    LifecycleError::Validation("request has no referral specialty".into())
                })?;
            Ok(ApprovalDocument::Referral {
                specialty: specialty.to_string(),
                issue_date: today.format("%d.%m.%Y").to_string(),
            })
        }
    }
}

/// Reject a pending request. Terminal, no document involved.
pub fn reject(conn: &Connection, id: i64) -> Result<Request, LifecycleError> {
    let request = get_by_id(conn, id)?;
    if request.status != RequestStatus::Pending {
        return Err(LifecycleError::NotPending {
            id,
            status: request.status,
        });
    }

    let updated = repository::mark_rejected(conn, id, Utc::now())?;
    if updated == 0 {
        let current = get_by_id(conn, id)?;
        return Err(LifecycleError::NotPending {
            id,
            status: current.status,
        });
    }

    info!(id, "request rejected");
    get_by_id(conn, id)
}

/// Remove one request regardless of status.
pub fn delete(conn: &Connection, id: i64) -> Result<(), LifecycleError> {
    match repository::delete_request(conn, id) {
        Ok(()) => {
            info!(id, "request deleted");
            Ok(())
        }
        Err(DatabaseError::NotFound { .. }) => Err(LifecycleError::NotFound(id)),
        Err(e) => Err(e.into()),
    }
}

/// Remove every request. Returns the number removed (0 when empty).
pub fn delete_all(conn: &Connection) -> Result<u64, LifecycleError> {
    let removed = repository::delete_all_requests(conn)?;
    info!(removed, "all requests deleted");
    Ok(removed)
}

// ── Query surface ────────────────────────────────────────────

pub fn get_by_id(conn: &Connection, id: i64) -> Result<Request, LifecycleError> {
    repository::get_request(conn, id)?.ok_or(LifecycleError::NotFound(id))
}

pub fn list_by_patient(conn: &Connection, cnp: &str) -> Result<Vec<RequestSummary>, LifecycleError> {
    Ok(repository::list_requests_by_cnp(conn, cnp)?)
}

/// Full rows for the admin view, newest first (blob excluded).
pub fn list_all(conn: &Connection, limit: u32) -> Result<Vec<Request>, LifecycleError> {
    Ok(repository::list_all_requests(conn, limit)?)
}

/// Pending requests with their count, newest first.
pub fn list_pending(conn: &Connection) -> Result<(usize, Vec<Request>), LifecycleError> {
    let requests = repository::list_pending_requests(conn)?;
    Ok((requests.len(), requests))
}

/// The stored document of a request.
///
/// `NotFound` when the request is absent; `Ok(None)` when it exists
/// but has never been approved.
pub fn get_pdf(conn: &Connection, id: i64) -> Result<Option<Vec<u8>>, LifecycleError> {
    match repository::get_pdf_data(conn, id) {
        Ok(bytes) => Ok(bytes),
        Err(DatabaseError::NotFound { .. }) => Err(LifecycleError::NotFound(id)),
        Err(e) => Err(e.into()),
    }
}
