//! Document generator for approved requests.
//!
//! Two templates, one per request type:
//! 1. Enrollment — "CERERE DE TRANSFER" form with the administrative
//!    header filled in and the patient's signature image embedded.
//! 2. Referral — "BILET DE TRIMITERE" letter with a drawn practice stamp.
//!
//! PDF generation via `printpdf` with builtin Helvetica. Diacritics are
//! folded to ASCII before rendering (the builtin fonts carry no
//! Romanian glyphs).

mod enrollment;
mod referral;

use std::io::BufWriter;

use base64::Engine;
use chrono::{Local, NaiveDate};
use printpdf::PdfDocumentReference;
use thiserror::Error;

use crate::config;
use crate::models::Request;

#[derive(Error, Debug)]
pub enum DocumentError {
    #[error("invalid signature image: {0}")]
    Signature(String),

    #[error("PDF rendering failed: {0}")]
    Render(String),
}

/// Administrative header fields computed at approval time.
///
/// The patient leaves these blank; the practice fills them in when the
/// doctor approves the enrollment.
#[derive(Debug, Clone)]
pub struct RegistrationFields {
    pub registration_number: String,
    /// DD/MM/YYYY
    pub registration_date: String,
    pub practice_name: String,
    pub practice_cui: String,
    pub practice_address: String,
    pub insurance_house: String,
    pub contract_number: String,
}

impl RegistrationFields {
    /// Header for an approval registered on `date`.
    pub fn registered_on(date: NaiveDate) -> Self {
        Self {
            registration_number: "1".into(),
            registration_date: date.format("%d/%m/%Y").to_string(),
            practice_name: config::PRACTICE_NAME.into(),
            practice_cui: config::PRACTICE_CUI.into(),
            practice_address: config::PRACTICE_ADDRESS.into(),
            insurance_house: config::PRACTICE_INSURANCE_HOUSE.into(),
            contract_number: config::PRACTICE_CONTRACT_NUMBER.into(),
        }
    }

    /// Header for a draft rendered on `date`: registration number and
    /// date keep their defaults, the practice fields stay blank until
    /// approval.
    pub fn draft_on(date: NaiveDate) -> Self {
        Self {
            registration_number: "1".into(),
            registration_date: date.format("%d/%m/%Y").to_string(),
            practice_name: String::new(),
            practice_cui: String::new(),
            practice_address: String::new(),
            insurance_house: String::new(),
            contract_number: String::new(),
        }
    }
}

/// Which document an approval produces. The variant carries exactly the
/// data that request type requires, so a referral cannot be approved
/// without a specialty nor an enrollment without a signature.
#[derive(Debug, Clone)]
pub enum ApprovalDocument {
    Enrollment {
        signature_data_url: String,
        registration: RegistrationFields,
    },
    Referral {
        specialty: String,
        /// DD.MM.YYYY
        issue_date: String,
    },
}

/// Render the enrollment form ahead of approval, for patients without
/// a client-side generator. Same layout as the approved form, with the
/// practice fields blank.
pub fn generate_draft(request: &Request) -> Result<Vec<u8>, DocumentError> {
    let signature = request
        .signature_data_url
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| DocumentError::Signature("request has no signature image".into()))?;
    let registration = RegistrationFields::draft_on(Local::now().date_naive());
    enrollment::generate_enrollment_pdf(request, signature, &registration)
}

/// Render the approval document for `request`. Returns PDF bytes.
pub fn generate(request: &Request, approval: &ApprovalDocument) -> Result<Vec<u8>, DocumentError> {
    match approval {
        ApprovalDocument::Enrollment {
            signature_data_url,
            registration,
        } => enrollment::generate_enrollment_pdf(request, signature_data_url, registration),
        ApprovalDocument::Referral {
            specialty,
            issue_date,
        } => referral::generate_referral_pdf(request, specialty, issue_date),
    }
}

// ── Shared helpers ───────────────────────────────────────────

/// Folds Romanian diacritics to ASCII equivalents.
pub(crate) fn fold_diacritics(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            'ă' | 'â' => 'a',
            'î' => 'i',
            'ș' | 'ş' => 's',
            'ț' | 'ţ' => 't',
            'Ă' | 'Â' => 'A',
            'Î' => 'I',
            'Ș' | 'Ş' => 'S',
            'Ț' | 'Ţ' => 'T',
            other => other,
        })
        .collect()
}

/// Greedy word wrap by character count (builtin fonts, ~80 chars per
/// content line at 10pt on A4 with 20mm margins).
pub(crate) fn wrap_text(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.len() + word.len() + 1 > max_chars && !current.is_empty() {
            lines.push(current.clone());
            current.clear();
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Decode a `data:<mime>;base64,<payload>` URL into (mime, bytes).
pub(crate) fn decode_data_url(data_url: &str) -> Result<(String, Vec<u8>), DocumentError> {
    let rest = data_url
        .strip_prefix("data:")
        .ok_or_else(|| DocumentError::Signature("not a data URL".into()))?;
    let (mime, payload) = rest
        .split_once(";base64,")
        .ok_or_else(|| DocumentError::Signature("data URL is not base64-encoded".into()))?;
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| DocumentError::Signature(format!("base64 decode failed: {e}")))?;
    Ok((mime.to_string(), bytes))
}

/// Serialize a finished document to bytes.
pub(crate) fn save_to_bytes(doc: PdfDocumentReference) -> Result<Vec<u8>, DocumentError> {
    let mut buf = BufWriter::new(Vec::new());
    doc.save(&mut buf)
        .map_err(|e| DocumentError::Render(format!("PDF save error: {e}")))?;
    buf.into_inner()
        .map_err(|e| DocumentError::Render(format!("PDF buffer error: {e}")))
}
