use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{RequestStatus, RequestType};

/// Home address of the requesting patient.
///
/// Required for enrollment requests (the form prints it verbatim);
/// referral requests leave everything empty.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PatientAddress {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub number: Option<String>,
    #[serde(default)]
    pub block: Option<String>,
    #[serde(default)]
    pub entrance: Option<String>,
    #[serde(default)]
    pub apartment: Option<String>,
    #[serde(default)]
    pub sector: String,
}

/// Identity-document details (CI/BI series, number, issuer).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityDocument {
    #[serde(default)]
    pub doc_type: String,
    #[serde(default)]
    pub series: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub issued_by: String,
    #[serde(default)]
    pub issue_date: String,
}

/// A stored enrollment or referral request.
///
/// The PDF blob is intentionally not part of this struct — list and
/// detail queries never load it. `repository::get_pdf_data` is the
/// only reader.
#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub id: i64,
    pub kind: RequestType,
    pub status: RequestStatus,
    pub patient_name: String,
    /// CNP — national id number, opaque string
    pub patient_cnp: String,
    pub patient_birth_date: String,
    pub patient_citizenship: String,
    pub address: PatientAddress,
    pub identity_document: IdentityDocument,
    pub doctor_name: String,
    pub doctor_specialty: Option<String>,
    /// Target specialty — set for referral requests only
    pub referral_specialty: Option<String>,
    /// Signature pad output (data URL) — set for enrollment requests only
    pub signature_data_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Submission payload for a new request. Validated by the lifecycle
/// engine before insertion (rules differ per `kind`).
#[derive(Debug, Clone, Deserialize)]
pub struct NewRequest {
    pub kind: RequestType,
    pub patient_name: String,
    pub patient_cnp: String,
    #[serde(default)]
    pub patient_birth_date: String,
    #[serde(default)]
    pub patient_citizenship: String,
    #[serde(default)]
    pub address: PatientAddress,
    #[serde(default)]
    pub identity_document: IdentityDocument,
    pub doctor_name: String,
    #[serde(default)]
    pub doctor_specialty: Option<String>,
    #[serde(default)]
    pub referral_specialty: Option<String>,
    #[serde(default)]
    pub signature_data_url: Option<String>,
    /// Client-prepared draft PDF, decoded from base64 at the API edge.
    /// Present for enrollment requests, absent for referrals.
    #[serde(skip)]
    pub draft_pdf: Option<Vec<u8>>,
}

/// Slim row for list views — no address/identity/blob columns.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
    pub id: i64,
    pub kind: RequestType,
    pub status: RequestStatus,
    pub patient_name: String,
    pub patient_cnp: String,
    pub doctor_name: String,
    pub doctor_specialty: Option<String>,
    pub referral_specialty: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewRequest {
    /// Transient, unsaved view of a submission, for rendering a draft
    /// document before the request exists in the store.
    pub fn as_unsaved_request(&self) -> Request {
        let now = Utc::now();
        Request {
            id: 0,
            kind: self.kind,
            status: RequestStatus::Pending,
            patient_name: self.patient_name.clone(),
            patient_cnp: self.patient_cnp.clone(),
            patient_birth_date: self.patient_birth_date.clone(),
            patient_citizenship: self.patient_citizenship.clone(),
            address: self.address.clone(),
            identity_document: self.identity_document.clone(),
            doctor_name: self.doctor_name.clone(),
            doctor_specialty: self.doctor_specialty.clone(),
            referral_specialty: self.referral_specialty.clone(),
            signature_data_url: self.signature_data_url.clone(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Minimal referral submission; used by tests and kept public for
    /// programmatic clients.
    pub fn referral(
        patient_name: impl Into<String>,
        patient_cnp: impl Into<String>,
        doctor_name: impl Into<String>,
        referral_specialty: impl Into<String>,
    ) -> Self {
        Self {
            kind: RequestType::Trimitere,
            patient_name: patient_name.into(),
            patient_cnp: patient_cnp.into(),
            patient_birth_date: String::new(),
            patient_citizenship: String::new(),
            address: PatientAddress::default(),
            identity_document: IdentityDocument::default(),
            doctor_name: doctor_name.into(),
            doctor_specialty: None,
            referral_specialty: Some(referral_specialty.into()),
            signature_data_url: None,
            draft_pdf: None,
        }
    }
}
