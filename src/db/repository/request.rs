use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::DatabaseError;
use crate::models::*;

/// All non-blob columns, in row-mapping order.
const REQUEST_COLUMNS: &str = "id, type, status, patient_name, patient_cnp, \
     patient_birth_date, patient_citizenship, address_street, address_number, \
     address_block, address_entrance, address_apartment, address_sector, \
     id_type, id_series, id_number, id_issued_by, id_issue_date, \
     doctor_name, doctor_specialty, referral_specialty, signature_data_url, \
     created_at, updated_at";

pub fn insert_request(
    conn: &Connection,
    new: &NewRequest,
    now: DateTime<Utc>,
) -> Result<i64, DatabaseError> {
    let ts = format_timestamp(now);
    conn.execute(
        "INSERT INTO requests (type, status, patient_name, patient_cnp,
         patient_birth_date, patient_citizenship, address_street, address_number,
         address_block, address_entrance, address_apartment, address_sector,
         id_type, id_series, id_number, id_issued_by, id_issue_date,
         doctor_name, doctor_specialty, referral_specialty, signature_data_url,
         pdf_data, created_at, updated_at)
         VALUES (?1, 'pending', ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11,
                 ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?22)",
        params![
            new.kind.as_str(),
            new.patient_name,
            new.patient_cnp,
            new.patient_birth_date,
            new.patient_citizenship,
            new.address.street,
            new.address.number,
            new.address.block,
            new.address.entrance,
            new.address.apartment,
            new.address.sector,
            new.identity_document.doc_type,
            new.identity_document.series,
            new.identity_document.number,
            new.identity_document.issued_by,
            new.identity_document.issue_date,
            new.doctor_name,
            new.doctor_specialty,
            new.referral_specialty,
            new.signature_data_url,
            new.draft_pdf,
            ts,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_request(conn: &Connection, id: i64) -> Result<Option<Request>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLUMNS} FROM requests WHERE id = ?1"
    ))?;

    let result = stmt.query_row(params![id], map_request_row);

    match result {
        Ok(row) => Ok(Some(request_from_row(row)?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Requests of one patient (exact CNP match), newest first.
pub fn list_requests_by_cnp(
    conn: &Connection,
    cnp: &str,
) -> Result<Vec<RequestSummary>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT id, type, status, patient_name, patient_cnp, doctor_name,
         doctor_specialty, referral_specialty, created_at, updated_at
         FROM requests WHERE patient_cnp = ?1
         ORDER BY created_at DESC, id DESC",
    )?;

    let rows = stmt.query_map(params![cnp], map_summary_row)?;

    let mut requests = Vec::new();
    for row in rows {
        requests.push(summary_from_row(row?)?);
    }
    Ok(requests)
}

/// Full rows for the admin view, newest first, capped at `limit`.
/// Every non-blob column comes along; only `pdf_data` stays behind.
pub fn list_all_requests(conn: &Connection, limit: u32) -> Result<Vec<Request>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLUMNS} FROM requests
         ORDER BY created_at DESC, id DESC
         LIMIT ?1"
    ))?;

    let rows = stmt.query_map(params![limit], map_request_row)?;

    let mut requests = Vec::new();
    for row in rows {
        requests.push(request_from_row(row?)?);
    }
    Ok(requests)
}

/// Full pending rows for the doctor's work queue, newest first.
pub fn list_pending_requests(conn: &Connection) -> Result<Vec<Request>, DatabaseError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {REQUEST_COLUMNS} FROM requests WHERE status = 'pending'
         ORDER BY created_at DESC, id DESC"
    ))?;

    let rows = stmt.query_map([], map_request_row)?;

    let mut requests = Vec::new();
    for row in rows {
        requests.push(request_from_row(row?)?);
    }
    Ok(requests)
}

/// Flip a pending request to approved, attaching the generated PDF.
///
/// Compare-and-set: the WHERE clause re-checks `pending`, so the
/// status flip and the blob write land together or not at all.
/// Returns the number of updated rows (0 = gone or no longer pending).
pub fn mark_approved(
    conn: &Connection,
    id: i64,
    pdf_data: &[u8],
    now: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let rows = conn.execute(
        "UPDATE requests SET status = 'approved', pdf_data = ?2, updated_at = ?3
         WHERE id = ?1 AND status = 'pending'",
        params![id, pdf_data, format_timestamp(now)],
    )?;
    Ok(rows)
}

/// Flip a pending request to rejected. The PDF blob is left untouched.
pub fn mark_rejected(
    conn: &Connection,
    id: i64,
    now: DateTime<Utc>,
) -> Result<usize, DatabaseError> {
    let rows = conn.execute(
        "UPDATE requests SET status = 'rejected', updated_at = ?2
         WHERE id = ?1 AND status = 'pending'",
        params![id, format_timestamp(now)],
    )?;
    Ok(rows)
}

/// Read the PDF blob of one request.
///
/// `Err(NotFound)` when the row is absent; `Ok(None)` when the row
/// exists but carries no document yet (a referral before approval).
pub fn get_pdf_data(conn: &Connection, id: i64) -> Result<Option<Vec<u8>>, DatabaseError> {
    let row: Option<Option<Vec<u8>>> = conn
        .query_row(
            "SELECT pdf_data FROM requests WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?;

    row.ok_or_else(|| DatabaseError::NotFound {
        entity_type: "Request".into(),
        id: id.to_string(),
    })
}

/// Delete one request unconditionally (any status).
pub fn delete_request(conn: &Connection, id: i64) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM requests WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DatabaseError::NotFound {
            entity_type: "Request".into(),
            id: id.to_string(),
        });
    }
    Ok(())
}

/// Delete every request. Returns the number of removed rows.
pub fn delete_all_requests(conn: &Connection) -> Result<u64, DatabaseError> {
    let deleted = conn.execute("DELETE FROM requests", [])?;
    Ok(deleted as u64)
}

// ── Row mapping ──────────────────────────────────────────────

fn format_timestamp(ts: DateTime<Utc>) -> String {
    // Fixed-width RFC 3339 so lexicographic ORDER BY matches time order
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {s:?}: {e}")))
}

// Internal row type for Request mapping
struct RequestRow {
    id: i64,
    kind: String,
    status: String,
    patient_name: String,
    patient_cnp: String,
    patient_birth_date: String,
    patient_citizenship: String,
    address_street: String,
    address_number: Option<String>,
    address_block: Option<String>,
    address_entrance: Option<String>,
    address_apartment: Option<String>,
    address_sector: String,
    id_type: String,
    id_series: String,
    id_number: String,
    id_issued_by: String,
    id_issue_date: String,
    doctor_name: String,
    doctor_specialty: Option<String>,
    referral_specialty: Option<String>,
    signature_data_url: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_request_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RequestRow> {
    Ok(RequestRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        status: row.get(2)?,
        patient_name: row.get(3)?,
        patient_cnp: row.get(4)?,
        patient_birth_date: row.get(5)?,
        patient_citizenship: row.get(6)?,
        address_street: row.get(7)?,
        address_number: row.get(8)?,
        address_block: row.get(9)?,
        address_entrance: row.get(10)?,
        address_apartment: row.get(11)?,
        address_sector: row.get(12)?,
        id_type: row.get(13)?,
        id_series: row.get(14)?,
        id_number: row.get(15)?,
        id_issued_by: row.get(16)?,
        id_issue_date: row.get(17)?,
        doctor_name: row.get(18)?,
        doctor_specialty: row.get(19)?,
        referral_specialty: row.get(20)?,
        signature_data_url: row.get(21)?,
        created_at: row.get(22)?,
        updated_at: row.get(23)?,
    })
}

fn request_from_row(row: RequestRow) -> Result<Request, DatabaseError> {
    Ok(Request {
        id: row.id,
        kind: RequestType::from_str(&row.kind)?,
        status: RequestStatus::from_str(&row.status)?,
        patient_name: row.patient_name,
        patient_cnp: row.patient_cnp,
        patient_birth_date: row.patient_birth_date,
        patient_citizenship: row.patient_citizenship,
        address: PatientAddress {
            street: row.address_street,
            number: row.address_number,
            block: row.address_block,
            entrance: row.address_entrance,
            apartment: row.address_apartment,
            sector: row.address_sector,
        },
        identity_document: IdentityDocument {
            doc_type: row.id_type,
            series: row.id_series,
            number: row.id_number,
            issued_by: row.id_issued_by,
            issue_date: row.id_issue_date,
        },
        doctor_name: row.doctor_name,
        doctor_specialty: row.doctor_specialty,
        referral_specialty: row.referral_specialty,
        signature_data_url: row.signature_data_url,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}

struct SummaryRow {
    id: i64,
    kind: String,
    status: String,
    patient_name: String,
    patient_cnp: String,
    doctor_name: String,
    doctor_specialty: Option<String>,
    referral_specialty: Option<String>,
    created_at: String,
    updated_at: String,
}

fn map_summary_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SummaryRow> {
    Ok(SummaryRow {
        id: row.get(0)?,
        kind: row.get(1)?,
        status: row.get(2)?,
        patient_name: row.get(3)?,
        patient_cnp: row.get(4)?,
        doctor_name: row.get(5)?,
        doctor_specialty: row.get(6)?,
        referral_specialty: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

fn summary_from_row(row: SummaryRow) -> Result<RequestSummary, DatabaseError> {
    Ok(RequestSummary {
        id: row.id,
        kind: RequestType::from_str(&row.kind)?,
        status: RequestStatus::from_str(&row.status)?,
        patient_name: row.patient_name,
        patient_cnp: row.patient_cnp,
        doctor_name: row.doctor_name,
        doctor_specialty: row.doctor_specialty,
        referral_specialty: row.referral_specialty,
        created_at: parse_timestamp(&row.created_at)?,
        updated_at: parse_timestamp(&row.updated_at)?,
    })
}
