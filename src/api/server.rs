//! API server lifecycle.
//!
//! Pattern: bind → spawn background task → return handle with a
//! shutdown channel. The caller keeps the handle for as long as the
//! server should run.

use std::net::SocketAddr;

use tokio::sync::oneshot;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl ApiServer {
    /// Shut down the server gracefully.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }
}

/// Bind the API server and spawn it in a background task.
///
/// `addr` may carry port 0 for an ephemeral port; the bound address is
/// reported in the returned handle.
pub async fn start_api_server(ctx: ApiContext, addr: SocketAddr) -> Result<ApiServer, String> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind API server on {addr}: {e}"))?;

    let addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get server address: {e}"))?;

    let app = api_router(ctx);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::tests::TEST_SIGNATURE;

    struct TestServer {
        server: ApiServer,
        // Kept alive for the duration of the test
        _dir: tempfile::TempDir,
        base: String,
    }

    async fn start_test_server() -> TestServer {
        let dir = tempfile::tempdir().unwrap();
        let ctx = ApiContext::new(dir.path().join("requests.db"));
        let server = start_api_server(ctx, "127.0.0.1:0".parse().unwrap())
            .await
            .expect("server should start");
        let base = format!("http://{}", server.addr);
        TestServer {
            server,
            _dir: dir,
            base,
        }
    }

    fn referral_body() -> serde_json::Value {
        serde_json::json!({
            "kind": "trimitere",
            "patient_name": "POP MARIA",
            "patient_cnp": "2950505123456",
            "doctor_name": "Dr. Popescu",
            "referral_specialty": "Cardiologie"
        })
    }

    fn enrollment_body() -> serde_json::Value {
        serde_json::json!({
            "kind": "inscriere",
            "patient_name": "GEORGESCU ANDREI",
            "patient_cnp": "1901213254491",
            "patient_birth_date": "13/12/1990",
            "patient_citizenship": "romana",
            "address": {
                "street": "Str. Aviatorilor",
                "number": "12",
                "apartment": "3",
                "sector": "1"
            },
            "identity_document": {
                "doc_type": "CI",
                "series": "RX",
                "number": "123456",
                "issued_by": "SPCEP S1",
                "issue_date": "01/02/2015"
            },
            "doctor_name": "Dr. Popescu",
            "doctor_specialty": "Medicina de familie",
            "signature_data_url": TEST_SIGNATURE,
            // single 0x00 byte as the client draft
            "pdf_data": "AA=="
        })
    }

    #[tokio::test]
    async fn health_endpoint_answers() {
        let mut ts = start_test_server().await;

        let resp = reqwest::get(format!("{}/api/health", ts.base)).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let json: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(json["status"], "ok");

        ts.server.shutdown();
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let mut ts = start_test_server().await;

        let resp = reqwest::get(format!("{}/nonexistent", ts.base)).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        ts.server.shutdown();
    }

    #[tokio::test]
    async fn referral_full_lifecycle_over_http() {
        let mut ts = start_test_server().await;
        let client = reqwest::Client::new();

        // Submit
        let resp = client
            .post(format!("{}/api/requests", ts.base))
            .json(&referral_body())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        let created: serde_json::Value = resp.json().await.unwrap();
        let id = created["request"]["id"].as_i64().unwrap();
        assert_eq!(created["request"]["status"], "pending");

        // No document before approval
        let resp = client
            .get(format!("{}/api/requests/{id}/pdf", ts.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
        let err: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(err["error"]["code"], "PDF_NOT_READY");

        // Shows up in the pending queue
        let pending: serde_json::Value = client
            .get(format!("{}/api/requests/pending", ts.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(pending["count"], 1);

        // Approve
        let resp = client
            .post(format!("{}/api/requests/{id}/approve", ts.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let approved: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(approved["request"]["status"], "approved");

        // Document is downloadable now
        let resp = client
            .get(format!("{}/api/requests/{id}/pdf", ts.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        assert_eq!(
            resp.headers()[reqwest::header::CONTENT_TYPE],
            "application/pdf"
        );
        let bytes = resp.bytes().await.unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        // Second approval conflicts
        let resp = client
            .post(format!("{}/api/requests/{id}/approve", ts.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CONFLICT);
        let err: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(err["error"]["code"], "NOT_PENDING");

        ts.server.shutdown();
    }

    #[tokio::test]
    async fn enrollment_draft_is_replaced_on_approval() {
        let mut ts = start_test_server().await;
        let client = reqwest::Client::new();

        let created: serde_json::Value = client
            .post(format!("{}/api/requests", ts.base))
            .json(&enrollment_body())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = created["request"]["id"].as_i64().unwrap();

        // Draft blob as submitted
        let draft = client
            .get(format!("{}/api/requests/{id}/pdf", ts.base))
            .send()
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert_eq!(&draft[..], &[0u8]);

        client
            .post(format!("{}/api/requests/{id}/approve", ts.base))
            .send()
            .await
            .unwrap();

        let resp = client
            .get(format!("{}/api/requests/{id}/pdf", ts.base))
            .send()
            .await
            .unwrap();
        assert!(resp.headers()[reqwest::header::CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains(&format!("request-{id}.pdf")));
        let final_pdf = resp.bytes().await.unwrap();
        assert!(final_pdf.starts_with(b"%PDF"));

        ts.server.shutdown();
    }

    #[tokio::test]
    async fn invalid_submission_is_400() {
        let mut ts = start_test_server().await;
        let client = reqwest::Client::new();

        // Referral without a specialty
        let mut body = referral_body();
        body.as_object_mut().unwrap().remove("referral_specialty");
        let resp = client
            .post(format!("{}/api/requests", ts.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
        let err: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(err["error"]["code"], "BAD_REQUEST");

        // Enrollment with a broken draft encoding
        let mut body = enrollment_body();
        body["pdf_data"] = serde_json::json!("not base64!!!");
        let resp = client
            .post(format!("{}/api/requests", ts.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

        ts.server.shutdown();
    }

    #[tokio::test]
    async fn cnp_filter_and_reject_flow() {
        let mut ts = start_test_server().await;
        let client = reqwest::Client::new();

        client
            .post(format!("{}/api/requests", ts.base))
            .json(&referral_body())
            .send()
            .await
            .unwrap();
        let created: serde_json::Value = client
            .post(format!("{}/api/requests", ts.base))
            .json(&enrollment_body())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = created["request"]["id"].as_i64().unwrap();

        // Patient view filters by CNP
        let mine: serde_json::Value = client
            .get(format!("{}/api/requests?cnp=1901213254491", ts.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(mine["requests"].as_array().unwrap().len(), 1);
        assert_eq!(mine["requests"][0]["patient_name"], "GEORGESCU ANDREI");

        // Reject, then the terminal state holds
        let resp = client
            .post(format!("{}/api/requests/{id}/reject", ts.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let rejected: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(rejected["request"]["status"], "rejected");

        let resp = client
            .post(format!("{}/api/requests/{id}/approve", ts.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CONFLICT);

        ts.server.shutdown();
    }

    #[tokio::test]
    async fn admin_listing_carries_full_rows() {
        let mut ts = start_test_server().await;
        let client = reqwest::Client::new();

        client
            .post(format!("{}/api/requests", ts.base))
            .json(&enrollment_body())
            .send()
            .await
            .unwrap();

        // Admin view: every non-blob field present
        let listed: serde_json::Value = client
            .get(format!("{}/api/requests", ts.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let row = &listed["requests"][0];
        assert_eq!(row["address"]["street"], "Str. Aviatorilor");
        assert_eq!(row["identity_document"]["series"], "RX");
        assert_eq!(row["patient_birth_date"], "13/12/1990");
        assert_eq!(row["patient_citizenship"], "romana");
        assert!(row.get("pdf_data").is_none());

        // Patient view stays slim
        let mine: serde_json::Value = client
            .get(format!("{}/api/requests?cnp=1901213254491", ts.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(mine["requests"][0].get("address").is_none());

        ts.server.shutdown();
    }

    #[tokio::test]
    async fn server_side_draft_feeds_a_headless_submission() {
        use base64::Engine;

        let mut ts = start_test_server().await;
        let client = reqwest::Client::new();

        // Referrals carry no draft form
        let resp = client
            .post(format!("{}/api/generate-pdf", ts.base))
            .json(&referral_body())
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);

        // Render the enrollment draft server-side
        let mut body = enrollment_body();
        body.as_object_mut().unwrap().remove("pdf_data");
        let resp = client
            .post(format!("{}/api/generate-pdf", ts.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let generated: serde_json::Value = resp.json().await.unwrap();
        let encoded = generated["pdf_data"].as_str().unwrap();
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));

        // Attach it and submit, exactly as a headless client would
        body["pdf_data"] = serde_json::json!(encoded);
        let resp = client
            .post(format!("{}/api/requests", ts.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::CREATED);
        let created: serde_json::Value = resp.json().await.unwrap();
        let id = created["request"]["id"].as_i64().unwrap();

        let draft = client
            .get(format!("{}/api/requests/{id}/pdf", ts.base))
            .send()
            .await
            .unwrap()
            .bytes()
            .await
            .unwrap();
        assert!(draft.starts_with(b"%PDF"));

        ts.server.shutdown();
    }

    #[tokio::test]
    async fn admin_delete_endpoints() {
        let mut ts = start_test_server().await;
        let client = reqwest::Client::new();

        let created: serde_json::Value = client
            .post(format!("{}/api/requests", ts.base))
            .json(&referral_body())
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let id = created["request"]["id"].as_i64().unwrap();
        client
            .post(format!("{}/api/requests", ts.base))
            .json(&enrollment_body())
            .send()
            .await
            .unwrap();

        // Single delete
        let resp = client
            .delete(format!("{}/api/requests/{id}", ts.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NO_CONTENT);
        let resp = client
            .delete(format!("{}/api/requests/{id}", ts.base))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        // Wipe the rest
        let wiped: serde_json::Value = client
            .delete(format!("{}/api/requests", ts.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(wiped["deleted"], 1);

        let listed: serde_json::Value = client
            .get(format!("{}/api/requests", ts.base))
            .send()
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(listed["requests"].as_array().unwrap().is_empty());

        ts.server.shutdown();
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let mut ts = start_test_server().await;
        ts.server.shutdown();
        ts.server.shutdown();
    }
}
