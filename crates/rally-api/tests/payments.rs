mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use common::{TestApp, VerifyOutcome};

async fn initialize(app: &TestApp, submission_id: &str) -> String {
    let (status, body) = app
        .post("/payments/initialize", None, json!({ "submissionId": submission_id }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert!(body["authorizationUrl"].as_str().unwrap().starts_with("https://"));
    body["reference"].as_str().unwrap().to_string()
}

fn payment_status(app: &TestApp, id: &str) -> String {
    let row = app.state.db.get_participate(id).unwrap().unwrap();
    row.into_model().payment_status.to_string()
}

#[tokio::test]
async fn initialize_uses_configured_amount_and_stores_reference() {
    let app = TestApp::new();
    let id = app.participate(None).await;
    let reference = initialize(&app, &id).await;

    assert!(reference.starts_with("RLY-"));
    let sent = app.provider.initialized.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].amount, 500_000);
    assert_eq!(sent[0].currency, "NGN");
    assert_eq!(sent[0].email, "ada@x.com");

    let row = app.state.db.get_participate(&id).unwrap().unwrap().into_model();
    assert_eq!(row.payment_reference.as_deref(), Some(reference.as_str()));
    assert_eq!(row.payment_status.to_string(), "unpaid");
}

#[tokio::test]
async fn initialize_rejects_unknown_and_invalid_requests() {
    let app = TestApp::new();
    let (status, _) = app
        .post("/payments/initialize", None, json!({ "submissionId": Uuid::new_v4() }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let id = app.participate(None).await;
    let (status, _) = app
        .post("/payments/initialize", None, json!({ "submissionId": id, "amount": 0 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.state.db.update_payment_settings(500_000, "NGN", false).unwrap();
    let (status, body) = app
        .post("/payments/initialize", None, json!({ "submissionId": id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Payments are currently disabled");
    assert!(app.provider.initialized.lock().unwrap().is_empty());
}

#[tokio::test]
async fn amount_below_the_fee_is_rejected() {
    let app = TestApp::new();
    let id = app.participate(None).await;

    let (status, body) = app
        .post("/payments/initialize", None, json!({ "submissionId": id, "amount": 100 }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Amount must be at least 500000 NGN");
    assert!(app.provider.initialized.lock().unwrap().is_empty());

    // Paying more than the fee is allowed.
    let (status, _) = app
        .post("/payments/initialize", None, json!({ "submissionId": id, "amount": 600_000 }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(app.provider.initialized.lock().unwrap()[0].amount, 600_000);
}

#[tokio::test]
async fn provider_outage_during_initialize_is_a_bad_gateway() {
    let app = TestApp::new();
    let id = app.participate(None).await;
    *app.provider.down.lock().unwrap() = true;

    let (status, body) = app
        .post("/payments/initialize", None, json!({ "submissionId": id }))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream_error");

    let row = app.state.db.get_participate(&id).unwrap().unwrap();
    assert!(row.into_model().payment_reference.is_none());
}

#[tokio::test]
async fn successful_verification_marks_paid() {
    let app = TestApp::new();
    let id = app.participate(None).await;
    let reference = initialize(&app, &id).await;

    let (status, body) = app
        .post("/payments/verify", None, json!({ "reference": reference }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paymentStatus"], "paid");
    assert_eq!(body["amountPaid"], 500_000);
    assert_eq!(body["providerCustomerId"], "CUS_test");
    assert_eq!(payment_status(&app, &id), "paid");

    // A paid submission cannot be charged again.
    let (status, _) = app
        .post("/payments/initialize", None, json!({ "submissionId": id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn initializing_twice_keeps_the_first_reference_verifiable() {
    let app = TestApp::new();
    let id = app.participate(None).await;
    let first = initialize(&app, &id).await;
    let second = initialize(&app, &id).await;
    assert_ne!(first, second);

    // The customer pays on the first checkout after a reload opened a second one.
    let (status, body) = app
        .post("/payments/verify", None, json!({ "reference": first }))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["paymentStatus"], "paid");
    assert_eq!(body["reference"], first);
    assert_eq!(payment_status(&app, &id), "paid");

    // The abandoned checkout cannot undo it.
    app.provider.set_verify(VerifyOutcome::Failed);
    let (status, body) = app
        .post("/payments/verify", None, json!({ "reference": second }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paymentStatus"], "paid");
    assert_eq!(payment_status(&app, &id), "paid");

    let (status, _) = app
        .post("/payments/initialize", None, json!({ "submissionId": id }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn underpayment_is_recorded_as_failed() {
    let app = TestApp::new();
    let id = app.participate(None).await;
    let reference = initialize(&app, &id).await;

    app.provider.set_verify(VerifyOutcome::Underpaid);
    let (status, body) = app
        .post("/payments/verify", None, json!({ "reference": reference }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paymentStatus"], "failed");
    assert_eq!(body["amountPaid"], serde_json::Value::Null);
    assert_eq!(payment_status(&app, &id), "failed");
}

#[tokio::test]
async fn failed_verification_marks_failed_and_can_recover() {
    let app = TestApp::new();
    let id = app.participate(None).await;
    let reference = initialize(&app, &id).await;

    app.provider.set_verify(VerifyOutcome::Failed);
    let (status, body) = app
        .post("/payments/verify", None, json!({ "reference": reference }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paymentStatus"], "failed");
    assert_eq!(payment_status(&app, &id), "failed");

    app.provider.set_verify(VerifyOutcome::Success);
    let (_, body) = app
        .post("/payments/verify", None, json!({ "reference": reference }))
        .await;
    assert_eq!(body["paymentStatus"], "paid");
}

#[tokio::test]
async fn unreachable_provider_leaves_status_unchanged() {
    let app = TestApp::new();
    let id = app.participate(None).await;
    let reference = initialize(&app, &id).await;

    app.provider.set_verify(VerifyOutcome::Unreachable);
    let (status, body) = app
        .post("/payments/verify", None, json!({ "reference": reference }))
        .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"], "upstream_error");
    assert_eq!(payment_status(&app, &id), "unpaid");
}

#[tokio::test]
async fn paid_is_never_downgraded() {
    let app = TestApp::new();
    let id = app.participate(None).await;
    let reference = initialize(&app, &id).await;

    app.provider.set_verify(VerifyOutcome::Success);
    app.post("/payments/verify", None, json!({ "reference": reference }))
        .await;

    app.provider.set_verify(VerifyOutcome::Failed);
    let (status, body) = app
        .post("/payments/verify", None, json!({ "reference": reference }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["paymentStatus"], "paid");
    assert_eq!(payment_status(&app, &id), "paid");
}

#[tokio::test]
async fn verifying_an_unknown_reference() {
    let app = TestApp::new();
    let (status, _) = app
        .post("/payments/verify", None, json!({ "reference": "RLY-nope" }))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .post("/payments/verify", None, json!({ "reference": "  " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"]["missing"], json!(["reference"]));
}

#[tokio::test]
async fn payment_visibility() {
    let app = TestApp::new();
    let (owner, _) = app.register("ada@x.com").await;
    let (stranger, _) = app.register("bob@x.com").await;
    let (admin, _) = app.admin("root@x.com").await;

    let id = app.participate(Some(&owner)).await;
    let reference = initialize(&app, &id).await;
    let uri = format!("/payments/{reference}");

    let (status, body) = app.get(&uri, Some(&owner)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["submissionId"], id);

    let (status, _) = app.get(&uri, Some(&stranger)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.get(&uri, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app.get(&uri, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, mine) = app.get("/payments/my", Some(&owner)).await;
    assert_eq!(mine.as_array().unwrap().len(), 1);
    let (_, theirs) = app.get("/payments/my", Some(&stranger)).await;
    assert!(theirs.as_array().unwrap().is_empty());

    let (status, _) = app.get("/payments", Some(&owner)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, all) = app.get("/payments", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all[0]["reference"], reference);
}

#[tokio::test]
async fn payment_config_and_settings() {
    let app = TestApp::new();
    let (admin, _) = app.admin("root@x.com").await;

    let (status, body) = app.get("/payments/config", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["publicKey"], "pk_test_123");
    assert_eq!(body["amount"], 500_000);
    assert_eq!(body["enabled"], true);

    let (status, body) = app
        .put(
            "/admin/payment-settings",
            Some(&admin),
            json!({ "amount": 250_000, "currency": "ghs", "enabled": true }),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["currency"], "GHS");

    let (_, body) = app.get("/payments/config", None).await;
    assert_eq!(body["amount"], 250_000);
    assert_eq!(body["currency"], "GHS");

    let (status, _) = app
        .put(
            "/admin/payment-settings",
            Some(&admin),
            json!({ "amount": -1, "currency": "NGN", "enabled": true }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
