//! HTTP-level tests for the router, driven through `tower::ServiceExt::oneshot`
//! without opening sockets.

use std::sync::Arc;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use ndarray::Array1;
use serde_json::{json, Value};
use spamshield_core::{Result, SpamShieldConfig};
use spamshield_infer::{EncoderBackend, SpamCodeClassifier, SpamTypeClassifier};
use spamshield_runtime::TaggingOrchestrator;
use spamshield_server::{build_router, AppState};
use spamshield_text::IdentityTranslator;
use tower::ServiceExt as _;

const BODY_LIMIT: usize = 1024 * 1024;

/// Three dims: commercial, loan, p2p keyword hits.
struct KeywordEncoder;

impl EncoderBackend for KeywordEncoder {
    fn encode_batch(&self, texts: &[&str]) -> Result<Vec<Array1<f32>>> {
        let groups: [&[&str]; 3] = [
            &["sale", "shop", "discount"],
            &["loan", "approved", "cash"],
            &["send", "money", "gcash"],
        ];
        Ok(texts
            .iter()
            .map(|text| {
                groups
                    .iter()
                    .map(|words| {
                        text.split_whitespace()
                            .filter(|w| words.contains(w))
                            .count() as f32
                    })
                    .collect::<Array1<f32>>()
            })
            .collect())
    }

    fn dimension(&self) -> usize {
        3
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

fn test_router() -> (tempfile::TempDir, Router) {
    let dir = tempfile::tempdir().unwrap();
    let zeros = vec!["0.0"; 16].join(",");
    std::fs::write(
        dir.path().join("spam_code_clf.json"),
        format!(r#"{{"classes":[0,1],"coef":[[{zeros}]],"intercept":[-1.0]}}"#),
    )
    .unwrap();
    std::fs::write(
        dir.path().join("sms_spam_type_clf.json"),
        r#"{"classes":[0,1,2],"coef":[[1,0,0],[0,1,0],[0,0,1]],"intercept":[0,0,0]}"#,
    )
    .unwrap();

    let config = SpamShieldConfig::from_vars(dir.path(), |_| None).unwrap();
    let orchestrator = TaggingOrchestrator::new(
        SpamCodeClassifier::load(&config.model_paths.spam_code_clf).unwrap(),
        SpamTypeClassifier::load(&config.model_paths.spam_type_clf).unwrap(),
        Arc::new(KeywordEncoder),
        Arc::new(IdentityTranslator),
        config.embedding.batch_size,
    )
    .unwrap();

    let state = Arc::new(AppState::new(config, orchestrator));
    (dir, build_router(state))
}

async fn read_json(resp: axum::response::Response) -> Value {
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json")
}

fn post_tag(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/tag")
        .header("content-type", "application/json")
        .body(Body::from(body))
        .expect("build POST /api/tag")
}

#[tokio::test]
async fn health_returns_ok() {
    let (_dir, app) = test_router();
    let req = Request::builder()
        .uri("/api/health")
        .body(Body::empty())
        .unwrap();

    let resp = app.oneshot(req).await.expect("oneshot /api/health");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(read_json(resp).await["status"], "ok");
}

#[tokio::test]
async fn tag_labels_every_record() {
    let (_dir, app) = test_router();
    let payload = json!({
        "records": [
            { "id": 1, "sender": "639170000001", "content": "No Record" },
            { "id": 2, "sender": "639170000002", "content": "AB12345" },
            { "id": "m-3", "sender": "639170000003", "content": "https://promo.example.com/claim" },
            { "id": 4, "sender": "639170000004", "content": "Loan approved, get cash today", "spam_tag": "HAM" },
        ]
    });

    let resp = app.oneshot(post_tag(payload.to_string())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = read_json(resp).await;
    let tags: Vec<&str> = body["records"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["spam_tag"].as_str().unwrap())
        .collect();
    assert_eq!(tags, vec!["NO_RECORD", "SPAM_CODE", "URL_ONLY", "LOAN/SCAM/SPAM"]);
    assert_eq!(body["records"][2]["id"], "m-3");
    assert_eq!(body["report"]["total"], 4);
    assert_eq!(body["report"]["stage"], "LABELED");
    assert_eq!(body["report"]["counts"]["URL_ONLY"], 1);
}

#[tokio::test]
async fn tag_accepts_empty_batch() {
    let (_dir, app) = test_router();
    let resp = app
        .oneshot(post_tag(json!({ "records": [] }).to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = read_json(resp).await;
    assert!(body["records"].as_array().unwrap().is_empty());
    assert_eq!(body["report"]["total"], 0);
}

#[tokio::test]
async fn tag_treats_null_fields_as_empty_text() {
    let (_dir, app) = test_router();
    let payload = json!({
        "records": [
            { "id": 1, "sender": null, "content": null },
            { "id": 2, "sender": null, "content": "AB12345" },
            { "id": 3, "content": 12345 },
        ]
    });

    let resp = app.oneshot(post_tag(payload.to_string())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = read_json(resp).await;
    let records = body["records"].as_array().unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0]["content"], "");
    assert_eq!(records[0]["sender"], "");
    assert!(records[0]["spam_tag"].is_string());
    assert_eq!(records[1]["spam_tag"], "SPAM_CODE");
    assert_eq!(records[2]["content"], "12345");
    assert_eq!(body["report"]["total"], 3);
}

#[tokio::test]
async fn malformed_requests_are_bad_request() {
    let (_dir, app) = test_router();
    for body in [
        "{not json",
        "",
        "42",
        r#"{"messages":[]}"#,
        r#"{"records":[{"content":"hi"}]}"#,
    ] {
        let resp = app
            .clone()
            .oneshot(post_tag(body.to_string()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body:?}");
        assert!(read_json(resp).await["error"].is_string());
    }
}

#[tokio::test]
async fn status_reports_pipeline_and_last_run() {
    let (_dir, app) = test_router();

    let status = |app: Router| async move {
        let req = Request::builder()
            .uri("/api/status")
            .body(Body::empty())
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        read_json(resp).await
    };

    let before = status(app.clone()).await;
    assert_eq!(before["pipeline"]["encoder"], "keyword");
    assert_eq!(before["pipeline"]["embeddingDim"], 3);
    assert_eq!(before["pipeline"]["translator"], "identity");
    assert_eq!(before["config"]["pooling"], "mean");
    assert_eq!(before["runs"], 0);
    assert!(before["lastRun"].is_null());

    let payload = json!({ "records": [{ "id": 1, "content": "big sale at the shop" }] });
    let resp = app.clone().oneshot(post_tag(payload.to_string())).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let after = status(app).await;
    assert_eq!(after["runs"], 1);
    assert_eq!(after["lastRun"]["counts"]["COMMERCIAL"], 1);
    assert_eq!(after["pipeline"]["cachedEmbeddings"], 1);
}
