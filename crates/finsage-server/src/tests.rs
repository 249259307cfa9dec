//! Server API tests

use std::time::Duration;

use super::*;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use finsage_core::{AIClient, AIError, MockBackend, TaskType};
use http_body_util::BodyExt;
use tower::ServiceExt;

fn open_config() -> ServerConfig {
    ServerConfig {
        require_auth: false,
        ..Default::default()
    }
}

fn setup_test_app() -> Router {
    create_router_with_engine(FinanceEngine::offline(), open_config())
}

fn setup_mock_app(mock: MockBackend) -> Router {
    create_router_with_engine(
        FinanceEngine::new(Some(AIClient::Mock(mock))),
        open_config(),
    )
}

async fn get_body_json(response: axum::response::Response) -> serde_json::Value {
    let body = response.into_body();
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

// ========== Health ==========

#[tokio::test]
async fn test_health_is_public() {
    let app = create_router_with_engine(FinanceEngine::offline(), ServerConfig::default());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["service"], "FinSage API");
    assert!(json["ai_backend"].is_null());
}

#[tokio::test]
async fn test_security_headers() {
    let response = setup_test_app()
        .oneshot(
            Request::builder()
                .uri("/api/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    let headers = response.headers();
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert!(headers.contains_key("content-security-policy"));
}

#[tokio::test]
async fn test_ai_status_offline() {
    let response = setup_test_app()
        .oneshot(Request::builder().uri("/api/ai").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["configured"], false);
    assert_eq!(json["healthy"], false);
}

#[tokio::test]
async fn test_ai_status_mock() {
    let response = setup_mock_app(MockBackend::new())
        .oneshot(Request::builder().uri("/api/ai").body(Body::empty()).unwrap())
        .await
        .unwrap();

    let json = get_body_json(response).await;
    assert_eq!(json["configured"], true);
    assert_eq!(json["backend"], "mock");
    assert_eq!(json["default_model"], "mock");
    assert_eq!(json["healthy"], true);
}

// ========== Budget ==========

#[tokio::test]
async fn test_budget_rule_based() {
    let response = setup_test_app()
        .oneshot(post_json(
            "/api/budget",
            serde_json::json!({"income": 50000, "target_savings": 10000}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["source"], "rule_based");
    assert_eq!(json["spendable"], 40000.0);
    assert!(json.get("model").is_none());
    assert!(json.get("fallback_reason").is_none());

    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 9);
    assert_eq!(data[0]["category"], "Rent");

    let total: f64 = data
        .iter()
        .map(|a| a["allocated_amount"].as_f64().unwrap())
        .sum();
    assert!(total <= 40000.0 + 0.01);
}

#[tokio::test]
async fn test_budget_degenerate_is_empty() {
    let response = setup_test_app()
        .oneshot(post_json(
            "/api/budget",
            serde_json::json!({"income": 30000, "target_savings": 20000, "loan_commitments": 15000}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert!(json["data"].as_array().unwrap().is_empty());
    assert_eq!(json["spendable"], -5000.0);
}

#[tokio::test]
async fn test_budget_spendable_is_rounded() {
    let response = setup_test_app()
        .oneshot(post_json(
            "/api/budget",
            serde_json::json!({"income": 0.3, "target_savings": 0.1}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["spendable"], 0.2);
}

#[tokio::test]
async fn test_budget_rejects_negative_income() {
    let response = setup_test_app()
        .oneshot(post_json(
            "/api/budget",
            serde_json::json!({"income": -1, "target_savings": 0}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = get_body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("income"));
}

#[tokio::test]
async fn test_budget_from_mock_model() {
    let response = setup_mock_app(MockBackend::new())
        .oneshot(post_json(
            "/api/budget",
            serde_json::json!({"income": 50000, "target_savings": 10000}),
        ))
        .await
        .unwrap();

    let json = get_body_json(response).await;
    assert_eq!(json["source"], "model");
    assert_eq!(json["model"], "mock");
    assert_eq!(json["data"].as_array().unwrap().len(), 9);
}

// ========== Anomalies ==========

#[tokio::test]
async fn test_anomalies_fall_back_on_timeout() {
    let mock = MockBackend::new().failing(
        TaskType::AnomalyDetection,
        AIError::Timeout(Duration::from_secs(30)),
    );

    let response = setup_mock_app(mock)
        .oneshot(post_json(
            "/api/anomalies",
            serde_json::json!({
                "income": 50000,
                "monthly_limit": 10000,
                "target_savings": 10000,
                "current_expenses": {"Food": 6000},
                "budget_allocations": {"Food": 5000}
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["source"], "fallback");
    assert_eq!(json["fallback_reason"], "timeout");

    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["category"], "Food");
    assert_eq!(data[0]["impact_amount"], 1000.0);
}

#[tokio::test]
async fn test_anomalies_approaching_limit() {
    let response = setup_test_app()
        .oneshot(post_json(
            "/api/anomalies",
            serde_json::json!({
                "income": 50000,
                "monthly_limit": 10000,
                "target_savings": 0,
                "current_expenses": {"Food": 4750, "Rent": 4750}
            }),
        ))
        .await
        .unwrap();

    let json = get_body_json(response).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["category"], "Overall Budget");
    assert_eq!(data[0]["impact_amount"], 9500.0);
}

// ========== Recommendations & advice ==========

#[tokio::test]
async fn test_recommendations_never_empty() {
    let response = setup_test_app()
        .oneshot(post_json(
            "/api/recommendations",
            serde_json::json!({
                "income": 50000,
                "current_month_expenses": {},
                "total_expenses": 0
            }),
        ))
        .await
        .unwrap();

    let json = get_body_json(response).await;
    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["type"], "success");
}

#[tokio::test]
async fn test_advice_text() {
    let response = setup_test_app()
        .oneshot(post_json(
            "/api/advice",
            serde_json::json!({
                "income": 50000,
                "total_expenses": 45000,
                "savings": 5000,
                "target_savings": 10000,
                "anomaly_count": 1
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    let advice = json["data"].as_str().unwrap();
    assert!(advice.starts_with("1. "));
    assert!(advice.contains("1 spending anomaly"));
}

// ========== Summary ==========

#[tokio::test]
async fn test_monthly_summary() {
    let response = setup_test_app()
        .oneshot(post_json(
            "/api/summary",
            serde_json::json!({
                "transactions": [
                    {"date": "2024-08-10", "amount": 4000, "category": "Food"},
                    {"date": "2024-09-01", "amount": 60000, "category": "Salary", "transaction_type": "income"},
                    {"date": "2024-09-08", "amount": 3500, "category": "Food"},
                    {"date": "2024-09-20", "amount": 3000, "category": "Food"}
                ]
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = get_body_json(response).await;
    assert_eq!(json["month"], "2024-09");
    assert_eq!(json["total_income"], 60000.0);
    assert_eq!(json["total_expenses"], 6500.0);
    assert_eq!(json["savings"], 53500.0);
    assert_eq!(json["last_month_expenses"]["Food"], 4000.0);
}

#[tokio::test]
async fn test_summary_rejects_negative_amount() {
    let response = setup_test_app()
        .oneshot(post_json(
            "/api/summary",
            serde_json::json!({
                "transactions": [{"date": "2024-09-08", "amount": -5, "category": "Food"}],
                "month": "2024-09"
            }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ========== Auth ==========

#[tokio::test]
async fn test_auth_required_by_default() {
    let config = ServerConfig {
        api_keys: vec!["secret-key".to_string()],
        ..Default::default()
    };
    let body = serde_json::json!({"income": 50000, "target_savings": 10000});

    let app = create_router_with_engine(FinanceEngine::offline(), config.clone());
    let response = app
        .oneshot(post_json("/api/budget", body.clone()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let app = create_router_with_engine(FinanceEngine::offline(), config.clone());
    let mut request = post_json("/api/budget", body.clone());
    request
        .headers_mut()
        .insert("authorization", "Bearer wrong-key!".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let app = create_router_with_engine(FinanceEngine::offline(), config);
    let mut request = post_json("/api/budget", body);
    request
        .headers_mut()
        .insert("authorization", "Bearer secret-key".parse().unwrap());
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[test]
fn test_validate_api_key() {
    let keys = vec!["abc".to_string(), "longer-key".to_string()];
    assert!(validate_api_key("abc", &keys));
    assert!(validate_api_key("longer-key", &keys));
    assert!(!validate_api_key("abd", &keys));
    assert!(!validate_api_key("", &keys));
    assert!(!validate_api_key("abc", &[]));
}

#[test]
fn test_parse_list() {
    assert_eq!(
        parse_list(" a, b ,,c "),
        vec!["a".to_string(), "b".to_string(), "c".to_string()]
    );
    assert!(parse_list("").is_empty());
}
