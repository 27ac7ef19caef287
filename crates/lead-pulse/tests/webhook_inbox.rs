use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use lead_pulse::workflows::webhook::{webhook_router, WebhookInbox};
use serde_json::Value;
use tower::ServiceExt;

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

fn get_data() -> Request<Body> {
    Request::get("/data")
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn data_reports_waiting_before_first_delivery() {
    let router = webhook_router(WebhookInbox::default());

    let response = router.oneshot(get_data()).await.expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let payload = read_json(response).await;
    assert_eq!(payload["status"], "waiting");
}

#[tokio::test]
async fn data_returns_the_latest_json_delivery() {
    let inbox = WebhookInbox::default();

    for event in ["ONCRMLEADADD", "ONCRMLEADUPDATE"] {
        let response = webhook_router(inbox.clone())
            .oneshot(
                Request::post("/bitrix-webhook")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(format!(r#"{{"event":"{event}"}}"#)))
                    .expect("request builds"),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(read_json(response).await["status"], "received");
    }

    let response = webhook_router(inbox)
        .oneshot(get_data())
        .await
        .expect("route executes");
    let payload = read_json(response).await;
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["payload"]["event"], "ONCRMLEADUPDATE");
}

#[tokio::test]
async fn form_encoded_deliveries_are_kept_verbatim() {
    let inbox = WebhookInbox::default();

    webhook_router(inbox.clone())
        .oneshot(
            Request::post("/bitrix-webhook")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("event=ONCRMLEADADD&data[FIELDS][ID]=17"))
                .expect("request builds"),
        )
        .await
        .expect("route executes");

    let latest = inbox.latest().await.expect("delivery stored");
    assert_eq!(
        latest.payload,
        Value::String("event=ONCRMLEADADD&data[FIELDS][ID]=17".to_string())
    );
}
