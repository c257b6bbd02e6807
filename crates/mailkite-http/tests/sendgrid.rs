//! `SendGridSender` against a mock SendGrid API.

#![allow(clippy::unwrap_used)]

use mailkite::{Address, EmailData, Priority, Sender};
use mailkite_http::{SendGridOptions, SendGridSender};
use serde::Serialize;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn email() -> EmailData {
    EmailData {
        from: Some(Address::with_name("from@test.com", "Sender")),
        to: vec![Address::with_name("ann@test.com", "Ann")],
        subject: "Hello".into(),
        body: "Plain body".into(),
        priority: Priority::Low,
        ..EmailData::default()
    }
}

fn sender(server: &MockServer) -> SendGridSender {
    SendGridSender::new(SendGridOptions::new("SG.key").with_host(server.uri()))
}

async fn last_body(server: &MockServer) -> Value {
    let requests = server.received_requests().await.unwrap();
    requests.last().unwrap().body_json().unwrap()
}

#[tokio::test]
async fn sends_json_and_reads_message_id_header() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v3/mail/send"))
        .and(header("authorization", "Bearer SG.key"))
        .respond_with(ResponseTemplate::new(202).insert_header("X-Message-Id", "sg-123"))
        .expect(1)
        .mount(&server)
        .await;

    let response = sender(&server).send_async(&email(), None).await.unwrap();
    assert!(response.successful(), "{:?}", response.error_messages);
    assert_eq!(response.message_id.as_deref(), Some("sg-123"));

    let body = last_body(&server).await;
    assert_eq!(
        body["personalizations"],
        json!([{ "to": [{ "email": "ann@test.com", "name": "Ann" }] }])
    );
    assert_eq!(body["subject"], "Hello");
    assert_eq!(
        body["content"],
        json!([{ "type": "text/plain", "value": "Plain body" }])
    );
    assert_eq!(
        body["headers"],
        json!({
            "Priority": "Non-Urgent",
            "Importance": "Low",
            "X-Priority": "5",
            "X-MSMail-Priority": "Low"
        })
    );
    assert_eq!(body["mail_settings"]["sandbox_mode"]["enable"], false);
}

#[tokio::test]
async fn failure_lists_status_then_errors() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [
                { "message": "The from address does not match a verified Sender Identity.", "field": "from" },
                { "field": "personalizations.0.to" }
            ]
        })))
        .mount(&server)
        .await;

    let response = sender(&server).send_async(&email(), None).await.unwrap();
    assert_eq!(
        response.error_messages,
        vec![
            "400 Bad Request".to_string(),
            "The from address does not match a verified Sender Identity.".to_string(),
            r#"{"field":"personalizations.0.to"}"#.to_string(),
        ]
    );
}

#[derive(Serialize)]
struct Receipt {
    name: &'static str,
    total: u32,
}

#[tokio::test]
async fn template_send_carries_template_data() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(202))
        .mount(&server)
        .await;

    let response = sender(&server)
        .send_with_template(
            &email(),
            "d-abc",
            &Receipt {
                name: "Ann",
                total: 12,
            },
            None,
        )
        .await
        .unwrap();
    assert!(response.successful());
    assert_eq!(response.message_id, None);

    let body = last_body(&server).await;
    assert_eq!(body["template_id"], "d-abc");
    assert_eq!(
        body["personalizations"][0]["dynamic_template_data"],
        json!({ "name": "Ann", "total": 12 })
    );
    assert!(body.get("content").is_none());
}

#[tokio::test]
async fn sandbox_mode_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let sender = SendGridSender::new(
        SendGridOptions::new("k")
            .with_host(server.uri())
            .with_sandbox_mode(true),
    );
    sender.send_async(&email(), None).await.unwrap();

    let body = last_body(&server).await;
    assert_eq!(body["mail_settings"]["sandbox_mode"]["enable"], true);
}
