//! End-to-end builder tests against the filesystem senders.

#![allow(clippy::unwrap_used, clippy::similar_names)]

use mailkite::{
    Attachment, CancellationToken, Email, EmailData, Mailer, PickupDirectorySender, Result,
    SaveToDiskSender, SendResponse, Sender, async_trait,
};
use mailkite_mime::Message;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};

#[derive(Default)]
struct RecordingSender {
    sent: Mutex<Vec<EmailData>>,
}

#[async_trait]
impl Sender for RecordingSender {
    async fn send_async(
        &self,
        email: &EmailData,
        token: Option<&CancellationToken>,
    ) -> Result<SendResponse> {
        email.sender_address()?;
        if mailkite::is_cancelled(token) {
            return Ok(SendResponse::cancelled());
        }
        self.sent.lock().unwrap().push(email.clone());
        Ok(SendResponse::with_message_id("recorded"))
    }
}

#[derive(Serialize)]
#[allow(non_snake_case)]
struct Welcome {
    Name: String,
    Plan: String,
}

fn entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(Iterator::count).unwrap_or(0)
}

#[test]
fn template_email_through_pickup_directory() {
    let dir = tempfile::tempdir().unwrap();
    let logo = Attachment::new("logo.png", "image/png", vec![0x89, 0x50]).inline(true);

    let email = Email::new()
        .from(("team@test.com", "Team"))
        .to(("ann@test.com;bob@test.com", "Ann;Bob"))
        .subject("Welcome aboard")
        .using_template(
            "<p>Hi ##Name##, you are on ##Plan##</p><img src=\"cid:logo.png\">",
            &Welcome {
                Name: "Ann".to_string(),
                Plan: "Pro".to_string(),
            },
            true,
        )
        .unwrap()
        .plaintext_alternative_body("Hi Ann, you are on Pro")
        .attach(logo)
        .high_priority()
        .using_sender(Arc::new(PickupDirectorySender::new(dir.path())));

    let response = email.send(None).unwrap();
    assert!(response.successful());
    assert_eq!(entries(dir.path()), 1);

    let path = dir
        .path()
        .join(format!("{}.eml", response.message_id.unwrap()));
    let message = Message::parse(&std::fs::read(path).unwrap()).unwrap();

    assert_eq!(message.from(), Some("\"Team\" <team@test.com>"));
    assert_eq!(
        message.to(),
        Some("\"Ann\" <ann@test.com>, \"Bob\" <bob@test.com>")
    );
    assert_eq!(message.headers().get("X-Priority"), Some("1"));
    assert_eq!(
        message.html_body().unwrap().as_deref(),
        Some("<p>Hi Ann, you are on Pro</p><img src=\"cid:logo.png\">")
    );
    assert_eq!(
        message.text_body().unwrap().as_deref(),
        Some("Hi Ann, you are on Pro")
    );
    assert_eq!(message.attachments()[0].content_id(), Some("logo.png"));
}

#[test]
fn same_email_can_be_sent_twice() {
    let dir = tempfile::tempdir().unwrap();
    let email = Email::new()
        .from("from@test.com")
        .to("to@test.com")
        .body("twice", false)
        .using_sender(Arc::new(PickupDirectorySender::new(dir.path())));

    assert!(email.send(None).unwrap().successful());
    assert!(email.send(None).unwrap().successful());
    assert_eq!(entries(dir.path()), 2);
}

#[tokio::test]
async fn cancelled_send_performs_no_io() {
    let dir = tempfile::tempdir().unwrap();
    let token = CancellationToken::new();
    token.cancel();

    let email = Email::new()
        .from("from@test.com")
        .to("to@test.com")
        .using_sender(Arc::new(SaveToDiskSender::new(dir.path())));

    let response = email.send_async(Some(&token)).await.unwrap();
    assert!(!response.successful());
    assert_eq!(
        response.error_messages,
        vec![mailkite::CANCELLED_MESSAGE.to_string()]
    );
    assert_eq!(entries(dir.path()), 0);
}

#[test]
fn mailer_resolution_order() {
    let mailer_sender = Arc::new(RecordingSender::default());
    let explicit_sender = Arc::new(RecordingSender::default());
    let mailer = Mailer::new()
        .with_sender(mailer_sender.clone())
        .with_default_from("noreply@test.com");

    mailer.email().to("a@test.com").send(None).unwrap();
    mailer
        .email()
        .to("b@test.com")
        .using_sender(explicit_sender.clone())
        .send(None)
        .unwrap();

    let via_mailer = mailer_sender.sent.lock().unwrap();
    let via_explicit = explicit_sender.sent.lock().unwrap();
    assert_eq!(via_mailer.len(), 1);
    assert_eq!(via_mailer[0].to[0].email(), "a@test.com");
    assert_eq!(via_explicit.len(), 1);
    assert_eq!(via_explicit[0].to[0].email(), "b@test.com");
    assert_eq!(
        via_explicit[0].from.as_ref().unwrap().email(),
        "noreply@test.com"
    );
}

#[test]
fn missing_from_is_a_precondition_error() {
    let sender = Arc::new(RecordingSender::default());
    let result = Email::new()
        .to("to@test.com")
        .using_sender(sender.clone())
        .send(None);

    assert!(matches!(result, Err(mailkite::Error::InvalidArgument(_))));
    assert!(sender.sent.lock().unwrap().is_empty());
}
