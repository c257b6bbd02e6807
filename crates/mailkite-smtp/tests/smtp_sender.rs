//! `SmtpSender` against a scripted in-process SMTP server.

#![allow(clippy::unwrap_used, clippy::similar_names)]

use mailkite::{Address, CancellationToken, Email, EmailData, Sender};
use mailkite_mime::Message;
use mailkite_smtp::{AuthMechanism, Security, SmtpClientOptions, SmtpSender};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

#[derive(Debug, Default)]
struct Transcript {
    commands: Vec<String>,
    data: String,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Accepts one connection and answers like a small relay. Recipients whose
/// address contains `reject` get a 550.
async fn spawn_server() -> (u16, Arc<Mutex<Transcript>>) {
    init_tracing();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let transcript = Arc::new(Mutex::new(Transcript::default()));
    let log = Arc::clone(&transcript);

    tokio::spawn(async move {
        let (socket, _) = listener.accept().await.unwrap();
        let (read, mut write) = socket.into_split();
        let mut lines = BufReader::new(read).lines();

        write.write_all(b"220 mock.test ESMTP ready\r\n").await.unwrap();

        while let Some(line) = lines.next_line().await.unwrap() {
            log.lock().unwrap().commands.push(line.clone());
            let upper = line.to_uppercase();

            let reply: &[u8] = if upper.starts_with("EHLO") {
                b"250-mock.test\r\n250-AUTH PLAIN LOGIN\r\n250 SIZE 1000000\r\n"
            } else if upper.starts_with("AUTH PLAIN") {
                b"235 2.7.0 Authentication successful\r\n"
            } else if upper.starts_with("AUTH LOGIN") {
                b"334 VXNlcm5hbWU6\r\n"
            } else if upper == "BG9NAW4=" {
                // base64("login")
                b"334 UGFzc3dvcmQ6\r\n"
            } else if upper == "C2VJCMV0" {
                // base64("secret")
                b"235 2.7.0 Authentication successful\r\n"
            } else if upper.starts_with("MAIL FROM") {
                b"250 OK\r\n"
            } else if upper.starts_with("RCPT TO") {
                if upper.contains("REJECT") {
                    b"550 5.1.1 No such user\r\n"
                } else {
                    b"250 OK\r\n"
                }
            } else if upper == "DATA" {
                write.write_all(b"354 End data with <CR><LF>.<CR><LF>\r\n").await.unwrap();
                let mut data = String::new();
                while let Some(data_line) = lines.next_line().await.unwrap() {
                    if data_line == "." {
                        break;
                    }
                    data.push_str(&data_line);
                    data.push('\n');
                }
                log.lock().unwrap().data = data;
                b"250 2.0.0 Queued\r\n"
            } else if upper == "QUIT" {
                write.write_all(b"221 Bye\r\n").await.unwrap();
                break;
            } else {
                b"502 Command not implemented\r\n"
            };

            write.write_all(reply).await.unwrap();
        }
    });

    (port, transcript)
}

fn options(port: u16) -> SmtpClientOptions {
    SmtpClientOptions::new("127.0.0.1", Security::None).with_port(port)
}

fn email() -> EmailData {
    EmailData {
        from: Some(Address::with_name("from@test.com", "Sender")),
        to: vec![Address::new("to@test.com")],
        cc: vec![Address::new("cc@test.com")],
        bcc: vec![Address::new("hidden@test.com")],
        subject: "Scripted".to_string(),
        body: "Hello\n.dot line".to_string(),
        ..EmailData::default()
    }
}

#[tokio::test]
async fn delivers_to_all_envelope_recipients() {
    let (port, transcript) = spawn_server().await;
    let sender = SmtpSender::new(options(port).with_credentials("user", "pass"));

    let response = sender.send_async(&email(), None).await.unwrap();
    assert!(response.successful(), "{:?}", response.error_messages);

    let transcript = transcript.lock().unwrap();
    assert_eq!(
        transcript.commands,
        vec![
            "EHLO localhost",
            // base64("\0user\0pass")
            "AUTH PLAIN AHVzZXIAcGFzcw==",
            "MAIL FROM:<from@test.com>",
            "RCPT TO:<to@test.com>",
            "RCPT TO:<cc@test.com>",
            "RCPT TO:<hidden@test.com>",
            "DATA",
            "QUIT",
        ]
    );

    // Dot-stuffed on the wire.
    assert!(transcript.data.contains("\n..dot line\n"));

    let message = Message::parse(transcript.data.as_bytes()).unwrap();
    assert_eq!(message.subject().as_deref(), Some("Scripted"));
    assert_eq!(message.headers().get("Cc"), Some("cc@test.com"));
    assert!(!message.headers().contains("Bcc"));
    assert_eq!(
        message.message_id().map(|id| id.trim_matches(['<', '>']).to_string()),
        response.message_id
    );
}

#[tokio::test]
async fn login_mechanism_answers_both_prompts() {
    let (port, transcript) = spawn_server().await;
    let sender = SmtpSender::new(
        options(port)
            .with_credentials("login", "secret")
            .with_auth_mechanism(AuthMechanism::Login),
    );

    let response = sender.send_async(&email(), None).await.unwrap();
    assert!(response.successful(), "{:?}", response.error_messages);

    let commands = &transcript.lock().unwrap().commands;
    assert_eq!(commands[1..4], ["AUTH LOGIN", "bG9naW4=", "c2VjcmV0"]);
}

#[tokio::test]
async fn rejected_recipient_is_a_failed_response() {
    let (port, transcript) = spawn_server().await;
    let sender = SmtpSender::new(options(port));
    let mut email = email();
    email.cc = vec![Address::new("reject@test.com")];

    let response = sender.send_async(&email, None).await.unwrap();
    assert!(!response.successful());
    assert_eq!(
        response.error_messages,
        vec!["SMTP error 550: 5.1.1 No such user".to_string()]
    );
    assert!(
        !transcript
            .lock()
            .unwrap()
            .commands
            .contains(&"DATA".to_string())
    );
}

#[tokio::test]
async fn cancelled_send_never_connects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    let token = CancellationToken::new();
    token.cancel();

    let response = SmtpSender::new(options(port))
        .send_async(&email(), Some(&token))
        .await
        .unwrap();
    assert_eq!(
        response.error_messages,
        vec![mailkite::CANCELLED_MESSAGE.to_string()]
    );

    let accepted =
        tokio::time::timeout(std::time::Duration::from_millis(50), listener.accept()).await;
    assert!(accepted.is_err());
}

#[tokio::test]
async fn connection_refused_is_a_failed_response() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap().port()
    };

    let response = SmtpSender::new(options(port))
        .send_async(&email(), None)
        .await
        .unwrap();
    assert!(!response.successful());
    assert_eq!(response.error_messages.len(), 1);
    assert!(response.error_messages[0].starts_with("I/O error"));
}

#[test]
fn blocking_send_through_the_builder() {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (port, transcript) = runtime.block_on(spawn_server());

    let response = Email::new()
        .from("from@test.com")
        .to("to@test.com")
        .subject("Blocking")
        .body("<p>Hi</p>", true)
        .using_sender(Arc::new(SmtpSender::new(options(port))))
        .send(None)
        .unwrap();

    assert!(response.successful(), "{:?}", response.error_messages);
    assert!(transcript.lock().unwrap().data.contains("Subject: Blocking"));
    drop(runtime);
}
