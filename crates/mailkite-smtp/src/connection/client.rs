//! Type-state SMTP client.

use super::{ServerInfo, SmtpStream};
use crate::command::{Command, EnvelopeAddress};
use crate::error::{Error, Result};
use crate::extension::{AuthMechanism, Extension};
use crate::reply::{Reply, ReplyCode, is_last_reply_line, parse_reply};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::marker::PhantomData;

/// Greeted, not authenticated.
#[derive(Debug)]
pub struct Connected;

/// Logged in.
#[derive(Debug)]
pub struct Authenticated;

/// `MAIL FROM` accepted.
#[derive(Debug)]
pub struct MailTransaction;

/// At least one `RCPT TO` accepted.
#[derive(Debug)]
pub struct RecipientAdded;

/// Server waiting for message data.
#[derive(Debug)]
pub struct Data;

/// States in which a mail transaction may start.
pub trait Ready: sealed::Sealed {}

impl Ready for Connected {}
impl Ready for Authenticated {}

mod sealed {
    pub trait Sealed {}
    impl Sealed for super::Connected {}
    impl Sealed for super::Authenticated {}
}

/// SMTP client whose state is tracked in the type.
#[derive(Debug)]
pub struct Client<State> {
    stream: SmtpStream,
    server_info: ServerInfo,
    _state: PhantomData<State>,
}

impl Client<Connected> {
    /// Reads the server greeting.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting cannot be read or is not 220.
    pub async fn from_stream(mut stream: SmtpStream) -> Result<Self> {
        let greeting = read_reply(&mut stream)
            .await?
            .require(ReplyCode::SERVICE_READY)?;

        let hostname = greeting
            .lines
            .first()
            .and_then(|line| line.split_whitespace().next())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            stream,
            server_info: ServerInfo {
                hostname,
                ..ServerInfo::default()
            },
            _state: PhantomData,
        })
    }

    /// Sends EHLO and records the advertised extensions.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects EHLO.
    pub async fn ehlo(mut self, client_hostname: &str) -> Result<Self> {
        let reply = self
            .send_command(Command::Ehlo {
                hostname: client_hostname.to_string(),
            })
            .await?
            .require_success()?;

        // First line is the server's own greeting.
        self.server_info.extensions = reply
            .lines
            .iter()
            .skip(1)
            .map(|line| Extension::parse(line))
            .collect();
        Ok(self)
    }

    /// Upgrades to TLS and repeats EHLO on the encrypted channel.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotSupported`] if STARTTLS was not advertised, or an
    /// error if the upgrade fails.
    pub async fn starttls(mut self, server: &str, client_hostname: &str) -> Result<Self> {
        if !self.server_info.supports_starttls() {
            return Err(Error::NotSupported("STARTTLS".into()));
        }

        self.send_command(Command::StartTls)
            .await?
            .require_success()?;
        self.stream = self.stream.upgrade(server).await?;
        tracing::debug!(server, "Connection upgraded to TLS");

        self.ehlo(client_hostname).await
    }

    /// Logs in with the given mechanism.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Rejected`] if the server refuses the credentials.
    pub async fn authenticate(
        mut self,
        mechanism: AuthMechanism,
        username: &str,
        password: &str,
    ) -> Result<Client<Authenticated>> {
        let reply = match mechanism {
            AuthMechanism::Plain => {
                let credentials = STANDARD.encode(format!("\0{username}\0{password}"));
                self.send_command(Command::Auth {
                    mechanism,
                    initial_response: Some(credentials),
                })
                .await?
            }
            AuthMechanism::Login => {
                self.send_command(Command::Auth {
                    mechanism,
                    initial_response: None,
                })
                .await?
                .require(ReplyCode::AUTH_CONTINUE)?;
                self.send_command(Command::AuthResponse(STANDARD.encode(username)))
                    .await?
                    .require(ReplyCode::AUTH_CONTINUE)?;
                self.send_command(Command::AuthResponse(STANDARD.encode(password)))
                    .await?
            }
        };

        reply.require_success()?;
        tracing::debug!(mechanism = mechanism.as_str(), "SMTP authentication succeeded");
        Ok(self.into_state())
    }
}

impl<S: Ready> Client<S> {
    /// Starts a mail transaction.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the sender.
    pub async fn mail_from(mut self, from: EnvelopeAddress) -> Result<Client<MailTransaction>> {
        self.send_command(Command::MailFrom { from, size: None })
            .await?
            .require_success()?;
        Ok(self.into_state())
    }
}

impl Client<MailTransaction> {
    /// Adds the first recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the recipient.
    pub async fn rcpt_to(mut self, to: EnvelopeAddress) -> Result<Client<RecipientAdded>> {
        self.send_command(Command::RcptTo { to })
            .await?
            .require_success()?;
        Ok(self.into_state())
    }
}

impl Client<RecipientAdded> {
    /// Adds another recipient.
    ///
    /// # Errors
    ///
    /// Returns an error if the server rejects the recipient.
    pub async fn rcpt_to(mut self, to: EnvelopeAddress) -> Result<Self> {
        self.send_command(Command::RcptTo { to })
            .await?
            .require_success()?;
        Ok(self)
    }

    /// Switches the server into data mode.
    ///
    /// # Errors
    ///
    /// Returns an error unless the server answers 354.
    pub async fn data(mut self) -> Result<Client<Data>> {
        self.send_command(Command::Data)
            .await?
            .require(ReplyCode::START_DATA)?;
        Ok(self.into_state())
    }
}

impl Client<Data> {
    /// Transmits the message and ends the transaction.
    ///
    /// Line endings become CRLF, lines starting with `.` are dot-stuffed and
    /// the terminating `.` line is appended.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails or the server rejects the message.
    pub async fn send_message(mut self, message: &[u8]) -> Result<Client<Connected>> {
        self.stream.write_all(&encode_data(message)).await?;
        read_reply(&mut self.stream).await?.require_success()?;
        Ok(self.into_state())
    }
}

impl<S> Client<S> {
    /// Server information gathered so far.
    #[must_use]
    pub const fn server_info(&self) -> &ServerInfo {
        &self.server_info
    }

    /// Returns true if the transport is encrypted.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        self.stream.is_encrypted()
    }

    /// Sends QUIT. Available in any state.
    ///
    /// # Errors
    ///
    /// Returns an error if the QUIT exchange fails.
    pub async fn quit(mut self) -> Result<()> {
        let reply = self.send_command(Command::Quit).await?;
        if reply.code == ReplyCode::CLOSING {
            Ok(())
        } else {
            reply.require_success().map(drop)
        }
    }

    async fn send_command(&mut self, command: Command) -> Result<Reply> {
        tracing::debug!(command = %command.log_line(), "SMTP >");
        self.stream.write_all(&command.serialize()).await?;
        let reply = read_reply(&mut self.stream).await?;
        tracing::debug!(code = reply.code.as_u16(), text = %reply.text(), "SMTP <");
        Ok(reply)
    }

    fn into_state<T>(self) -> Client<T> {
        Client {
            stream: self.stream,
            server_info: self.server_info,
            _state: PhantomData,
        }
    }
}

async fn read_reply(stream: &mut SmtpStream) -> Result<Reply> {
    let mut lines = Vec::new();
    loop {
        let line = stream.read_line().await?;
        if line.is_empty() {
            continue;
        }
        let last = is_last_reply_line(&line);
        lines.push(line);
        if last {
            return parse_reply(&lines);
        }
    }
}

/// CRLF-normalized, dot-stuffed DATA payload including the final `.` line.
fn encode_data(message: &[u8]) -> Vec<u8> {
    let body = message.strip_suffix(b"\n").unwrap_or(message);
    let mut out = Vec::with_capacity(message.len() + 16);

    for line in body.split(|&b| b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        if line.first() == Some(&b'.') {
            out.push(b'.');
        }
        out.extend_from_slice(line);
        out.extend_from_slice(b"\r\n");
    }

    out.extend_from_slice(b".\r\n");
    out
}
