//! Line-oriented TCP/TLS transport.

use crate::error::{Error, Result};
use crate::options::Security;
use rustls::pki_types::ServerName;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tokio_rustls::client::TlsStream;
use tokio_rustls::rustls::{ClientConfig, RootCertStore};

/// SMTP transport, plain or encrypted.
#[derive(Debug)]
pub enum SmtpStream {
    /// Plain TCP.
    Tcp(BufReader<TcpStream>),
    /// TLS over TCP.
    Tls(Box<BufReader<TlsStream<TcpStream>>>),
}

impl SmtpStream {
    /// Opens a connection using the given security mode.
    ///
    /// `Security::StartTls` opens plain TCP; the upgrade happens after EHLO.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP connection or TLS handshake fails.
    pub async fn open(server: &str, port: u16, security: Security) -> Result<Self> {
        let tcp = TcpStream::connect((server, port)).await?;
        tracing::debug!(server, port, security = security.display_name(), "SMTP connection opened");

        match security {
            Security::Tls => Ok(Self::Tls(Box::new(BufReader::new(
                handshake(server, tcp).await?,
            )))),
            Security::None | Security::StartTls => Ok(Self::Tcp(BufReader::new(tcp))),
        }
    }

    /// Returns true once the transport is encrypted.
    #[must_use]
    pub const fn is_encrypted(&self) -> bool {
        matches!(self, Self::Tls(_))
    }

    /// Reads one line without its line ending.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] when the server closes the connection.
    pub async fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        let read = match self {
            Self::Tcp(reader) => reader.read_line(&mut line).await?,
            Self::Tls(reader) => reader.read_line(&mut line).await?,
        };
        if read == 0 {
            return Err(Error::Protocol("Connection closed by server".into()));
        }
        Ok(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Writes and flushes bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    pub async fn write_all(&mut self, data: &[u8]) -> Result<()> {
        match self {
            Self::Tcp(reader) => {
                let stream = reader.get_mut();
                stream.write_all(data).await?;
                stream.flush().await?;
            }
            Self::Tls(reader) => {
                let stream = reader.get_mut();
                stream.write_all(data).await?;
                stream.flush().await?;
            }
        }
        Ok(())
    }

    /// Upgrades a plain stream to TLS (STARTTLS).
    ///
    /// # Errors
    ///
    /// Returns an error if the stream is already encrypted or the handshake
    /// fails.
    pub async fn upgrade(self, server: &str) -> Result<Self> {
        match self {
            Self::Tcp(reader) => Ok(Self::Tls(Box::new(BufReader::new(
                handshake(server, reader.into_inner()).await?,
            )))),
            Self::Tls(_) => Err(Error::Protocol("Connection is already encrypted".into())),
        }
    }
}

async fn handshake(server: &str, tcp: TcpStream) -> Result<TlsStream<TcpStream>> {
    let server_name = ServerName::try_from(server.to_string())
        .map_err(|_| Error::Protocol(format!("Invalid server name: {server}")))?;
    Ok(connector().connect(server_name, tcp).await?)
}

fn connector() -> TlsConnector {
    let roots = RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    };
    let config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}
