// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! SMTP submission client.
//!
//! Every send opens its own connection and walks the session in a fixed
//! order: greeting, optional STARTTLS, AUTH, envelope, DATA, QUIT. A
//! failure at any stage aborts the session with a [`SendError`] tagged
//! with that stage. Nothing is retried here.

mod auth;
mod client;
mod error;
mod message;

pub use auth::Mechanism;
pub use client::{Capabilities, Reply};
pub use error::{ProtocolError, SendError, Stage};
pub use message::{is_safe_address, OutboundMessage};

use crate::config::SmtpConfig;
use async_trait::async_trait;
use client::Connection;
use rustls::{ClientConfig, RootCertStore};
use std::io;
use std::sync::Arc;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, info, warn};

/// Anything that can deliver an [`OutboundMessage`].
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SendError>;
}

/// Sends mail through one configured relay.
pub struct SmtpSender {
    config: SmtpConfig,
    tls: TlsConnector,
}

impl SmtpSender {
    /// Create a sender validating relay certificates against the bundled
    /// Mozilla root set.
    pub fn new(config: SmtpConfig) -> Self {
        let mut roots = RootCertStore::empty();
        roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

        let tls_config = ClientConfig::builder()
            .with_root_certificates(roots)
            .with_no_client_auth();

        Self::with_tls_config(config, Arc::new(tls_config))
    }

    /// Create a sender with a caller-provided TLS client configuration.
    pub fn with_tls_config(config: SmtpConfig, tls_config: Arc<ClientConfig>) -> Self {
        Self {
            config,
            tls: TlsConnector::from(tls_config),
        }
    }

    /// Deliver one message. The connection is closed on every return path
    /// since the session owns it.
    pub async fn send_message(&self, message: &OutboundMessage) -> Result<(), SendError> {
        for address in [&message.from, &message.to] {
            if !is_safe_address(address) {
                return Err(SendError::Envelope(format!("invalid address {address:?}")));
            }
        }

        let stream = connect(&self.config).await?;
        let mut conn = Connection::new(stream);

        conn.expect(220).await.map_err(SendError::greeting)?;
        let mut capabilities = conn
            .ehlo(&self.config.hello_name)
            .await
            .map_err(SendError::greeting)?;

        if capabilities.supports("STARTTLS") {
            conn = conn
                .starttls(&self.tls, &self.config.host)
                .await
                .map_err(SendError::tls)?;
            capabilities = conn
                .ehlo(&self.config.hello_name)
                .await
                .map_err(SendError::tls)?;
            debug!(host = %self.config.host, "STARTTLS negotiated");
        } else {
            debug!(host = %self.config.host, "STARTTLS not offered, continuing in plaintext");
        }

        auth::authenticate(
            &mut conn,
            &capabilities,
            &self.config.username,
            &self.config.password,
        )
        .await?;

        conn.command_ok(&format!("MAIL FROM:<{}>", message.from))
            .await
            .map_err(SendError::envelope)?;
        conn.command_ok(&format!("RCPT TO:<{}>", message.to))
            .await
            .map_err(SendError::envelope)?;

        conn.command("DATA", 354).await.map_err(SendError::transfer)?;
        conn.send_data(&message.render())
            .await
            .map_err(SendError::transfer)?;
        conn.expect(250).await.map_err(SendError::transfer)?;

        // The relay has accepted the message at this point.
        if let Err(e) = conn.quit().await {
            warn!(error = %e, "QUIT failed after message was accepted");
        }

        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpSender {
    async fn send(&self, message: &OutboundMessage) -> Result<(), SendError> {
        self.send_message(message).await
    }
}

/// Check that the relay accepts TCP connections. Used once at startup.
pub async fn probe(config: &SmtpConfig) -> Result<(), SendError> {
    connect(config).await?;
    info!(addr = %config.address(), "SMTP server is reachable");
    Ok(())
}

async fn connect(config: &SmtpConfig) -> Result<TcpStream, SendError> {
    let addr = config.address();
    match tokio::time::timeout(config.connect_timeout(), TcpStream::connect(&addr)).await {
        Ok(Ok(stream)) => Ok(stream),
        Ok(Err(source)) => Err(SendError::Connect { addr, source }),
        Err(_) => Err(SendError::Connect {
            addr,
            source: io::Error::new(io::ErrorKind::TimedOut, "connection timed out"),
        }),
    }
}
