// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! SMTP AUTH (RFC 4954) with the LOGIN and PLAIN mechanisms.
//!
//! LOGIN is preferred because several submission relays only offer it;
//! PLAIN is the fallback. Sending without authentication is never
//! attempted.

use super::client::{Capabilities, Connection};
use super::error::{ProtocolError, SendError};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;

/// Challenges accepted before LOGIN is considered stuck.
const MAX_LOGIN_CHALLENGES: usize = 4;

/// Authentication mechanism picked from the server's advertisement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mechanism {
    Login,
    Plain,
}

impl Mechanism {
    /// Pick LOGIN if advertised, else PLAIN, else fail naming what was
    /// offered.
    pub fn select(capabilities: &Capabilities) -> Result<Self, SendError> {
        let Some(advertised) = capabilities.params("AUTH") else {
            return Err(SendError::Auth(
                "server does not advertise AUTH extension".to_string(),
            ));
        };

        let offers = |name: &str| {
            advertised
                .split_whitespace()
                .any(|m| m.eq_ignore_ascii_case(name))
        };

        if offers("LOGIN") {
            Ok(Self::Login)
        } else if offers("PLAIN") {
            Ok(Self::Plain)
        } else {
            Err(SendError::Auth(format!(
                "server does not support LOGIN or PLAIN auth (advertised: {advertised})"
            )))
        }
    }
}

/// Authenticate on an open session using the best advertised mechanism.
pub(crate) async fn authenticate(
    conn: &mut Connection,
    capabilities: &Capabilities,
    username: &str,
    password: &str,
) -> Result<(), SendError> {
    let mechanism = Mechanism::select(capabilities)?;
    debug!(?mechanism, "Authenticating");

    match mechanism {
        Mechanism::Login => login(conn, username, password).await,
        Mechanism::Plain => plain(conn, username, password).await,
    }
}

async fn login(conn: &mut Connection, username: &str, password: &str) -> Result<(), SendError> {
    conn.send_line("AUTH LOGIN").await.map_err(SendError::auth)?;

    for _ in 0..MAX_LOGIN_CHALLENGES {
        let reply = conn.read_reply().await.map_err(SendError::auth)?;
        match reply.code {
            235 => return Ok(()),
            334 => {
                let prompt = decode_challenge(reply.text())?;
                let answer = match prompt.trim().to_lowercase().as_str() {
                    "username:" => username,
                    "password:" => password,
                    _ => {
                        return Err(SendError::Auth(format!(
                            "unexpected server prompt: {}",
                            prompt.trim()
                        )))
                    }
                };
                conn.send_secret(&STANDARD.encode(answer))
                    .await
                    .map_err(SendError::auth)?;
            }
            _ => {
                return Err(SendError::Auth(format!(
                    "LOGIN rejected: {}",
                    ProtocolError::Unexpected(reply)
                )))
            }
        }
    }

    Err(SendError::Auth("LOGIN exchange did not complete".to_string()))
}

async fn plain(conn: &mut Connection, username: &str, password: &str) -> Result<(), SendError> {
    let token = STANDARD.encode(format!("\0{username}\0{password}"));
    conn.send_secret(&format!("AUTH PLAIN {token}"))
        .await
        .map_err(SendError::auth)?;

    conn.expect(235)
        .await
        .map(|_| ())
        .map_err(|e| SendError::Auth(format!("PLAIN rejected: {e}")))
}

fn decode_challenge(text: &str) -> Result<String, SendError> {
    let bytes = STANDARD
        .decode(text.trim())
        .map_err(|_| SendError::Auth(format!("malformed challenge: {text:?}")))?;
    String::from_utf8(bytes).map_err(|_| SendError::Auth("challenge is not UTF-8".to_string()))
}
