// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Error types for the SMTP sender.

use super::client::Reply;
use std::fmt;
use thiserror::Error;

/// Low-level failure while talking to the relay. Always wrapped into a
/// [`SendError`] naming the stage it happened in.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("connection closed by server")]
    Closed,

    #[error("malformed reply line: {0:?}")]
    Malformed(String),

    #[error("unexpected reply: {0}")]
    Unexpected(Reply),

    #[error("TLS: {0}")]
    Tls(String),
}

/// Failure of one send attempt, tagged with the protocol stage.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("greeting: {0}")]
    Greeting(String),

    #[error("STARTTLS: {0}")]
    Tls(String),

    #[error("authentication: {0}")]
    Auth(String),

    #[error("envelope rejected: {0}")]
    Envelope(String),

    #[error("data transfer: {0}")]
    Transfer(String),
}

/// Protocol stage a [`SendError`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Connect,
    Greeting,
    Tls,
    Auth,
    Envelope,
    Transfer,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connect => write!(f, "connect"),
            Self::Greeting => write!(f, "greeting"),
            Self::Tls => write!(f, "starttls"),
            Self::Auth => write!(f, "auth"),
            Self::Envelope => write!(f, "envelope"),
            Self::Transfer => write!(f, "transfer"),
        }
    }
}

impl SendError {
    pub fn stage(&self) -> Stage {
        match self {
            Self::Connect { .. } => Stage::Connect,
            Self::Greeting(_) => Stage::Greeting,
            Self::Tls(_) => Stage::Tls,
            Self::Auth(_) => Stage::Auth,
            Self::Envelope(_) => Stage::Envelope,
            Self::Transfer(_) => Stage::Transfer,
        }
    }

    pub(crate) fn greeting(err: ProtocolError) -> Self {
        Self::Greeting(err.to_string())
    }

    pub(crate) fn tls(err: ProtocolError) -> Self {
        Self::Tls(err.to_string())
    }

    pub(crate) fn auth(err: ProtocolError) -> Self {
        Self::Auth(err.to_string())
    }

    pub(crate) fn envelope(err: ProtocolError) -> Self {
        Self::Envelope(err.to_string())
    }

    pub(crate) fn transfer(err: ProtocolError) -> Self {
        Self::Transfer(err.to_string())
    }
}
