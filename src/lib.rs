// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay
//!
//! Backend for a site contact form. Submissions are accepted over HTTP and
//! relayed by SMTP:
//!
//! - Per-IP sliding-window rate limiting (5 per hour default)
//! - Required field and email validation
//! - Operator notification through an authenticated SMTP relay
//!   (STARTTLS, AUTH LOGIN/PLAIN)
//! - Best-effort localized confirmation to the visitor (es, en, ca, eu)
//! - Origin allow-list for CORS

pub mod compose;
pub mod config;
pub mod error;
pub mod form;
pub mod handlers;
pub mod limiter;
pub mod smtp;
pub mod validator;

pub use config::Config;
pub use form::ContactForm;
pub use limiter::RateLimiter;
pub use smtp::{Mailer, OutboundMessage, SendError, SmtpSender};
