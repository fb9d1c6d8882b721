// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Outbound plain-text message and its RFC 5322 rendering.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};

/// Longest raw UTF-8 run packed into one encoded word; 45 bytes become
/// 60 base64 characters, keeping each word under 75 (RFC 2047 §2).
const ENCODED_WORD_CHUNK: usize = 45;

/// One message to one recipient. Built per send and dropped afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub reply_to: Option<String>,
    pub body: String,
}

impl OutboundMessage {
    /// Render headers and body with CRLF line endings, dated now.
    pub fn render(&self) -> String {
        self.render_at(Utc::now())
    }

    /// Render with an explicit `Date` header.
    pub fn render_at(&self, date: DateTime<Utc>) -> String {
        let mut out = String::with_capacity(self.body.len() + 512);

        push_header(&mut out, "Date", &date.to_rfc2822());
        push_header(&mut out, "From", &sanitize(&self.from));
        push_header(&mut out, "To", &sanitize(&self.to));
        push_header(&mut out, "Subject", &encode_header_text(&self.subject));
        if let Some(reply_to) = self.reply_to.as_deref().filter(|r| !r.is_empty()) {
            push_header(&mut out, "Reply-To", &sanitize(reply_to));
        }
        push_header(&mut out, "MIME-Version", "1.0");
        push_header(&mut out, "Content-Type", "text/plain; charset=UTF-8");
        push_header(&mut out, "Content-Transfer-Encoding", "8bit");
        out.push_str("\r\n");

        for line in self.body.lines() {
            out.push_str(line);
            out.push_str("\r\n");
        }
        out
    }
}

/// Whether `address` can be placed in a `MAIL FROM`/`RCPT TO` path.
pub fn is_safe_address(address: &str) -> bool {
    !address.is_empty()
        && !address
            .chars()
            .any(|c| c.is_control() || c.is_whitespace() || c == '<' || c == '>')
}

fn push_header(out: &mut String, name: &str, value: &str) {
    out.push_str(name);
    out.push_str(": ");
    out.push_str(value);
    out.push_str("\r\n");
}

/// Drop CR and LF so a value cannot start a new header line.
fn sanitize(value: &str) -> String {
    value.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// Encode unstructured header text as RFC 2047 `B` words when it is not
/// plain ASCII.
fn encode_header_text(value: &str) -> String {
    let value = sanitize(value);
    if value.is_ascii() {
        return value;
    }

    let mut words = Vec::new();
    let mut chunk = String::new();
    for c in value.chars() {
        if chunk.len() + c.len_utf8() > ENCODED_WORD_CHUNK {
            words.push(encoded_word(&chunk));
            chunk.clear();
        }
        chunk.push(c);
    }
    if !chunk.is_empty() {
        words.push(encoded_word(&chunk));
    }
    words.join("\r\n ")
}

fn encoded_word(text: &str) -> String {
    format!("=?UTF-8?B?{}?=", STANDARD.encode(text))
}
