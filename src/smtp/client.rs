// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Line-level SMTP client connection (RFC 5321).
//!
//! Reads multi-line replies, issues commands, parses EHLO capabilities
//! and upgrades the transport in place with STARTTLS (RFC 3207).

use super::error::ProtocolError;
use rustls::pki_types::ServerName;
use std::collections::HashMap;
use std::fmt;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio_rustls::TlsConnector;
use tracing::trace;

/// Upper bound on lines in one reply.
const MAX_REPLY_LINES: usize = 128;

/// Upper bound on a single reply line including CRLF (RFC 5321 §4.5.3.1.5).
const MAX_REPLY_LINE_LENGTH: usize = 512;

/// Byte stream an SMTP session can run over, plaintext or TLS.
pub(crate) trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Stream for T {}

/// A complete server reply: status code plus the text of every line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub code: u16,
    pub lines: Vec<String>,
}

impl Reply {
    /// Positive completion (2xx).
    pub fn is_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Text of the first line.
    pub fn text(&self) -> &str {
        self.lines.first().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.lines.join(" "))
    }
}

/// Extensions advertised in an EHLO reply, keyed by upper-case keyword.
#[derive(Debug, Clone, Default)]
pub struct Capabilities {
    extensions: HashMap<String, String>,
}

impl Capabilities {
    /// Parse the lines of a `250` EHLO reply. The first line is the
    /// server's greeting and carries no extension.
    pub fn from_ehlo(reply: &Reply) -> Self {
        let extensions = reply
            .lines
            .iter()
            .skip(1)
            .filter_map(|line| {
                let line = line.trim();
                if line.is_empty() {
                    return None;
                }
                // Some servers still send the pre-standard "AUTH=LOGIN" form.
                let (keyword, params) = match line.find([' ', '=']) {
                    Some(at) => (&line[..at], line[at + 1..].trim()),
                    None => (line, ""),
                };
                Some((keyword.to_ascii_uppercase(), params.to_string()))
            })
            .collect();

        Self { extensions }
    }

    pub fn supports(&self, keyword: &str) -> bool {
        self.extensions.contains_key(&keyword.to_ascii_uppercase())
    }

    pub fn params(&self, keyword: &str) -> Option<&str> {
        self.extensions
            .get(&keyword.to_ascii_uppercase())
            .map(String::as_str)
    }
}

/// One SMTP connection. Dropping it closes the socket.
pub(crate) struct Connection {
    stream: BufReader<Box<dyn Stream>>,
}

impl Connection {
    pub fn new<S: Stream + 'static>(stream: S) -> Self {
        Self {
            stream: BufReader::new(Box::new(stream)),
        }
    }

    /// Read one complete, possibly multi-line, reply.
    pub async fn read_reply(&mut self) -> Result<Reply, ProtocolError> {
        let mut lines = Vec::new();
        let mut line = String::new();

        loop {
            line.clear();
            // One byte past the limit is enough to tell an overlong line.
            let n = (&mut self.stream)
                .take(MAX_REPLY_LINE_LENGTH as u64 + 1)
                .read_line(&mut line)
                .await?;
            if n == 0 {
                return Err(ProtocolError::Closed);
            }
            if n > MAX_REPLY_LINE_LENGTH {
                return Err(ProtocolError::Malformed(truncate(&line)));
            }

            let raw = line.trim_end_matches(['\r', '\n']);
            let (code, more, text) = parse_reply_line(raw)?;
            lines.push(text.to_string());

            if !more {
                trace!(code, "S: {}", raw);
                return Ok(Reply { code, lines });
            }
            if lines.len() >= MAX_REPLY_LINES {
                return Err(ProtocolError::Malformed("reply has too many lines".to_string()));
            }
        }
    }

    /// Read a reply and require a specific code.
    pub async fn expect(&mut self, code: u16) -> Result<Reply, ProtocolError> {
        let reply = self.read_reply().await?;
        if reply.code == code {
            Ok(reply)
        } else {
            Err(ProtocolError::Unexpected(reply))
        }
    }

    /// Send a single command line; CRLF is appended.
    pub async fn send_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        trace!("C: {}", line);
        self.write_line(line).await
    }

    /// Like [`send_line`](Self::send_line) but keeps the line out of traces.
    pub async fn send_secret(&mut self, line: &str) -> Result<(), ProtocolError> {
        trace!("C: <redacted>");
        self.write_line(line).await
    }

    async fn write_line(&mut self, line: &str) -> Result<(), ProtocolError> {
        let stream = self.stream.get_mut();
        stream.write_all(line.as_bytes()).await?;
        stream.write_all(b"\r\n").await?;
        stream.flush().await?;
        Ok(())
    }

    /// Send a command and require any 2xx reply.
    pub async fn command_ok(&mut self, line: &str) -> Result<Reply, ProtocolError> {
        self.send_line(line).await?;
        let reply = self.read_reply().await?;
        if reply.is_completion() {
            Ok(reply)
        } else {
            Err(ProtocolError::Unexpected(reply))
        }
    }

    /// Send a command and require the given reply code.
    pub async fn command(&mut self, line: &str, code: u16) -> Result<Reply, ProtocolError> {
        self.send_line(line).await?;
        self.expect(code).await
    }

    /// Send `EHLO` and collect the advertised extensions.
    pub async fn ehlo(&mut self, hello_name: &str) -> Result<Capabilities, ProtocolError> {
        let reply = self.command(&format!("EHLO {hello_name}"), 250).await?;
        Ok(Capabilities::from_ehlo(&reply))
    }

    /// Negotiate STARTTLS and continue the session over TLS, validating the
    /// certificate against `host`.
    pub async fn starttls(
        mut self,
        connector: &TlsConnector,
        host: &str,
    ) -> Result<Connection, ProtocolError> {
        self.command("STARTTLS", 220).await?;

        let server_name = ServerName::try_from(host.to_string())
            .map_err(|e| ProtocolError::Tls(format!("invalid server name {host:?}: {e}")))?;

        let plain = self.stream.into_inner();
        let tls = connector
            .connect(server_name, plain)
            .await
            .map_err(|e| ProtocolError::Tls(e.to_string()))?;

        Ok(Connection::new(tls))
    }

    /// Transmit the DATA payload: CRLF line endings, leading dots doubled,
    /// terminated by `<CRLF>.<CRLF>`.
    pub async fn send_data(&mut self, content: &str) -> Result<(), ProtocolError> {
        let payload = dot_stuff(content);
        let stream = self.stream.get_mut();
        stream.write_all(payload.as_bytes()).await?;
        stream.write_all(b".\r\n").await?;
        stream.flush().await?;
        Ok(())
    }

    pub async fn quit(&mut self) -> Result<(), ProtocolError> {
        self.command("QUIT", 221).await.map(|_| ())
    }
}

fn parse_reply_line(raw: &str) -> Result<(u16, bool, &str), ProtocolError> {
    let bytes = raw.as_bytes();
    if bytes.len() < 3 || !bytes[..3].iter().all(u8::is_ascii_digit) {
        return Err(ProtocolError::Malformed(truncate(raw)));
    }
    // Three ASCII digits, so the slice boundary is valid.
    let code: u16 = raw[..3]
        .parse()
        .map_err(|_| ProtocolError::Malformed(truncate(raw)))?;

    match bytes.get(3) {
        None => Ok((code, false, "")),
        Some(b' ') => Ok((code, false, &raw[4..])),
        Some(b'-') => Ok((code, true, &raw[4..])),
        Some(_) => Err(ProtocolError::Malformed(truncate(raw))),
    }
}

/// Normalize line endings to CRLF and double leading dots. The result
/// always ends with CRLF.
pub(crate) fn dot_stuff(content: &str) -> String {
    let mut out = String::with_capacity(content.len() + 64);
    for line in content.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with('.') {
            out.push('.');
        }
        out.push_str(line);
        out.push_str("\r\n");
    }
    // A trailing newline yields one empty segment too many.
    if content.ends_with('\n') {
        out.truncate(out.len() - 2);
    }
    out
}

fn truncate(line: &str) -> String {
    line.chars().take(80).collect()
}
