// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! SMTP sender tests against a scripted in-process relay.

use contact_relay::config::SmtpConfig;
use contact_relay::smtp::{probe, OutboundMessage, SendError, SmtpSender, Stage};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{ClientConfig, RootCertStore, ServerConfig};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_rustls::TlsAcceptor;

trait RelayIo: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> RelayIo for T {}

/// One step of the relay's side of the conversation.
enum Step {
    /// Write a reply (CRLF-terminated lines).
    Say(&'static str),
    /// Read one command line that must start with the given prefix.
    Hear(&'static str),
    /// Read the DATA payload up to the terminating dot.
    Data,
    /// Run the server side of a TLS handshake on the connection.
    Handshake(TlsAcceptor),
}

use Step::{Data, Handshake, Hear, Say};

/// Run `steps` against the first connection and return every line the
/// client sent. Stops quietly when the client hangs up early.
async fn scripted_relay(steps: Vec<Step>) -> (SocketAddr, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut stream: BufReader<Box<dyn RelayIo>> = BufReader::new(Box::new(stream));
        let mut transcript = Vec::new();
        let mut line = String::new();

        for step in steps {
            match step {
                Say(reply) => {
                    let out = stream.get_mut();
                    if out.write_all(reply.as_bytes()).await.is_err() || out.flush().await.is_err() {
                        break;
                    }
                }
                Hear(prefix) => {
                    line.clear();
                    if stream.read_line(&mut line).await.unwrap_or(0) == 0 {
                        break;
                    }
                    assert!(
                        line.starts_with(prefix),
                        "expected {prefix:?}, got {line:?}"
                    );
                    transcript.push(line.trim_end().to_string());
                }
                Data => {
                    let mut payload = String::new();
                    loop {
                        line.clear();
                        if stream.read_line(&mut line).await.unwrap_or(0) == 0 {
                            break;
                        }
                        if line == ".\r\n" {
                            break;
                        }
                        payload.push_str(&line);
                    }
                    transcript.push(payload);
                }
                Handshake(acceptor) => match acceptor.accept(stream.into_inner()).await {
                    Ok(tls) => {
                        transcript.push("<tls>".to_string());
                        stream = BufReader::new(Box::new(tls));
                    }
                    Err(_) => {
                        transcript.push("<tls failed>".to_string());
                        break;
                    }
                },
            }
        }
        transcript
    });

    (addr, handle)
}

fn config(addr: SocketAddr) -> SmtpConfig {
    SmtpConfig {
        host: addr.ip().to_string(),
        port: addr.port(),
        username: "user".to_string(),
        password: "pass".to_string(),
        hello_name: "localhost".to_string(),
        connect_timeout_secs: 5,
    }
}

fn message() -> OutboundMessage {
    OutboundMessage {
        from: "web@landofirm.com".to_string(),
        to: "info@landofirm.com".to_string(),
        subject: "Nuevo contacto: Ana".to_string(),
        reply_to: Some("a@b.com".to_string()),
        body: "Nombre: Ana\n.signature\n".to_string(),
    }
}

const GREETING: Step = Say("220 relay.example.com ESMTP ready\r\n");
const EHLO_LOGIN: Step = Say("250-relay.example.com\r\n250-8BITMIME\r\n250 AUTH PLAIN LOGIN\r\n");

fn login_ok() -> Vec<Step> {
    vec![
        Hear("AUTH LOGIN"),
        Say("334 VXNlcm5hbWU6\r\n"),
        Hear("dXNlcg=="),
        Say("334 UGFzc3dvcmQ6\r\n"),
        Hear("cGFzcw=="),
        Say("235 2.7.0 Authentication successful\r\n"),
    ]
}

#[tokio::test]
async fn test_full_session_with_login() {
    let mut steps = vec![GREETING, Hear("EHLO localhost"), EHLO_LOGIN];
    steps.extend(login_ok());
    steps.extend([
        Hear("MAIL FROM:<web@landofirm.com>"),
        Say("250 2.1.0 Ok\r\n"),
        Hear("RCPT TO:<info@landofirm.com>"),
        Say("250 2.1.5 Ok\r\n"),
        Hear("DATA"),
        Say("354 End data with <CR><LF>.<CR><LF>\r\n"),
        Data,
        Say("250 2.0.0 Ok: queued\r\n"),
        Hear("QUIT"),
        Say("221 2.0.0 Bye\r\n"),
    ]);
    let (addr, relay) = scripted_relay(steps).await;

    let result = SmtpSender::new(config(addr)).send_message(&message()).await;
    tokio_test::assert_ok!(result);

    let transcript = relay.await.unwrap();
    assert_eq!(transcript.last().map(String::as_str), Some("QUIT"));

    let payload = transcript
        .iter()
        .find(|l| l.contains("Subject:"))
        .expect("DATA payload recorded");
    assert!(payload.contains("From: web@landofirm.com\r\n"));
    assert!(payload.contains("To: info@landofirm.com\r\n"));
    assert!(payload.contains("Subject: Nuevo contacto: Ana\r\n"));
    assert!(payload.contains("Reply-To: a@b.com\r\n"));
    assert!(payload.contains("Content-Type: text/plain; charset=UTF-8\r\n"));
    assert!(payload.contains("\r\n\r\nNombre: Ana\r\n"));
    // Leading dot is doubled on the wire.
    assert!(payload.contains("\r\n..signature\r\n"));
}

#[tokio::test]
async fn test_plain_used_when_login_absent() {
    let steps = vec![
        GREETING,
        Hear("EHLO"),
        Say("250-relay.example.com\r\n250 AUTH PLAIN CRAM-MD5\r\n"),
        Hear("AUTH PLAIN AHVzZXIAcGFzcw=="),
        Say("235 ok\r\n"),
        Hear("MAIL FROM:"),
        Say("250 ok\r\n"),
        Hear("RCPT TO:"),
        Say("251 will forward\r\n"),
        Hear("DATA"),
        Say("354 go ahead\r\n"),
        Data,
        Say("250 queued\r\n"),
        Hear("QUIT"),
        Say("221 bye\r\n"),
    ];
    let (addr, relay) = scripted_relay(steps).await;

    let result = SmtpSender::new(config(addr)).send_message(&message()).await;
    tokio_test::assert_ok!(result);
    relay.await.unwrap();
}

#[tokio::test]
async fn test_no_auth_advertised_fails_before_envelope() {
    let steps = vec![
        GREETING,
        Hear("EHLO"),
        Say("250-relay.example.com\r\n250 PIPELINING\r\n"),
        Hear("MAIL FROM:"),
    ];
    let (addr, relay) = scripted_relay(steps).await;

    let err = SmtpSender::new(config(addr))
        .send_message(&message())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Auth);
    assert!(err.to_string().contains("does not advertise AUTH"));

    // Dropping the session closed the socket; the relay never saw MAIL FROM.
    let transcript = relay.await.unwrap();
    assert_eq!(transcript, vec!["EHLO localhost"]);
}

#[tokio::test]
async fn test_rejected_credentials_are_auth_errors() {
    let steps = vec![
        GREETING,
        Hear("EHLO"),
        EHLO_LOGIN,
        Hear("AUTH LOGIN"),
        Say("334 VXNlcm5hbWU6\r\n"),
        Hear("dXNlcg=="),
        Say("334 UGFzc3dvcmQ6\r\n"),
        Hear("cGFzcw=="),
        Say("535 5.7.8 Authentication credentials invalid\r\n"),
    ];
    let (addr, _relay) = scripted_relay(steps).await;

    let err = SmtpSender::new(config(addr))
        .send_message(&message())
        .await
        .unwrap_err();
    assert!(matches!(err, SendError::Auth(_)));
    assert!(err.to_string().contains("535"));
}

#[tokio::test]
async fn test_recipient_rejection_is_envelope_error() {
    let mut steps = vec![GREETING, Hear("EHLO"), EHLO_LOGIN];
    steps.extend(login_ok());
    steps.extend([
        Hear("MAIL FROM:"),
        Say("250 ok\r\n"),
        Hear("RCPT TO:"),
        Say("550 5.1.1 <info@landofirm.com>: Recipient address rejected\r\n"),
    ]);
    let (addr, _relay) = scripted_relay(steps).await;

    let err = SmtpSender::new(config(addr))
        .send_message(&message())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Envelope);
    assert_ne!(err.stage(), Stage::Auth);
    match err {
        SendError::Envelope(reason) => assert!(reason.contains("Recipient address rejected")),
        other => panic!("expected envelope error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_rejected_message_is_transfer_error() {
    let mut steps = vec![GREETING, Hear("EHLO"), EHLO_LOGIN];
    steps.extend(login_ok());
    steps.extend([
        Hear("MAIL FROM:"),
        Say("250 ok\r\n"),
        Hear("RCPT TO:"),
        Say("250 ok\r\n"),
        Hear("DATA"),
        Say("354 go ahead\r\n"),
        Data,
        Say("554 5.7.1 Message rejected as spam\r\n"),
    ]);
    let (addr, _relay) = scripted_relay(steps).await;

    let err = SmtpSender::new(config(addr))
        .send_message(&message())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Transfer);
}

#[tokio::test]
async fn test_refused_starttls_is_tls_error() {
    let steps = vec![
        GREETING,
        Hear("EHLO"),
        Say("250-relay.example.com\r\n250-STARTTLS\r\n250 AUTH LOGIN\r\n"),
        Hear("STARTTLS"),
        Say("454 4.7.0 TLS not available due to temporary reason\r\n"),
    ];
    let (addr, _relay) = scripted_relay(steps).await;

    let err = SmtpSender::new(config(addr))
        .send_message(&message())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Tls);
}

#[tokio::test]
async fn test_bad_greeting_is_greeting_error() {
    let steps = vec![Say("554 no SMTP service here\r\n")];
    let (addr, _relay) = scripted_relay(steps).await;

    let err = SmtpSender::new(config(addr))
        .send_message(&message())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Greeting);
}

#[tokio::test]
async fn test_quit_failure_after_acceptance_is_ignored() {
    let mut steps = vec![GREETING, Hear("EHLO"), EHLO_LOGIN];
    steps.extend(login_ok());
    steps.extend([
        Hear("MAIL FROM:"),
        Say("250 ok\r\n"),
        Hear("RCPT TO:"),
        Say("250 ok\r\n"),
        Hear("DATA"),
        Say("354 go ahead\r\n"),
        Data,
        Say("250 queued\r\n"),
        // Relay hangs up instead of answering QUIT.
    ]);
    let (addr, _relay) = scripted_relay(steps).await;

    let result = SmtpSender::new(config(addr)).send_message(&message()).await;
    tokio_test::assert_ok!(result);
}

#[tokio::test]
async fn test_connect_failure_is_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let err = SmtpSender::new(config(addr))
        .send_message(&message())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Connect);

    let err = probe(&config(addr)).await.unwrap_err();
    assert!(matches!(err, SendError::Connect { .. }));
}

#[tokio::test]
async fn test_unsafe_recipient_never_dials() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let msg = OutboundMessage {
        to: "a@b.com>\r\nRCPT TO:<victim@example.com".to_string(),
        ..message()
    };
    let err = SmtpSender::new(config(addr))
        .send_message(&msg)
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Envelope);
}

/// Self-signed certificate for 127.0.0.1 plus an acceptor serving it.
fn self_signed_relay_tls() -> (CertificateDer<'static>, TlsAcceptor) {
    let certified = rcgen::generate_simple_self_signed(vec![
        "127.0.0.1".to_string(),
        "localhost".to_string(),
    ])
    .unwrap();
    let cert = certified.cert.der().clone();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(certified.key_pair.serialize_der()));

    let server = ServerConfig::builder()
        .with_no_client_auth()
        .with_single_cert(vec![cert.clone()], key)
        .unwrap();
    (cert, TlsAcceptor::from(Arc::new(server)))
}

fn starttls_session(acceptor: TlsAcceptor) -> Vec<Step> {
    let mut steps = vec![
        GREETING,
        Hear("EHLO localhost"),
        Say("250-relay.example.com\r\n250-STARTTLS\r\n250 8BITMIME\r\n"),
        Hear("STARTTLS"),
        Say("220 2.0.0 Ready to start TLS\r\n"),
        Handshake(acceptor),
        Hear("EHLO localhost"),
        EHLO_LOGIN,
    ];
    steps.extend(login_ok());
    steps.extend([
        Hear("MAIL FROM:<web@landofirm.com>"),
        Say("250 ok\r\n"),
        Hear("RCPT TO:<info@landofirm.com>"),
        Say("250 ok\r\n"),
        Hear("DATA"),
        Say("354 go ahead\r\n"),
        Data,
        Say("250 queued\r\n"),
        Hear("QUIT"),
        Say("221 bye\r\n"),
    ]);
    steps
}

#[tokio::test]
async fn test_starttls_upgrade_then_full_session() {
    let (cert, acceptor) = self_signed_relay_tls();
    let (addr, relay) = scripted_relay(starttls_session(acceptor)).await;

    let mut roots = RootCertStore::empty();
    roots.add(cert).unwrap();
    let tls = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    let sender = SmtpSender::with_tls_config(config(addr), Arc::new(tls));
    tokio_test::assert_ok!(sender.send_message(&message()).await);

    let transcript = relay.await.unwrap();
    let upgraded = transcript
        .iter()
        .position(|l| l == "<tls>")
        .expect("handshake completed");
    // EHLO is repeated over TLS and AUTH only happens after the upgrade.
    assert_eq!(transcript[upgraded + 1], "EHLO localhost");
    assert_eq!(transcript[upgraded + 2], "AUTH LOGIN");
    assert!(!transcript[..upgraded].iter().any(|l| l.starts_with("AUTH")));
    assert_eq!(transcript.last().map(String::as_str), Some("QUIT"));
}

#[tokio::test]
async fn test_untrusted_certificate_is_tls_error() {
    let (_, acceptor) = self_signed_relay_tls();
    let (addr, relay) = scripted_relay(starttls_session(acceptor)).await;

    let err = SmtpSender::new(config(addr))
        .send_message(&message())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Tls);
    assert!(matches!(err, SendError::Tls(_)));

    let transcript = relay.await.unwrap();
    assert_eq!(transcript.last().map(String::as_str), Some("<tls failed>"));
    assert!(!transcript.iter().any(|l| l.starts_with("AUTH")));
}
