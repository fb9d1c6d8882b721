// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! Contact Relay Service
//!
//! Accepts contact-form submissions on `POST /api/contact` and relays them
//! through an SMTP submission server.
//!
//! ## Configuration
//!
//! Configuration is loaded from environment variables (a `.env` file is
//! honoured when present):
//!
//! - `PORT`: Listen port (default: 8080)
//! - `SMTP_HOST`, `SMTP_USER`, `SMTP_PASS`: Relay and credentials (required)
//! - `SMTP_PORT`: Relay port (default: 587)
//! - `MAIL_TO`: Notification recipient (default: info@landofirm.com)
//! - `MAIL_FROM`: Sender address (default: `SMTP_USER`)
//! - `ALLOWED_ORIGINS`: Comma-separated CORS origins
//! - `RATE_LIMIT_MAX` / `RATE_LIMIT_WINDOW_SECS`: Per-IP policy (default: 5 per 3600s)

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use contact_relay::{
    config::Config,
    handlers::{router, AppState},
    limiter::RateLimiter,
    smtp::{self, SmtpSender},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(
            EnvFilter::builder()
                .with_default_directive(Level::INFO.into())
                .from_env_lossy(),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        bind_addr = %config.bind_addr,
        smtp = %config.smtp.address(),
        smtp_user = %config.smtp.username,
        mail_to = %config.mail.to,
        max_requests = config.rate_limit.max_requests,
        window_secs = config.rate_limit.window_secs,
        "Starting contact relay"
    );

    info!(addr = %config.smtp.address(), "Testing SMTP connection");
    if let Err(e) = smtp::probe(&config.smtp).await {
        warn!(error = %e, "Cannot reach SMTP server");
    }

    let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
    let cleanup = limiter
        .clone()
        .spawn_cleanup(config.rate_limit.cleanup_interval());

    let state = Arc::new(AppState {
        limiter,
        mailer: Arc::new(SmtpSender::new(config.smtp.clone())),
        mail: config.mail.clone(),
    });
    let app = router(state, &config.allowed_origins);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "Server listening");

    let served = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await;

    cleanup.abort();
    served?;
    Ok(())
}
