// SPDX-FileCopyrightText: 2025 Hyperpolymath
// SPDX-License-Identifier: PMPL-1.0-or-later

//! HTTP handlers for the contact relay.
//!
//! `POST /api/contact` runs the whole flow: rate limit, decode, validate,
//! operator notification (must succeed), visitor confirmation (best
//! effort).

use crate::compose;
use crate::config::MailConfig;
use crate::error::ApiError;
use crate::form::ContactForm;
use crate::limiter::RateLimiter;
use crate::smtp::{Mailer, OutboundMessage};
use crate::validator;
use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{header, HeaderMap, HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

/// Shared application state.
pub struct AppState {
    pub limiter: Arc<RateLimiter>,
    pub mailer: Arc<dyn Mailer>,
    pub mail: MailConfig,
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
}

/// Accepted submission response.
#[derive(Debug, Serialize)]
pub struct SentResponse {
    pub ok: &'static str,
}

/// Build the service router with CORS restricted to `allowed_origins`.
pub fn router(state: Arc<AppState>, allowed_origins: &[String]) -> Router {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| o.trim().parse().ok())
        .collect();
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route(
            "/api/contact",
            post(contact).fallback(method_not_allowed),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "contact-relay",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}

/// Accept a contact submission and relay it by email.
pub async fn contact(
    State(state): State<Arc<AppState>>,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<SentResponse>, ApiError> {
    let ip = client_ip(&headers, connect_info.map(|ConnectInfo(addr)| addr));

    if !state.limiter.allow(&ip).await {
        info!(ip = %ip, "Request rate limited");
        return Err(ApiError::RateLimited);
    }

    let form: ContactForm = serde_json::from_slice(&body).map_err(|e| {
        debug!(ip = %ip, error = %e, "Invalid request body");
        ApiError::InvalidBody
    })?;
    let form = validator::validate(form).map_err(|e| {
        info!(ip = %ip, error = %e, "Validation failed");
        e
    })?;

    let notification = OutboundMessage {
        from: state.mail.from.clone(),
        to: state.mail.to.clone(),
        subject: compose::notification_subject(&form),
        reply_to: Some(form.email.clone()),
        body: compose::notification_body(&form, &ip, Utc::now()),
    };
    if let Err(e) = state.mailer.send(&notification).await {
        error!(
            stage = %e.stage(),
            error = %e,
            ip = %ip,
            email = %form.email,
            "SMTP error (notification)"
        );
        return Err(ApiError::SendFailed);
    }
    info!(
        from = %form.email,
        name = %form.name,
        service = %form.service,
        "Notification sent"
    );

    let confirmation = OutboundMessage {
        from: state.mail.from.clone(),
        to: form.email.clone(),
        subject: compose::confirmation_subject(&form),
        reply_to: None,
        body: compose::confirmation_body(&form),
    };
    match state.mailer.send(&confirmation).await {
        Ok(()) => info!(to = %form.email, "Confirmation sent"),
        Err(e) => warn!(
            stage = %e.stage(),
            error = %e,
            to = %form.email,
            "SMTP error (confirmation)"
        ),
    }

    Ok(Json(SentResponse { ok: "message sent" }))
}

/// Resolve the caller's IP: first `X-Forwarded-For` entry, then
/// `X-Real-IP`, then the socket peer.
pub fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    if let Some(forwarded) = header_value("x-forwarded-for") {
        if let Some(first) = forwarded.split(',').next().map(str::trim).filter(|v| !v.is_empty()) {
            return first.to_string();
        }
    }
    if let Some(real) = header_value("x-real-ip") {
        return real.to_string();
    }
    peer.map(|addr| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
