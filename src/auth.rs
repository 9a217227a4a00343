//! Authentication for the HTTP surface
//!
//! Moderator routes use HTTP Basic auth. The gateway event intake uses a
//! shared bearer token.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, Response, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

/// Authentication configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Username for moderator routes (None = auth disabled)
    pub username: Option<String>,
    /// Password for moderator routes
    pub password: Option<String>,
}

impl AuthConfig {
    /// Load auth config from environment variables
    /// MODERATOR_USERNAME and MODERATOR_PASSWORD must both be set to enable auth
    pub fn from_env() -> Self {
        let username = std::env::var("MODERATOR_USERNAME")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let password = std::env::var("MODERATOR_PASSWORD")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        // Both must be set to enable auth
        if username.is_some() && password.is_some() {
            tracing::info!("Moderator authentication enabled");
            Self { username, password }
        } else {
            if username.is_some() || password.is_some() {
                tracing::warn!(
                    "MODERATOR_USERNAME and MODERATOR_PASSWORD must both be set to enable authentication"
                );
            }
            tracing::warn!("Moderator authentication DISABLED - anyone can run moderator commands!");
            Self {
                username: None,
                password: None,
            }
        }
    }

    /// Check if authentication is enabled
    pub fn is_enabled(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }

    /// Validate credentials
    pub fn validate(&self, username: &str, password: &str) -> bool {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => {
                // Use constant-time comparison to prevent timing attacks
                constant_time_eq(u.as_bytes(), username.as_bytes())
                    && constant_time_eq(p.as_bytes(), password.as_bytes())
            }
            _ => true, // Auth disabled, allow all
        }
    }

    /// Validate an `Authorization` header value
    fn validate_header(&self, value: &str) -> bool {
        let Some(credentials) = value.strip_prefix("Basic ") else {
            return false;
        };
        let Ok(decoded) = STANDARD.decode(credentials.trim()) else {
            return false;
        };
        let Ok(decoded) = String::from_utf8(decoded) else {
            return false;
        };
        match decoded.split_once(':') {
            Some((username, password)) => self.validate(username, password),
            None => false,
        }
    }
}

/// Constant-time byte comparison to prevent timing attacks
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}

/// Middleware for HTTP Basic Authentication on moderator routes
pub async fn moderator_auth_middleware(
    State(auth_config): State<Arc<AuthConfig>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    // If auth is disabled, pass through
    if !auth_config.is_enabled() {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| auth_config.validate_header(value));

    if authorized {
        return next.run(request).await;
    }

    tracing::warn!("Rejected unauthenticated moderator request to {}", request.uri().path());
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Basic realm=\"Contest Moderation\"")],
        "Unauthorized",
    )
        .into_response()
}

/// Shared secret the chat gateway presents on `/events`
#[derive(Debug, Clone)]
pub struct GatewayAuth {
    /// None = intake open to anyone who can reach the port
    pub token: Option<String>,
}

impl GatewayAuth {
    /// Load the gateway token from EVENT_TOKEN
    pub fn from_env() -> Self {
        let token = std::env::var("EVENT_TOKEN")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if token.is_some() {
            tracing::info!("Gateway event authentication enabled");
        } else {
            tracing::warn!(
                "EVENT_TOKEN not set - anyone who can reach this port can forge chat events!"
            );
        }
        Self { token }
    }

    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// Validate an `Authorization: Bearer <token>` header value
    fn validate_header(&self, value: &str) -> bool {
        match (&self.token, value.strip_prefix("Bearer ")) {
            (Some(expected), Some(presented)) => {
                constant_time_eq(expected.as_bytes(), presented.trim().as_bytes())
            }
            (None, _) => true,
            _ => false,
        }
    }
}

/// Middleware requiring the gateway token on event intake
pub async fn gateway_auth_middleware(
    State(gateway): State<Arc<GatewayAuth>>,
    request: Request<Body>,
    next: Next,
) -> Response<Body> {
    if !gateway.is_enabled() {
        return next.run(request).await;
    }

    let authorized = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| gateway.validate_header(value));

    if authorized {
        return next.run(request).await;
    }

    tracing::warn!("Rejected event without a valid gateway token");
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer realm=\"Contest Events\"")],
        "Unauthorized",
    )
        .into_response()
}
