//! Rejects requests whose `Host` header is not a loopback name.
//!
//! The listener only binds to 127.0.0.1, but a page on another origin can
//! still reach it through DNS rebinding; checking `Host` closes that hole.
use axum::{
    extract::Request,
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

const ALLOWED_HOSTS: [&str; 2] = ["127.0.0.1", "localhost"];

/// Returns `true` when the host name part of `host` is allowed.
pub fn is_allowed_host(host: &str) -> bool {
    let hostname = host.split(':').next().unwrap_or_default();
    ALLOWED_HOSTS.contains(&hostname)
}

pub async fn require_local_host(request: Request, next: Next) -> Response {
    let allowed = request
        .headers()
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .is_some_and(is_allowed_host);

    if !allowed {
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }
    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loopback_names_with_or_without_port() {
        assert!(is_allowed_host("localhost"));
        assert!(is_allowed_host("localhost:3456"));
        assert!(is_allowed_host("127.0.0.1:3457"));
    }

    #[test]
    fn other_names_are_rejected() {
        assert!(!is_allowed_host("evil.example.com"));
        assert!(!is_allowed_host("localhost.evil.example.com:3456"));
        assert!(!is_allowed_host("0.0.0.0:3456"));
        assert!(!is_allowed_host(""));
    }
}
