//! Fixed-window request limits per client IP and route class
use crate::api::error::ApiError;
use crate::config::RateLimitConfig;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteClass {
    General,
    Auth,
    PublicForms,
}

impl RouteClass {
    fn as_str(&self) -> &'static str {
        match self {
            RouteClass::General => "general",
            RouteClass::Auth => "auth",
            RouteClass::PublicForms => "public_forms",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { limit: u32, remaining: u32 },
    Limited { limit: u32, retry_after_secs: u64 },
}

#[derive(Debug, Clone, Copy)]
struct Window {
    started: Instant,
    count: u32,
}

pub struct RateLimiter {
    config: RateLimitConfig,
    windows: DashMap<(RouteClass, String), Window>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self { config, windows: DashMap::new() }
    }

    pub fn enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_secs.max(1))
    }

    fn limit(&self, class: RouteClass) -> u32 {
        match class {
            RouteClass::General => self.config.general_limit,
            RouteClass::Auth => self.config.auth_limit,
            RouteClass::PublicForms => self.config.forms_limit,
        }
    }

    pub fn check(&self, class: RouteClass, client: &str) -> Decision {
        self.check_at(class, client, Instant::now())
    }

    /// Count one hit at `now` against the client's current window
    pub fn check_at(&self, class: RouteClass, client: &str, now: Instant) -> Decision {
        let limit = self.limit(class);
        if !self.config.enabled {
            return Decision::Allowed { limit, remaining: limit };
        }
        let window = self.window();

        let mut entry = self
            .windows
            .entry((class, client.to_string()))
            .or_insert(Window { started: now, count: 0 });
        if now.saturating_duration_since(entry.started) >= window {
            *entry = Window { started: now, count: 0 };
        }

        if entry.count >= limit {
            let left = window.saturating_sub(now.saturating_duration_since(entry.started));
            // Round up so clients never retry early
            let retry_after_secs = left.as_secs() + u64::from(left.subsec_nanos() > 0);
            return Decision::Limited { limit, retry_after_secs: retry_after_secs.max(1) };
        }
        entry.count += 1;
        Decision::Allowed { limit, remaining: limit - entry.count }
    }

    /// Drop windows that have ended; returns how many were removed
    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }

    pub fn sweep_at(&self, now: Instant) -> usize {
        let window = self.window();
        let before = self.windows.len();
        self.windows.retain(|_, w| now.saturating_duration_since(w.started) < window);
        before - self.windows.len()
    }
}

/// First `X-Forwarded-For` entry, else the peer address
pub fn client_ip(headers: &HeaderMap, peer: Option<std::net::SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    forwarded.or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn peer_addr(request: &Request) -> Option<std::net::SocketAddr> {
    request
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0)
}

/// Middleware applied per route group with `from_fn_with_state`
pub async fn limit(
    State((limiter, class)): State<(Arc<RateLimiter>, RouteClass)>,
    request: Request,
    next: Next,
) -> Response {
    if !limiter.enabled() {
        return next.run(request).await;
    }
    let client = client_ip(request.headers(), peer_addr(&request)).unwrap_or_else(|| "unknown".to_string());

    match limiter.check(class, &client) {
        Decision::Limited { retry_after_secs, .. } => {
            debug!(class = class.as_str(), %client, "Rate limit exceeded");
            crate::metrics::incr(&format!("ratelimit.{}.rejected", class.as_str()));
            ApiError::RateLimited { retry_after_secs }.into_response()
        },
        Decision::Allowed { limit, remaining } => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("x-ratelimit-limit", HeaderValue::from(limit));
            headers.insert("x-ratelimit-remaining", HeaderValue::from(remaining));
            response
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(limit: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig {
            enabled: true,
            window_secs: 60,
            general_limit: limit,
            auth_limit: 2,
            forms_limit: 1,
        })
    }

    #[test]
    fn test_allows_limit_then_rejects_until_next_window() {
        let limiter = limiter(3);
        let start = Instant::now();
        for remaining in [2, 1, 0] {
            assert_eq!(
                limiter.check_at(RouteClass::General, "1.2.3.4", start),
                Decision::Allowed { limit: 3, remaining }
            );
        }
        let later = start + Duration::from_secs(20);
        assert_eq!(
            limiter.check_at(RouteClass::General, "1.2.3.4", later),
            Decision::Limited { limit: 3, retry_after_secs: 40 }
        );

        let next_window = start + Duration::from_secs(60);
        assert_eq!(
            limiter.check_at(RouteClass::General, "1.2.3.4", next_window),
            Decision::Allowed { limit: 3, remaining: 2 }
        );
    }

    #[test]
    fn test_classes_and_clients_are_independent() {
        let limiter = limiter(5);
        let now = Instant::now();
        assert!(matches!(limiter.check_at(RouteClass::PublicForms, "a", now), Decision::Allowed { .. }));
        assert!(matches!(limiter.check_at(RouteClass::PublicForms, "a", now), Decision::Limited { .. }));
        assert!(matches!(limiter.check_at(RouteClass::PublicForms, "b", now), Decision::Allowed { .. }));
        assert!(matches!(limiter.check_at(RouteClass::General, "a", now), Decision::Allowed { .. }));
    }

    #[test]
    fn test_disabled_always_allows() {
        let limiter = RateLimiter::new(RateLimitConfig { enabled: false, ..Default::default() });
        for _ in 0..100 {
            assert!(matches!(limiter.check(RouteClass::Auth, "a"), Decision::Allowed { .. }));
        }
    }

    #[test]
    fn test_sweep_drops_finished_windows() {
        let limiter = limiter(5);
        let start = Instant::now();
        limiter.check_at(RouteClass::General, "a", start);
        limiter.check_at(RouteClass::Auth, "b", start + Duration::from_secs(30));
        assert_eq!(limiter.sweep_at(start + Duration::from_secs(61)), 1);
        assert_eq!(limiter.windows.len(), 1);
    }

    #[test]
    fn test_client_ip_prefers_forwarded_header() {
        let mut headers = HeaderMap::new();
        let peer = "10.0.0.9:5000".parse().ok();
        assert_eq!(client_ip(&headers, peer).as_deref(), Some("10.0.0.9"));

        headers.insert("x-forwarded-for", HeaderValue::from_static("203.0.113.7, 10.0.0.1"));
        assert_eq!(client_ip(&headers, peer).as_deref(), Some("203.0.113.7"));
    }
}
