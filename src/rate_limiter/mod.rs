/*!
 * # Rate Limiter Module
 *
 * Fixed-window request limiting keyed by authenticated user when available
 * and client IP otherwise. Counters live in process memory; the window
 * restarts when it expires.
 */

use axum::{
    extract::Request,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::auth::{AuthService, AuthUser};

/// One counter window for one client key
#[derive(Debug, Clone)]
struct RateLimitEntry {
    count: u32,
    window_start: Instant,
}

impl RateLimitEntry {
    fn new() -> Self {
        Self {
            count: 1,
            window_start: Instant::now(),
        }
    }

    fn is_expired(&self, window: Duration) -> bool {
        self.window_start.elapsed() >= window
    }

    fn time_until_reset(&self, window: Duration) -> Duration {
        window.saturating_sub(self.window_start.elapsed())
    }
}

/// Rate limiting configuration
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_window: u32,
    pub window_duration: Duration,
    pub enable_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_window: 100,
            window_duration: Duration::from_secs(60),
            enable_headers: true,
        }
    }
}

impl From<&crate::config::AppConfig> for RateLimitConfig {
    fn from(config: &crate::config::AppConfig) -> Self {
        Self {
            requests_per_window: config.rate_limit_requests_per_window,
            window_duration: Duration::from_secs(config.rate_limit_window_seconds),
            enable_headers: config.rate_limit_enable_headers,
        }
    }
}

/// Outcome of one rate limit check
#[derive(Debug, Clone)]
pub struct RateLimitResult {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_time: Duration,
}

/// In-memory fixed-window rate limiter
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    entries: Arc<DashMap<String, RateLimitEntry>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: Arc::new(DashMap::new()),
        }
    }

    pub fn check_rate_limit(&self, key: &str) -> RateLimitResult {
        let limit = self.config.requests_per_window;
        let window = self.config.window_duration;

        let mut entry = self
            .entries
            .entry(key.to_string())
            .or_insert_with(RateLimitEntry::new);

        if entry.is_expired(window) {
            *entry = RateLimitEntry::new();
        } else if entry.count < u32::MAX {
            entry.count += 1;
        }

        let allowed = entry.count <= limit;
        let remaining = limit.saturating_sub(entry.count);
        let reset_time = entry.time_until_reset(window);

        RateLimitResult {
            allowed,
            limit,
            remaining,
            reset_time,
        }
    }

    /// Drop expired windows so the map does not grow without bound
    pub fn cleanup_expired(&self) {
        let window = self.config.window_duration;
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired(window));
        let dropped = before.saturating_sub(self.entries.len());
        if dropped > 0 {
            debug!("Rate limiter dropped {} expired window(s)", dropped);
        }
    }
}

// Key extraction functions

fn extract_ip_key(request: &Request) -> String {
    if let Some(forwarded) = request.headers().get("x-forwarded-for") {
        if let Ok(forwarded_str) = forwarded.to_str() {
            if let Some(ip) = forwarded_str.split(',').next() {
                return format!("ip:{}", ip.trim());
            }
        }
    }

    if let Some(real_ip) = request.headers().get("x-real-ip") {
        if let Ok(ip_str) = real_ip.to_str() {
            return format!("ip:{}", ip_str);
        }
    }

    "ip:unknown".to_string()
}

async fn extract_user_key(
    authed_user_id: Option<String>,
    bearer_token: Option<String>,
    auth_service: Option<&Arc<AuthService>>,
) -> Option<String> {
    // Auth middleware has usually validated the token already
    if let Some(user_id) = authed_user_id {
        return Some(format!("user:{}", user_id));
    }

    // This layer sits outside the auth middleware, so fall back to validating
    // the bearer token directly
    if let (Some(service), Some(token)) = (auth_service, bearer_token) {
        if let Ok(claims) = service.validate_token(&token).await {
            return Some(format!("user:{}", claims.sub));
        }
    }

    None
}

fn num_to_header_value(n: impl Into<u64>) -> HeaderValue {
    HeaderValue::from_str(&n.into().to_string())
        .unwrap_or_else(|_| HeaderValue::from_static("0"))
}

// Layer implementation for tower
#[derive(Clone)]
pub struct RateLimitLayer {
    rate_limiter: RateLimiter,
    auth_service: Option<Arc<AuthService>>,
}

impl RateLimitLayer {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            rate_limiter: RateLimiter::new(config),
            auth_service: None,
        }
    }

    pub fn with_auth_service(mut self, auth_service: Arc<AuthService>) -> Self {
        self.auth_service = Some(auth_service);
        self
    }

    /// Handle on the shared limiter, e.g. for the cleanup task
    pub fn limiter(&self) -> RateLimiter {
        self.rate_limiter.clone()
    }
}

impl<S> tower::Layer<S> for RateLimitLayer {
    type Service = RateLimitService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitService {
            inner,
            rate_limiter: self.rate_limiter.clone(),
            auth_service: self.auth_service.clone(),
        }
    }
}

#[derive(Clone)]
pub struct RateLimitService<S> {
    inner: S,
    rate_limiter: RateLimiter,
    auth_service: Option<Arc<AuthService>>,
}

impl<S> tower::Service<Request> for RateLimitService<S>
where
    S: tower::Service<Request, Response = Response<axum::body::Body>> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = Response<axum::body::Body>;
    type Error = S::Error;
    type Future = std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self::Response, Self::Error>> + Send>,
    >;

    fn poll_ready(
        &mut self,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request) -> Self::Future {
        let rate_limiter = self.rate_limiter.clone();
        let mut inner = self.inner.clone();
        let auth_service = self.auth_service.clone();

        Box::pin(async move {
            // Health, status and docs stay reachable under load
            let path = request.uri().path();
            if path == "/api/v1/health"
                || path == "/api/v1/status"
                || path.starts_with("/swagger-ui")
                || path.starts_with("/api-docs")
            {
                return inner.call(request).await;
            }

            let authed_user_id = request
                .extensions()
                .get::<AuthUser>()
                .map(|auth_user| auth_user.user_id.clone());
            let bearer_token = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|auth_header| auth_header.to_str().ok())
                .and_then(|raw| raw.strip_prefix("Bearer "))
                .map(|token| token.trim().to_string());
            let key = match extract_user_key(authed_user_id, bearer_token, auth_service.as_ref())
                .await
            {
                Some(user_key) => user_key,
                None => extract_ip_key(&request),
            };

            let result = rate_limiter.check_rate_limit(&key);
            let enable_headers = rate_limiter.config.enable_headers;

            if !result.allowed {
                warn!("Rate limit exceeded for key: {}", key);

                let mut response = Response::new(axum::body::Body::from("Rate limit exceeded"));
                *response.status_mut() = StatusCode::TOO_MANY_REQUESTS;
                if enable_headers {
                    let headers = response.headers_mut();
                    headers.insert("X-RateLimit-Limit", num_to_header_value(result.limit));
                    headers.insert("X-RateLimit-Remaining", num_to_header_value(0u32));
                    headers.insert(
                        "X-RateLimit-Reset",
                        num_to_header_value(result.reset_time.as_secs()),
                    );
                }
                return Ok(response);
            }

            let mut response = inner.call(request).await?;

            if enable_headers {
                let headers = response.headers_mut();
                headers.insert("X-RateLimit-Limit", num_to_header_value(result.limit));
                headers.insert(
                    "X-RateLimit-Remaining",
                    num_to_header_value(result.remaining),
                );
                headers.insert(
                    "X-RateLimit-Reset",
                    num_to_header_value(result.reset_time.as_secs()),
                );
            }

            Ok(response)
        })
    }
}

/// Periodically evict expired windows
pub async fn start_cleanup_task(rate_limiter: RateLimiter, interval: Duration) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        ticker.tick().await;
        rate_limiter.cleanup_expired();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> RateLimitConfig {
        RateLimitConfig {
            requests_per_window: 3,
            window_duration: Duration::from_secs(60),
            enable_headers: true,
        }
    }

    #[test]
    fn requests_over_the_limit_are_rejected() {
        let limiter = RateLimiter::new(small_config());

        for _ in 0..3 {
            assert!(limiter.check_rate_limit("user:a").allowed);
        }
        let result = limiter.check_rate_limit("user:a");
        assert!(!result.allowed);
        assert_eq!(result.remaining, 0);
    }

    #[test]
    fn keys_are_counted_independently() {
        let limiter = RateLimiter::new(small_config());

        for _ in 0..3 {
            assert!(limiter.check_rate_limit("user:a").allowed);
        }
        assert!(!limiter.check_rate_limit("user:a").allowed);
        assert!(limiter.check_rate_limit("user:b").allowed);
    }

    #[test]
    fn expired_windows_restart_the_count() {
        let config = RateLimitConfig {
            requests_per_window: 1,
            window_duration: Duration::from_millis(0),
            enable_headers: true,
        };
        let limiter = RateLimiter::new(config);

        assert!(limiter.check_rate_limit("user:a").allowed);
        // Zero-length window: the next check starts a fresh window
        assert!(limiter.check_rate_limit("user:a").allowed);
    }

    #[test]
    fn cleanup_drops_expired_entries() {
        let config = RateLimitConfig {
            requests_per_window: 1,
            window_duration: Duration::from_millis(0),
            enable_headers: true,
        };
        let limiter = RateLimiter::new(config);
        limiter.check_rate_limit("user:a");
        limiter.check_rate_limit("user:b");

        limiter.cleanup_expired();
        assert_eq!(limiter.entries.len(), 0);
    }
}
