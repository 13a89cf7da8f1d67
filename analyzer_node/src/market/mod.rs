//! Market data proxy with an in-memory TTL cache.
//!
//! Cache key is the full constructed upstream URL. Fresh hits skip the
//! upstream entirely; on upstream rate-limit, server error, or network
//! failure any cached entry, stale included, is served instead of an error.
//! Client errors are forwarded untouched.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;
use tokio::sync::RwLock;

use crate::api::errors::ApiError;
use crate::retry::with_retry;

pub const CACHE_TTL: Duration = Duration::from_secs(5 * 60);
pub const CACHE_CAPACITY: usize = 100;
const UPSTREAM_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: Value,
    pub inserted_at: Instant,
}

/// TTL cache with insertion-ordered eviction.
#[derive(Debug, Default)]
pub struct MarketCache {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
}

impl MarketCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entry for `key` if it is younger than the TTL at `now`.
    pub fn fresh(&self, key: &str, now: Instant) -> Option<&Value> {
        self.entries
            .get(key)
            .filter(|e| now.duration_since(e.inserted_at) < CACHE_TTL)
            .map(|e| &e.data)
    }

    /// Entry for `key` regardless of age (stale-on-error fallback).
    pub fn any(&self, key: &str) -> Option<&Value> {
        self.entries.get(key).map(|e| &e.data)
    }

    /// Insert whole-value; when capacity is exceeded the oldest key by
    /// insertion order is dropped.
    pub fn insert(&mut self, key: String, data: Value, now: Instant) {
        let previous = self.entries.insert(
            key.clone(),
            CacheEntry {
                data,
                inserted_at: now,
            },
        );
        if previous.is_none() {
            self.order.push_back(key);
        }
        while self.entries.len() > CACHE_CAPACITY {
            if let Some(oldest) = self.order.pop_front() {
                self.entries.remove(&oldest);
            } else {
                break;
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, Error)]
enum FetchError {
    #[error("rate limit exceeded")]
    RateLimited,
    #[error("upstream server error: {0}")]
    Server(u16),
    #[error("network error: {0}")]
    Network(String),
    /// Non-retryable upstream status (client errors other than 429); the
    /// body text is passed through.
    #[error("upstream returned {0}")]
    Status(u16, String),
}

impl FetchError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            FetchError::RateLimited | FetchError::Server(_) | FetchError::Network(_)
        )
    }
}

/// Outcome of a proxied market request, ready to render.
#[derive(Debug)]
pub enum MarketReply {
    Ok(Value),
    RateLimited,
    Offline(String),
    Passthrough(u16, String),
}

impl IntoResponse for MarketReply {
    fn into_response(self) -> Response {
        match self {
            MarketReply::Ok(body) => Json(body).into_response(),
            MarketReply::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "Rate limit exceeded. Please try again in a few minutes.",
                    "rateLimited": true,
                    "retryAfter": 60000,
                })),
            )
                .into_response(),
            MarketReply::Offline(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message, "offline": true })),
            )
                .into_response(),
            MarketReply::Passthrough(status, body) => (
                StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                body,
            )
                .into_response(),
        }
    }
}

pub struct MarketProxy {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    cache: RwLock<MarketCache>,
}

impl MarketProxy {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        MarketProxy {
            http: reqwest::Client::new(),
            base_url,
            api_key,
            cache: RwLock::new(MarketCache::new()),
        }
    }

    /// Typed route: a fixed upstream URL per data type, retry-wrapped
    /// before any failure surfaces. Failures map to a plain 500.
    pub async fn fetch_typed(&self, data_type: &str) -> Result<Value, ApiError> {
        let (path, error_message) = match data_type {
            "coins" => (
                "/coins/markets?vs_currency=usd&order=market_cap_desc&per_page=12&page=1&sparkline=false",
                "Failed to fetch cryptocurrency data.",
            ),
            "defi" => (
                "/coins/markets?vs_currency=usd&category=decentralized-finance&order=market_cap_desc&per_page=12&page=1&sparkline=false",
                "Failed to fetch DeFi token data.",
            ),
            "global" => ("/global", "Failed to fetch global market stats."),
            _ => {
                return Err(ApiError::InvalidInput(
                    "Invalid data type requested.".to_string(),
                ))
            }
        };
        let url = format!("{}{}", self.base_url, path);

        match self.cached_fetch(&url, true).await {
            MarketReply::Ok(body) => Ok(body),
            MarketReply::RateLimited => Err(ApiError::UpstreamUnavailable(format!(
                "{} Details: rate limit exceeded",
                error_message
            ))),
            MarketReply::Offline(detail) | MarketReply::Passthrough(_, detail) => Err(
                ApiError::UpstreamUnavailable(format!("{} Details: {}", error_message, detail)),
            ),
        }
    }

    /// Passthrough route: forward path and query to the upstream base.
    pub async fn fetch_path(&self, path: &str, query: Option<&str>) -> MarketReply {
        let url = match query {
            Some(q) if !q.is_empty() => format!("{}/{}?{}", self.base_url, path, q),
            _ => format!("{}/{}", self.base_url, path),
        };
        self.cached_fetch(&url, false).await
    }

    async fn cached_fetch(&self, url: &str, retry: bool) -> MarketReply {
        let now = Instant::now();
        if let Some(data) = self.cache.read().await.fresh(url, now) {
            log::debug!("returning cached market data for {}", url);
            return MarketReply::Ok(data.clone());
        }

        let result = if retry {
            with_retry(
                || self.fetch_upstream(url),
                3,
                Duration::from_millis(1000),
                FetchError::is_retryable,
            )
            .await
        } else {
            self.fetch_upstream(url).await
        };

        match result {
            Ok(data) => {
                let mut cache = self.cache.write().await;
                cache.insert(url.to_string(), data.clone(), Instant::now());
                MarketReply::Ok(data)
            }
            Err(err) => self.resolve_failure(url, err).await,
        }
    }

    /// Stale-on-error: any cached body beats a transient failure (429, 5xx,
    /// network). Client errors pass through; the cache never masks them.
    async fn resolve_failure(&self, url: &str, err: FetchError) -> MarketReply {
        if err.is_retryable() {
            if let Some(data) = self.cache.read().await.any(url) {
                log::warn!("upstream failed ({}), returning cached market data", err);
                return MarketReply::Ok(data.clone());
            }
        }
        match err {
            FetchError::RateLimited => MarketReply::RateLimited,
            FetchError::Server(status) => {
                MarketReply::Offline(format!("Upstream market API returned {}", status))
            }
            FetchError::Network(detail) => {
                MarketReply::Offline(format!("Failed to fetch market data: {}", detail))
            }
            FetchError::Status(status, body) => MarketReply::Passthrough(status, body),
        }
    }

    async fn fetch_upstream(&self, url: &str) -> Result<Value, FetchError> {
        let mut request = self.http.get(url).timeout(UPSTREAM_TIMEOUT);
        if let Some(key) = &self.api_key {
            request = request.header("x_cg_pro_api_key", key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(FetchError::RateLimited);
        }
        if status.is_server_error() {
            return Err(FetchError::Server(status.as_u16()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("market upstream error {}: {}", status, body);
            return Err(FetchError::Status(status.as_u16(), body));
        }

        response
            .json()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))
    }
}
