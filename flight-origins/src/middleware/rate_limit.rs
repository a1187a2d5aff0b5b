//! Per-client fixed-window rate limiting
//!
//! Every client IP gets a counter sized from a limit expression such as
//! `30/minute`. The window opens on the client's first request and admits at
//! most the configured number of requests until it closes; the next request
//! after that opens a fresh window.

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::{Error, Result};

/// A parsed limit expression: `requests` per `period`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    /// Requests allowed within one period
    pub requests: NonZeroU32,
    /// Length of the period
    pub period: Duration,
}

impl RateLimitRule {
    /// Build a rule directly
    pub fn new(requests: NonZeroU32, period: Duration) -> Self {
        Self { requests, period }
    }

    /// Per-minute limit
    pub fn per_minute(requests: NonZeroU32) -> Self {
        Self::new(requests, Duration::from_secs(60))
    }
}

impl fmt::Display for RateLimitRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}s", self.requests, self.period.as_secs())
    }
}

fn unit_seconds(unit: &str) -> Option<u64> {
    let unit = unit.to_ascii_lowercase();
    let unit = unit.strip_suffix('s').unwrap_or(&unit);
    match unit {
        "second" => Some(1),
        "minute" => Some(60),
        "hour" => Some(3_600),
        "day" => Some(86_400),
        _ => None,
    }
}

impl FromStr for RateLimitRule {
    type Err = Error;

    /// Accepts `N/unit`, `N per unit` and `N/M units`, where unit is one of
    /// second, minute, hour or day (plural and case insensitive).
    fn from_str(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidConfig(format!("invalid rate limit '{}': {}", raw, reason));

        let trimmed = raw.trim();
        let lower = trimmed.to_ascii_lowercase();
        let (count, window) = match lower.split_once('/') {
            Some(parts) => parts,
            None => lower
                .split_once(" per ")
                .ok_or_else(|| invalid("expected '<count>/<unit>' or '<count> per <unit>'"))?,
        };

        let requests = count
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| invalid("request count must be a positive integer"))?;

        let mut words = window.split_whitespace();
        let (multiplier, unit) = match (words.next(), words.next(), words.next()) {
            (Some(unit), None, None) => (1, unit),
            (Some(multiplier), Some(unit), None) => {
                let multiplier = multiplier
                    .parse::<u64>()
                    .ok()
                    .filter(|m| *m > 0)
                    .ok_or_else(|| invalid("period multiplier must be a positive integer"))?;
                (multiplier, unit)
            }
            _ => return Err(invalid("expected a single period unit")),
        };
        let unit_secs = unit_seconds(unit).ok_or_else(|| invalid("unknown period unit"))?;

        let period_secs = multiplier
            .checked_mul(unit_secs)
            .ok_or_else(|| invalid("period too long"))?;

        Ok(Self::new(requests, Duration::from_secs(period_secs)))
    }
}

#[derive(Debug, Clone, Copy)]
struct Window {
    opened: Instant,
    count: u32,
}

/// Per-IP limiter shared by every route
#[derive(Debug, Clone)]
pub struct ClientRateLimiter {
    windows: Arc<DashMap<IpAddr, Window>>,
    rule: RateLimitRule,
}

impl ClientRateLimiter {
    /// Create a limiter enforcing `rule` for each client independently
    pub fn new(rule: RateLimitRule) -> Result<Self> {
        if rule.period.is_zero() {
            return Err(Error::InvalidConfig(format!(
                "rate limit period must be positive: {}",
                rule
            )));
        }
        Ok(Self {
            windows: Arc::new(DashMap::new()),
            rule,
        })
    }

    /// The enforced limit
    pub fn rule(&self) -> RateLimitRule {
        self.rule
    }

    /// Admit or reject one request from `client`
    ///
    /// Rejected requests do not count against the window.
    pub fn check(&self, client: IpAddr) -> Result<()> {
        let now = Instant::now();
        let mut window = self.windows.entry(client).or_insert(Window {
            opened: now,
            count: 0,
        });

        if now.duration_since(window.opened) >= self.rule.period {
            *window = Window {
                opened: now,
                count: 0,
            };
        }

        if window.count >= self.rule.requests.get() {
            let retry_after = window
                .opened
                .checked_add(self.rule.period)
                .map_or(self.rule.period, |closes| closes.saturating_duration_since(now));
            return Err(Error::TooManyRequests { retry_after });
        }

        window.count += 1;
        Ok(())
    }

    /// Forget clients whose window has closed
    pub fn retain_recent(&self) {
        let now = Instant::now();
        let period = self.rule.period;
        self.windows
            .retain(|_, window| now.duration_since(window.opened) < period);
    }

    /// Number of clients currently tracked
    pub fn tracked_clients(&self) -> usize {
        self.windows.len()
    }

    /// Periodically drop idle client state in the background
    pub fn spawn_cleanup(&self, every: Duration) -> JoinHandle<()> {
        let limiter = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                limiter.retain_recent();
                tracing::trace!(clients = limiter.tracked_clients(), "Pruned rate limiter state");
            }
        })
    }
}

/// Client address as seen by the listener
///
/// Falls back to loopback when the router is driven without connection info,
/// as in tests.
pub fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

/// Axum middleware rejecting clients over their limit with 429
pub async fn enforce_rate_limit(
    State(limiter): State<ClientRateLimiter>,
    request: Request,
    next: Next,
) -> Response {
    let client = client_ip(&request);

    if let Err(e) = limiter.check(client) {
        tracing::warn!(
            client = %client,
            limit = %limiter.rule(),
            path = %request.uri().path(),
            "Rate limit exceeded"
        );
        return e.into_response();
    }

    next.run(request).await
}
