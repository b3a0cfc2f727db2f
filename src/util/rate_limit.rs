//! Rate limiting utilities

use axum::http::HeaderMap;
use dashmap::DashMap;
use governor::{
    clock::DefaultClock, state::keyed::DefaultKeyedStateStore, Quota, RateLimiter,
};
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;

/// Keyed rate limiter type alias
pub type KeyedLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

/// Maximum number of distinct IPs tracked for connection counting
pub const MAX_TRACKED_IPS: usize = 10_000;

/// Allow/deny gate consulted by the connection layer.
///
/// Callers never retry on a denial.
pub trait RateLimit: Send + Sync {
    /// Reserve a connection slot for `ip`. Returns false when the IP is at its limit.
    fn connect_allowed(&self, ip: IpAddr) -> bool;

    /// Release a slot reserved by `connect_allowed`.
    fn disconnect(&self, ip: IpAddr);

    /// Check whether one more inbound message from `ip` fits the budget.
    fn message_allowed(&self, ip: IpAddr) -> bool;
}

/// Per-IP connection counter plus per-IP message token bucket
pub struct IpRateLimiter {
    connections: DashMap<IpAddr, u32>,
    messages: KeyedLimiter,
    max_conns_per_ip: u32,
    trust_proxy: bool,
}

impl IpRateLimiter {
    pub fn new(max_conns_per_ip: u32, messages_per_sec: u32, trust_proxy: bool) -> Self {
        let quota = Quota::per_second(NonZeroU32::new(messages_per_sec).unwrap_or(NonZeroU32::MIN));
        Self {
            connections: DashMap::new(),
            messages: RateLimiter::keyed(quota),
            max_conns_per_ip,
            trust_proxy,
        }
    }

    /// Resolve the client IP for a request.
    ///
    /// `X-Forwarded-For` is only honoured behind a trusted proxy; its first
    /// entry is the client as seen by the outermost proxy.
    pub fn real_ip(&self, headers: &HeaderMap, remote: SocketAddr) -> IpAddr {
        if self.trust_proxy {
            let forwarded = headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.split(',').next())
                .and_then(|first| first.trim().parse::<IpAddr>().ok());
            if let Some(ip) = forwarded {
                return ip;
            }
        }
        remote.ip()
    }

    /// Live connection count for an IP
    pub fn connections_for(&self, ip: IpAddr) -> u32 {
        self.connections.get(&ip).map(|c| *c).unwrap_or(0)
    }

    /// Drop idle bookkeeping (IPs with no sockets and a refilled bucket)
    pub fn cleanup(&self) {
        self.connections.retain(|_, count| *count > 0);
        self.messages.retain_recent();
        self.messages.shrink_to_fit();
    }
}

impl RateLimit for IpRateLimiter {
    fn connect_allowed(&self, ip: IpAddr) -> bool {
        if !self.connections.contains_key(&ip) && self.connections.len() >= MAX_TRACKED_IPS {
            return false;
        }

        let mut count = self.connections.entry(ip).or_insert(0);
        if *count >= self.max_conns_per_ip {
            return false;
        }
        *count += 1;
        true
    }

    fn disconnect(&self, ip: IpAddr) {
        if let Some(mut count) = self.connections.get_mut(&ip) {
            *count = count.saturating_sub(1);
        }
        self.connections.remove_if(&ip, |_, count| *count == 0);
    }

    fn message_allowed(&self, ip: IpAddr) -> bool {
        self.messages.check_key(&ip).is_ok()
    }
}
