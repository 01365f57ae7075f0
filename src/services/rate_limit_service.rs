use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, Request, StatusCode};
use ipnetwork::IpNetwork;
use opentelemetry::{KeyValue, global, metrics::Counter};
use std::net::{IpAddr, SocketAddr};
use tower_governor::GovernorError;
use tower_governor::key_extractor::KeyExtractor;
use tracing::warn;

#[derive(Clone, Debug)]
pub struct Metrics {
    pub decisions_total: Counter<u64>,
}

impl Metrics {
    #[must_use]
    pub fn new() -> Self {
        let meter = global::meter("alumniconnect-chat");
        Self {
            decisions_total: meter
                .u64_counter("rate_limit_decisions_total")
                .with_description("Rate limit decisions (allowed/throttled)")
                .build(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Governor key extractor that resolves the real client address.
///
/// The peer address is authoritative unless it falls inside a trusted proxy
/// range; only then is the `X-Forwarded-For` chain consulted, walked right to
/// left until the first hop outside the trusted ranges.
#[derive(Clone, Debug)]
pub struct ClientIpExtractor {
    trusted_proxies: Vec<IpNetwork>,
}

impl ClientIpExtractor {
    #[must_use]
    pub fn new(trusted_proxies: Vec<IpNetwork>) -> Self {
        Self { trusted_proxies }
    }

    #[must_use]
    pub fn identify_client_ip(&self, headers: &HeaderMap, peer_addr: IpAddr) -> IpAddr {
        if self.is_trusted(&peer_addr) {
            self.forwarded_client(headers).unwrap_or(peer_addr)
        } else {
            peer_addr
        }
    }

    fn forwarded_client(&self, headers: &HeaderMap) -> Option<IpAddr> {
        let chain = headers.get("x-forwarded-for")?.to_str().ok()?;
        chain.rsplit(',').filter_map(|hop| hop.trim().parse::<IpAddr>().ok()).find(|ip| !self.is_trusted(ip))
    }

    fn is_trusted(&self, ip: &IpAddr) -> bool {
        self.trusted_proxies.iter().any(|net| net.contains(*ip))
    }
}

impl KeyExtractor for ClientIpExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        let peer_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip())
            .ok_or(GovernorError::UnableToExtractKey)?;

        Ok(self.identify_client_ip(req.headers(), peer_ip))
    }
}

#[derive(Clone, Debug)]
pub struct RateLimitService {
    pub extractor: ClientIpExtractor,
    pub metrics: Metrics,
}

impl RateLimitService {
    #[must_use]
    pub fn new(trusted_proxies: Vec<IpNetwork>) -> Self {
        Self { extractor: ClientIpExtractor::new(trusted_proxies), metrics: Metrics::new() }
    }

    pub fn log_decision(&self, status: StatusCode, retry_after: Option<String>) {
        let outcome = if status == StatusCode::TOO_MANY_REQUESTS {
            if let Some(after) = retry_after {
                warn!("Rate limit exceeded (retry allowed after {}s)", after);
            }
            "throttled"
        } else {
            "allowed"
        };

        self.metrics.decisions_total.add(1, &[KeyValue::new("status", outcome)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> ClientIpExtractor {
        ClientIpExtractor::new(vec!["10.0.0.0/8".parse().expect("valid CIDR")])
    }

    fn xff(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", value.parse().expect("valid header"));
        headers
    }

    #[test]
    fn test_untrusted_peer_ignores_forwarded_header() {
        let peer: IpAddr = "203.0.113.9".parse().expect("valid IP");
        let ip = extractor().identify_client_ip(&xff("198.51.100.7"), peer);
        assert_eq!(ip, peer);
    }

    #[test]
    fn test_trusted_proxy_uses_forwarded_client() {
        let peer: IpAddr = "10.0.0.5".parse().expect("valid IP");
        let ip = extractor().identify_client_ip(&xff("198.51.100.7, 10.0.0.2"), peer);
        assert_eq!(ip, "198.51.100.7".parse::<IpAddr>().expect("valid IP"));
    }

    #[test]
    fn test_trusted_peer_without_header_falls_back_to_peer() {
        let peer: IpAddr = "10.0.0.5".parse().expect("valid IP");
        let ip = extractor().identify_client_ip(&HeaderMap::new(), peer);
        assert_eq!(ip, peer);
    }
}
