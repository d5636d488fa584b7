use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName};

use crate::state::AppState;

/// Network identity of the client making the request
///
/// Taken from the configured caller-IP header when one is set (deployments
/// behind a trusted proxy), otherwise from the TCP peer address. `None` when
/// neither yields an address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallerIdentity(pub Option<IpAddr>);

impl CallerIdentity {
    pub fn is(&self, allowed: IpAddr) -> bool {
        self.0 == Some(allowed)
    }
}

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ip = match &state.config.caller_ip_header {
            Some(header) => ip_from_header(&parts.headers, header),
            None => ConnectInfo::<SocketAddr>::from_request_parts(parts, state)
                .await
                .ok()
                .map(|ConnectInfo(addr)| addr.ip()),
        };

        Ok(Self(ip.map(|ip| ip.to_canonical())))
    }
}

/// First entry of a (possibly comma-separated) forwarding header
fn ip_from_header(headers: &HeaderMap, name: &HeaderName) -> Option<IpAddr> {
    headers
        .get(name)?
        .to_str()
        .ok()?
        .split(',')
        .next()?
        .trim()
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(name: &'static str, value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(name, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn test_ip_from_single_value_header() {
        let headers = headers_with("x-real-ip", "198.51.100.4");
        let name = HeaderName::from_static("x-real-ip");

        assert_eq!(
            ip_from_header(&headers, &name),
            Some("198.51.100.4".parse().unwrap())
        );
    }

    #[test]
    fn test_ip_from_forwarded_chain_uses_first_entry() {
        let headers = headers_with("x-forwarded-for", " 2001:db8::1 , 10.0.0.1, 10.0.0.2");
        let name = HeaderName::from_static("x-forwarded-for");

        assert_eq!(
            ip_from_header(&headers, &name),
            Some("2001:db8::1".parse().unwrap())
        );
    }

    #[test]
    fn test_ip_from_header_missing_or_garbage() {
        let name = HeaderName::from_static("x-forwarded-for");
        assert_eq!(ip_from_header(&HeaderMap::new(), &name), None);

        let headers = headers_with("x-forwarded-for", "unknown");
        assert_eq!(ip_from_header(&headers, &name), None);
    }

    #[test]
    fn test_identity_comparison() {
        let allowed: IpAddr = "203.0.113.7".parse().unwrap();

        assert!(CallerIdentity(Some(allowed)).is(allowed));
        assert!(!CallerIdentity(Some("203.0.113.8".parse().unwrap())).is(allowed));
        assert!(!CallerIdentity(None).is(allowed));
    }
}
