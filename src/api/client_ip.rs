use axum::{
    extract::{ConnectInfo, FromRequestParts},
    http::{HeaderMap, request::Parts},
};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::AppState;

pub const UNKNOWN_ADDRESS: &str = "unknown";

/// The address login attempts are counted against.
///
/// `X-Forwarded-For` is only believed when the socket peer is one of the
/// configured trusted proxies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIp(pub String);

impl FromRequestParts<Arc<AppState>> for ClientIp {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(Self(resolve(
            peer,
            &parts.headers,
            &state.config().security.trusted_proxy_ips,
        )))
    }
}

fn resolve(peer: Option<IpAddr>, headers: &HeaderMap, trusted: &[String]) -> String {
    let Some(peer) = peer else {
        return UNKNOWN_ADDRESS.to_string();
    };

    let peer_trusted = trusted
        .iter()
        .filter_map(|p| p.trim().parse::<IpAddr>().ok())
        .any(|p| p == peer);

    if peer_trusted
        && let Some(forwarded) = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .and_then(|v| v.parse::<IpAddr>().ok())
    {
        return forwarded.to_string();
    }

    peer.to_string()
}
