use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;

pub const FORWARDED_FOR_HEADER: &str = "x-forwarded-for";
pub const UNKNOWN_SOURCE: &str = "unknown";

/// The client a visit is attributed to.
///
/// Taken from the first hop of `X-Forwarded-For`, then the peer address.
/// Never rejects: a request without either is counted as [`UNKNOWN_SOURCE`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientSource(pub String);

impl<S> FromRequestParts<S> for ClientSource
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let forwarded = parts
            .headers
            .get(FORWARDED_FOR_HEADER)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|hop| !hop.is_empty());
        if let Some(hop) = forwarded {
            return Ok(Self(hop.to_owned()));
        }

        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string());

        Ok(Self(peer.unwrap_or_else(|| UNKNOWN_SOURCE.to_owned())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(request: Request<()>) -> String {
        let (mut parts, _) = request.into_parts();
        let ClientSource(source) = ClientSource::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        source
    }

    #[tokio::test]
    async fn first_forwarded_hop_wins() {
        let request = Request::builder()
            .header(FORWARDED_FOR_HEADER, "203.0.113.5, 10.0.0.1")
            .extension(ConnectInfo(SocketAddr::from(([127, 0, 0, 1], 9000))))
            .body(())
            .unwrap();
        assert_eq!(extract(request).await, "203.0.113.5");
    }

    #[tokio::test]
    async fn falls_back_to_peer_address() {
        let request = Request::builder()
            .extension(ConnectInfo(SocketAddr::from(([198, 51, 100, 7], 9000))))
            .body(())
            .unwrap();
        assert_eq!(extract(request).await, "198.51.100.7");
    }

    #[tokio::test]
    async fn unknown_without_header_or_peer() {
        let request = Request::builder().body(()).unwrap();
        assert_eq!(extract(request).await, UNKNOWN_SOURCE);
    }
}
