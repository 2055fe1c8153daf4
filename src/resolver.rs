use std::net::{IpAddr, SocketAddr};

use crate::error::Error;
use crate::gateway::Transport;

/// Read-only view of the listening points bound by the (excluded) SIP
/// transport layer.
///
/// The registry depends on this trait rather than any concrete transport
/// implementation, so it can be constructed with an injected collaborator
/// instead of reaching for a process-global lookup.
pub trait ListeningPoints: Send + Sync {
    /// Returns the bound `(ip, port)` for `transport`, or `None` if this
    /// server is not listening on it.
    fn listening_point(&self, transport: Transport) -> Option<SocketAddr>;
}

/// Resolves the local `(host, port)` a Contact/Via header should carry for
/// a given outbound transport.
///
/// Precedence, applied independently per field:
/// * `host`: `received` (NAT-discovered) > `extern_addr` (configured
///   override) > the listening point's bound IP.
/// * `port`: `rport` (NAT-discovered) > the listening point's bound port.
///
/// Returns [`Error::TransportUnavailable`] if no listening point is bound
/// for `transport` — the caller aborts this registration attempt.
pub fn resolve(
    points: &dyn ListeningPoints,
    transport: Transport,
    extern_addr: Option<IpAddr>,
    received: Option<IpAddr>,
    rport: Option<u16>,
) -> Result<(IpAddr, u16), Error> {
    let point = points
        .listening_point(transport)
        .ok_or(Error::TransportUnavailable(transport))?;

    let host = received.or(extern_addr).unwrap_or(point.ip());
    let port = rport.unwrap_or(point.port());
    Ok((host, port))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    struct FixedPoints(SocketAddr);
    impl ListeningPoints for FixedPoints {
        fn listening_point(&self, _transport: Transport) -> Option<SocketAddr> {
            Some(self.0)
        }
    }

    struct NoPoints;
    impl ListeningPoints for NoPoints {
        fn listening_point(&self, _transport: Transport) -> Option<SocketAddr> {
            None
        }
    }

    fn addr(ip: [u8; 4], port: u16) -> SocketAddr {
        SocketAddr::new(IpAddr::V4(Ipv4Addr::new(ip[0], ip[1], ip[2], ip[3])), port)
    }

    #[test]
    fn falls_back_to_listening_point_when_no_overrides() {
        let points = FixedPoints(addr([10, 0, 0, 5], 5060));
        let (host, port) = resolve(&points, Transport::Udp, None, None, None).unwrap();
        assert_eq!(host, IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5)));
        assert_eq!(port, 5060);
    }

    #[test]
    fn extern_addr_overrides_listening_point_host() {
        let points = FixedPoints(addr([10, 0, 0, 5], 5060));
        let extern_addr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));
        let (host, port) = resolve(&points, Transport::Udp, Some(extern_addr), None, None).unwrap();
        assert_eq!(host, extern_addr);
        assert_eq!(port, 5060);
    }

    #[test]
    fn received_and_rport_win_over_everything_else() {
        let points = FixedPoints(addr([10, 0, 0, 5], 5060));
        let extern_addr = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 9));
        let received = IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7));
        let (host, port) =
            resolve(&points, Transport::Udp, Some(extern_addr), Some(received), Some(40000))
                .unwrap();
        assert_eq!(host, received);
        assert_eq!(port, 40000);
    }

    #[test]
    fn missing_listening_point_is_transport_unavailable() {
        let err = resolve(&NoPoints, Transport::Tls, None, None, None).unwrap_err();
        assert!(matches!(err, Error::TransportUnavailable(Transport::Tls)));
    }
}
