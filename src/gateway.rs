use async_trait::async_trait;
use serde::Deserialize;

use crate::error::Error;

/// SIP transports a gateway (or this server's listening points) may use.
///
/// Parsed case-insensitively, since gateway descriptors commonly arrive
/// from config files and APIs with inconsistent casing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Transport {
    Udp,
    Tcp,
    Tls,
    Ws,
    Wss,
}

impl std::str::FromStr for Transport {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "UDP" => Ok(Transport::Udp),
            "TCP" => Ok(Transport::Tcp),
            "TLS" => Ok(Transport::Tls),
            "WS" => Ok(Transport::Ws),
            "WSS" => Ok(Transport::Wss),
            other => Err(Error::UriError(format!("unknown transport {other}"))),
        }
    }
}

impl From<Transport> for rsip::Transport {
    fn from(t: Transport) -> Self {
        match t {
            Transport::Udp => rsip::Transport::Udp,
            Transport::Tcp => rsip::Transport::Tcp,
            Transport::Tls => rsip::Transport::Tls,
            Transport::Ws => rsip::Transport::Ws,
            Transport::Wss => rsip::Transport::Wss,
        }
    }
}

/// SIP credentials for an outbound registration.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub secret: String,
}

/// A configured upstream gateway (trunk/PBX), as read from the data store.
///
/// Invariant: a gateway without `credentials` is skipped entirely by the
/// control loop — it is never considered for registration.
#[derive(Debug, Clone)]
pub struct Gateway {
    pub gateway_ref: String,
    pub name: String,
    pub host: String,
    pub transport: Transport,
    pub expires: Option<u32>,
    pub registries: Vec<String>,
    pub credentials: Option<Credentials>,
}

impl Gateway {
    /// Requested registration lifetime, defaulting to 3600 seconds.
    pub fn expires_or_default(&self) -> u32 {
        self.expires.unwrap_or(3600)
    }
}

/// Canonical gateway URI string, e.g. `sip:alice@pbx.example.com`.
///
/// Serves as the primary key into the registration cache. Each entry in a
/// gateway's `registries` list yields its own URI under the same username,
/// tracked as an independent cache entry.
pub fn gateway_uri(username: &str, host: &str) -> String {
    format!("sip:{username}@{host}")
}

/// Read-only interface onto the gateway/domain/agent data store.
///
/// The store itself (CRUD, persistence) is out of scope for this crate —
/// only this narrow read contract is consumed.
#[async_trait]
pub trait GatewayStore: Send + Sync {
    /// Returns the current list of configured gateways, or
    /// [`Error::DataStoreFailure`] if the store could not be reached.
    async fn get_gateways(&self) -> Result<Vec<Gateway>, Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_parses_case_insensitively() {
        assert_eq!("udp".parse::<Transport>().unwrap(), Transport::Udp);
        assert_eq!("TLS".parse::<Transport>().unwrap(), Transport::Tls);
        assert!("sctp".parse::<Transport>().is_err());
    }

    #[test]
    fn uri_is_canonical_sip_form() {
        assert_eq!(
            gateway_uri("alice", "pbx.example.com"),
            "sip:alice@pbx.example.com"
        );
    }

    #[test]
    fn gateway_defaults_expires_to_3600() {
        let gw = Gateway {
            gateway_ref: "gw1".into(),
            name: "PBX".into(),
            host: "pbx.example.com".into(),
            transport: Transport::Udp,
            expires: None,
            registries: vec![],
            credentials: None,
        };
        assert_eq!(gw.expires_or_default(), 3600);
    }
}
