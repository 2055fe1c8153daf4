use crate::gateway::Transport;
use std::fmt;

/// Errors produced by the gateway registration subsystem.
///
/// Mirrors the error taxonomy of the registration control loop: every
/// variant here is absorbed at the tick boundary (see
/// [`crate::control_loop::ControlLoop`]) and never stops the loop.
#[derive(Debug, Clone)]
pub enum Error {
    /// No listening point is configured for the requested transport.
    TransportUnavailable(Transport),
    /// The SIP provider failed to hand the REGISTER off to a transaction.
    DispatchFailure(String),
    /// `GatewayStore::get_gateways` returned a non-OK status.
    DataStoreFailure(String),
    /// A final `4xx`/`5xx`/`6xx` response (other than an auth challenge).
    RegistrationRejected(u16),
    /// Host name did not resolve to any address.
    DnsResolutionError(String),
    /// Malformed SIP URI or header value.
    UriError(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::TransportUnavailable(t) => write!(f, "no listening point for transport {t:?}"),
            Error::DispatchFailure(msg) => write!(f, "dispatch failure: {msg}"),
            Error::DataStoreFailure(msg) => write!(f, "data store failure: {msg}"),
            Error::RegistrationRejected(code) => write!(f, "registration rejected: {code}"),
            Error::DnsResolutionError(msg) => write!(f, "dns resolution error: {msg}"),
            Error::UriError(msg) => write!(f, "uri error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<rsip::Error> for Error {
    fn from(e: rsip::Error) -> Self {
        Error::UriError(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
