use std::net::IpAddr;

use tracing::{info, warn};

use crate::cache::{effective_expires, RegistrationCache, RegistrationRecord};
use crate::gateway::gateway_uri;
use crate::settings::RegistrarSettings;

/// Minimal view of a final response to a REGISTER, constructed by the SIP
/// stack adapter from a real `rsip::Response`.
///
/// Kept deliberately thin: the registry never parses `rsip::Response`
/// itself, staying decoupled from the transaction layer. `401`/`407`
/// never reach this type — they are resolved into either a `200` (on
/// successful auth retry) or a final failure code by the SIP stack before
/// this is built.
pub struct ResponseView {
    pub status_code: u16,
    pub granted_expires: Option<u32>,
    pub resolved_ip: Option<IpAddr>,
    /// NAT-discovered public address the registrar observed this request
    /// arriving from (RFC 3581 `received`), if the transport layer
    /// detected a mismatch with our own address.
    pub received: Option<IpAddr>,
    /// NAT-discovered source port (RFC 3581 `rport`) paired with `received`.
    pub rport: Option<u16>,
}

impl ResponseView {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

/// Reconciles the registration cache with the outcome of one REGISTER
/// attempt.
///
/// On `2xx`, writes (or replaces) the cache entry for `username`/`host`
/// with a freshly computed effective expiry. On anything else, invalidates
/// any existing entry and logs — the next control loop tick will see
/// `is_expired() == true` and retry.
pub fn handle_register_response(
    cache: &RegistrationCache,
    settings: &RegistrarSettings,
    username: &str,
    host: &str,
    response: &ResponseView,
) {
    let gw_uri = gateway_uri(username, host);

    if response.is_success() {
        let granted = response.granted_expires.unwrap_or(3600);
        let expires = effective_expires(granted, settings.check_expires_duration());
        let record = RegistrationRecord::new(
            username.to_string(),
            host.to_string(),
            response.resolved_ip,
            expires,
            response.received,
            response.rport,
        );
        info!(gw_uri = %gw_uri, granted, expires, "registration confirmed");
        cache.put(gw_uri, record);
    } else {
        warn!(
            gw_uri = %gw_uri,
            status = response.status_code,
            "registration rejected, invalidating cache entry"
        );
        cache.invalidate(&gw_uri);
    }
}
