use async_trait::async_trait;
use rsip::Request;
use tracing::{debug, warn};

use crate::cache::RegistrationCache;
use crate::error::Error;
use crate::gateway::Transport;
use crate::response::ResponseView;

/// Injected collaborator over the (excluded) SIP transaction/transport
/// layer. Mirrors the shape of `EndpointInner`'s transaction-minting API,
/// narrowed to what a REGISTER dispatch needs.
///
/// `send` returns an already-reduced [`ResponseView`] rather than a raw
/// `rsip::Response` — parsing the final response (including absorbing any
/// `401`/`407` challenge/retry round trip) is the adapter's job, keeping
/// this crate decoupled from transaction-layer response handling.
#[async_trait]
pub trait SipProvider: Send + Sync {
    /// Local address this provider is bound to for `transport`.
    fn listening_point(&self, transport: Transport) -> Option<std::net::SocketAddr>;

    /// Mints a fresh, provider-scoped Call-ID for a new registration
    /// dialog.
    fn new_call_id(&self) -> rsip::headers::CallId;

    /// Hands `request` to a client transaction and drives it to a final
    /// response, or a transport-level failure.
    async fn send(&self, request: Request) -> Result<ResponseView, Error>;
}

/// Sends a built REGISTER and reconciles the cache on transport failure.
///
/// On any dispatch error the cache entry for `gw_uri` is invalidated —
/// the next tick's `is_expired` check will be true and a retry will be
/// attempted, rather than trusting a possibly-stale cached record. A
/// final non-2xx *response* (as opposed to a transport failure) is not an
/// `Err` here — it is handled by
/// [`crate::response::handle_register_response`] after `send` returns.
pub struct Dispatcher<'a> {
    provider: &'a dyn SipProvider,
    cache: &'a RegistrationCache,
}

impl<'a> Dispatcher<'a> {
    pub fn new(provider: &'a dyn SipProvider, cache: &'a RegistrationCache) -> Self {
        Self { provider, cache }
    }

    pub async fn send(&self, request: Request, gw_uri: &str) -> Result<ResponseView, Error> {
        debug!(gw_uri, "dispatching REGISTER");
        match self.provider.send(request).await {
            Ok(view) => Ok(view),
            Err(err) => {
                warn!(gw_uri, error = %err, "dispatch failed, invalidating cache entry");
                self.cache.invalidate(gw_uri);
                Err(err)
            }
        }
    }
}
