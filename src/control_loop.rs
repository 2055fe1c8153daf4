use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::cache::RegistrationCache;
use crate::dispatcher::{Dispatcher, SipProvider};
use crate::error::Error;
use crate::gateway::{gateway_uri, GatewayStore};
use crate::request::{build_register, CSeqCounter, RegisterParams};
use crate::resolver::{self, ListeningPoints};
use crate::response::handle_register_response;
use crate::settings::RegistrarSettings;

const INITIAL_DELAY: Duration = Duration::from_secs(10);

/// Resolves `host` to an address, the one place this subsystem performs
/// DNS — kept off of any transaction-layer thread by running here, inside
/// an already-spawned tokio task, rather than inline in a transport read
/// loop.
async fn resolve_gateway_ip(host: &str, port: u16) -> Result<std::net::IpAddr, Error> {
    tokio::net::lookup_host((host, port))
        .await
        .map_err(|e| Error::DnsResolutionError(e.to_string()))?
        .next()
        .map(|addr| addr.ip())
        .ok_or_else(|| Error::DnsResolutionError(format!("no address for {host}")))
}

/// Periodic re-registration driver.
///
/// Owns no SIP state itself beyond the cache and the process-wide CSeq
/// counter; every tick re-derives whatever it needs to build and dispatch
/// one REGISTER per due gateway.
pub struct ControlLoop<S, P, L> {
    store: S,
    provider: P,
    listening_points: L,
    cache: Arc<RegistrationCache>,
    settings: RegistrarSettings,
    cseq: CSeqCounter,
    cancel: CancellationToken,
}

impl<S, P, L> ControlLoop<S, P, L>
where
    S: GatewayStore + 'static,
    P: SipProvider + 'static,
    L: ListeningPoints + 'static,
{
    pub fn new(
        store: S,
        provider: P,
        listening_points: L,
        cache: Arc<RegistrationCache>,
        settings: RegistrarSettings,
    ) -> Self {
        Self {
            store,
            provider,
            listening_points,
            cache,
            settings,
            cseq: CSeqCounter::new(),
            cancel: CancellationToken::new(),
        }
    }

    /// Spawns the ticking task. Dropping or awaiting the returned handle
    /// has no effect on cancellation — call [`ControlLoop::stop`] for
    /// that.
    pub fn start(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.settings.check_expires_duration();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(
                tokio::time::Instant::now() + INITIAL_DELAY,
                period,
            );
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = self.cancel.cancelled() => {
                        debug!("control loop cancelled");
                        return;
                    }
                    _ = ticker.tick() => {
                        self.run_tick().await;
                    }
                }
            }
        })
    }

    /// Cancels the next scheduled tick and all subsequent ones. A tick
    /// already in flight still runs to completion.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    async fn run_tick(&self) {
        let gateways = match self.store.get_gateways().await {
            Ok(gateways) => gateways,
            Err(err) => {
                error!(error = %err, "failed to load gateways, skipping tick");
                return;
            }
        };

        for gateway in gateways {
            let Some(credentials) = &gateway.credentials else {
                debug!(gw_name = %gateway.name, "skipping gateway with no credentials configured");
                continue;
            };

            let primary_uri = gateway_uri(&credentials.username, &gateway.host);

            if self.cache.is_expired(&primary_uri) {
                self.register_one(&gateway.host, credentials, &gateway, &primary_uri)
                    .await;
            }

            // Preserved quirk: additional registries are scheduled off the
            // *primary* URI's expiry, not their own. A registry here can
            // be re-registered more or less often than its own last
            // response's granted expires would imply.
            for registry_host in &gateway.registries {
                if self.cache.is_expired(&primary_uri) {
                    let registry_uri = gateway_uri(&credentials.username, registry_host);
                    self.register_one(registry_host, credentials, &gateway, &registry_uri)
                        .await;
                }
            }
        }
    }

    async fn register_one(
        &self,
        target_host: &str,
        credentials: &crate::gateway::Credentials,
        gateway: &crate::gateway::Gateway,
        gw_uri: &str,
    ) {
        let sip_port: u16 = 5060;
        let gw_name = &gateway.name;

        let gateway_ip = match resolve_gateway_ip(target_host, sip_port).await {
            Ok(ip) => ip,
            Err(err) => {
                warn!(gw_uri, %gw_name, error = %err, "dns resolution failed, skipping this gateway");
                return;
            }
        };
        debug!(gw_uri, %gw_name, %gateway_ip, "resolved gateway host");

        // Reuse the NAT-discovered address/port from the last confirmed
        // registration under this URI, if any, so a registrar behind a
        // symmetric NAT keeps getting the address it actually observed us
        // from rather than our own bound address every tick.
        let previous = self.cache.get_if_present(gw_uri);
        let received = previous.as_ref().and_then(|r| r.received);
        let rport = previous.as_ref().and_then(|r| r.rport);

        let (contact_host, contact_port) = match resolver::resolve(
            &self.listening_points,
            gateway.transport,
            self.settings.extern_addr,
            received,
            rport,
        ) {
            Ok(pair) => pair,
            Err(err) => {
                warn!(gw_uri, %gw_name, error = %err, "no listening point, skipping this gateway");
                return;
            }
        };

        let params = RegisterParams {
            username: &credentials.username,
            gateway_ref: &gateway.gateway_ref,
            gateway_host: target_host,
            transport: gateway.transport,
            contact_host,
            contact_port,
            via_host: contact_host,
            via_port: contact_port,
            call_id: self.provider.new_call_id(),
            cseq: self.cseq.next(),
            expires: gateway.expires_or_default(),
            user_agent: &self.settings.user_agent,
        };

        let request = match build_register(&params) {
            Ok(request) => request,
            Err(err) => {
                warn!(gw_uri, %gw_name, error = %err, "failed to build REGISTER, skipping this gateway");
                return;
            }
        };

        let dispatcher = Dispatcher::new(&self.provider, &self.cache);
        match dispatcher.send(request, gw_uri).await {
            Ok(response) => {
                handle_register_response(
                    &self.cache,
                    &self.settings,
                    &credentials.username,
                    target_host,
                    &response,
                );
            }
            Err(_) => {
                // already logged and invalidated by the dispatcher
            }
        }
    }
}
