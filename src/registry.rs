use std::sync::Arc;
use std::time::Duration;

use crate::cache::{RegistrationCache, RegistrationRecord};
use crate::control_loop::ControlLoop;
use crate::dispatcher::SipProvider;
use crate::gateway::GatewayStore;
use crate::resolver::ListeningPoints;
use crate::settings::RegistrarSettings;

/// Top-level facade: wires the cache, control loop, and injected
/// collaborators together, and is the one handle a host application
/// needs to start, stop, and introspect this subsystem.
pub struct Registry<S, P, L> {
    cache: Arc<RegistrationCache>,
    control_loop: Arc<ControlLoop<S, P, L>>,
}

impl<S, P, L> Registry<S, P, L>
where
    S: GatewayStore + 'static,
    P: SipProvider + 'static,
    L: ListeningPoints + 'static,
{
    pub fn new(store: S, provider: P, listening_points: L, settings: RegistrarSettings) -> Self {
        let write_expiry = settings.check_expires_duration().max(Duration::from_secs(1));
        let cache = Arc::new(RegistrationCache::new(write_expiry));
        let control_loop = Arc::new(ControlLoop::new(
            store,
            provider,
            listening_points,
            cache.clone(),
            settings,
        ));
        Self {
            cache,
            control_loop,
        }
    }

    /// Starts the periodic re-registration task.
    pub fn start(&self) -> tokio::task::JoinHandle<()> {
        self.control_loop.clone().start()
    }

    /// Stops scheduling future ticks. A tick already running completes.
    pub fn stop(&self) {
        self.control_loop.stop();
    }

    /// Current view of all live registrations, for upward introspection
    /// (e.g. an operator-facing status endpoint).
    pub fn snapshot(&self) -> Vec<RegistrationRecord> {
        self.cache.snapshot()
    }
}
