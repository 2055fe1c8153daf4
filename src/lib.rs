//! Upstream gateway registration subsystem for a SIP routing server.
//!
//! Periodically sends authenticated, GIN-style bulk `REGISTER` requests
//! (RFC 6140) to configured upstream gateways and maintains an in-memory
//! cache of the resulting registration state for other subsystems to
//! consult. The gateway data store, the SIP transaction/transport layer,
//! and configuration loading are all injected collaborators — see
//! [`gateway::GatewayStore`], [`dispatcher::SipProvider`], and
//! [`settings::RegistrarSettings`].

pub mod cache;
pub mod control_loop;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod registry;
pub mod request;
pub mod resolver;
pub mod response;
pub mod settings;

pub use cache::{RegistrationCache, RegistrationRecord};
pub use dispatcher::SipProvider;
pub use error::{Error, Result};
pub use gateway::{Gateway, GatewayStore, Transport};
pub use registry::Registry;
pub use resolver::ListeningPoints;
pub use response::ResponseView;
pub use settings::RegistrarSettings;
