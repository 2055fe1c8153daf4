use crate::gateway::Transport;
use serde::Deserialize;
use std::net::IpAddr;

/// Process-level configuration consumed by the registry at construction.
///
/// Loading this from a config file, environment, or control-plane push is
/// explicitly the caller's job — this struct is data only, with
/// `Deserialize` derived so a caller can populate it with `serde`/`toml`
/// or any other format without this crate caring which.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistrarSettings {
    /// Overrides the Contact/Via host when listening behind a private IP.
    #[serde(default)]
    pub extern_addr: Option<IpAddr>,

    /// Transports this server listens on, referenced by `Gateway::transport`.
    #[serde(default)]
    pub transports: Vec<Transport>,

    /// Value used for the `User-Agent` header on every outbound REGISTER.
    pub user_agent: String,

    /// Tick period in minutes and cache write-expiry (shared). Default 1.
    #[serde(default = "default_check_expires_minutes")]
    pub check_expires_minutes: u64,
}

fn default_check_expires_minutes() -> u64 {
    1
}

impl RegistrarSettings {
    pub fn check_expires_duration(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.check_expires_minutes * 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_check_expires_minutes_is_one() {
        let json = r#"{"user_agent": "routrd/1.0"}"#;
        let settings: RegistrarSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.check_expires_minutes, 1);
        assert_eq!(settings.check_expires_duration().as_secs(), 60);
    }
}
