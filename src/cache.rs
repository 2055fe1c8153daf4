use std::net::IpAddr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use moka::sync::Cache;

/// A single upstream registration, as last confirmed by a `200 OK`.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationRecord {
    pub username: String,
    pub host: String,
    pub ip: Option<IpAddr>,
    /// Effective lifetime in seconds — the server-granted `Expires` minus
    /// two write-expiry intervals (see [`effective_expires`]). May be
    /// zero or negative; a non-positive value means the record is live
    /// for exactly zero seconds and `is_live` is false as soon as it is
    /// written.
    pub expires: i64,
    pub registered_on_ms: u64,
    pub reg_on_formatted: String,
    /// NAT-discovered public address observed on the last response for
    /// this gateway URI, if any. Carried forward so the next tick's
    /// Contact/Via rewrite reflects the registrar's view of us rather than
    /// our own bound address.
    pub received: Option<IpAddr>,
    /// NAT-discovered source port (RFC 3581 `rport`) paired with `received`.
    pub rport: Option<u16>,
}

impl RegistrationRecord {
    pub fn new(
        username: String,
        host: String,
        ip: Option<IpAddr>,
        expires: i64,
        received: Option<IpAddr>,
        rport: Option<u16>,
    ) -> Self {
        let registered_on_ms = now_ms();
        Self {
            username,
            host,
            ip,
            expires,
            registered_on_ms,
            reg_on_formatted: "just now".to_string(),
            received,
            rport,
        }
    }

    /// A record is live iff its age is strictly less than its `expires`.
    /// Absence of a cache entry is handled by the caller, not here.
    pub fn is_live(&self, now_ms: u64) -> bool {
        if self.expires <= 0 {
            return false;
        }
        let age_ms = now_ms.saturating_sub(self.registered_on_ms);
        (age_ms as i64) < self.expires * 1000
    }

    /// Human-friendly age, recomputed on demand (e.g. for `snapshot()`
    /// operator views) rather than stored statically.
    pub fn age_formatted(&self, now_ms: u64) -> String {
        let age_secs = now_ms.saturating_sub(self.registered_on_ms) / 1000;
        match age_secs {
            0 => "just now".to_string(),
            1..=59 => format!("{age_secs}s ago"),
            60..=3599 => format!("{}m ago", age_secs / 60),
            _ => format!("{}h ago", age_secs / 3600),
        }
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// The two write-expiry intervals of safety margin subtracted from the
/// server-granted `Expires` to compute the effective, stored `expires`.
///
/// With the default `check_expires_minutes = 1` this is 120 seconds, so
/// the local view of a registration expires two tick intervals before the
/// server's, guaranteeing a re-register even after one missed tick.
pub fn effective_expires(server_granted_secs: u32, check_expires: Duration) -> i64 {
    server_granted_secs as i64 - 2 * check_expires.as_secs() as i64
}

/// Bounded, write-expiring mapping from gateway URI string to
/// [`RegistrationRecord`].
///
/// Two independent timers coexist here and must never be unified:
/// * **Write-expiry** (this cache's TTL): a hard eviction `check_expires`
///   after the last write, regardless of the record's own `expires` — a
///   defensive bound against unbounded memory retention of dead gateways.
/// * **Logical expiry** (`RegistrationRecord::is_live`): drives
///   [`RegistrationCache::is_expired`] and the control loop's decision to
///   re-register.
pub struct RegistrationCache {
    inner: Cache<String, RegistrationRecord>,
}

impl RegistrationCache {
    pub fn new(write_expiry: Duration) -> Self {
        Self {
            inner: Cache::builder().time_to_live(write_expiry).build(),
        }
    }

    /// Inserts or replaces the entry for `uri`, resetting its write-expiry
    /// timer. `put(u, r1); put(u, r2)` leaves only `r2` queryable.
    pub fn put(&self, uri: impl Into<String>, record: RegistrationRecord) {
        self.inner.insert(uri.into(), record);
    }

    pub fn get_if_present(&self, uri: &str) -> Option<RegistrationRecord> {
        self.inner.get(uri)
    }

    pub fn invalidate(&self, uri: &str) {
        self.inner.invalidate(uri);
    }

    /// Materialized copy of all live values. Stable order is not
    /// guaranteed.
    pub fn snapshot(&self) -> Vec<RegistrationRecord> {
        self.inner.iter().map(|(_, v)| v).collect()
    }

    /// True iff there is no current entry for `uri`, or the entry's
    /// logical expiry has been reached.
    pub fn is_expired(&self, uri: &str) -> bool {
        match self.get_if_present(uri) {
            None => true,
            Some(record) => !record.is_live(now_ms()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn record(expires: i64) -> RegistrationRecord {
        RegistrationRecord::new(
            "alice".into(),
            "pbx.example.com".into(),
            Some(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5))),
            expires,
            None,
            None,
        )
    }

    #[test]
    fn absence_is_expired() {
        let cache = RegistrationCache::new(Duration::from_secs(60));
        assert!(cache.is_expired("sip:alice@pbx.example.com"));
    }

    #[test]
    fn fresh_record_is_not_expired() {
        let cache = RegistrationCache::new(Duration::from_secs(60));
        cache.put("sip:alice@pbx.example.com", record(3480));
        assert!(!cache.is_expired("sip:alice@pbx.example.com"));
    }

    #[test]
    fn put_replaces_and_snapshot_has_exactly_one_entry() {
        let cache = RegistrationCache::new(Duration::from_secs(60));
        cache.put("sip:alice@pbx.example.com", record(100));
        cache.put("sip:alice@pbx.example.com", record(200));
        cache.inner.run_pending_tasks();
        let snapshot = cache.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].expires, 200);
    }

    #[test]
    fn invalidate_wins_over_a_live_record() {
        let cache = RegistrationCache::new(Duration::from_secs(60));
        cache.put("sip:alice@pbx.example.com", record(3480));
        cache.invalidate("sip:alice@pbx.example.com");
        assert!(cache.get_if_present("sip:alice@pbx.example.com").is_none());
    }

    #[test]
    fn expiry_boundary_is_live_for_zero_seconds() {
        // A gateway granting exactly 120s leaves no safety margin: 120 - 2*60 = 0.
        let stored = effective_expires(120, Duration::from_secs(60));
        assert_eq!(stored, 0);
        let rec = record(stored);
        assert!(!rec.is_live(rec.registered_on_ms));
    }

    #[test]
    fn re_register_safety_margin_is_120_seconds_by_default() {
        // A typical one-hour grant: 3600 - 2*60 = 3480.
        assert_eq!(effective_expires(3600, Duration::from_secs(60)), 3480);
    }
}
