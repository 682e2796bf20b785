//! Challenge nonce registry
//!
//! Issues single-use, time-bounded challenges keyed by canonical wallet
//! address. Entries live in memory only and are lost on restart.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use rand::Rng;
use serde::Serialize;
use tokio::sync::Mutex;

use super::address::Address;
use super::crypto::CryptoError;

/// Default challenge lifetime (5 minutes)
pub const DEFAULT_NONCE_TTL_SECONDS: i64 = 300;

const NONCE_RANDOM_LEN: usize = 15;
const NONCE_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Source of the current time, swappable in tests
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// An issued challenge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Challenge {
    /// The exact text the wallet must sign
    pub nonce: String,
    pub expires_at: DateTime<Utc>,
}

impl Challenge {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at < now
    }
}

/// In-memory store of live challenges, at most one per address
pub struct NonceRegistry {
    entries: Mutex<HashMap<Address, Challenge>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl NonceRegistry {
    /// Create a registry using wall-clock time
    pub fn new(ttl_seconds: i64) -> Self {
        Self::with_clock(ttl_seconds, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl_seconds: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::seconds(ttl_seconds),
            clock,
        }
    }

    /// Issue a fresh challenge for `address`, replacing any unconsumed one
    pub async fn issue_challenge(&self, address: &str) -> Result<Challenge, CryptoError> {
        let address = Address::parse(address)?;
        let now = self.clock.now();

        let challenge = Challenge {
            nonce: build_nonce_message(now),
            expires_at: now + self.ttl,
        };

        let replaced = self
            .entries
            .lock()
            .await
            .insert(address.clone(), challenge.clone())
            .is_some();

        tracing::debug!(
            address = %address,
            expires_at = %challenge.expires_at,
            replaced,
            "Challenge issued"
        );

        Ok(challenge)
    }

    /// Check `nonce` against the live challenge for `address` and consume it.
    ///
    /// Returns `true` at most once per issued challenge. Expired entries are
    /// evicted; a mismatched nonce leaves the entry in place.
    pub async fn verify_and_consume(&self, address: &str, nonce: &str) -> bool {
        let address = match Address::parse(address) {
            Ok(address) => address,
            Err(_) => return false,
        };
        let now = self.clock.now();

        let mut entries = self.entries.lock().await;

        let Some(stored) = entries.get(&address) else {
            tracing::debug!(address = %address, "No challenge outstanding");
            return false;
        };

        if stored.is_expired(now) {
            entries.remove(&address);
            tracing::debug!(address = %address, "Challenge expired");
            return false;
        }

        if stored.nonce != nonce {
            tracing::debug!(address = %address, "Challenge nonce mismatch");
            return false;
        }

        entries.remove(&address);
        true
    }

    /// Drop every expired challenge, returning how many were removed
    pub async fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries.lock().await;

        let before = entries.len();
        entries.retain(|_, challenge| !challenge.is_expired(now));
        before - entries.len()
    }

    /// Number of outstanding challenges
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

/// Periodically reclaim expired challenges
pub async fn nonce_sweeper(registry: Arc<NonceRegistry>, interval: StdDuration) {
    tracing::info!(interval_secs = interval.as_secs(), "Starting nonce sweeper");

    let mut ticker = tokio::time::interval(interval);
    // the first tick completes immediately
    ticker.tick().await;

    loop {
        ticker.tick().await;

        let removed = registry.sweep_expired().await;
        if removed > 0 {
            tracing::debug!(removed, "Swept expired challenges");
        }
    }
}

fn build_nonce_message(now: DateTime<Utc>) -> String {
    format!(
        "Login to MCPForge at {} with nonce: {}",
        now.to_rfc3339_opts(SecondsFormat::Secs, true),
        random_token(NONCE_RANDOM_LEN)
    )
}

fn random_token(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| NONCE_CHARSET[rng.gen_range(0..NONCE_CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    use super::*;

    /// Clock that only moves when told to
    pub struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        pub fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now = *now + by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::ManualClock;
    use super::*;

    const ADDRESS: &str = "0xAbCdEf0123456789aBcDeF0123456789AbCd1234";

    fn registry() -> (NonceRegistry, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = NonceRegistry::with_clock(DEFAULT_NONCE_TTL_SECONDS, clock.clone());
        (registry, clock)
    }

    #[tokio::test]
    async fn test_issue_and_consume_once() {
        let (registry, _) = registry();
        let challenge = registry.issue_challenge(ADDRESS).await.unwrap();

        assert!(registry.verify_and_consume(ADDRESS, &challenge.nonce).await);
        assert!(!registry.verify_and_consume(ADDRESS, &challenge.nonce).await);
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_nonce_format() {
        let (registry, clock) = registry();
        let challenge = registry.issue_challenge(ADDRESS).await.unwrap();

        let (statement, random) = challenge.nonce.split_once(" with nonce: ").unwrap();
        assert!(statement.starts_with("Login to MCPForge at "));
        assert_eq!(random.len(), NONCE_RANDOM_LEN);
        assert!(random
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit()));
        assert_eq!(
            challenge.expires_at,
            clock.now() + Duration::seconds(DEFAULT_NONCE_TTL_SECONDS)
        );
    }

    #[tokio::test]
    async fn test_invalid_address_rejected() {
        let (registry, _) = registry();
        assert!(matches!(
            registry.issue_challenge("0x1234").await,
            Err(CryptoError::InvalidAddressFormat(_))
        ));
        assert!(!registry.verify_and_consume("0x1234", "anything").await);
    }

    #[tokio::test]
    async fn test_address_case_does_not_matter() {
        let (registry, _) = registry();
        let challenge = registry.issue_challenge(ADDRESS).await.unwrap();

        assert!(
            registry
                .verify_and_consume(&ADDRESS.to_lowercase(), &challenge.nonce)
                .await
        );
    }

    #[tokio::test]
    async fn test_reissue_invalidates_previous() {
        let (registry, _) = registry();
        let first = registry.issue_challenge(ADDRESS).await.unwrap();
        let second = registry.issue_challenge(ADDRESS).await.unwrap();

        assert_ne!(first.nonce, second.nonce);
        assert!(!registry.verify_and_consume(ADDRESS, &first.nonce).await);
        assert!(registry.verify_and_consume(ADDRESS, &second.nonce).await);
    }

    #[tokio::test]
    async fn test_mismatch_keeps_entry() {
        let (registry, _) = registry();
        let challenge = registry.issue_challenge(ADDRESS).await.unwrap();

        assert!(!registry.verify_and_consume(ADDRESS, "wrong nonce").await);
        assert_eq!(registry.len().await, 1);
        assert!(registry.verify_and_consume(ADDRESS, &challenge.nonce).await);
    }

    #[tokio::test]
    async fn test_ttl_boundary() {
        let (registry, clock) = registry();

        let challenge = registry.issue_challenge(ADDRESS).await.unwrap();
        clock.advance(Duration::seconds(DEFAULT_NONCE_TTL_SECONDS - 1));
        assert!(registry.verify_and_consume(ADDRESS, &challenge.nonce).await);

        let challenge = registry.issue_challenge(ADDRESS).await.unwrap();
        clock.advance(Duration::seconds(DEFAULT_NONCE_TTL_SECONDS + 1));
        assert!(!registry.verify_and_consume(ADDRESS, &challenge.nonce).await);
        // expired entries are evicted on access
        assert!(registry.is_empty().await);
    }

    #[tokio::test]
    async fn test_sweep_expired() {
        let (registry, clock) = registry();
        registry.issue_challenge(ADDRESS).await.unwrap();
        clock.advance(Duration::seconds(120));
        let live = registry
            .issue_challenge("0x1111111111111111111111111111111111111111")
            .await
            .unwrap();

        assert_eq!(registry.sweep_expired().await, 0);

        clock.advance(Duration::seconds(DEFAULT_NONCE_TTL_SECONDS - 60));
        assert_eq!(registry.sweep_expired().await, 1);
        assert_eq!(registry.len().await, 1);
        assert!(
            registry
                .verify_and_consume("0x1111111111111111111111111111111111111111", &live.nonce)
                .await
        );
    }

    #[tokio::test]
    async fn test_concurrent_consume_succeeds_once() {
        let (registry, _) = registry();
        let registry = Arc::new(registry);
        let challenge = registry.issue_challenge(ADDRESS).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            let nonce = challenge.nonce.clone();
            handles.push(tokio::spawn(async move {
                registry.verify_and_consume(ADDRESS, &nonce).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
