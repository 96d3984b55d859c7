//! Daily selection quota.
//!
//! Each client may be shown at most [`DAILY_SELECTION_LIMIT`] distinct items per day. The
//! record of what was shown lives in a [`StateStore`] under client-scoped keys and is wiped
//! the first time it is read on a new day. Callers without persistent storage get
//! [`PermissiveQuota`], which never blocks.

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Duration, NaiveDate, Utc};

use crate::{
    db::StateStore,
    error::{AppError, AppResult},
    models::{ChosenRecord, QuotaStatus},
};

pub const DAILY_SELECTION_LIMIT: usize = 20;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Settable clock for deterministic day-boundary behavior
#[derive(Debug)]
pub struct FixedClock {
    now: RwLock<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(now),
        }
    }

    pub fn advance(&self, by: Duration) {
        if let Ok(mut guard) = self.now.write() {
            *guard += by;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        match self.now.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

/// Daily quota of distinct items shown to one client
#[async_trait::async_trait]
pub trait QuotaStore: Send + Sync {
    /// Records for the current day, after discarding any stale-day state
    async fn today(&self) -> AppResult<Vec<ChosenRecord>>;

    /// Registers `id` for today
    ///
    /// Returns true if the id was already registered or was added, false if the limit is
    /// already reached.
    async fn try_add(&self, id: &str) -> AppResult<bool>;

    fn limit(&self) -> usize;

    /// Whether picks are actually remembered
    fn is_persistent(&self) -> bool;

    async fn remaining(&self) -> AppResult<usize> {
        let used = self.today().await?.len();
        Ok(self.limit().saturating_sub(used))
    }

    async fn limit_reached(&self) -> AppResult<bool> {
        Ok(self.remaining().await? == 0)
    }

    async fn status(&self) -> AppResult<QuotaStatus> {
        let remaining = self.remaining().await?;
        Ok(QuotaStatus {
            limit: self.limit(),
            remaining,
            limit_reached: remaining == 0,
            persistent: self.is_persistent(),
        })
    }
}

/// Quota backed by a state store
pub struct PersistentQuota {
    store: Arc<dyn StateStore>,
    clock: Arc<dyn Clock>,
    date_key: String,
    chosen_key: String,
    limit: usize,
}

impl PersistentQuota {
    pub fn new(store: Arc<dyn StateStore>, clock: Arc<dyn Clock>, client_id: &str) -> Self {
        Self::with_limit(store, clock, client_id, DAILY_SELECTION_LIMIT)
    }

    pub fn with_limit(
        store: Arc<dyn StateStore>,
        clock: Arc<dyn Clock>,
        client_id: &str,
        limit: usize,
    ) -> Self {
        Self {
            store,
            clock,
            date_key: format!("quota:{}:last_reset", client_id),
            chosen_key: format!("quota:{}:chosen", client_id),
            limit,
        }
    }

    /// Resets stale-day state, then loads today's records
    async fn reconcile(&self) -> AppResult<Vec<ChosenRecord>> {
        let today = self.clock.today().format(DATE_FORMAT).to_string();
        let stored_date = self.store.get(&self.date_key).await?;

        if stored_date.as_deref() != Some(today.as_str()) {
            tracing::debug!(
                key = %self.date_key,
                stored = ?stored_date,
                today = %today,
                store = self.store.name(),
                "Resetting daily quota"
            );
            self.store.remove(&self.chosen_key).await?;
            self.store.set(&self.date_key, today).await?;
            return Ok(Vec::new());
        }

        let Some(raw) = self.store.get(&self.chosen_key).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<ChosenRecord>>(&raw) {
            Ok(records) => Ok(records),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    key = %self.chosen_key,
                    store = self.store.name(),
                    "Discarding corrupt quota state"
                );
                self.store.remove(&self.chosen_key).await?;
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait::async_trait]
impl QuotaStore for PersistentQuota {
    async fn today(&self) -> AppResult<Vec<ChosenRecord>> {
        self.reconcile().await
    }

    async fn try_add(&self, id: &str) -> AppResult<bool> {
        let mut records = self.reconcile().await?;

        if records.iter().any(|r| r.id == id) {
            return Ok(true);
        }

        if records.len() >= self.limit {
            tracing::debug!(id = %id, limit = self.limit, "Daily quota reached");
            return Ok(false);
        }

        records.push(ChosenRecord {
            id: id.to_string(),
            timestamp: self.clock.now(),
        });

        let json = serde_json::to_string(&records)
            .map_err(|e| AppError::Internal(format!("Quota serialization error: {}", e)))?;
        self.store.set(&self.chosen_key, json).await?;

        Ok(true)
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn is_persistent(&self) -> bool {
        true
    }
}

/// No-op quota for callers without persistent storage
#[derive(Debug, Clone, Copy)]
pub struct PermissiveQuota {
    limit: usize,
}

impl Default for PermissiveQuota {
    fn default() -> Self {
        Self {
            limit: DAILY_SELECTION_LIMIT,
        }
    }
}

#[async_trait::async_trait]
impl QuotaStore for PermissiveQuota {
    async fn today(&self) -> AppResult<Vec<ChosenRecord>> {
        Ok(Vec::new())
    }

    async fn try_add(&self, _id: &str) -> AppResult<bool> {
        Ok(true)
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn is_persistent(&self) -> bool {
        false
    }
}

/// Chooses the quota implementation for a caller
#[derive(Clone)]
pub struct QuotaProvider {
    store: Option<Arc<dyn StateStore>>,
    clock: Arc<dyn Clock>,
}

impl QuotaProvider {
    pub fn new(store: Option<Arc<dyn StateStore>>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Persistent quota when both a store and a client identity exist, permissive otherwise
    pub fn for_client(&self, client_id: Option<&str>) -> Arc<dyn QuotaStore> {
        match (&self.store, client_id.map(str::trim).filter(|id| !id.is_empty())) {
            (Some(store), Some(client_id)) => Arc::new(PersistentQuota::new(
                store.clone(),
                self.clock.clone(),
                client_id,
            )),
            _ => Arc::new(PermissiveQuota::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::MemoryStateStore;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn setup(limit: usize) -> (Arc<MemoryStateStore>, Arc<FixedClock>, PersistentQuota) {
        let store = Arc::new(MemoryStateStore::new());
        let clock = Arc::new(FixedClock::new(noon()));
        let quota = PersistentQuota::with_limit(store.clone(), clock.clone(), "client-1", limit);
        (store, clock, quota)
    }

    #[tokio::test]
    async fn test_fresh_client_has_full_quota() {
        let (_, _, quota) = setup(DAILY_SELECTION_LIMIT);
        assert!(quota.today().await.unwrap().is_empty());
        assert_eq!(quota.remaining().await.unwrap(), DAILY_SELECTION_LIMIT);
        assert!(!quota.limit_reached().await.unwrap());
    }

    #[tokio::test]
    async fn test_try_add_is_idempotent() {
        let (_, _, quota) = setup(DAILY_SELECTION_LIMIT);
        assert!(quota.try_add("27205").await.unwrap());
        assert!(quota.try_add("27205").await.unwrap());
        assert_eq!(quota.today().await.unwrap().len(), 1);
        assert_eq!(quota.remaining().await.unwrap(), DAILY_SELECTION_LIMIT - 1);
    }

    #[tokio::test]
    async fn test_try_add_refuses_past_limit() {
        let (_, _, quota) = setup(2);
        assert!(quota.try_add("1").await.unwrap());
        assert!(quota.try_add("2").await.unwrap());
        assert!(!quota.try_add("3").await.unwrap());
        // Already-registered ids stay accepted at the limit
        assert!(quota.try_add("1").await.unwrap());
        assert_eq!(quota.today().await.unwrap().len(), 2);
        assert!(quota.limit_reached().await.unwrap());
    }

    #[tokio::test]
    async fn test_records_carry_clock_timestamp() {
        let (_, _, quota) = setup(DAILY_SELECTION_LIMIT);
        quota.try_add("42").await.unwrap();
        let records = quota.today().await.unwrap();
        assert_eq!(records[0].id, "42");
        assert_eq!(records[0].timestamp, noon());
    }

    #[tokio::test]
    async fn test_day_boundary_resets_quota() {
        let (_, clock, quota) = setup(2);
        quota.try_add("1").await.unwrap();
        quota.try_add("2").await.unwrap();
        assert_eq!(quota.remaining().await.unwrap(), 0);

        clock.advance(Duration::hours(12));

        assert_eq!(quota.remaining().await.unwrap(), 2);
        assert!(quota.today().await.unwrap().is_empty());
        assert!(quota.try_add("1").await.unwrap());
    }

    #[tokio::test]
    async fn test_same_day_does_not_reset() {
        let (_, clock, quota) = setup(DAILY_SELECTION_LIMIT);
        quota.try_add("1").await.unwrap();
        clock.advance(Duration::hours(11));
        assert_eq!(quota.today().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_corrupt_state_is_discarded() {
        let (store, _, quota) = setup(DAILY_SELECTION_LIMIT);
        quota.try_add("1").await.unwrap();
        store
            .set("quota:client-1:chosen", "not json".to_string())
            .await
            .unwrap();

        assert!(quota.today().await.unwrap().is_empty());
        assert_eq!(store.get("quota:client-1:chosen").await.unwrap(), None);
        assert!(quota.try_add("2").await.unwrap());
        assert_eq!(quota.today().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_day_boundary_clears_stored_records() {
        let (store, clock, quota) = setup(DAILY_SELECTION_LIMIT);
        quota.try_add("1").await.unwrap();
        assert!(store.get("quota:client-1:chosen").await.unwrap().is_some());

        clock.advance(Duration::days(1));
        assert!(quota.today().await.unwrap().is_empty());

        assert_eq!(store.get("quota:client-1:chosen").await.unwrap(), None);
        assert_eq!(
            store.get("quota:client-1:last_reset").await.unwrap().as_deref(),
            Some("2024-05-02")
        );
    }

    #[tokio::test]
    async fn test_clients_are_isolated() {
        let (store, clock, quota) = setup(DAILY_SELECTION_LIMIT);
        let other = PersistentQuota::new(store, clock, "client-2");
        quota.try_add("1").await.unwrap();
        assert!(other.today().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_permissive_quota_never_blocks() {
        let quota = PermissiveQuota::default();
        for i in 0..(DAILY_SELECTION_LIMIT * 2) {
            assert!(quota.try_add(&i.to_string()).await.unwrap());
        }
        assert!(quota.today().await.unwrap().is_empty());
        assert_eq!(quota.remaining().await.unwrap(), DAILY_SELECTION_LIMIT);
        assert!(!quota.is_persistent());
    }

    #[tokio::test]
    async fn test_status() {
        let (_, _, quota) = setup(3);
        quota.try_add("1").await.unwrap();
        let status = quota.status().await.unwrap();
        assert_eq!(
            status,
            QuotaStatus {
                limit: 3,
                remaining: 2,
                limit_reached: false,
                persistent: true,
            }
        );
    }

    #[test]
    fn test_provider_selects_implementation() {
        let clock: Arc<dyn Clock> = Arc::new(FixedClock::new(noon()));
        let store: Arc<dyn StateStore> = Arc::new(MemoryStateStore::new());

        let with_store = QuotaProvider::new(Some(store), clock.clone());
        assert!(with_store.for_client(Some("abc")).is_persistent());
        assert!(!with_store.for_client(None).is_persistent());
        assert!(!with_store.for_client(Some("  ")).is_persistent());

        let without_store = QuotaProvider::new(None, clock);
        assert!(!without_store.for_client(Some("abc")).is_persistent());
    }
}
