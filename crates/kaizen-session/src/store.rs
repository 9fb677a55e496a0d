use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use kaizen_db::Database;
use tokio::sync::RwLock;
use tracing::warn;

use crate::session::Session;

/// Conversation state keyed by Telegram user id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, telegram_id: i64) -> Result<Option<Session>>;

    async fn put(&self, telegram_id: i64, session: Session) -> Result<()>;

    async fn clear(&self, telegram_id: i64) -> Result<()>;

    /// Forget sessions untouched for longer than `max_age`.
    async fn purge_stale(&self, max_age: Duration) -> Result<usize>;
}

/// Process-local store. State is lost on restart.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<HashMap<i64, (Session, DateTime<Utc>)>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.inner.read().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, telegram_id: i64) -> Result<Option<Session>> {
        Ok(self
            .inner
            .read()
            .await
            .get(&telegram_id)
            .map(|(session, _)| session.clone()))
    }

    async fn put(&self, telegram_id: i64, session: Session) -> Result<()> {
        self.inner
            .write()
            .await
            .insert(telegram_id, (session, Utc::now()));
        Ok(())
    }

    async fn clear(&self, telegram_id: i64) -> Result<()> {
        self.inner.write().await.remove(&telegram_id);
        Ok(())
    }

    async fn purge_stale(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now() - max_age;
        let mut map = self.inner.write().await;
        let before = map.len();
        map.retain(|_, (_, touched)| *touched >= cutoff);
        Ok(before - map.len())
    }
}

/// Store backed by the `sessions` table, so an in-progress check-in
/// survives a restart.
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: Arc<Database>,
}

impl SqliteSessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn get(&self, telegram_id: i64) -> Result<Option<Session>> {
        let db = self.db.clone();
        let row = tokio::task::spawn_blocking(move || db.load_session(telegram_id)).await??;
        let Some((kind, payload)) = row else {
            return Ok(None);
        };
        match serde_json::from_str(&payload) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // Unreadable rows (older payload shape) are dropped
                warn!(
                    "Discarding unreadable {} session for {}: {}",
                    kind, telegram_id, e
                );
                self.clear(telegram_id).await?;
                Ok(None)
            }
        }
    }

    async fn put(&self, telegram_id: i64, session: Session) -> Result<()> {
        let payload = serde_json::to_string(&session)?;
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.save_session(telegram_id, session.kind(), &payload))
            .await??;
        Ok(())
    }

    async fn clear(&self, telegram_id: i64) -> Result<()> {
        let db = self.db.clone();
        tokio::task::spawn_blocking(move || db.delete_session(telegram_id)).await??;
        Ok(())
    }

    async fn purge_stale(&self, max_age: Duration) -> Result<usize> {
        let cutoff = Utc::now() - max_age;
        let db = self.db.clone();
        let n = tokio::task::spawn_blocking(move || db.purge_sessions_before(cutoff)).await??;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::AutomationStep;
    use kaizen_core::checkin::Onboarding;

    async fn exercise(store: &dyn SessionStore) {
        assert!(store.get(1).await.unwrap().is_none());

        let mut onboarding = Onboarding::default();
        onboarding.add_task("Meditate").unwrap();
        store.put(1, Session::Onboarding(onboarding.clone())).await.unwrap();
        store.put(2, Session::AddingTask).await.unwrap();

        assert_eq!(
            store.get(1).await.unwrap(),
            Some(Session::Onboarding(onboarding))
        );

        // a new flow replaces the old one
        store
            .put(1, Session::Automation(AutomationStep::AwaitingScrapeUrl))
            .await
            .unwrap();
        assert_eq!(
            store.get(1).await.unwrap(),
            Some(Session::Automation(AutomationStep::AwaitingScrapeUrl))
        );

        store.clear(1).await.unwrap();
        assert!(store.get(1).await.unwrap().is_none());
        assert_eq!(store.get(2).await.unwrap(), Some(Session::AddingTask));

        assert_eq!(store.purge_stale(Duration::hours(1)).await.unwrap(), 0);
        assert_eq!(store.purge_stale(Duration::hours(-1)).await.unwrap(), 1);
        assert!(store.get(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_store_round_trip() {
        let store = MemorySessionStore::new();
        exercise(&store).await;
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn sqlite_store_round_trip() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let store = SqliteSessionStore::new(db);
        exercise(&store).await;
    }

    #[tokio::test]
    async fn sqlite_store_drops_garbage() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.save_session(9, "checkin", "not json").unwrap();
        let store = SqliteSessionStore::new(db.clone());
        assert!(store.get(9).await.unwrap().is_none());
        assert!(db.load_session(9).unwrap().is_none());
    }
}
