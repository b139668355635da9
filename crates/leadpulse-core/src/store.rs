use async_trait::async_trait;

use crate::session::ValidatedSession;

/// One persisted session as read back from storage, before parsing.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    /// Storage name of the record, e.g. `analytics_joes-plumbing_1700000000000.json`.
    pub name: String,
    /// Arrival time in epoch milliseconds, taken from the record name.
    pub arrived_at: i64,
    pub body: String,
}

/// Append-only, site-partitioned session storage.
///
/// There is no update or delete. `scan` returns every record of a site in no
/// particular order; records that cannot be read are logged and left out.
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Persist `session` as a new record and return the record name.
    async fn append(&self, site_id: &str, session: &ValidatedSession) -> anyhow::Result<String>;

    async fn scan(&self, site_id: &str) -> anyhow::Result<Vec<SessionRecord>>;

    /// Cheap reachability check used by `/health`.
    async fn ping(&self) -> anyhow::Result<()>;
}
