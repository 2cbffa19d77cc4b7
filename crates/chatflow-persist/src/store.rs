use crate::error::Result;
use async_trait::async_trait;
use chatflow_types::{Session, SessionId};
use chrono::{DateTime, Utc};

/// Durable storage for per-session execution state.
///
/// Implementations must guarantee single-writer semantics per session id:
/// two concurrent resumption attempts for the same session must not
/// interleave their writes. Across different ids no ordering is implied.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn load(&self, id: &SessionId) -> Result<Option<Session>>;

    async fn save(&self, session: &Session) -> Result<()>;

    async fn delete(&self, id: &SessionId) -> Result<()>;

    /// Sweep sessions whose `updated_at` precedes `cutoff`. This is how
    /// suspended-session expiry is enforced; the engine itself never
    /// expires sessions. Returns the number removed.
    async fn delete_idle(&self, cutoff: DateTime<Utc>) -> Result<u64>;
}
