// Attribute snapshot cache
//
// Directory reads come in bursts (`ls -R`, shells completing paths) and each one
// wants the namespace list. One snapshot is reused for `ttl`; after that the next
// load goes back to the remote.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;

use crate::remote::{AttributeSnapshot, RemoteError, RemoteStore};

pub const DEFAULT_SNAPSHOT_TTL: Duration = Duration::from_secs(10);

/// Time-to-live guard in front of [`RemoteStore::fetch_attributes`].
///
/// Loads that arrive while a fetch is outstanding wait for that fetch instead of
/// starting their own. A failed fetch is handed to every waiter and is not cached.
#[derive(Clone)]
pub struct AttributeCache {
    remote: Arc<dyn RemoteStore>,
    snapshot: Cache<(), Arc<AttributeSnapshot>>,
}

impl AttributeCache {
    pub fn new(remote: Arc<dyn RemoteStore>, ttl: Duration) -> Self {
        let snapshot = Cache::builder().time_to_live(ttl).build();
        Self { remote, snapshot }
    }

    /// Drop the current snapshot so the next load goes to the remote.
    pub async fn invalidate(&self) {
        self.snapshot.invalidate(&()).await;
    }

    /// Return the current snapshot, fetching a new one if the last is older than `ttl`.
    pub async fn load(&self) -> Result<Arc<AttributeSnapshot>, Arc<RemoteError>> {
        let remote = Arc::clone(&self.remote);
        self.snapshot
            .try_get_with((), async move {
                tracing::debug!("fetching user attributes");
                let snapshot = remote.fetch_attributes().await?;
                tracing::debug!(namespaces = snapshot.namespaces.len(), "user attributes fetched");
                Ok::<_, RemoteError>(Arc::new(snapshot))
            })
            .await
            .inspect_err(|err| tracing::warn!(error = %err, "failed to fetch user attributes"))
    }
}
