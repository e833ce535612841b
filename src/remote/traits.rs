use async_trait::async_trait;
#[cfg(any(test, feature = "mockall"))]
use mockall::automock;

use super::error::RemoteError;
use super::models::AttributeSnapshot;

/// Remote side of the filesystem.
///
/// Rename and delete take canonical namespace ids, never display names.
#[cfg_attr(any(test, feature = "mockall"), automock)]
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch every namespace of the account together with its groups.
    async fn fetch_attributes(&self) -> Result<AttributeSnapshot, RemoteError>;

    async fn rename_namespace(&self, old_id: &str, new_id: &str) -> Result<(), RemoteError>;

    async fn delete_namespace(&self, id: &str) -> Result<(), RemoteError>;

    /// Check that the server answers and accepts our session.
    async fn probe_reachable(&self) -> Result<(), RemoteError>;
}
