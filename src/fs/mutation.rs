// Namespace rename/delete
//
// POSIX has no confirmation step: `rm -r` on the mount deletes remote data.
// Deletes therefore wait out a short window during which the operation can be
// cancelled before anything irreversible is sent.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::error::MutationError;
use super::name::validate_name;
use crate::remote::{NamespaceNaming, RemoteStore};

/// Display name of the namespace every account owns; it can never be renamed or deleted.
pub const DEFAULT_NAMESPACE: &str = "default";

pub const DEFAULT_DELETE_DELAY: Duration = Duration::from_secs(2);

pub struct MutationBridge {
    remote: Arc<dyn RemoteStore>,
    naming: Arc<dyn NamespaceNaming>,
    delete_delay: Duration,
}

impl MutationBridge {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        naming: Arc<dyn NamespaceNaming>,
        delete_delay: Duration,
    ) -> Self {
        Self { remote, naming, delete_delay }
    }

    /// Rename namespace `old` to `new` (both display names).
    ///
    /// The tree is not updated here; the caller re-keys it on success.
    pub async fn rename(&self, old: &str, new: &str) -> Result<(), MutationError> {
        if old == DEFAULT_NAMESPACE {
            warn!("refusing to rename the default namespace");
            return Err(MutationError::DefaultNamespace);
        }
        validate_name(new)?;

        let old_id = self.naming.to_canonical(old);
        let new_id = self.naming.to_canonical(new);
        info!(from = %old_id, to = %new_id, "renaming namespace");

        self.remote.rename_namespace(&old_id, &new_id).await.map_err(|source| {
            warn!(namespace = %old, error = %source, "namespace rename failed");
            MutationError::Remote { namespace: old.to_string(), source }
        })
    }

    /// Delete namespace `name` after the delete delay, unless `cancel` fires first.
    pub async fn delete(&self, name: &str, cancel: &CancellationToken) -> Result<(), MutationError> {
        if name == DEFAULT_NAMESPACE {
            warn!("refusing to delete the default namespace");
            return Err(MutationError::DefaultNamespace);
        }

        debug!(namespace = %name, delay = ?self.delete_delay, "delete pending");
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!(namespace = %name, "delete cancelled before it was sent");
                return Err(MutationError::Cancelled(name.to_string()));
            }
            _ = tokio::time::sleep(self.delete_delay) => {}
        }

        let id = self.naming.to_canonical(name);
        info!(namespace = %id, "deleting namespace");

        self.remote.delete_namespace(&id).await.map_err(|source| {
            warn!(namespace = %name, error = %source, "namespace delete failed");
            MutationError::Remote { namespace: name.to_string(), source }
        })
    }
}
