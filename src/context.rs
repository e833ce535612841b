// Process-wide mount state
//
// Built once when a mount starts and shared by reference with every layer that
// needs it. Nothing in here changes after construction.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::config::Config;
use crate::remote::{NamespaceNaming, RemoteStore};

/// Owner stamped on every entry; the remote has no notion of local users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ownership {
    pub uid: u32,
    pub gid: u32,
}

impl Ownership {
    /// Effective uid/gid of the mounting process.
    pub fn current() -> Self {
        Self { uid: nix::unistd::geteuid().as_raw(), gid: nix::unistd::getegid().as_raw() }
    }
}

pub struct MountContext {
    pub ownership: Ownership,
    pub remote: Arc<dyn RemoteStore>,
    pub naming: Arc<dyn NamespaceNaming>,
    pub config: Arc<Config>,
    pub mounted_at: DateTime<Utc>,
}

impl MountContext {
    pub fn new(
        remote: Arc<dyn RemoteStore>,
        naming: Arc<dyn NamespaceNaming>,
        config: Arc<Config>,
    ) -> Self {
        Self { ownership: Ownership::current(), remote, naming, config, mounted_at: Utc::now() }
    }

    pub fn with_ownership(mut self, ownership: Ownership) -> Self {
        self.ownership = ownership;
        self
    }
}
