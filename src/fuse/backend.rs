// DmfsBackend - namespace tree behind the FUSE adapter
//
// Domain errors are turned into errno-level FsError here and nowhere else.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use super::interface::*;
use crate::context::MountContext;
use crate::fs::{
    AttributeCache, Capabilities, DEFAULT_NAMESPACE, InodeTree, MutationBridge, MutationError,
    NamespaceNode, Node, ROOT_INO, RefreshError,
};

const DIR_MODE: u32 = 0o755;

pub struct DmfsBackend {
    ctx: Arc<MountContext>,
    tree: InodeTree,
    mutations: MutationBridge,
}

impl DmfsBackend {
    pub fn new(ctx: Arc<MountContext>) -> Self {
        let config = &ctx.config;
        let cache = AttributeCache::new(
            Arc::clone(&ctx.remote),
            Duration::from_secs(config.cache.ttl_seconds),
        );
        let tree = InodeTree::new(cache, Arc::clone(&ctx.naming));
        let mutations = MutationBridge::new(
            Arc::clone(&ctx.remote),
            Arc::clone(&ctx.naming),
            Duration::from_millis(config.mutation.delete_delay_ms),
        );

        Self { ctx, tree, mutations }
    }

    fn dir_attr(&self, inode: u64) -> FileAttr {
        let now = self.ctx.mounted_at;
        FileAttr {
            inode,
            atime: now,
            mtime: now,
            ctime: now,
            mode: DIR_MODE,
            uid: self.ctx.ownership.uid,
            gid: self.ctx.ownership.gid,
            nlinks: 2,
        }
    }

    /// Refresh, treating a concurrent refresh as success with the current tree.
    async fn refresh_or_stale(&self) -> FsResult<()> {
        match self.tree.refresh().await {
            Ok(()) | Err(RefreshError::AlreadyLoading) => Ok(()),
            Err(RefreshError::Remote(err)) => Err(FsError::IoError(err.to_string())),
        }
    }

    async fn node(&self, ino: u64) -> FsResult<Node> {
        self.tree.node(ino).await.ok_or_else(|| FsError::PathNotFound(format!("inode {ino}")))
    }

    /// Namespace by display name, refreshing once if it is not registered yet.
    async fn namespace(&self, name: &str) -> FsResult<Arc<NamespaceNode>> {
        if let Some(ns) = self.tree.lookup(name).await {
            return Ok(ns);
        }
        self.refresh_or_stale().await?;
        self.tree.lookup(name).await.ok_or_else(|| FsError::PathNotFound(format!("/{name}")))
    }

    async fn child(&self, parent: u64, name: &str) -> FsResult<Node> {
        let parent = self.node(parent).await?;
        if !parent.capabilities().lookup {
            return Err(FsError::PathNotFound(format!(
                "{name}: {:?} directories have no entries",
                parent.kind()
            )));
        }

        match parent {
            Node::Namespace(ns) => self
                .tree
                .lookup_group(&ns, name)
                .await
                .map(Node::Group)
                .ok_or_else(|| FsError::PathNotFound(format!("/{}/{name}", ns.name()))),
            _ => self.namespace(name).await.map(Node::Namespace),
        }
    }

    /// Resolve the namespace an `mv`/`rmdir` targets, or explain why it cannot be changed.
    async fn mutable_namespace(
        &self,
        parent: u64,
        name: &str,
        permitted: fn(Capabilities) -> bool,
    ) -> FsResult<Arc<NamespaceNode>> {
        let node = self.child(parent, name).await?;
        if !permitted(node.capabilities()) {
            return Err(FsError::NotSupported(format!(
                "{name}: {:?} directories cannot be changed",
                node.kind()
            )));
        }
        match node {
            Node::Namespace(ns) => Ok(ns),
            other => Err(FsError::NotSupported(format!("{name} is a {:?} directory", other.kind()))),
        }
    }
}

impl From<MutationError> for FsError {
    fn from(err: MutationError) -> Self {
        match err {
            MutationError::DefaultNamespace => FsError::PermissionDenied(err.to_string()),
            MutationError::InvalidName(name) => FsError::InvalidName(name),
            MutationError::NameTooLong(len) => FsError::NameTooLong(len),
            MutationError::Cancelled(name) => FsError::Cancelled(name),
            MutationError::Remote { .. } => FsError::IoError(err.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl FilesystemInterface for DmfsBackend {
    async fn lookup(&self, parent: u64, name: &str) -> FsResult<FileAttr> {
        let node = self.child(parent, name).await?;
        Ok(self.dir_attr(node.ino()))
    }

    async fn get_attr(&self, ino: u64) -> FsResult<FileAttr> {
        let node = self.node(ino).await?;
        Ok(self.dir_attr(node.ino()))
    }

    async fn read_dir(&self, ino: u64) -> FsResult<Vec<DirEntry>> {
        let node = self.node(ino).await?;
        let mut entries = vec![
            DirEntry { inode: node.ino(), name: ".".to_string() },
            DirEntry { inode: node.parent_ino(), name: "..".to_string() },
        ];

        match node {
            Node::Root => {
                self.refresh_or_stale().await?;
                entries.extend(
                    self.tree
                        .namespaces()
                        .await
                        .iter()
                        .map(|ns| DirEntry { inode: ns.ino(), name: ns.name().to_string() }),
                );
            }
            Node::Namespace(ns) => {
                self.refresh_or_stale().await?;
                entries.extend(
                    self.tree
                        .list_children(&ns)
                        .await
                        .iter()
                        .map(|group| DirEntry { inode: group.ino(), name: group.name().to_string() }),
                );
            }
            Node::Group(_) => {}
        }

        Ok(entries)
    }

    async fn rename(
        &self,
        parent: u64,
        name: &str,
        new_parent: u64,
        new_name: &str,
    ) -> FsResult<()> {
        if parent != new_parent {
            return Err(FsError::NotSupported(format!("moving {name} to another directory")));
        }

        if parent == ROOT_INO && name == DEFAULT_NAMESPACE {
            return Err(MutationError::DefaultNamespace.into());
        }

        let ns = self.mutable_namespace(parent, name, |caps| caps.rename).await?;
        self.mutations.rename(ns.name(), new_name).await?;
        self.tree.rename(ns.name(), new_name).await;
        Ok(())
    }

    async fn remove_dir(&self, parent: u64, name: &str, cancel: &CancellationToken) -> FsResult<()> {
        if parent == ROOT_INO && name == DEFAULT_NAMESPACE {
            return Err(MutationError::DefaultNamespace.into());
        }

        let ns = self.mutable_namespace(parent, name, |caps| caps.remove).await?;
        self.mutations.delete(ns.name(), cancel).await?;
        self.tree.forget(ns.name()).await;
        Ok(())
    }

    async fn statfs(&self) -> FsResult<StatFs> {
        let registered = self.tree.namespaces().await.len() as u64;
        Ok(StatFs {
            blocks: 0,
            bfree: 0,
            bavail: 0,
            files: registered,
            ffree: 0,
            bsize: 4096,
            namelen: 255,
        })
    }
}
