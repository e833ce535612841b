// Lazily populated namespace/group tree
//
// Nodes are created the first time a snapshot mentions them and are kept for
// the life of the mount, so a display name always resolves to the same node
// and inode. Namespaces that disappear remotely are not pruned.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use super::cache::AttributeCache;
use super::error::RefreshError;
use super::node::{GroupNode, NamespaceNode, Node, ROOT_INO};
use crate::remote::NamespaceNaming;

pub struct InodeTree {
    cache: AttributeCache,
    naming: Arc<dyn NamespaceNaming>,
    /// Held for the whole of a refresh; contenders back off instead of queueing.
    refresh_gate: Mutex<()>,
    registry: RwLock<Registry>,
}

struct Registry {
    /// Namespaces in the order they were first seen.
    namespaces: Vec<Arc<NamespaceNode>>,
    by_name: HashMap<String, Arc<NamespaceNode>>,
    /// Keyed by namespace inode.
    groups: HashMap<u64, NamespaceGroups>,
    inodes: HashMap<u64, Node>,
    next_ino: u64,
}

struct NamespaceGroups {
    /// Group names from the latest snapshot, replaced wholesale on refresh.
    current: Vec<String>,
    /// Every group node handed out so far, including ones no longer current.
    children: HashMap<String, Arc<GroupNode>>,
}

impl Registry {
    fn new() -> Self {
        Self {
            namespaces: Vec::new(),
            by_name: HashMap::new(),
            groups: HashMap::new(),
            inodes: HashMap::from([(ROOT_INO, Node::Root)]),
            next_ino: ROOT_INO + 1,
        }
    }

    /// Insert a namespace or replace the group list of an existing one.
    /// Returns true when a new node was created.
    fn upsert(&mut self, name: String, id: &str, groups: Vec<String>) -> bool {
        let groups = dedup(groups);

        if let Some(node) = self.by_name.get(&name) {
            if let Some(entry) = self.groups.get_mut(&node.ino()) {
                if entry.current != groups {
                    tracing::debug!(namespace = %name, groups = ?groups, "group list changed");
                    entry.current = groups;
                }
            }
            return false;
        }

        let ino = self.next_ino;
        self.next_ino += 1;

        let node = Arc::new(NamespaceNode::new(ino, name.clone(), id.to_string()));
        self.namespaces.push(Arc::clone(&node));
        self.by_name.insert(name, Arc::clone(&node));
        self.groups.insert(ino, NamespaceGroups { current: groups, children: HashMap::new() });
        self.inodes.insert(ino, Node::Namespace(node));
        true
    }

    /// Unregister a namespace together with its group nodes.
    fn remove(&mut self, name: &str) -> bool {
        let Some(node) = self.by_name.remove(name) else {
            return false;
        };

        self.namespaces.retain(|ns| ns.ino() != node.ino());
        self.inodes.remove(&node.ino());
        if let Some(entry) = self.groups.remove(&node.ino()) {
            for group in entry.children.values() {
                self.inodes.remove(&group.ino());
            }
        }
        true
    }

    /// Move the namespace registered as `old` to `new`, keeping its inode and groups.
    fn rekey(&mut self, old: &str, new: String, id: String) -> bool {
        let Some(node) = self.by_name.remove(old) else {
            return false;
        };
        // The remote accepted the rename, so whatever was listed as `new` is gone.
        self.remove(&new);

        let renamed = Arc::new(NamespaceNode::new(node.ino(), new.clone(), id));
        for slot in self.namespaces.iter_mut().filter(|ns| ns.ino() == node.ino()) {
            *slot = Arc::clone(&renamed);
        }
        self.inodes.insert(node.ino(), Node::Namespace(Arc::clone(&renamed)));
        self.by_name.insert(new, renamed);
        true
    }

    fn children(&mut self, ns: &NamespaceNode) -> Vec<Arc<GroupNode>> {
        let Registry { groups, inodes, next_ino, .. } = self;
        let Some(NamespaceGroups { current, children }) = groups.get_mut(&ns.ino()) else {
            return Vec::new();
        };

        current
            .iter()
            .map(|name| {
                let group = children.entry(name.clone()).or_insert_with(|| {
                    let ino = *next_ino;
                    *next_ino += 1;
                    let group = Arc::new(GroupNode::new(ino, ns, name.clone()));
                    inodes.insert(ino, Node::Group(Arc::clone(&group)));
                    group
                });
                Arc::clone(group)
            })
            .collect()
    }
}

fn dedup(names: Vec<String>) -> Vec<String> {
    let mut unique = Vec::with_capacity(names.len());
    for name in names {
        if !unique.contains(&name) {
            unique.push(name);
        }
    }
    unique
}

impl InodeTree {
    pub fn new(cache: AttributeCache, naming: Arc<dyn NamespaceNaming>) -> Self {
        Self { cache, naming, refresh_gate: Mutex::new(()), registry: RwLock::new(Registry::new()) }
    }

    /// Pull the current snapshot into the tree.
    ///
    /// Returns [`RefreshError::AlreadyLoading`] without waiting if another refresh
    /// is running. A failed fetch leaves the tree as it was.
    pub async fn refresh(&self) -> Result<(), RefreshError> {
        let Ok(_gate) = self.refresh_gate.try_lock() else {
            tracing::debug!("refresh already in flight, serving current tree");
            return Err(RefreshError::AlreadyLoading);
        };

        let snapshot = self.cache.load().await.map_err(RefreshError::Remote)?;

        let mut registry = self.registry.write().await;
        let mut created = 0usize;
        for namespace in &snapshot.namespaces {
            let name = self.naming.to_display(&namespace.name);
            if registry.upsert(name, &namespace.name, namespace.visible_groups()) {
                created += 1;
            }
        }

        tracing::debug!(
            namespaces = snapshot.namespaces.len(),
            created,
            registered = registry.namespaces.len(),
            "namespace tree refreshed"
        );
        Ok(())
    }

    /// Drop a namespace that was deleted remotely.
    ///
    /// Waits for an in-flight refresh and discards the cached snapshot, which
    /// still lists the namespace. Refreshes themselves never remove entries.
    pub async fn forget(&self, name: &str) {
        let _gate = self.refresh_gate.lock().await;
        self.cache.invalidate().await;
        if self.registry.write().await.remove(name) {
            tracing::debug!(namespace = %name, "namespace unregistered");
        }
    }

    /// Re-key a namespace that was renamed remotely. The inode stays the same.
    pub async fn rename(&self, old: &str, new: &str) {
        let _gate = self.refresh_gate.lock().await;
        self.cache.invalidate().await;
        let id = self.naming.to_canonical(new);
        if self.registry.write().await.rekey(old, new.to_string(), id) {
            tracing::debug!(from = %old, to = %new, "namespace re-keyed");
        }
    }

    /// Registered namespace by display name. Does not refresh.
    pub async fn lookup(&self, name: &str) -> Option<Arc<NamespaceNode>> {
        self.registry.read().await.by_name.get(name).cloned()
    }

    /// Every registered namespace in first-seen order.
    pub async fn namespaces(&self) -> Vec<Arc<NamespaceNode>> {
        self.registry.read().await.namespaces.clone()
    }

    /// Current groups of `ns`, creating group nodes the first time they are listed.
    pub async fn list_children(&self, ns: &NamespaceNode) -> Vec<Arc<GroupNode>> {
        self.registry.write().await.children(ns)
    }

    pub async fn lookup_group(&self, ns: &NamespaceNode, name: &str) -> Option<Arc<GroupNode>> {
        self.list_children(ns).await.into_iter().find(|group| group.name() == name)
    }

    pub async fn node(&self, ino: u64) -> Option<Node> {
        self.registry.read().await.inodes.get(&ino).cloned()
    }
}
