// Node kinds of the mounted tree
//
// The tree is closed: a root, namespaces under it, groups under those.
// What each kind supports lives in one capability table instead of being
// spread over per-kind types.

use std::sync::Arc;

/// Inode of the mount root, fixed by the FUSE protocol.
pub const ROOT_INO: u64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Namespace,
    Group,
}

/// Operations a node kind supports.
///
/// `rename` and `remove` apply to the node itself as the source of an
/// `mv` or the target of an `rmdir`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Children can be resolved by name.
    pub lookup: bool,
    pub rename: bool,
    pub remove: bool,
}

impl NodeKind {
    pub const fn capabilities(self) -> Capabilities {
        match self {
            NodeKind::Root => Capabilities { lookup: true, rename: false, remove: false },
            NodeKind::Namespace => Capabilities { lookup: true, rename: true, remove: true },
            // Group contents (files) are not served.
            NodeKind::Group => Capabilities { lookup: false, rename: false, remove: false },
        }
    }
}

/// Directory for one namespace, reused for as long as the process lives.
#[derive(Debug)]
pub struct NamespaceNode {
    ino: u64,
    name: String,
    id: String,
}

impl NamespaceNode {
    pub(crate) fn new(ino: u64, name: String, id: String) -> Self {
        Self { ino, name, id }
    }

    pub fn ino(&self) -> u64 {
        self.ino
    }

    /// Display name, as listed in the root directory.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical remote id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Directory for one group inside a namespace.
#[derive(Debug)]
pub struct GroupNode {
    ino: u64,
    namespace_ino: u64,
    name: String,
}

impl GroupNode {
    pub(crate) fn new(ino: u64, namespace: &NamespaceNode, name: String) -> Self {
        Self { ino, namespace_ino: namespace.ino(), name }
    }

    pub fn ino(&self) -> u64 {
        self.ino
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn namespace_ino(&self) -> u64 {
        self.namespace_ino
    }
}

#[derive(Debug, Clone)]
pub enum Node {
    Root,
    Namespace(Arc<NamespaceNode>),
    Group(Arc<GroupNode>),
}

impl Node {
    pub fn ino(&self) -> u64 {
        match self {
            Node::Root => ROOT_INO,
            Node::Namespace(ns) => ns.ino(),
            Node::Group(group) => group.ino(),
        }
    }

    pub fn kind(&self) -> NodeKind {
        match self {
            Node::Root => NodeKind::Root,
            Node::Namespace(_) => NodeKind::Namespace,
            Node::Group(_) => NodeKind::Group,
        }
    }

    pub fn parent_ino(&self) -> u64 {
        match self {
            Node::Root | Node::Namespace(_) => ROOT_INO,
            Node::Group(group) => group.namespace_ino(),
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.kind().capabilities()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_namespaces_are_mutable() {
        assert!(NodeKind::Namespace.capabilities().rename);
        assert!(NodeKind::Namespace.capabilities().remove);
        assert!(!NodeKind::Root.capabilities().rename);
        assert!(!NodeKind::Root.capabilities().remove);
        assert!(!NodeKind::Group.capabilities().rename);
        assert!(!NodeKind::Group.capabilities().remove);
    }

    #[test]
    fn test_groups_have_no_children() {
        assert!(NodeKind::Root.capabilities().lookup);
        assert!(NodeKind::Namespace.capabilities().lookup);
        assert!(!NodeKind::Group.capabilities().lookup);
    }

    #[test]
    fn test_group_parent_is_namespace() {
        let ns = NamespaceNode::new(7, "work".to_string(), "alice_work".to_string());
        let group = Arc::new(GroupNode::new(9, &ns, "scans".to_string()));
        let node = Node::Group(group);

        assert_eq!(node.ino(), 9);
        assert_eq!(node.parent_ino(), 7);
        assert_eq!(node.kind(), NodeKind::Group);
    }

    #[test]
    fn test_root_node() {
        assert_eq!(Node::Root.ino(), ROOT_INO);
        assert_eq!(Node::Root.parent_ino(), ROOT_INO);
        assert!(Node::Root.capabilities().lookup);
    }
}
