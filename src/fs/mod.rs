pub mod cache;
pub mod error;
pub mod mutation;
pub mod name;
pub mod node;
pub mod tree;

pub use cache::{AttributeCache, DEFAULT_SNAPSHOT_TTL};
pub use error::{MutationError, RefreshError};
pub use mutation::{DEFAULT_DELETE_DELAY, DEFAULT_NAMESPACE, MutationBridge};
pub use name::validate_name;
pub use node::{Capabilities, GroupNode, NamespaceNode, Node, NodeKind, ROOT_INO};
pub use tree::InodeTree;
