// Remote DataManager access
//
// The remote service is the only source of truth for namespaces and groups.
// Everything in here is consumed through the `RemoteStore` trait so the
// filesystem layers can be exercised against scripted stores.

pub mod error;
pub mod http;
pub mod models;
pub mod naming;
pub mod traits;

pub use error::RemoteError;
pub use http::HttpRemoteStore;
pub use models::{AttributeSnapshot, NO_GROUP, Namespace};
pub use naming::{NamespaceNaming, OwnerScope};
pub use traits::RemoteStore;

#[cfg(any(test, feature = "mockall"))]
pub use traits::MockRemoteStore;
