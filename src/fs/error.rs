use std::sync::Arc;

use thiserror::Error;

use crate::remote::RemoteError;

#[derive(Error, Debug)]
pub enum RefreshError {
    /// Another refresh is in flight; callers keep using the current tree.
    #[error("Namespace refresh already in progress")]
    AlreadyLoading,

    #[error("Failed to load namespaces: {0}")]
    Remote(Arc<RemoteError>),
}

#[derive(Error, Debug)]
pub enum MutationError {
    #[error("The default namespace cannot be renamed or deleted")]
    DefaultNamespace,

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Filename too long: {0} bytes (max 255)")]
    NameTooLong(usize),

    #[error("Delete of namespace {0} cancelled")]
    Cancelled(String),

    #[error("Remote call for namespace {namespace} failed: {source}")]
    Remote {
        namespace: String,
        #[source]
        source: RemoteError,
    },
}
