// Display name <-> canonical namespace id
//
// The remote scopes every namespace id with the owning user. Directory names
// leave the scope out.

/// Translates namespace names between the directory tree and the remote.
pub trait NamespaceNaming: Send + Sync {
    fn to_canonical(&self, display: &str) -> String;
    fn to_display(&self, id: &str) -> String;
}

/// `<owner>_<name>` scoping used by the DataManager server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerScope {
    prefix: String,
}

impl OwnerScope {
    pub fn new(owner: impl AsRef<str>) -> Self {
        let owner = owner.as_ref();
        let prefix = if owner.is_empty() { String::new() } else { format!("{owner}_") };
        Self { prefix }
    }
}

impl NamespaceNaming for OwnerScope {
    fn to_canonical(&self, display: &str) -> String {
        format!("{}{}", self.prefix, display)
    }

    fn to_display(&self, id: &str) -> String {
        if self.prefix.is_empty() {
            return id.to_string();
        }
        id.strip_prefix(&self.prefix).unwrap_or(id).to_string()
    }
}
