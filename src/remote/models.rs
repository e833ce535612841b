use serde::{Deserialize, Deserializer, Serialize};

/// Group shown for namespaces that have no groups, so they never list empty.
pub const NO_GROUP: &str = "no_group";

/// One namespace as reported by the remote, keyed by its canonical id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub name: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub groups: Vec<String>,
}

impl Namespace {
    pub fn new<I, S>(name: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { name: name.into(), groups: groups.into_iter().map(Into::into).collect() }
    }

    /// Groups as they appear on disk: the remote list, or the `no_group` placeholder.
    pub fn visible_groups(&self) -> Vec<String> {
        if self.groups.is_empty() { vec![NO_GROUP.to_string()] } else { self.groups.clone() }
    }
}

/// Result of one attribute fetch. Superseded wholesale by the next fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeSnapshot {
    #[serde(rename = "namespace", default, deserialize_with = "null_as_empty")]
    pub namespaces: Vec<Namespace>,
}

impl AttributeSnapshot {
    pub fn new(namespaces: Vec<Namespace>) -> Self {
        Self { namespaces }
    }
}

// The server encodes empty lists as `null`.
fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_groups_substitutes_placeholder() {
        let ns = Namespace::new("owner_alice", Vec::<String>::new());
        assert_eq!(ns.visible_groups(), vec![NO_GROUP.to_string()]);
    }

    #[test]
    fn test_visible_groups_keeps_remote_order() {
        let ns = Namespace::new("owner_alice", ["b", "a"]);
        assert_eq!(ns.visible_groups(), vec!["b".to_string(), "a".to_string()]);
    }

    #[test]
    fn test_snapshot_deserialization() {
        let json = r#"{
            "namespace": [
                { "name": "owner_default", "groups": null },
                { "name": "owner_work", "groups": ["invoices", "scans"] },
                { "name": "owner_misc" }
            ]
        }"#;

        let snapshot: AttributeSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(snapshot.namespaces.len(), 3);
        assert!(snapshot.namespaces[0].groups.is_empty());
        assert_eq!(snapshot.namespaces[1].groups, vec!["invoices", "scans"]);
        assert!(snapshot.namespaces[2].groups.is_empty());
    }

    #[test]
    fn test_snapshot_null_namespaces() {
        let snapshot: AttributeSnapshot = serde_json::from_str(r#"{"namespace": null}"#).unwrap();
        assert!(snapshot.namespaces.is_empty());
    }
}
