use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub remote: RemoteConfig,
    pub fuse: FuseConfig,
    pub cache: CacheConfig,
    pub mutation: MutationConfig,
    pub unmount: UnmountConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub url: String,
    pub username: String,
    pub token: String,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FuseConfig {
    pub mount_point: PathBuf,
    pub fsname: String,
    pub allow_other: bool,
    pub entry_timeout_ms: u64,
    pub attr_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// How long one attribute snapshot is reused before asking the remote again.
    pub ttl_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MutationConfig {
    /// Window in which an rmdir can still be interrupted before the namespace is deleted.
    pub delete_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UnmountConfig {
    pub retry_interval_secs: u64,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Config {
    /// Load defaults, then `path` (or `dmfs.toml` if present), then `DMFS_*` variables.
    ///
    /// Nested keys use a double underscore: `DMFS_REMOTE__URL`.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let file = match path {
            Some(path) => config::File::from(path).required(true),
            None => config::File::with_name("dmfs").required(false),
        };

        let config = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("DMFS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        Ok(config.try_deserialize()?)
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:9999".to_string(),
            username: String::new(),
            token: String::new(),
            request_timeout_secs: 30,
        }
    }
}

impl Default for FuseConfig {
    fn default() -> Self {
        Self {
            mount_point: PathBuf::from("./dmfs"),
            fsname: "dmanager".to_string(),
            allow_other: false,
            entry_timeout_ms: 1000,
            attr_timeout_ms: 1000,
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { ttl_seconds: 10 }
    }
}

impl Default for MutationConfig {
    fn default() -> Self {
        Self { delete_delay_ms: 2000 }
    }
}

impl Default for UnmountConfig {
    fn default() -> Self {
        Self { retry_interval_secs: 3, max_attempts: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    #[test]
    fn test_config_default_values() {
        let config = Config::default();

        assert_eq!(config.remote.url, "http://localhost:9999");
        assert!(config.remote.username.is_empty());
        assert_eq!(config.remote.request_timeout_secs, 30);

        assert_eq!(config.fuse.mount_point, PathBuf::from("./dmfs"));
        assert_eq!(config.fuse.fsname, "dmanager");
        assert!(!config.fuse.allow_other);
        assert_eq!(config.fuse.entry_timeout_ms, 1000);
        assert_eq!(config.fuse.attr_timeout_ms, 1000);

        assert_eq!(config.cache.ttl_seconds, 10);
        assert_eq!(config.mutation.delete_delay_ms, 2000);

        assert_eq!(config.unmount.retry_interval_secs, 3);
        assert!(config.unmount.max_attempts.is_none());
    }

    #[test]
    fn test_partial_deserialization_fills_defaults() {
        let json = r#"{
            "remote": { "url": "https://dm.example.com", "username": "alice" },
            "cache": { "ttl_seconds": 30 }
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.remote.url, "https://dm.example.com");
        assert_eq!(config.remote.username, "alice");
        assert_eq!(config.remote.request_timeout_secs, 30);
        assert_eq!(config.cache.ttl_seconds, 30);
        assert_eq!(config.mutation.delete_delay_ms, 2000);
        assert_eq!(config.fuse.fsname, "dmanager");
    }

    #[test]
    #[serial]
    fn test_load_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[remote]
url = "https://dm.example.com"
username = "bob"

[fuse]
mount_point = "/mnt/dm"
allow_other = true

[unmount]
max_attempts = 5
"#
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.remote.username, "bob");
        assert_eq!(config.fuse.mount_point, PathBuf::from("/mnt/dm"));
        assert!(config.fuse.allow_other);
        assert_eq!(config.unmount.max_attempts, Some(5));
        assert_eq!(config.unmount.retry_interval_secs, 3);
    }

    #[test]
    #[serial]
    fn test_environment_overrides() {
        // SAFETY: serialized with the other environment-touching tests.
        unsafe {
            std::env::set_var("DMFS_REMOTE__USERNAME", "carol");
            std::env::set_var("DMFS_CACHE__TTL_SECONDS", "42");
        }

        let config = Config::load(None);

        unsafe {
            std::env::remove_var("DMFS_REMOTE__USERNAME");
            std::env::remove_var("DMFS_CACHE__TTL_SECONDS");
        }

        let config = config.unwrap();
        assert_eq!(config.remote.username, "carol");
        assert_eq!(config.cache.ttl_seconds, 42);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/dmfs.toml")));
        assert!(result.is_err());
    }
}
