//! Key/value and set store holding blacklists, per-server settings and permission overrides.

use crate::model::ServerId;
use anyhow::{anyhow, Result};
use std::{
    collections::{BTreeMap, BTreeSet, HashSet},
    io::ErrorKind,
    path::PathBuf,
};
use tokio::sync::RwLock;

pub const GLOBAL_BLACKLIST: &str = "global_blacklist";

pub fn blacklist_key(server: ServerId) -> String {
    format!("blacklist:{}", server)
}

pub fn override_key(server: ServerId, command: &str) -> String {
    format!("override:{}:{}", server, command)
}

pub fn config_key(server: ServerId, key: &str) -> String {
    format!("config:{}:{}", server, key)
}

/// Shared store queried live by authorization checks and plugins.
#[serenity::async_trait]
pub trait Store: Send + Sync {
    async fn get_key(&self, key: &str) -> Result<Option<String>>;
    async fn set_key(&self, key: &str, value: &str) -> Result<()>;
    /// A missing set is the empty set.
    async fn get_set(&self, key: &str) -> Result<HashSet<String>>;
    /// Returns whether the member was newly added.
    async fn add_to_set(&self, key: &str, member: &str) -> Result<bool>;
    /// Returns whether the member was present.
    async fn remove_from_set(&self, key: &str, member: &str) -> Result<bool>;

    async fn get_role_overrides(&self, server: ServerId, command: &str) -> Result<HashSet<String>> {
        self.get_set(&override_key(server, command)).await
    }

    async fn get_config(&self, server: ServerId, key: &str) -> Result<Option<String>> {
        self.get_key(&config_key(server, key)).await
    }
}

#[derive(Default, serde::Serialize, serde::Deserialize)]
struct StoreData {
    #[serde(default)]
    keys: BTreeMap<String, String>,
    #[serde(default)]
    sets: BTreeMap<String, BTreeSet<String>>,
}

/// Store kept in memory and mirrored to a TOML file after every write.
pub struct TomlStore {
    path: Option<PathBuf>,
    data: RwLock<StoreData>,
}

impl TomlStore {
    /// Store which is never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(StoreData::default()),
        }
    }

    pub async fn load(path: PathBuf) -> Result<Self> {
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => toml::from_str(&contents).map_err(|e| {
                anyhow!(
                    "Could not parse store at `{}`: {}",
                    path.to_string_lossy(),
                    e
                )
            })?,
            // First run, nothing stored yet.
            Err(e) if e.kind() == ErrorKind::NotFound => StoreData::default(),
            Err(e) => {
                return Err(anyhow!(
                    "Could not read store at `{}`: {}",
                    path.to_string_lossy(),
                    e
                ))
            }
        };

        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    async fn save(&self, data: &StoreData) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let store_str = toml::to_string_pretty(data)
            .map_err(|e| anyhow!("Could not serialize store: {}", e))?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                anyhow!(
                    "Could not create directory `{}`: {}",
                    parent.to_string_lossy(),
                    e
                )
            })?;
        }

        // Create a temporary file in the same directory.
        let tmp_path = path.with_extension("toml.new");

        tokio::fs::write(&tmp_path, store_str).await.map_err(|e| {
            anyhow!(
                "Could not write store to temporary file `{}`: {}",
                tmp_path.to_string_lossy(),
                e
            )
        })?;

        // Atomically rename the temporary file over the target file.
        tokio::fs::rename(&tmp_path, path).await.map_err(|e| {
            anyhow!(
                "Could not rename temporary file `{}` to `{}`: {}",
                tmp_path.to_string_lossy(),
                path.to_string_lossy(),
                e
            )
        })?;

        Ok(())
    }
}

#[serenity::async_trait]
impl Store for TomlStore {
    async fn get_key(&self, key: &str) -> Result<Option<String>> {
        Ok(self.data.read().await.keys.get(key).cloned())
    }

    async fn set_key(&self, key: &str, value: &str) -> Result<()> {
        let mut data = self.data.write().await;
        data.keys.insert(key.to_owned(), value.to_owned());
        self.save(&data).await
    }

    async fn get_set(&self, key: &str) -> Result<HashSet<String>> {
        Ok(self
            .data
            .read()
            .await
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_to_set(&self, key: &str, member: &str) -> Result<bool> {
        let mut data = self.data.write().await;
        let added = data
            .sets
            .entry(key.to_owned())
            .or_default()
            .insert(member.to_owned());
        if added {
            self.save(&data).await?;
        }
        Ok(added)
    }

    async fn remove_from_set(&self, key: &str, member: &str) -> Result<bool> {
        let mut data = self.data.write().await;
        let Some(set) = data.sets.get_mut(key) else {
            return Ok(false);
        };
        let removed = set.remove(member);
        if set.is_empty() {
            data.sets.remove(key);
        }
        if removed {
            self.save(&data).await?;
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_set_is_empty() {
        let store = TomlStore::in_memory();
        assert!(store.get_set("blacklist:1").await.unwrap().is_empty());
        assert!(!store.remove_from_set("blacklist:1", "5").await.unwrap());
    }

    #[tokio::test]
    async fn overrides_and_config_use_server_scoped_keys() {
        let store = TomlStore::in_memory();
        store
            .add_to_set("override:123:mute", "Moderator")
            .await
            .unwrap();
        store.set_key("config:123:lang", "de").await.unwrap();

        let overrides = store
            .get_role_overrides(ServerId(123), "mute")
            .await
            .unwrap();
        assert_eq!(overrides, HashSet::from(["Moderator".to_owned()]));
        assert!(store
            .get_role_overrides(ServerId(456), "mute")
            .await
            .unwrap()
            .is_empty());
        assert_eq!(
            store.get_config(ServerId(123), "lang").await.unwrap(),
            Some("de".to_owned())
        );
    }

    #[tokio::test]
    async fn set_membership_reports_changes() {
        let store = TomlStore::in_memory();
        assert!(store.add_to_set(GLOBAL_BLACKLIST, "7").await.unwrap());
        assert!(!store.add_to_set(GLOBAL_BLACKLIST, "7").await.unwrap());
        assert!(store.remove_from_set(GLOBAL_BLACKLIST, "7").await.unwrap());
        assert!(store.get_set(GLOBAL_BLACKLIST).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn writes_survive_a_reload_from_disk() {
        let dir = std::env::temp_dir().join(format!("navalbot-store-{}", std::process::id()));
        let path = dir.join("store.toml");
        let _ = tokio::fs::remove_file(&path).await;

        let store = TomlStore::load(path.clone()).await.unwrap();
        store.set_key("owm_key", "secret").await.unwrap();
        store.add_to_set("blacklist:1", "99").await.unwrap();

        let reloaded = TomlStore::load(path.clone()).await.unwrap();
        assert_eq!(
            reloaded.get_key("owm_key").await.unwrap(),
            Some("secret".to_owned())
        );
        assert!(reloaded.get_set("blacklist:1").await.unwrap().contains("99"));

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
