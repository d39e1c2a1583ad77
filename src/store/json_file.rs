//! File-backed collaborator store.
//!
//! Lets a standalone install run end to end without a live forum backend. The
//! whole store is one JSON document, rewritten after every change (write to a
//! temporary sibling, then rename). User passwords are stored as bcrypt hashes.

use super::{CategoryStore, GroupStore, PluginRegistry, SettingsStore, UserStore};
use crate::models::records::{Category, CategoryDef, Group, GroupId, GroupQuery, UserId};
use anyhow::{Context, Result};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use tokio::sync::Mutex;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    settings: BTreeMap<String, Value>,
    #[serde(default)]
    groups: Vec<StoredGroup>,
    #[serde(default)]
    users: Vec<StoredUser>,
    #[serde(default)]
    categories: Vec<Category>,
    #[serde(default)]
    active_plugins: BTreeSet<String>,
    #[serde(default)]
    next_gid: u64,
    #[serde(default)]
    next_uid: u64,
    #[serde(default)]
    next_cid: u64,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredGroup {
    gid: GroupId,
    name: String,
    description: String,
    members: Vec<UserId>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredUser {
    uid: UserId,
    username: String,
    email: String,
    password_hash: String,
    joined_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    hash_cost: u32,
    data: Mutex<StoreData>,
}

impl JsonFileStore {
    /// Open the store at `path`, starting empty when the file does not exist.
    pub async fn open(path: impl Into<PathBuf>, hash_cost: u32) -> Result<Self> {
        let path = path.into();
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .with_context(|| format!("Store file {:?} is not valid JSON", path))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreData::default(),
            Err(e) => {
                return Err(anyhow::Error::new(e))
                    .with_context(|| format!("Failed to read store file {:?}", path))
            }
        };
        debug!(
            "[PHASE: setup] [STEP: store] Opened JSON store (path={:?}, exists={})",
            path,
            path.exists()
        );
        Ok(Self {
            path,
            hash_cost,
            data: Mutex::new(data),
        })
    }

    async fn flush(&self, data: &StoreData) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }
        let bytes = serde_json::to_vec_pretty(data)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("Failed to write {:?}", tmp))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("Failed to replace {:?}", self.path))?;
        Ok(())
    }
}

#[async_trait]
impl SettingsStore for JsonFileStore {
    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut data = self.data.lock().await;
        data.settings.insert(key.to_string(), value);
        self.flush(&data).await
    }
}

#[async_trait]
impl GroupStore for JsonFileStore {
    async fn get_id_by_name(&self, name: &str) -> Result<Option<GroupId>> {
        let data = self.data.lock().await;
        Ok(data.groups.iter().find(|g| g.name == name).map(|g| g.gid))
    }

    async fn get(&self, gid: GroupId, query: GroupQuery) -> Result<Group> {
        let data = self.data.lock().await;
        let g = data
            .groups
            .iter()
            .find(|g| g.gid == gid)
            .ok_or_else(|| anyhow::anyhow!("Group {} not found", gid))?;
        Ok(Group {
            gid: g.gid,
            name: g.name.clone(),
            description: g.description.clone(),
            count: g.members.len() as u64,
            members: if query.expand_members {
                g.members.clone()
            } else {
                Vec::new()
            },
        })
    }

    async fn create(&self, name: &str, description: &str) -> Result<Group> {
        let mut data = self.data.lock().await;
        if data.groups.iter().any(|g| g.name == name) {
            anyhow::bail!("Group '{}' already exists", name);
        }
        data.next_gid += 1;
        let gid = GroupId(data.next_gid);
        data.groups.push(StoredGroup {
            gid,
            name: name.to_string(),
            description: description.to_string(),
            members: Vec::new(),
        });
        self.flush(&data).await?;
        Ok(Group {
            gid,
            name: name.to_string(),
            description: description.to_string(),
            count: 0,
            members: Vec::new(),
        })
    }

    async fn join(&self, gid: GroupId, uid: UserId) -> Result<()> {
        let mut data = self.data.lock().await;
        if !data.users.iter().any(|u| u.uid == uid) {
            anyhow::bail!("User {} not found", uid);
        }
        let group = data
            .groups
            .iter_mut()
            .find(|g| g.gid == gid)
            .ok_or_else(|| anyhow::anyhow!("Group {} not found", gid))?;
        if !group.members.contains(&uid) {
            group.members.push(uid);
        }
        self.flush(&data).await
    }
}

#[async_trait]
impl UserStore for JsonFileStore {
    async fn create(&self, username: &str, password: &str, email: &str) -> Result<UserId> {
        let cost = self.hash_cost;
        let plain = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(plain, cost))
            .await
            .context("Password hashing task failed")?
            .context("Failed to hash password")?;

        let mut data = self.data.lock().await;
        if data
            .users
            .iter()
            .any(|u| u.username.eq_ignore_ascii_case(username))
        {
            anyhow::bail!("Username '{}' is already taken", username);
        }
        data.next_uid += 1;
        let uid = UserId(data.next_uid);
        data.users.push(StoredUser {
            uid,
            username: username.to_string(),
            email: email.to_string(),
            password_hash,
            joined_at: chrono::Utc::now(),
        });
        self.flush(&data).await?;
        Ok(uid)
    }
}

#[async_trait]
impl CategoryStore for JsonFileStore {
    async fn get_all(&self) -> Result<Vec<Category>> {
        Ok(self.data.lock().await.categories.clone())
    }

    async fn create(&self, def: &CategoryDef) -> Result<Category> {
        let mut data = self.data.lock().await;
        data.next_cid += 1;
        let category = Category {
            cid: data.next_cid,
            def: def.clone(),
        };
        data.categories.push(category.clone());
        self.flush(&data).await?;
        Ok(category)
    }
}

#[async_trait]
impl PluginRegistry for JsonFileStore {
    async fn is_active(&self, id: &str) -> Result<bool> {
        Ok(self.data.lock().await.active_plugins.contains(id))
    }

    async fn toggle_active(&self, id: &str) -> Result<()> {
        let mut data = self.data.lock().await;
        if !data.active_plugins.remove(id) {
            data.active_plugins.insert(id.to_string());
        }
        self.flush(&data).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Lowest cost bcrypt accepts; keeps the tests fast.
    const TEST_COST: u32 = 4;

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("store.json");

        {
            let store = JsonFileStore::open(&path, TEST_COST).await.unwrap();
            let group = GroupStore::create(&store, "Administrators", "Forum Administrators")
                .await
                .unwrap();
            let uid = UserStore::create(&store, "admin", "hunter22", "admin@example.com")
                .await
                .unwrap();
            store.join(group.gid, uid).await.unwrap();
            store.toggle_active("nodebb-plugin-markdown").await.unwrap();
            store.set("postDelay", serde_json::json!(10000)).await.unwrap();
        }

        let store = JsonFileStore::open(&path, TEST_COST).await.unwrap();
        let gid = store.get_id_by_name("Administrators").await.unwrap().unwrap();
        let group = store.get(gid, GroupQuery::default()).await.unwrap();
        assert_eq!(group.count, 1);
        assert!(group.members.is_empty());
        let expanded = store
            .get(
                gid,
                GroupQuery {
                    expand_members: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(expanded.members.len(), 1);
        assert!(store.is_active("nodebb-plugin-markdown").await.unwrap());
    }

    #[tokio::test]
    async fn passwords_are_hashed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = JsonFileStore::open(&path, TEST_COST).await.unwrap();
        UserStore::create(&store, "admin", "hunter22", "admin@example.com")
            .await
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("hunter22"));
        let v: Value = serde_json::from_str(&raw).unwrap();
        let hash = v["users"][0]["password_hash"].as_str().unwrap();
        assert!(bcrypt::verify("hunter22", hash).unwrap());
    }

    #[tokio::test]
    async fn join_requires_existing_user() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("s.json"), TEST_COST)
            .await
            .unwrap();
        let group = GroupStore::create(&store, "Administrators", "").await.unwrap();
        assert!(store.join(group.gid, UserId(99)).await.is_err());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(JsonFileStore::open(&path, TEST_COST).await.is_err());
    }
}
