// In-memory collaborator store
//
// Holds runtime-only state and keeps a journal of every state-changing call so
// callers can check exactly what a setup run wrote. Operations listed with
// `fail_on` return an error instead of running.

use super::{CategoryStore, GroupStore, PluginRegistry, SettingsStore, UserStore};
use crate::models::records::{Category, CategoryDef, Group, GroupId, GroupQuery, UserId};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use tokio::sync::Mutex;

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<MemoryInner>,
}

#[derive(Debug, Default)]
struct MemoryInner {
    settings: BTreeMap<String, Value>,
    groups: Vec<MemoryGroup>,
    users: Vec<(UserId, String, String)>,
    categories: Vec<Category>,
    active_plugins: BTreeSet<String>,
    journal: Vec<String>,
    failures: HashSet<String>,
    next_id: u64,
}

#[derive(Debug)]
struct MemoryGroup {
    gid: GroupId,
    name: String,
    description: String,
    members: Vec<UserId>,
}

impl MemoryInner {
    fn check(&self, op: &str, arg: &str) -> Result<()> {
        if self.failures.contains(op) || self.failures.contains(&format!("{}:{}", op, arg)) {
            anyhow::bail!("{} unavailable", op);
        }
        Ok(())
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `op` (e.g. `groups.join`) or `op:arg` (e.g. `categories.create:Blogs`) fail.
    pub async fn fail_on(&self, op: &str) {
        self.inner.lock().await.failures.insert(op.to_string());
    }

    /// Seed a group with `members` anonymous members.
    pub async fn seed_group(&self, name: &str, members: u64) -> GroupId {
        let mut inner = self.inner.lock().await;
        let gid = GroupId(inner.next_id());
        let members = (0..members)
            .map(|_| UserId(inner.next_id()))
            .collect::<Vec<_>>();
        inner.groups.push(MemoryGroup {
            gid,
            name: name.to_string(),
            description: String::new(),
            members,
        });
        gid
    }

    pub async fn seed_categories(&self, count: usize) {
        let mut inner = self.inner.lock().await;
        for i in 0..count {
            let cid = inner.next_id();
            inner.categories.push(Category {
                cid,
                def: CategoryDef {
                    name: format!("Existing {}", i + 1),
                    description: String::new(),
                    icon: String::new(),
                    bg_color: String::new(),
                    color: String::new(),
                    order: i as u32 + 1,
                },
            });
        }
    }

    pub async fn seed_active_plugin(&self, id: &str) {
        self.inner.lock().await.active_plugins.insert(id.to_string());
    }

    /// Every state-changing call, in order.
    pub async fn journal(&self) -> Vec<String> {
        self.inner.lock().await.journal.clone()
    }

    pub async fn setting(&self, key: &str) -> Option<Value> {
        self.inner.lock().await.settings.get(key).cloned()
    }

    pub async fn category_names(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.categories.iter().map(|c| c.def.name.clone()).collect()
    }

    pub async fn group_member_count(&self, name: &str) -> Option<usize> {
        let inner = self.inner.lock().await;
        inner
            .groups
            .iter()
            .find(|g| g.name == name)
            .map(|g| g.members.len())
    }

    pub async fn group_count(&self, name: &str) -> usize {
        let inner = self.inner.lock().await;
        inner.groups.iter().filter(|g| g.name == name).count()
    }

    pub async fn usernames(&self) -> Vec<String> {
        let inner = self.inner.lock().await;
        inner.users.iter().map(|(_, name, _)| name.clone()).collect()
    }

    pub async fn plugin_active(&self, id: &str) -> bool {
        self.inner.lock().await.active_plugins.contains(id)
    }
}

#[async_trait]
impl SettingsStore for MemoryStore {
    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.check("settings.set", key)?;
        inner.settings.insert(key.to_string(), value);
        inner.journal.push(format!("settings.set:{}", key));
        Ok(())
    }
}

#[async_trait]
impl GroupStore for MemoryStore {
    async fn get_id_by_name(&self, name: &str) -> Result<Option<GroupId>> {
        let inner = self.inner.lock().await;
        inner.check("groups.get_id_by_name", name)?;
        Ok(inner.groups.iter().find(|g| g.name == name).map(|g| g.gid))
    }

    async fn get(&self, gid: GroupId, query: GroupQuery) -> Result<Group> {
        let inner = self.inner.lock().await;
        inner.check("groups.get", &gid.to_string())?;
        inner
            .groups
            .iter()
            .find(|g| g.gid == gid)
            .map(|g| Group {
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
            .ok_or_else(|| anyhow::anyhow!("group {} not found", gid))
    }

    async fn create(&self, name: &str, description: &str) -> Result<Group> {
        let mut inner = self.inner.lock().await;
        inner.check("groups.create", name)?;
        if inner.groups.iter().any(|g| g.name == name) {
            anyhow::bail!("group '{}' already exists", name);
        }
        let gid = GroupId(inner.next_id());
        inner.groups.push(MemoryGroup {
            gid,
            name: name.to_string(),
            description: description.to_string(),
            members: Vec::new(),
        });
        inner.journal.push(format!("groups.create:{}", name));
        Ok(Group {
            gid,
            name: name.to_string(),
            description: description.to_string(),
            count: 0,
            members: Vec::new(),
        })
    }

    async fn join(&self, gid: GroupId, uid: UserId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.check("groups.join", &gid.to_string())?;
        let group = inner
            .groups
            .iter_mut()
            .find(|g| g.gid == gid)
            .ok_or_else(|| anyhow::anyhow!("group {} not found", gid))?;
        if !group.members.contains(&uid) {
            group.members.push(uid);
        }
        inner.journal.push(format!("groups.join:{}:{}", gid, uid));
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, username: &str, _password: &str, email: &str) -> Result<UserId> {
        let mut inner = self.inner.lock().await;
        inner.check("users.create", username)?;
        if inner.users.iter().any(|(_, name, _)| name == username) {
            anyhow::bail!("username '{}' is taken", username);
        }
        let uid = UserId(inner.next_id());
        inner
            .users
            .push((uid, username.to_string(), email.to_string()));
        inner.journal.push(format!("users.create:{}", username));
        Ok(uid)
    }
}

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn get_all(&self) -> Result<Vec<Category>> {
        let inner = self.inner.lock().await;
        inner.check("categories.get_all", "")?;
        Ok(inner.categories.clone())
    }

    async fn create(&self, def: &CategoryDef) -> Result<Category> {
        let mut inner = self.inner.lock().await;
        inner.check("categories.create", &def.name)?;
        let category = Category {
            cid: inner.next_id(),
            def: def.clone(),
        };
        inner.categories.push(category.clone());
        inner.journal.push(format!("categories.create:{}", def.name));
        Ok(category)
    }
}

#[async_trait]
impl PluginRegistry for MemoryStore {
    async fn is_active(&self, id: &str) -> Result<bool> {
        let inner = self.inner.lock().await;
        inner.check("plugins.is_active", id)?;
        Ok(inner.active_plugins.contains(id))
    }

    async fn toggle_active(&self, id: &str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        inner.check("plugins.toggle_active", id)?;
        if !inner.active_plugins.remove(id) {
            inner.active_plugins.insert(id.to_string());
        }
        inner.journal.push(format!("plugins.toggle_active:{}", id));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fail_on_matches_operation_and_argument() {
        let store = MemoryStore::new();
        store.fail_on("categories.create:Blogs").await;

        let ok = CategoryDef {
            name: "General".into(),
            description: String::new(),
            icon: String::new(),
            bg_color: String::new(),
            color: String::new(),
            order: 1,
        };
        let blocked = CategoryDef {
            name: "Blogs".into(),
            ..ok.clone()
        };
        assert!(CategoryStore::create(&store, &ok).await.is_ok());
        assert!(CategoryStore::create(&store, &blocked).await.is_err());
        assert_eq!(store.journal().await, vec!["categories.create:General"]);
    }

    #[tokio::test]
    async fn toggle_flips_state() {
        let store = MemoryStore::new();
        store.toggle_active("p").await.unwrap();
        assert!(store.is_active("p").await.unwrap());
        store.toggle_active("p").await.unwrap();
        assert!(!store.is_active("p").await.unwrap());
    }

    #[tokio::test]
    async fn duplicate_group_is_rejected() {
        let store = MemoryStore::new();
        GroupStore::create(&store, "Administrators", "").await.unwrap();
        assert!(GroupStore::create(&store, "Administrators", "").await.is_err());
        assert_eq!(store.group_count("Administrators").await, 1);
    }

    #[tokio::test]
    async fn members_are_listed_only_when_expanded() {
        let store = MemoryStore::new();
        let gid = store.seed_group("Administrators", 2).await;

        let plain = store.get(gid, GroupQuery::default()).await.unwrap();
        assert_eq!(plain.count, 2);
        assert!(plain.members.is_empty());

        let expanded = store
            .get(
                gid,
                GroupQuery {
                    expand_members: true,
                },
            )
            .await
            .unwrap();
        assert_eq!(expanded.count, 2);
        assert_eq!(expanded.members.len(), 2);
    }
}
