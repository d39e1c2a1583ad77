//! Collaborator interfaces used by the setup steps.
//!
//! The forum's own stores sit behind these traits. `JsonFileStore` backs a
//! standalone install; `MemoryStore` backs the smoke mode and tests.

pub mod json_file;
pub mod memory;

use crate::models::records::{Category, CategoryDef, Group, GroupId, GroupQuery, UserId};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

/// Application settings (key/value).
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn set(&self, key: &str, value: Value) -> Result<()>;
}

#[async_trait]
pub trait GroupStore: Send + Sync {
    async fn get_id_by_name(&self, name: &str) -> Result<Option<GroupId>>;
    async fn get(&self, gid: GroupId, query: GroupQuery) -> Result<Group>;
    async fn create(&self, name: &str, description: &str) -> Result<Group>;
    async fn join(&self, gid: GroupId, uid: UserId) -> Result<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, username: &str, password: &str, email: &str) -> Result<UserId>;
}

#[async_trait]
pub trait CategoryStore: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Category>>;
    async fn create(&self, def: &CategoryDef) -> Result<Category>;
}

/// Plugin activation state.
#[async_trait]
pub trait PluginRegistry: Send + Sync {
    async fn is_active(&self, id: &str) -> Result<bool>;
    async fn toggle_active(&self, id: &str) -> Result<()>;
}

/// Handles to every collaborator a setup run needs.
#[derive(Clone)]
pub struct Collaborators {
    pub settings: Arc<dyn SettingsStore>,
    pub groups: Arc<dyn GroupStore>,
    pub users: Arc<dyn UserStore>,
    pub categories: Arc<dyn CategoryStore>,
    pub plugins: Arc<dyn PluginRegistry>,
}

impl Collaborators {
    /// Use one store for every role.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: SettingsStore + GroupStore + UserStore + CategoryStore + PluginRegistry + 'static,
    {
        Self {
            settings: store.clone(),
            groups: store.clone(),
            users: store.clone(),
            categories: store.clone(),
            plugins: store,
        }
    }
}
