// Records exchanged with the forum's stores

use serde::{Deserialize, Serialize};
use std::fmt;

pub const ADMIN_GROUP_NAME: &str = "Administrators";
pub const ADMIN_GROUP_DESCRIPTION: &str = "Forum Administrators";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub u64);

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    pub gid: GroupId,
    pub name: String,
    pub description: String,
    /// Number of members
    pub count: u64,
    /// Member ids, only filled when the lookup asked for them
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<UserId>,
}

/// Options for a group lookup.
#[derive(Debug, Clone, Copy, Default)]
pub struct GroupQuery {
    /// Also resolve member ids (not needed to read `count`)
    pub expand_members: bool,
}

/// A category definition as found in the bundled dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDef {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub bg_color: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub cid: u64,
    #[serde(flatten)]
    pub def: CategoryDef,
}
