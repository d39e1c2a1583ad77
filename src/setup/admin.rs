//! Administrator bootstrap.
//!
//! Makes sure the "Administrators" group exists and has at least one member.
//! The group is always resolved (or created) before the administrator user is
//! created, and the user joins it last. A failed join after the user was created
//! is reported with the orphaned user's id.

use super::{SetupStep, StepOutcome};
use crate::error::{Result, SetupError};
use crate::models::fields::{admin_questions, ADMIN_EMAIL, ADMIN_PASSWORD, ADMIN_USERNAME};
use crate::models::records::{
    GroupId, GroupQuery, UserId, ADMIN_GROUP_DESCRIPTION, ADMIN_GROUP_NAME,
};
use crate::prompt::{collect_or_abort, AnswerSource};
use crate::store::{GroupStore, UserStore};
use async_trait::async_trait;
use log::{debug, error, info, warn};
use std::sync::Arc;

#[derive(Debug)]
enum AdminState {
    CheckGroup,
    CheckCount(GroupId),
    CreateGroupAndAdmin,
    CreateAdmin(Option<GroupId>),
    Done(StepOutcome),
}

pub struct AdminBootstrapper {
    groups: Arc<dyn GroupStore>,
    users: Arc<dyn UserStore>,
    answers: Arc<dyn AnswerSource>,
}

impl AdminBootstrapper {
    pub fn new(
        groups: Arc<dyn GroupStore>,
        users: Arc<dyn UserStore>,
        answers: Arc<dyn AnswerSource>,
    ) -> Self {
        Self {
            groups,
            users,
            answers,
        }
    }

    pub async fn ensure_admin(&self) -> Result<StepOutcome> {
        let mut state = AdminState::CheckGroup;
        loop {
            debug!("[PHASE: setup] [STEP: administrator] state={:?}", state);
            state = match state {
                AdminState::CheckGroup => match self.lookup_group().await? {
                    Some(gid) => AdminState::CheckCount(gid),
                    None => AdminState::CreateGroupAndAdmin,
                },
                AdminState::CheckCount(gid) => {
                    let group = self
                        .groups
                        .get(gid, GroupQuery::default())
                        .await
                        .map_err(|e| SetupError::store(format!("groups.get({})", gid), e))?;
                    if group.count > 0 {
                        info!(
                            "[PHASE: setup] [STEP: administrator] Administrator found, skipping Admin setup"
                        );
                        AdminState::Done(StepOutcome::Skipped(format!(
                            "{} has {} member(s)",
                            ADMIN_GROUP_NAME, group.count
                        )))
                    } else {
                        AdminState::CreateAdmin(Some(gid))
                    }
                }
                AdminState::CreateGroupAndAdmin => {
                    let gid = self.create_group().await?;
                    AdminState::CreateAdmin(Some(gid))
                }
                AdminState::CreateAdmin(gid) => {
                    let (uid, gid) = self.create_admin(gid).await?;
                    AdminState::Done(StepOutcome::Completed(format!(
                        "created administrator uid={} in group gid={}",
                        uid, gid
                    )))
                }
                AdminState::Done(outcome) => return Ok(outcome),
            };
        }
    }

    /// Ask for the administrator's details, create the user and add it to the
    /// administrators group. Without a group id the group is looked up, and
    /// created if missing, before the user is created.
    pub async fn create_admin(&self, gid: Option<GroupId>) -> Result<(UserId, GroupId)> {
        warn!(
            "[PHASE: setup] [STEP: administrator] No administrators have been detected, running initial user setup"
        );

        let mut answers =
            collect_or_abort(self.answers.as_ref(), &admin_questions(), "administrator account")
                .await?;
        let username = answers.take(ADMIN_USERNAME);
        let email = answers.take(ADMIN_EMAIL);
        let password = answers.take(ADMIN_PASSWORD);

        let gid = match gid {
            Some(gid) => gid,
            None => match self.lookup_group().await? {
                Some(gid) => gid,
                None => self.create_group().await?,
            },
        };

        let uid = self
            .users
            .create(&username, &password, &email)
            .await
            .map_err(|e| SetupError::store(format!("users.create({})", username), e))?;
        info!(
            "[PHASE: setup] [STEP: administrator] Created user '{}' (uid={})",
            username, uid
        );

        if let Err(e) = self.groups.join(gid, uid).await {
            error!(
                "[PHASE: setup] [STEP: administrator] User '{}' (uid={}) was created but could not join {} (gid={}): {}",
                username, uid, ADMIN_GROUP_NAME, gid, e
            );
            return Err(SetupError::store(
                format!(
                    "groups.join(gid={}, uid={}); user '{}' exists without administrator rights",
                    gid, uid, username
                ),
                e,
            ));
        }

        info!(
            "[PHASE: setup] [STEP: administrator] User '{}' joined {}",
            username, ADMIN_GROUP_NAME
        );
        Ok((uid, gid))
    }

    async fn lookup_group(&self) -> Result<Option<GroupId>> {
        self.groups
            .get_id_by_name(ADMIN_GROUP_NAME)
            .await
            .map_err(|e| SetupError::store(format!("groups.get_id_by_name({})", ADMIN_GROUP_NAME), e))
    }

    async fn create_group(&self) -> Result<GroupId> {
        let group = self
            .groups
            .create(ADMIN_GROUP_NAME, ADMIN_GROUP_DESCRIPTION)
            .await
            .map_err(|e| SetupError::store(format!("groups.create({})", ADMIN_GROUP_NAME), e))?;
        info!(
            "[PHASE: setup] [STEP: administrator] Created group {} (gid={})",
            ADMIN_GROUP_NAME, group.gid
        );
        Ok(group.gid)
    }
}

#[async_trait]
impl SetupStep for AdminBootstrapper {
    fn name(&self) -> &'static str {
        "administrator"
    }

    async fn run(&self) -> Result<StepOutcome> {
        self.ensure_admin().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prompt::PresetAnswers;
    use crate::store::MemoryStore;

    fn admin_answers() -> Arc<dyn AnswerSource> {
        Arc::new(
            PresetAnswers::new()
                .with("username", "admin")
                .with("email", "admin@example.com")
                .with("password", "hunter22"),
        )
    }

    fn bootstrapper(store: &Arc<MemoryStore>, answers: Arc<dyn AnswerSource>) -> AdminBootstrapper {
        AdminBootstrapper::new(store.clone(), store.clone(), answers)
    }

    #[tokio::test]
    async fn missing_group_is_created_before_admin_then_joined() {
        let store = Arc::new(MemoryStore::new());
        let outcome = bootstrapper(&store, admin_answers()).ensure_admin().await.unwrap();
        assert!(matches!(outcome, StepOutcome::Completed(_)));

        let journal = store.journal().await;
        assert_eq!(journal.len(), 3);
        assert_eq!(journal[0], "groups.create:Administrators");
        assert_eq!(journal[1], "users.create:admin");
        assert!(journal[2].starts_with("groups.join:"));
        assert_eq!(store.group_member_count("Administrators").await, Some(1));
    }

    #[tokio::test]
    async fn existing_admin_means_zero_writes() {
        let store = Arc::new(MemoryStore::new());
        store.seed_group("Administrators", 1).await;
        let outcome = bootstrapper(&store, admin_answers()).ensure_admin().await.unwrap();
        assert!(matches!(outcome, StepOutcome::Skipped(_)));
        assert!(store.journal().await.is_empty());
    }

    #[tokio::test]
    async fn empty_group_is_reused_not_recreated() {
        let store = Arc::new(MemoryStore::new());
        store.seed_group("Administrators", 0).await;
        bootstrapper(&store, admin_answers()).ensure_admin().await.unwrap();

        assert_eq!(store.group_count("Administrators").await, 1);
        let journal = store.journal().await;
        assert_eq!(journal[0], "users.create:admin");
        assert!(journal[1].starts_with("groups.join:"));
    }

    #[tokio::test]
    async fn empty_required_username_fails_before_any_user_write() {
        let store = Arc::new(MemoryStore::new());
        store.seed_group("Administrators", 0).await;
        let answers = Arc::new(
            PresetAnswers::new()
                .with("username", "")
                .with("email", "a@b.com")
                .with("password", "x"),
        );
        let err = bootstrapper(&store, answers).ensure_admin().await.unwrap_err();
        assert!(matches!(err, SetupError::ValidationFailed { ref field, .. } if field == "username"));
        assert!(store.usernames().await.is_empty());
    }

    #[tokio::test]
    async fn failed_join_surfaces_orphaned_user() {
        let store = Arc::new(MemoryStore::new());
        store.fail_on("groups.join").await;
        let err = bootstrapper(&store, admin_answers()).ensure_admin().await.unwrap_err();

        match &err {
            SetupError::StoreUnavailable { operation, .. } => {
                assert!(operation.contains("groups.join"), "{}", operation);
                assert!(operation.contains("'admin'"), "{}", operation);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(store.usernames().await, vec!["admin"]);
        assert_eq!(store.group_member_count("Administrators").await, Some(0));
    }

    #[tokio::test]
    async fn group_lookup_failure_is_fatal() {
        let store = Arc::new(MemoryStore::new());
        store.fail_on("groups.get_id_by_name").await;
        let err = bootstrapper(&store, admin_answers()).ensure_admin().await.unwrap_err();
        assert!(err.is_fatal());
        assert!(store.journal().await.is_empty());
    }

    #[tokio::test]
    async fn create_admin_without_group_resolves_it_first() {
        let store = Arc::new(MemoryStore::new());
        let (_, gid) = bootstrapper(&store, admin_answers())
            .create_admin(None)
            .await
            .unwrap();

        let journal = store.journal().await;
        assert_eq!(journal[0], "groups.create:Administrators");
        assert_eq!(journal[1], "users.create:admin");
        assert_eq!(journal[2], format!("groups.join:{}:{}", gid, 2));
    }
}
