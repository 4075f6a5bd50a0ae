use std::sync::Arc;

use serde::Deserialize;

use super::settle;
use crate::auth::AuthUser;
use crate::error::{Error, Result};
use crate::models::{MemberRole, NewWorkspace, RowId, Workspace, WorkspaceMember};
use crate::rest::{decode_rows, decode_single, DataService, Query};

const WORKSPACES: &str = "workspaces";
const MEMBERS: &str = "workspace_members";

#[derive(Deserialize)]
struct Membership {
    workspace_id: RowId,
}

/// Workspaces the signed-in user belongs to, plus the current selection.
pub struct WorkspaceStore<D> {
    data: Arc<D>,
    workspaces: Vec<Workspace>,
    selected: Option<RowId>,
    error: Option<String>,
}

impl<D: DataService> WorkspaceStore<D> {
    pub const fn new(data: Arc<D>) -> Self {
        Self {
            data,
            workspaces: Vec::new(),
            selected: None,
            error: None,
        }
    }

    pub fn workspaces(&self) -> &[Workspace] {
        &self.workspaces
    }

    pub const fn selected_workspace_id(&self) -> Option<&RowId> {
        self.selected.as_ref()
    }

    pub fn selected_workspace(&self) -> Option<&Workspace> {
        let selected = self.selected.as_ref()?;
        self.workspaces.iter().find(|workspace| &workspace.id == selected)
    }

    /// Message of the last failed operation, cleared on the next success.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn select_workspace(&mut self, id: Option<RowId>) {
        self.selected = id;
    }

    /// Load the workspaces `user` is a member of. The first one becomes the
    /// selection when nothing is selected yet.
    pub async fn fetch_workspaces(&mut self, user: Option<&AuthUser>) -> Result<&[Workspace]> {
        self.error = None;
        let Some(user) = user else {
            self.workspaces.clear();
            return Ok(&self.workspaces);
        };

        let result = self.load_for_user(&user.id).await;
        match settle(&mut self.error, "fetch_workspaces", result) {
            Ok(workspaces) => self.workspaces = workspaces,
            Err(error) => {
                self.workspaces.clear();
                return Err(error);
            }
        }

        if self.selected.is_none() {
            self.selected = self.workspaces.first().map(|workspace| workspace.id.clone());
        }
        Ok(&self.workspaces)
    }

    async fn load_for_user(&self, user_id: &str) -> Result<Vec<Workspace>> {
        let memberships: Vec<Membership> = decode_rows(
            self.data
                .select(
                    &Query::table(MEMBERS)
                        .select("workspace_id")
                        .eq("user_id", user_id),
                )
                .await?,
        )?;
        if memberships.is_empty() {
            return Ok(Vec::new());
        }

        let ids = memberships.iter().map(|membership| &membership.workspace_id);
        decode_rows(
            self.data
                .select(&Query::table(WORKSPACES).in_list("id", ids))
                .await?,
        )
    }

    /// Create a workspace owned by `user`, enrol the owner as admin, and
    /// select it.
    pub async fn create_workspace(
        &mut self,
        user: Option<&AuthUser>,
        name: &str,
    ) -> Result<Workspace> {
        let result = match (user, name.trim()) {
            (None, _) => Err(Error::NotSignedIn),
            (Some(_), "") => Err(Error::InvalidInput(
                "workspace name must not be empty".to_string(),
            )),
            (Some(user), name) => self.insert_workspace(&user.id, name).await,
        };
        let workspace = settle(&mut self.error, "create_workspace", result)?;

        tracing::info!(workspace_id = %workspace.id, "Created workspace");
        self.workspaces.push(workspace.clone());
        self.selected = Some(workspace.id.clone());
        Ok(workspace)
    }

    async fn insert_workspace(&self, owner_id: &str, name: &str) -> Result<Workspace> {
        let row = serde_json::to_value(NewWorkspace {
            name: name.to_string(),
            owner_id: owner_id.to_string(),
        })?;
        let workspace: Workspace = decode_single(WORKSPACES, self.data.insert(WORKSPACES, row).await?)?;

        let member = serde_json::to_value(WorkspaceMember {
            workspace_id: workspace.id.clone(),
            user_id: owner_id.to_string(),
            role: MemberRole::Admin,
        })?;
        if let Err(error) = self.data.insert(MEMBERS, member).await {
            tracing::warn!(workspace_id = %workspace.id, %error, "Failed to add owner as workspace admin");
        }
        Ok(workspace)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::rest::testing::MemoryData;

    fn user(id: &str) -> AuthUser {
        AuthUser {
            id: id.to_string(),
            email: Some(format!("{id}@example.com")),
        }
    }

    fn seeded() -> MemoryData {
        let data = MemoryData::default();
        data.seed(
            MEMBERS,
            vec![
                json!({ "workspace_id": "w1", "user_id": "u1", "role": "admin" }),
                json!({ "workspace_id": "w2", "user_id": "u1", "role": "member" }),
                json!({ "workspace_id": "w3", "user_id": "u2", "role": "admin" }),
            ],
        );
        data.seed(
            WORKSPACES,
            vec![
                json!({ "id": "w1", "name": "Acme", "owner_id": "u1" }),
                json!({ "id": "w2", "name": "Side", "owner_id": "u9" }),
                json!({ "id": "w3", "name": "Other", "owner_id": "u2" }),
            ],
        );
        data
    }

    #[tokio::test]
    async fn fetch_returns_member_workspaces_and_selects_first() {
        let mut store = WorkspaceStore::new(Arc::new(seeded()));

        let names: Vec<_> = store
            .fetch_workspaces(Some(&user("u1")))
            .await
            .unwrap()
            .iter()
            .map(|workspace| workspace.name.clone())
            .collect();

        assert_eq!(names, vec!["Acme", "Side"]);
        assert_eq!(store.selected_workspace_id(), Some(&RowId::from("w1")));
    }

    #[tokio::test]
    async fn fetch_keeps_existing_selection() {
        let mut store = WorkspaceStore::new(Arc::new(seeded()));
        store.select_workspace(Some(RowId::from("w2")));

        store.fetch_workspaces(Some(&user("u1"))).await.unwrap();

        assert_eq!(store.selected_workspace().map(|w| w.name.as_str()), Some("Side"));
    }

    #[tokio::test]
    async fn fetch_without_user_or_membership_is_empty() {
        let mut store = WorkspaceStore::new(Arc::new(seeded()));
        assert!(store.fetch_workspaces(None).await.unwrap().is_empty());
        assert!(store
            .fetch_workspaces(Some(&user("nobody")))
            .await
            .unwrap()
            .is_empty());
        assert_eq!(store.selected_workspace_id(), None);
    }

    #[tokio::test]
    async fn fetch_failure_records_error_and_clears_list() {
        let data = seeded();
        let mut store = WorkspaceStore::new(Arc::new(data.clone()));
        store.fetch_workspaces(Some(&user("u1"))).await.unwrap();
        data.fail_table(WORKSPACES);

        assert!(store.fetch_workspaces(Some(&user("u1"))).await.is_err());
        assert!(store.workspaces().is_empty());
        assert!(store.error().unwrap().contains("workspaces unavailable"));
    }

    #[tokio::test]
    async fn create_enrols_owner_as_admin_and_selects() {
        let data = MemoryData::default();
        let mut store = WorkspaceStore::new(Arc::new(data.clone()));

        let workspace = store
            .create_workspace(Some(&user("u1")), "  Launch  ")
            .await
            .unwrap();

        assert_eq!(workspace.name, "Launch");
        assert_eq!(store.selected_workspace_id(), Some(&workspace.id));
        assert_eq!(
            data.rows(MEMBERS),
            vec![json!({ "workspace_id": "1", "user_id": "u1", "role": "admin", "id": 2 })]
        );
    }

    #[tokio::test]
    async fn create_survives_membership_failure() {
        let data = MemoryData::default();
        data.fail_table(MEMBERS);
        let mut store = WorkspaceStore::new(Arc::new(data));

        let workspace = store.create_workspace(Some(&user("u1")), "Solo").await.unwrap();

        assert_eq!(store.workspaces(), &[workspace]);
        assert_eq!(store.error(), None);
    }

    #[tokio::test]
    async fn create_requires_user_and_name() {
        let mut store = WorkspaceStore::new(Arc::new(MemoryData::default()));

        let error = store.create_workspace(None, "Acme").await.unwrap_err();
        assert!(matches!(error, Error::NotSignedIn));
        assert_eq!(store.error(), Some("Not logged in"));

        let error = store
            .create_workspace(Some(&user("u1")), "   ")
            .await
            .unwrap_err();
        assert!(matches!(error, Error::InvalidInput(_)));
        assert!(store.workspaces().is_empty());
    }
}
