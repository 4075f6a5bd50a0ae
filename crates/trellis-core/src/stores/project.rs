use std::sync::Arc;

use serde_json::json;

use super::settle;
use crate::auth::AuthUser;
use crate::error::{Error, Result};
use crate::models::{NewProject, Project, RowId};
use crate::rest::{decode_rows, decode_single, DataService, Filter, Query};

const PROJECTS: &str = "projects";

/// Projects of the selected workspace that the user may see.
pub struct ProjectStore<D> {
    data: Arc<D>,
    projects: Vec<Project>,
    error: Option<String>,
}

impl<D: DataService> ProjectStore<D> {
    pub const fn new(data: Arc<D>) -> Self {
        Self {
            data,
            projects: Vec::new(),
            error: None,
        }
    }

    pub fn projects(&self) -> &[Project] {
        &self.projects
    }

    pub fn find(&self, id: &RowId) -> Option<&Project> {
        self.projects.iter().find(|project| &project.id == id)
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub async fn fetch_projects(
        &mut self,
        user: Option<&AuthUser>,
        workspace_id: Option<&RowId>,
    ) -> Result<&[Project]> {
        self.error = None;
        let (Some(user), Some(workspace_id)) = (user, workspace_id) else {
            self.projects.clear();
            return Ok(&self.projects);
        };

        let result = self
            .data
            .select(&Query::table(PROJECTS).eq("workspace_id", workspace_id))
            .await
            .and_then(decode_rows::<Project>);
        match settle(&mut self.error, "fetch_projects", result) {
            Ok(projects) => {
                self.projects = projects
                    .into_iter()
                    .filter(|project| project.is_visible_to(&user.id))
                    .collect();
                Ok(&self.projects)
            }
            Err(error) => {
                self.projects.clear();
                Err(error)
            }
        }
    }

    /// Create a project visible only to its creator, then reload the list.
    pub async fn create_project(
        &mut self,
        user: Option<&AuthUser>,
        workspace_id: Option<&RowId>,
        name: &str,
    ) -> Result<Project> {
        let result = match (user, workspace_id, name.trim()) {
            (None, _, _) => Err(Error::NotSignedIn),
            (_, None, _) => Err(Error::MissingSelection("workspace")),
            (_, _, "") => Err(Error::InvalidInput(
                "project name must not be empty".to_string(),
            )),
            (Some(user), Some(workspace_id), name) => {
                self.insert_project(NewProject {
                    name: name.to_string(),
                    workspace_id: workspace_id.clone(),
                    allowed_user_ids: vec![user.id.clone()],
                })
                .await
            }
        };
        let project = settle(&mut self.error, "create_project", result)?;

        tracing::info!(project_id = %project.id, "Created project");
        self.projects.push(project.clone());
        self.fetch_projects(user, workspace_id).await?;
        Ok(project)
    }

    async fn insert_project(&self, project: NewProject) -> Result<Project> {
        let rows = self
            .data
            .insert(PROJECTS, serde_json::to_value(project)?)
            .await?;
        decode_single(PROJECTS, rows)
    }

    /// Append a project that was obtained elsewhere.
    pub fn add_project(&mut self, project: Project) {
        self.projects.push(project);
    }

    pub async fn update_project_access(
        &mut self,
        project_id: &RowId,
        allowed_user_ids: Vec<String>,
    ) -> Result<()> {
        let result = self
            .data
            .update(
                PROJECTS,
                &[Filter::eq("id", project_id)],
                json!({ "allowed_user_ids": allowed_user_ids }),
            )
            .await;
        settle(&mut self.error, "update_project_access", result)?;

        if let Some(project) = self
            .projects
            .iter_mut()
            .find(|project| &project.id == project_id)
        {
            project.allowed_user_ids = Some(allowed_user_ids);
        }
        Ok(())
    }

    pub async fn delete_project(&mut self, project_id: &RowId) -> Result<()> {
        let result = self
            .data
            .delete(PROJECTS, &[Filter::eq("id", project_id)])
            .await;
        settle(&mut self.error, "delete_project", result)?;

        tracing::info!(project_id = %project_id, "Deleted project");
        self.projects.retain(|project| &project.id != project_id);
        Ok(())
    }
}
