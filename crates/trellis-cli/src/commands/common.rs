use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use trellis_core::auth::AuthUser;
use trellis_core::models::Actor;
use trellis_core::rest::RestClient;
use trellis_core::{Activity, MediaItem, Node, NodeKind, Project, RowId, Workspace};

use crate::auth::{build_authenticator, CliAuthenticator};
use crate::config_profiles::{CliProfile, CliProfilesConfig};
use crate::error::CliError;

/// Everything a data command needs: the resolved profile, its restored
/// session, and a data client acting as the signed-in user.
pub struct AppContext {
    pub config: CliProfilesConfig,
    pub profile_name: String,
    pub authenticator: CliAuthenticator,
    pub data: Arc<RestClient>,
}

impl AppContext {
    pub async fn load(global_profile: Option<&str>) -> Result<Self, CliError> {
        let config = CliProfilesConfig::load().map_err(CliError::Config)?;
        let profile_name = config.resolve_profile_name(global_profile);
        let profile = config.profile(&profile_name).cloned().unwrap_or_default();
        let service = profile.service_config()?.ok_or(CliError::NotConfigured)?;

        tracing::debug!(profile = %profile_name, url = %service.supabase_url, "Loaded CLI profile");

        let mut authenticator = build_authenticator(&profile_name, &service)?;
        let mut client = RestClient::new(&service)?;
        if let Some(session) = authenticator.restore_session().await {
            client.set_access_token(Some(session.access_token));
        }

        Ok(Self {
            config,
            profile_name,
            authenticator,
            data: Arc::new(client),
        })
    }

    pub fn profile(&self) -> CliProfile {
        self.config
            .profile(&self.profile_name)
            .cloned()
            .unwrap_or_default()
    }

    pub fn user(&self) -> Option<AuthUser> {
        self.authenticator.current_user()
    }

    pub fn require_user(&self) -> Result<AuthUser, CliError> {
        self.user().ok_or(CliError::NotSignedIn)
    }

    pub fn require_actor(&self) -> Result<Actor, CliError> {
        Ok(Actor::from(&self.require_user()?))
    }

    pub fn selected_workspace(&self) -> Option<RowId> {
        self.profile().selected_workspace_id
    }

    pub fn require_workspace(&self) -> Result<RowId, CliError> {
        self.selected_workspace()
            .ok_or(CliError::NoSelection("workspace"))
    }

    pub fn selected_project(&self) -> Option<RowId> {
        self.profile().selected_project_id
    }

    pub fn require_project(&self) -> Result<RowId, CliError> {
        self.selected_project().ok_or(CliError::NoSelection("project"))
    }

    /// Persist a change to this profile's selections.
    pub fn update_profile(&mut self, update: impl FnOnce(&mut CliProfile)) -> Result<(), CliError> {
        update(self.config.profile_mut_or_default(&self.profile_name));
        self.config.save().map_err(CliError::Config)?;
        Ok(())
    }

    pub async fn finish(mut self) {
        self.authenticator.shutdown().await;
    }
}

pub fn normalize_name(parts: &[String], what: &'static str) -> Result<String, CliError> {
    let joined = parts.join(" ");
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyArgument(what))
    } else {
        Ok(trimmed.to_string())
    }
}

pub fn normalize_identifier(id: &str, what: &'static str) -> Result<RowId, CliError> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        Err(CliError::EmptyArgument(what))
    } else {
        Ok(RowId::from(trimmed))
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn marker(selected: bool) -> &'static str {
    if selected {
        "*"
    } else {
        " "
    }
}

pub fn format_workspace_lines(workspaces: &[Workspace], selected: Option<&RowId>) -> Vec<String> {
    workspaces
        .iter()
        .map(|workspace| {
            format!(
                "{} {:<38}  {}",
                marker(selected == Some(&workspace.id)),
                workspace.id,
                workspace.name
            )
        })
        .collect()
}

pub fn format_project_lines(projects: &[Project], selected: Option<&RowId>) -> Vec<String> {
    projects
        .iter()
        .map(|project| {
            let access = project.allowed_user_ids.as_ref().map_or_else(
                || "everyone".to_string(),
                |users| format!("{} user(s)", users.len()),
            );
            format!(
                "{} {:<38}  {:<30}  {access}",
                marker(selected == Some(&project.id)),
                project.id,
                project.name
            )
        })
        .collect()
}

pub fn format_node_lines(nodes: &[&Node], now: DateTime<Utc>) -> Vec<String> {
    nodes
        .iter()
        .map(|node| {
            let kind = match node.kind {
                NodeKind::Folder => "folder",
                NodeKind::Page => "page",
            };
            let due = node
                .due_date
                .map(|date| format!("  due {date}"))
                .unwrap_or_default();
            let updated = node
                .updated_at
                .or(node.created_at)
                .map(|at| format!("  {}", format_relative_time(at, now)))
                .unwrap_or_default();
            format!("{:<38}  {kind:<6}  {}{due}{updated}", node.id, node.name)
        })
        .collect()
}

pub fn format_activity_lines(activities: &[Activity], now: DateTime<Utc>) -> Vec<String> {
    activities
        .iter()
        .map(|activity| {
            let who = activity
                .user_name
                .as_deref()
                .or(activity.user_id.as_deref())
                .unwrap_or("someone");
            let target = activity.node_name.as_deref().unwrap_or("-");
            let details = activity
                .details
                .as_deref()
                .map(|details| format!("  ({details})"))
                .unwrap_or_default();
            format!(
                "{:<10}  {who} {} {target}{details}",
                format_relative_time(activity.timestamp, now),
                activity.action
            )
        })
        .collect()
}

pub fn format_media_lines(items: &[MediaItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| format!("{:<38}  {}  {:<30}  {}", item.id, item.date, item.name, item.url))
        .collect()
}

pub fn format_relative_time(at: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let diff = (now - at).num_seconds().max(0);
    let minute = 60;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;
    let month = 30 * day;
    let year = 365 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else if diff < month {
        format!("{}w ago", diff / week)
    } else if diff < year {
        format!("{}mo ago", diff / month)
    } else {
        format!("{}y ago", diff / year)
    }
}
