//! Project lifecycle: visibility, creation under a namespace and quota,
//! deletion, and membership management.

mod members;
pub mod validation;

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::access::AccessEvaluator;
use crate::error::{Error, Result};
use crate::storage::ProjectStorage;
use crate::store::Store;
use crate::types::{
    GUEST, OWNER, PUBLIC_PREFIX, Project, ProjectMember, Quota, RoleTables, USER, User, VIEWER,
};

use validation::{validate_project_id, validate_project_name};

pub use members::{KickedMember, MemberInvite, MemberSummary, MembershipChange};

/// Role label shown to staff for projects they are not a member of. Display only.
pub const STAFF_LABEL: &str = "admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Created,
    Deleted,
    Added,
    Updated,
    Kicked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub id: String,
    pub name: String,
    pub role: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedProject {
    pub status: Status,
    /// Final id: `<uid>_<id>`, or the requested id as given for `PUBLIC_` projects.
    pub id: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeletedProject {
    pub status: Status,
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    pub owned_projects: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_projects: Option<u32>,
}

pub struct ProjectManager {
    store: Arc<dyn Store>,
    storage: Arc<dyn ProjectStorage>,
    access: AccessEvaluator,
}

impl ProjectManager {
    pub fn new(
        store: Arc<dyn Store>,
        storage: Arc<dyn ProjectStorage>,
        tables: Arc<RoleTables>,
    ) -> Self {
        Self {
            store,
            storage,
            access: AccessEvaluator::new(tables),
        }
    }

    pub fn access(&self) -> &AccessEvaluator {
        &self.access
    }

    /// Projects visible to `user`, ordered by id. Anonymous callers see nothing.
    pub fn list_projects(&self, user: Option<&User>) -> Result<Vec<ProjectSummary>> {
        let Some(user) = user else {
            return Ok(Vec::new());
        };

        let memberships = self.store.list_user_memberships(&user.id)?;
        let mut visible: BTreeMap<String, ProjectSummary> = BTreeMap::new();

        if self.access.is_staff(user) {
            let roles: HashMap<String, String> = memberships
                .into_iter()
                .map(|(m, _)| (m.project_id, m.project_role))
                .collect();

            for project in self.store.list_projects()? {
                let role = roles
                    .get(&project.id)
                    .cloned()
                    .unwrap_or_else(|| STAFF_LABEL.to_string());
                visible.insert(project.id.clone(), summarize(project, role));
            }
        } else {
            for (membership, project) in memberships {
                visible.insert(
                    project.id.clone(),
                    summarize(project, membership.project_role),
                );
            }

            for project in self.store.list_projects_with_prefix(PUBLIC_PREFIX)? {
                visible
                    .entry(project.id.clone())
                    .or_insert_with(|| summarize(project, VIEWER.to_string()));
            }
        }

        Ok(visible.into_values().collect())
    }

    /// Creates a project owned by `user` and returns its final id.
    pub fn create_project(&self, user: &User, req: &NewProject) -> Result<CreatedProject> {
        let requested = req.id.trim();
        validate_project_id(requested)?;
        validate_project_name(&req.name)?;

        let project_id = if has_public_prefix(requested) {
            self.access.authorize_public_creation(user)?;
            requested.to_string()
        } else {
            format!("{}_{}", user.uid, requested)
        };

        let usage = self.quota_usage(user)?;
        let quota = self.access.tables().quota(&user.global_role);
        if quota.is_exhausted(usage.owned_projects) {
            return Err(quota_exceeded(&user.global_role, quota));
        }

        if self.store.get_project(&project_id)?.is_some() {
            return Err(Error::conflict(
                "You already have a project with this name (or ID collision)",
            ));
        }

        let path = self.storage.project_path(&project_id);
        self.storage.create_dir(&path)?;

        let now = Utc::now();
        let project = Project {
            id: project_id.clone(),
            name: req.name.clone(),
            storage_path: path.to_string_lossy().into_owned(),
            owner_id: user.uid.clone(),
            created_at: now,
        };
        let owner = ProjectMember {
            project_id: project_id.clone(),
            user_id: user.id.clone(),
            project_role: OWNER.to_string(),
            created_at: now,
            updated_at: now,
        };
        self.store.create_project(&project, &owner)?;

        tracing::info!("Created project {} for {}", project_id, user.uid);

        Ok(CreatedProject {
            status: Status::Created,
            id: project_id,
            role: OWNER.to_string(),
        })
    }

    /// Deletes a project, its memberships and, best-effort, its storage directory.
    pub fn delete_project(&self, user: &User, project_id: &str) -> Result<DeletedProject> {
        let membership = self.store.get_member(project_id, &user.id)?;
        self.access.authorize_delete(user, membership.as_ref())?;

        let project = self
            .store
            .get_project(project_id)?
            .ok_or_else(|| Error::not_found("Project not found"))?;

        match self.storage.remove_dir(Path::new(&project.storage_path)) {
            Ok(()) => tracing::debug!("Removed storage for project {}", project.id),
            Err(e) => tracing::warn!(
                "Failed to remove storage for project {} at {}: {e}",
                project.id,
                project.storage_path
            ),
        }

        if !self.store.delete_project(&project.id)? {
            return Err(Error::not_found("Project not found"));
        }

        tracing::info!("Deleted project {} by {}", project.id, user.uid);

        Ok(DeletedProject {
            status: Status::Deleted,
            id: project.id,
        })
    }

    /// Number of projects `user` owns against the limit of their global role.
    pub fn quota_usage(&self, user: &User) -> Result<QuotaUsage> {
        let owned_projects = self
            .store
            .list_user_memberships(&user.id)?
            .iter()
            .filter(|(m, _)| m.project_role == OWNER)
            .count();

        Ok(QuotaUsage {
            owned_projects,
            max_projects: self.access.tables().quota(&user.global_role).max_projects,
        })
    }
}

fn summarize(project: Project, role: String) -> ProjectSummary {
    ProjectSummary {
        id: project.id,
        name: project.name,
        role,
    }
}

/// True when `id` starts with `PUBLIC_` in any letter case.
fn has_public_prefix(id: &str) -> bool {
    id.get(..PUBLIC_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(PUBLIC_PREFIX))
}

fn quota_exceeded(global_role: &str, quota: Quota) -> Error {
    let max = quota.max_projects.unwrap_or_default();
    match global_role {
        GUEST => Error::forbidden("Guests cannot create projects."),
        USER => Error::forbidden(format!(
            "Free plan limit reached ({max} Project). Upgrade to Nitro."
        )),
        _ => Error::forbidden(format!("Project limit reached ({max}).")),
    }
}
