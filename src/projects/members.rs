use chrono::Utc;
use serde::{Deserialize, Serialize};

use super::{ProjectManager, Status};
use crate::access::{Action, Source, Standing};
use crate::error::{Error, Result};
use crate::types::{ProjectMember, User, VIEWER, is_public_id};

fn default_role() -> String {
    VIEWER.to_string()
}

/// Invitation or role change. The target is looked up by `user_id` (external
/// UID) when present, otherwise by `email`.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberInvite {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default = "default_role")]
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipChange {
    pub status: Status,
    pub uid: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberSummary {
    pub uid: String,
    pub email: String,
    pub username: String,
    pub role: String,
    pub global_role: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KickedMember {
    pub status: Status,
    pub uid: String,
}

impl MemberInvite {
    /// True when the invite can only name the caller.
    fn targets(&self, user: &User) -> bool {
        match (&self.user_id, &self.email) {
            (Some(uid), _) => *uid == user.uid,
            (None, Some(email)) => *email == user.email,
            (None, None) => true,
        }
    }
}

impl ProjectManager {
    /// Adds `invite`'s target to the project or changes their role in place.
    pub fn invite_or_update_member(
        &self,
        user: &User,
        project_id: &str,
        invite: &MemberInvite,
    ) -> Result<MembershipChange> {
        if !self.access.tables().is_project_role(&invite.role) {
            return Err(Error::validation(format!(
                "Unknown project role '{}'",
                invite.role
            )));
        }

        let membership = self.store.get_member(project_id, &user.id)?;
        let action = if membership.is_none()
            && is_public_id(project_id)
            && invite.role == VIEWER
            && invite.targets(user)
        {
            Action::SelfJoin
        } else {
            Action::Moderate
        };

        let standing = self
            .access
            .standing(user, project_id, membership.as_ref(), action)?;
        self.access.authorize_role_grant(standing, &invite.role)?;

        let project = self
            .store
            .get_project(project_id)?
            .ok_or_else(|| Error::not_found("Project not found"))?;

        let target = self.resolve_target(user, invite, action)?;

        if let Some(existing) = self.store.get_member(&project.id, &target.id)? {
            return self.overwrite_role(standing, &existing, &target, &invite.role);
        }

        let now = Utc::now();
        let member = ProjectMember {
            project_id: project.id.clone(),
            user_id: target.id.clone(),
            project_role: invite.role.clone(),
            created_at: now,
            updated_at: now,
        };

        match self.store.create_member(&member) {
            Ok(()) => {}
            Err(Error::Conflict(_)) => {
                // lost an insert race; the row now exists, so treat this as an update
                let existing = self
                    .store
                    .get_member(&project.id, &target.id)?
                    .ok_or_else(|| Error::conflict("Membership changed concurrently"))?;
                return self.overwrite_role(standing, &existing, &target, &invite.role);
            }
            Err(e) => return Err(e),
        }

        tracing::info!(
            "Added {} to project {} as {} by {}",
            target.uid,
            project.id,
            invite.role,
            user.uid
        );

        Ok(MembershipChange {
            status: Status::Added,
            uid: target.uid,
            role: invite.role.clone(),
        })
    }

    /// Members of `project_id` with their identity fields.
    ///
    /// `PUBLIC_` projects are readable by anyone; other projects need viewer level.
    pub fn list_project_members(&self, user: &User, project_id: &str) -> Result<Vec<MemberSummary>> {
        if !is_public_id(project_id) && !self.access.is_staff(user) {
            let membership = self.store.get_member(project_id, &user.id)?;
            self.access
                .standing(user, project_id, membership.as_ref(), Action::Read)?;
        }

        let members = self
            .store
            .list_project_members(project_id)?
            .into_iter()
            .map(|(m, u)| MemberSummary {
                uid: u.uid,
                email: u.email,
                username: u.username,
                role: m.project_role,
                global_role: u.global_role,
            })
            .collect();

        Ok(members)
    }

    /// Removes the member with external UID `target_uid` from the project.
    pub fn kick_member(
        &self,
        user: &User,
        project_id: &str,
        target_uid: &str,
    ) -> Result<KickedMember> {
        let membership = self.store.get_member(project_id, &user.id)?;
        let standing =
            self.access
                .standing(user, project_id, membership.as_ref(), Action::Moderate)?;

        let target = self
            .store
            .get_user_by_uid(target_uid)?
            .ok_or_else(|| Error::not_found("User not found"))?;
        let target_membership = self
            .store
            .get_member(project_id, &target.id)?
            .ok_or_else(|| Error::not_found("Member not found"))?;

        self.access
            .authorize_kick(user, standing, &target, &target_membership)?;

        if !self.store.delete_member(project_id, &target.id)? {
            return Err(Error::not_found("Member not found"));
        }

        tracing::info!(
            "Kicked {} from project {} by {}",
            target.uid,
            project_id,
            user.uid
        );

        Ok(KickedMember {
            status: Status::Kicked,
            uid: target.uid,
        })
    }

    fn resolve_target(&self, user: &User, invite: &MemberInvite, action: Action) -> Result<User> {
        let target = match (&invite.user_id, &invite.email) {
            (Some(uid), _) => self.store.get_user_by_uid(uid)?,
            (None, Some(email)) => self.store.get_user_by_email(email)?,
            (None, None) if action == Action::SelfJoin => Some(user.clone()),
            (None, None) => {
                return Err(Error::validation("Either user_id or email is required"));
            }
        };
        target.ok_or_else(|| Error::not_found("User not found"))
    }

    fn overwrite_role(
        &self,
        standing: Standing,
        existing: &ProjectMember,
        target: &User,
        role: &str,
    ) -> Result<MembershipChange> {
        // implicit public access never rewrites an existing row
        if standing.source == Source::Public {
            return Err(Error::conflict("Already a member of this project"));
        }
        self.access.authorize_overwrite(standing, existing)?;

        self.store
            .update_member_role(&existing.project_id, &existing.user_id, role)?;

        tracing::info!(
            "Changed role of {} in project {} from {} to {}",
            target.uid,
            existing.project_id,
            existing.project_role,
            role
        );

        Ok(MembershipChange {
            status: Status::Updated,
            uid: target.uid.clone(),
            role: role.to_string(),
        })
    }
}
