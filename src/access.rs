//! Access evaluation: combines a user's global role with their project
//! membership into an effective level and decides each action.

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::types::{
    ADMIN, MAX_LEVEL, MODERATOR, OWNER, PUBLIC_CREATOR_RANK, ProjectMember, Rank, RoleTables,
    STAFF_RANK, SUPER_ADMIN, User, VIEWER, is_public_id,
};

/// What the actor is trying to do on a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Read project data such as the member list.
    Read,
    /// Join a `PUBLIC_` project as a viewer without an invitation.
    SelfJoin,
    /// Invite, change roles, or kick.
    Moderate,
}

/// Where an actor's level on a project comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Staff,
    Member,
    /// Implicit viewer access to a `PUBLIC_` project.
    Public,
}

/// Resolved level of one actor on one project.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    pub level: Rank,
    pub source: Source,
}

impl Standing {
    pub fn is_staff(self) -> bool {
        self.source == Source::Staff
    }
}

#[derive(Debug, Clone)]
pub struct AccessEvaluator {
    tables: Arc<RoleTables>,
}

impl AccessEvaluator {
    pub fn new(tables: Arc<RoleTables>) -> Self {
        Self { tables }
    }

    pub fn tables(&self) -> &RoleTables {
        &self.tables
    }

    pub fn global_rank(&self, user: &User) -> Rank {
        self.tables.global_rank(&user.global_role)
    }

    pub fn is_staff(&self, user: &User) -> bool {
        self.global_rank(user) >= STAFF_RANK
    }

    /// Effective level for read and self-join actions, `None` when the user has no access.
    ///
    /// `membership` must be the user's own row for `project_id`, if any.
    pub fn effective_level(
        &self,
        user: &User,
        project_id: &str,
        membership: Option<&ProjectMember>,
    ) -> Option<Rank> {
        if self.is_staff(user) {
            return Some(MAX_LEVEL);
        }
        match membership {
            Some(m) => Some(self.tables.project_rank(&m.project_role)),
            None if is_public_id(project_id) => Some(self.tables.project_rank(VIEWER)),
            None => None,
        }
    }

    /// Resolves the actor's standing for `action`, or the reason it is denied.
    pub fn standing(
        &self,
        user: &User,
        project_id: &str,
        membership: Option<&ProjectMember>,
        action: Action,
    ) -> Result<Standing> {
        let Some(level) = self.effective_level(user, project_id, membership) else {
            return Err(Error::forbidden("You are not a member of this project"));
        };

        let source = if self.is_staff(user) {
            Source::Staff
        } else if membership.is_some() {
            Source::Member
        } else {
            Source::Public
        };

        match (source, action) {
            (Source::Staff, _) => {}
            (Source::Public, Action::Moderate) => {
                return Err(Error::forbidden("You are not a member of this project"));
            }
            (_, Action::Moderate) if level < self.tables.project_rank(MODERATOR) => {
                return Err(Error::forbidden("Moderator rights required"));
            }
            (_, Action::Read) if level < self.tables.project_rank(VIEWER) => {
                return Err(Error::forbidden("Viewer access required"));
            }
            _ => {}
        }

        Ok(Standing { level, source })
    }

    /// Checks that `standing` may hand out `role`.
    ///
    /// Members may only assign roles ranked strictly below their own; implicit
    /// public access only ever yields a viewer self-join.
    pub fn authorize_role_grant(&self, standing: Standing, role: &str) -> Result<()> {
        match standing.source {
            Source::Staff => Ok(()),
            Source::Public if role == VIEWER => Ok(()),
            Source::Public => Err(Error::forbidden(format!(
                "Cannot assign role '{role}' without membership"
            ))),
            Source::Member if self.tables.project_rank(role) >= standing.level => Err(
                Error::forbidden(format!("Cannot assign role '{role}' equal/higher than yours")),
            ),
            Source::Member => Ok(()),
        }
    }

    /// Checks that `standing` may overwrite the role of an existing member.
    pub fn authorize_overwrite(&self, standing: Standing, existing: &ProjectMember) -> Result<()> {
        if standing.is_staff() {
            return Ok(());
        }
        if self.tables.project_rank(&existing.project_role) >= standing.level {
            return Err(Error::forbidden(
                "Cannot modify a member with equal/higher rank",
            ));
        }
        Ok(())
    }

    /// Checks that `actor` holding `standing` may remove `target` from the project.
    pub fn authorize_kick(
        &self,
        actor: &User,
        standing: Standing,
        target: &User,
        target_membership: &ProjectMember,
    ) -> Result<()> {
        if target.global_role == SUPER_ADMIN && actor.global_role != SUPER_ADMIN {
            return Err(Error::forbidden("Cannot kick a Super Admin"));
        }
        if self.tables.project_rank(&target_membership.project_role) >= standing.level {
            return Err(Error::forbidden("Cannot kick this member"));
        }
        Ok(())
    }

    /// Project deletion is reserved to global admins and the project's owner.
    pub fn authorize_delete(&self, user: &User, membership: Option<&ProjectMember>) -> Result<()> {
        let is_admin = self.global_rank(user) >= self.tables.global_rank(ADMIN);
        let is_owner = membership.is_some_and(|m| m.project_role == OWNER);
        if !(is_admin || is_owner) {
            return Err(Error::forbidden(
                "Insufficient permissions to delete this project",
            ));
        }
        Ok(())
    }

    pub fn authorize_public_creation(&self, user: &User) -> Result<()> {
        if self.global_rank(user) < PUBLIC_CREATOR_RANK {
            return Err(Error::forbidden(
                "Only Admins can create PUBLIC_ channels.",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn evaluator() -> AccessEvaluator {
        AccessEvaluator::new(Arc::new(RoleTables::default()))
    }

    fn user(global_role: &str) -> User {
        let now = Utc::now();
        User {
            id: format!("id-{global_role}"),
            uid: format!("uid-{global_role}"),
            email: format!("{global_role}@example.com"),
            username: global_role.to_string(),
            global_role: global_role.to_string(),
            banned: false,
            created_at: now,
            updated_at: now,
        }
    }

    fn member(project_id: &str, user: &User, role: &str) -> ProjectMember {
        let now = Utc::now();
        ProjectMember {
            project_id: project_id.to_string(),
            user_id: user.id.clone(),
            project_role: role.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_staff_gets_max_level_everywhere() {
        let eval = evaluator();
        for role in ["moderator", "admin", "super_admin"] {
            let u = user(role);
            assert_eq!(eval.effective_level(&u, "abc_private", None), Some(MAX_LEVEL));
        }
    }

    #[test]
    fn test_non_member_private_has_no_level() {
        let eval = evaluator();
        assert_eq!(eval.effective_level(&user("user"), "abc_private", None), None);
    }

    #[test]
    fn test_non_member_public_is_viewer() {
        let eval = evaluator();
        assert_eq!(eval.effective_level(&user("user"), "PUBLIC_News", None), Some(10));
    }

    #[test]
    fn test_member_level_is_project_rank() {
        let eval = evaluator();
        let u = user("user");
        let m = member("abc_app", &u, "moderator");
        assert_eq!(eval.effective_level(&u, "abc_app", Some(&m)), Some(50));
    }

    #[test]
    fn test_effective_level_monotonic_in_global_rank() {
        let eval = evaluator();
        let tables = RoleTables::default();
        let mut globals: Vec<_> = tables.global.iter().collect();
        globals.sort_by_key(|(_, rank)| **rank);

        for project_role in [None, Some("viewer"), Some("moderator"), Some("owner")] {
            for project_id in ["PUBLIC_Forum", "abc_app"] {
                let mut previous = None;
                for (role, _) in &globals {
                    let u = user(role);
                    let m = project_role.map(|r| member(project_id, &u, r));
                    let level = eval.effective_level(&u, project_id, m.as_ref());
                    assert!(level >= previous, "{role} lowered level on {project_id}");
                    previous = level;
                }
            }
        }
    }

    #[test]
    fn test_standing_level_matches_effective_level() {
        let eval = evaluator();
        for global in ["guest", "user", "nitro", "moderator", "admin", "super_admin"] {
            let u = user(global);
            for project_role in [None, Some("viewer"), Some("editor"), Some("owner")] {
                for project_id in ["PUBLIC_Forum", "abc_app"] {
                    let m = project_role.map(|r| member(project_id, &u, r));
                    let level = eval.effective_level(&u, project_id, m.as_ref());
                    for action in [Action::Read, Action::SelfJoin, Action::Moderate] {
                        if let Ok(standing) = eval.standing(&u, project_id, m.as_ref(), action) {
                            assert_eq!(Some(standing.level), level, "{global} on {project_id}");
                        }
                    }
                    let read = eval.standing(&u, project_id, m.as_ref(), Action::Read);
                    assert_eq!(read.is_ok(), level.is_some(), "{global} reading {project_id}");
                }
            }
        }
    }

    #[test]
    fn test_moderate_requires_membership() {
        let eval = evaluator();
        let err = eval
            .standing(&user("user"), "PUBLIC_News", None, Action::Moderate)
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(ref r) if r.contains("not a member")));
    }

    #[test]
    fn test_moderate_requires_moderator_rank() {
        let eval = evaluator();
        let u = user("user");
        let m = member("abc_app", &u, "editor");
        let err = eval
            .standing(&u, "abc_app", Some(&m), Action::Moderate)
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(ref r) if r == "Moderator rights required"));
    }

    #[test]
    fn test_read_private_as_non_member_denied() {
        let eval = evaluator();
        assert!(
            eval.standing(&user("nitro"), "abc_app", None, Action::Read)
                .is_err()
        );
    }

    #[test]
    fn test_self_join_public_only() {
        let eval = evaluator();
        let u = user("user");
        let standing = eval
            .standing(&u, "PUBLIC_News", None, Action::SelfJoin)
            .unwrap();
        assert_eq!(standing.source, Source::Public);
        eval.authorize_role_grant(standing, "viewer").unwrap();
        assert!(eval.authorize_role_grant(standing, "moderator").is_err());
        assert!(
            eval.standing(&u, "abc_app", None, Action::SelfJoin)
                .is_err()
        );
    }

    #[test]
    fn test_owner_cannot_grant_owner() {
        let eval = evaluator();
        let u = user("user");
        let m = member("abc_app", &u, "owner");
        let standing = eval
            .standing(&u, "abc_app", Some(&m), Action::Moderate)
            .unwrap();
        let err = eval.authorize_role_grant(standing, "owner").unwrap_err();
        assert!(matches!(err, Error::Forbidden(ref r) if r.contains("equal/higher")));
        eval.authorize_role_grant(standing, "moderator").unwrap();
    }

    #[test]
    fn test_staff_may_grant_anything() {
        let eval = evaluator();
        let standing = eval
            .standing(&user("admin"), "abc_app", None, Action::Moderate)
            .unwrap();
        eval.authorize_role_grant(standing, "owner").unwrap();
    }

    #[test]
    fn test_overwrite_protects_equal_rank() {
        let eval = evaluator();
        let actor = user("user");
        let actor_m = member("abc_app", &actor, "moderator");
        let standing = eval
            .standing(&actor, "abc_app", Some(&actor_m), Action::Moderate)
            .unwrap();

        let peer = user("nitro");
        let peer_m = member("abc_app", &peer, "moderator");
        assert!(eval.authorize_overwrite(standing, &peer_m).is_err());

        let viewer_m = member("abc_app", &peer, "viewer");
        eval.authorize_overwrite(standing, &viewer_m).unwrap();
    }

    #[test]
    fn test_kick_super_admin_needs_super_admin() {
        let eval = evaluator();
        let target = user("super_admin");
        let target_m = member("abc_app", &target, "viewer");

        let admin = user("admin");
        let standing = eval
            .standing(&admin, "abc_app", None, Action::Moderate)
            .unwrap();
        let err = eval
            .authorize_kick(&admin, standing, &target, &target_m)
            .unwrap_err();
        assert!(matches!(err, Error::Forbidden(ref r) if r.contains("Super Admin")));

        let root = user("super_admin");
        let standing = eval
            .standing(&root, "abc_app", None, Action::Moderate)
            .unwrap();
        eval.authorize_kick(&root, standing, &target, &target_m)
            .unwrap();
    }

    #[test]
    fn test_kick_requires_strictly_lower_rank() {
        let eval = evaluator();
        let actor = user("user");
        let actor_m = member("abc_app", &actor, "moderator");
        let standing = eval
            .standing(&actor, "abc_app", Some(&actor_m), Action::Moderate)
            .unwrap();

        let target = user("nitro");
        let peer = member("abc_app", &target, "moderator");
        assert!(eval.authorize_kick(&actor, standing, &target, &peer).is_err());

        let viewer = member("abc_app", &target, "viewer");
        eval.authorize_kick(&actor, standing, &target, &viewer)
            .unwrap();
    }

    #[test]
    fn test_delete_rules() {
        let eval = evaluator();
        let u = user("user");
        assert!(eval.authorize_delete(&u, None).is_err());
        assert!(
            eval.authorize_delete(&u, Some(&member("abc_app", &u, "moderator")))
                .is_err()
        );
        eval.authorize_delete(&u, Some(&member("abc_app", &u, "owner")))
            .unwrap();
        eval.authorize_delete(&user("admin"), None).unwrap();
        // global moderators are staff for visibility but not for deletion
        assert!(eval.authorize_delete(&user("moderator"), None).is_err());
    }

    #[test]
    fn test_public_creation_rank() {
        let eval = evaluator();
        eval.authorize_public_creation(&user("admin")).unwrap();
        assert!(eval.authorize_public_creation(&user("nitro")).is_err());
    }
}
