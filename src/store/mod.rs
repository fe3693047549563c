mod schema;
mod sqlite;

pub use sqlite::SqliteStore;

use crate::error::Result;
use crate::types::*;

/// Store defines the database interface.
///
/// Implementations must enforce uniqueness of project ids and of
/// (project_id, user_id) memberships, reporting violations as
/// [`Error::Conflict`](crate::error::Error::Conflict), and must delete a
/// project's memberships together with the project.
pub trait Store: Send + Sync {
    fn initialize(&self) -> Result<()>;

    // User operations
    fn create_user(&self, user: &User) -> Result<()>;
    fn get_user(&self, id: &str) -> Result<Option<User>>;
    fn get_user_by_uid(&self, uid: &str) -> Result<Option<User>>;
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;
    /// All users ordered by external UID.
    fn list_users(&self) -> Result<Vec<User>>;
    fn update_user(&self, user: &User) -> Result<()>;

    // Project operations
    /// Inserts the project and its owner membership atomically.
    fn create_project(&self, project: &Project, owner: &ProjectMember) -> Result<()>;
    fn get_project(&self, id: &str) -> Result<Option<Project>>;
    fn list_projects(&self) -> Result<Vec<Project>>;
    /// Projects whose id starts with `prefix`, compared case-sensitively.
    fn list_projects_with_prefix(&self, prefix: &str) -> Result<Vec<Project>>;
    fn delete_project(&self, id: &str) -> Result<bool>;

    // Membership operations
    fn create_member(&self, member: &ProjectMember) -> Result<()>;
    fn get_member(&self, project_id: &str, user_id: &str) -> Result<Option<ProjectMember>>;
    fn update_member_role(&self, project_id: &str, user_id: &str, role: &str) -> Result<()>;
    fn delete_member(&self, project_id: &str, user_id: &str) -> Result<bool>;
    fn list_user_memberships(&self, user_id: &str) -> Result<Vec<(ProjectMember, Project)>>;
    fn list_project_members(&self, project_id: &str) -> Result<Vec<(ProjectMember, User)>>;

    // Token operations
    fn create_token(&self, token: &Token) -> Result<()>;
    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>>;
    fn update_token_last_used(&self, id: &str) -> Result<()>;
    fn has_admin_token(&self) -> Result<bool>;
}
