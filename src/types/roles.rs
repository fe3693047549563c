use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Numeric privilege rank; higher is more privileged, unknown roles rank 0.
pub type Rank = u32;

/// Level granted to global staff on every project.
pub const MAX_LEVEL: Rank = 100;
/// Global rank from which a user counts as platform staff.
pub const STAFF_RANK: Rank = 60;
/// Global rank required to open a `PUBLIC_` project.
pub const PUBLIC_CREATOR_RANK: Rank = 80;

pub const GUEST: &str = "guest";
pub const USER: &str = "user";
pub const ADMIN: &str = "admin";
pub const SUPER_ADMIN: &str = "super_admin";

pub const VIEWER: &str = "viewer";
pub const MODERATOR: &str = "moderator";
pub const OWNER: &str = "owner";

/// Resource limits attached to a global role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Quota {
    /// `None` = unlimited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_projects: Option<u32>,
}

impl Quota {
    pub const UNLIMITED: Quota = Quota { max_projects: None };

    #[must_use]
    pub const fn limited(max_projects: u32) -> Self {
        Self {
            max_projects: Some(max_projects),
        }
    }

    /// Returns true if a user already owning `owned` projects may not create another.
    #[must_use]
    pub fn is_exhausted(self, owned: usize) -> bool {
        self.max_projects
            .is_some_and(|max| owned >= max as usize)
    }
}

/// Role and quota tables, injected wherever access decisions are made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleTables {
    pub global: BTreeMap<String, Rank>,
    pub project: BTreeMap<String, Rank>,
    #[serde(default)]
    pub quotas: BTreeMap<String, Quota>,
}

impl Default for RoleTables {
    fn default() -> Self {
        let global = [
            (GUEST, 0),
            (USER, 10),
            ("nitro", 40),
            ("moderator", 60),
            (ADMIN, 80),
            (SUPER_ADMIN, 100),
        ];
        let project = [(VIEWER, 10), ("editor", 20), (MODERATOR, 50), (OWNER, 100)];
        let quotas = [
            (GUEST, Quota::limited(0)),
            (USER, Quota::limited(1)),
            ("nitro", Quota::limited(10)),
            ("moderator", Quota::UNLIMITED),
            (ADMIN, Quota::UNLIMITED),
            (SUPER_ADMIN, Quota::UNLIMITED),
        ];

        Self {
            global: global.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            project: project.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            quotas: quotas.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }
}

impl RoleTables {
    /// Parses tables from TOML with `[global]`, `[project]` and `[quotas.<role>]` sections.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let tables: RoleTables =
            toml::from_str(s).map_err(|e| Error::Config(format!("invalid role tables: {e}")))?;
        tables.validate()?;
        Ok(tables)
    }

    /// Checks that the roles the access rules refer to by name are present.
    pub fn validate(&self) -> Result<()> {
        for role in [VIEWER, MODERATOR, OWNER] {
            if !self.project.contains_key(role) {
                return Err(Error::Config(format!(
                    "project role table is missing '{role}'"
                )));
            }
        }
        if !self.global.contains_key(ADMIN) {
            return Err(Error::Config(format!(
                "global role table is missing '{ADMIN}'"
            )));
        }
        Ok(())
    }

    pub fn global_rank(&self, role: &str) -> Rank {
        self.global.get(role).copied().unwrap_or(0)
    }

    pub fn project_rank(&self, role: &str) -> Rank {
        self.project.get(role).copied().unwrap_or(0)
    }

    pub fn is_project_role(&self, role: &str) -> bool {
        self.project.contains_key(role)
    }

    /// Quota for a global role, falling back to the guest tier for unknown roles.
    pub fn quota(&self, global_role: &str) -> Quota {
        self.quotas
            .get(global_role)
            .or_else(|| self.quotas.get(GUEST))
            .copied()
            .unwrap_or(Quota::limited(0))
    }
}
