use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};

use super::Store;
use super::schema::SCHEMA;
use crate::error::{Error, Result};
use crate::types::*;

const USER_COLUMNS: &str =
    "id, uid, email, username, global_role, banned, created_at, updated_at";
const PROJECT_COLUMNS: &str = "id, name, storage_path, owner_id, created_at";
const MEMBER_COLUMNS: &str = "project_id, user_id, project_role, created_at, updated_at";
const TOKEN_COLUMNS: &str =
    "id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at, last_used_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path)?;

        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens a private in-memory database, mainly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .or_else(|_| {
            // Handle SQLite's default datetime format: "YYYY-MM-DD HH:MM:SS"
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
        })
        .unwrap_or_else(|e| {
            tracing::error!("Invalid datetime in database: '{}' - {}", s, e);
            Utc::now()
        })
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

fn user_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(offset)?,
        uid: row.get(offset + 1)?,
        email: row.get(offset + 2)?,
        username: row.get(offset + 3)?,
        global_role: row.get(offset + 4)?,
        banned: row.get(offset + 5)?,
        created_at: parse_datetime(&row.get::<_, String>(offset + 6)?),
        updated_at: parse_datetime(&row.get::<_, String>(offset + 7)?),
    })
}

fn project_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        storage_path: row.get(offset + 2)?,
        owner_id: row.get(offset + 3)?,
        created_at: parse_datetime(&row.get::<_, String>(offset + 4)?),
    })
}

fn member_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<ProjectMember> {
    Ok(ProjectMember {
        project_id: row.get(offset)?,
        user_id: row.get(offset + 1)?,
        project_role: row.get(offset + 2)?,
        created_at: parse_datetime(&row.get::<_, String>(offset + 3)?),
        updated_at: parse_datetime(&row.get::<_, String>(offset + 4)?),
    })
}

fn token_from_row(row: &Row<'_>) -> rusqlite::Result<Token> {
    Ok(Token {
        id: row.get(0)?,
        token_hash: row.get(1)?,
        token_lookup: row.get(2)?,
        is_admin: row.get(3)?,
        user_id: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        expires_at: row.get::<_, Option<String>>(6)?.map(|s| parse_datetime(&s)),
        last_used_at: row.get::<_, Option<String>>(7)?.map(|s| parse_datetime(&s)),
    })
}

fn insert_member(conn: &Connection, member: &ProjectMember) -> rusqlite::Result<usize> {
    conn.execute(
        "INSERT INTO project_members (project_id, user_id, project_role, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            member.project_id,
            member.user_id,
            member.project_role,
            format_datetime(&member.created_at),
            format_datetime(&member.updated_at),
        ],
    )
}

impl SqliteStore {
    fn query_user(&self, column: &str, value: &str) -> Result<Option<User>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1"),
            params![value],
            |row| user_from_row(row, 0),
        )
        .optional()
        .map_err(Error::from)
    }
}

impl Store for SqliteStore {
    fn initialize(&self) -> Result<()> {
        self.conn().execute_batch(SCHEMA)?;
        Ok(())
    }

    // User operations

    fn create_user(&self, user: &User) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO users (id, uid, email, username, global_role, banned, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id,
                user.uid,
                user.email,
                user.username,
                user.global_role,
                user.banned,
                format_datetime(&user.created_at),
                format_datetime(&user.updated_at),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::conflict(
                "A user with this uid or email already exists",
            )),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_user(&self, id: &str) -> Result<Option<User>> {
        self.query_user("id", id)
    }

    fn get_user_by_uid(&self, uid: &str) -> Result<Option<User>> {
        self.query_user("uid", uid)
    }

    fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.query_user("email", email)
    }

    fn list_users(&self) -> Result<Vec<User>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY uid"))?;

        let rows = stmt.query_map([], |row| user_from_row(row, 0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        let rows = self
            .conn()
            .execute(
                "UPDATE users SET email = ?1, username = ?2, global_role = ?3, banned = ?4,
                 updated_at = ?5 WHERE id = ?6",
                params![
                    user.email,
                    user.username,
                    user.global_role,
                    user.banned,
                    format_datetime(&user.updated_at),
                    user.id
                ],
            )
            .map_err(|e| {
                if is_constraint_violation(&e) {
                    Error::conflict("A user with this email already exists")
                } else {
                    Error::from(e)
                }
            })?;

        if rows == 0 {
            return Err(Error::not_found("User not found"));
        }
        Ok(())
    }

    // Project operations

    fn create_project(&self, project: &Project, owner: &ProjectMember) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn.transaction()?;

        let inserted = tx.execute(
            "INSERT INTO projects (id, name, storage_path, owner_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                project.id,
                project.name,
                project.storage_path,
                project.owner_id,
                format_datetime(&project.created_at),
            ],
        );
        match inserted {
            Ok(_) => {}
            Err(e) if is_constraint_violation(&e) => {
                return Err(Error::conflict(
                    "You already have a project with this name (or ID collision)",
                ));
            }
            Err(e) => return Err(Error::from(e)),
        }

        insert_member(&tx, owner)?;
        tx.commit()?;
        Ok(())
    }

    fn get_project(&self, id: &str) -> Result<Option<Project>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?1"),
            params![id],
            |row| project_from_row(row, 0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn list_projects(&self) -> Result<Vec<Project>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id"
        ))?;

        let rows = stmt.query_map([], |row| project_from_row(row, 0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_projects_with_prefix(&self, prefix: &str) -> Result<Vec<Project>> {
        // substr keeps the match case-sensitive and free of LIKE wildcards
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects
             WHERE substr(id, 1, length(?1)) = ?1 ORDER BY id"
        ))?;

        let rows = stmt.query_map(params![prefix], |row| project_from_row(row, 0))?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn delete_project(&self, id: &str) -> Result<bool> {
        let rows = self
            .conn()
            .execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        Ok(rows > 0)
    }

    // Membership operations

    fn create_member(&self, member: &ProjectMember) -> Result<()> {
        match insert_member(&self.conn(), member) {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => {
                Err(Error::conflict("Membership already exists"))
            }
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_member(&self, project_id: &str, user_id: &str) -> Result<Option<ProjectMember>> {
        let conn = self.conn();
        conn.query_row(
            &format!(
                "SELECT {MEMBER_COLUMNS} FROM project_members
                 WHERE project_id = ?1 AND user_id = ?2"
            ),
            params![project_id, user_id],
            |row| member_from_row(row, 0),
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_member_role(&self, project_id: &str, user_id: &str, role: &str) -> Result<()> {
        let rows = self.conn().execute(
            "UPDATE project_members SET project_role = ?1, updated_at = ?2
             WHERE project_id = ?3 AND user_id = ?4",
            params![role, format_datetime(&Utc::now()), project_id, user_id],
        )?;

        if rows == 0 {
            return Err(Error::not_found("Member not found"));
        }
        Ok(())
    }

    fn delete_member(&self, project_id: &str, user_id: &str) -> Result<bool> {
        let rows = self.conn().execute(
            "DELETE FROM project_members WHERE project_id = ?1 AND user_id = ?2",
            params![project_id, user_id],
        )?;
        Ok(rows > 0)
    }

    fn list_user_memberships(&self, user_id: &str) -> Result<Vec<(ProjectMember, Project)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT m.project_id, m.user_id, m.project_role, m.created_at, m.updated_at,
                    p.id, p.name, p.storage_path, p.owner_id, p.created_at
             FROM project_members m
             JOIN projects p ON p.id = m.project_id
             WHERE m.user_id = ?1
             ORDER BY p.id",
        )?;

        let rows = stmt.query_map(params![user_id], |row| {
            Ok((member_from_row(row, 0)?, project_from_row(row, 5)?))
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    fn list_project_members(&self, project_id: &str) -> Result<Vec<(ProjectMember, User)>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT m.project_id, m.user_id, m.project_role, m.created_at, m.updated_at,
                    u.id, u.uid, u.email, u.username, u.global_role, u.banned,
                    u.created_at, u.updated_at
             FROM project_members m
             JOIN users u ON u.id = m.user_id
             WHERE m.project_id = ?1
             ORDER BY m.created_at, u.uid",
        )?;

        let rows = stmt.query_map(params![project_id], |row| {
            Ok((member_from_row(row, 0)?, user_from_row(row, 5)?))
        })?;

        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(Error::from)
    }

    // Token operations

    fn create_token(&self, token: &Token) -> Result<()> {
        let result = self.conn().execute(
            "INSERT INTO tokens (id, token_hash, token_lookup, is_admin, user_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                token.id,
                token.token_hash,
                token.token_lookup,
                token.is_admin,
                token.user_id,
                format_datetime(&token.created_at),
                token.expires_at.as_ref().map(format_datetime),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_constraint_violation(&e) => Err(Error::TokenLookupCollision),
            Err(e) => Err(Error::from(e)),
        }
    }

    fn get_token_by_lookup(&self, lookup: &str) -> Result<Option<Token>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {TOKEN_COLUMNS} FROM tokens WHERE token_lookup = ?1"),
            params![lookup],
            token_from_row,
        )
        .optional()
        .map_err(Error::from)
    }

    fn update_token_last_used(&self, id: &str) -> Result<()> {
        self.conn().execute(
            "UPDATE tokens SET last_used_at = ?1 WHERE id = ?2",
            params![format_datetime(&Utc::now()), id],
        )?;
        Ok(())
    }

    fn has_admin_token(&self) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM tokens WHERE is_admin = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }
}
