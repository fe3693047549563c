use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::types::RoleTables;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Root for project directories. Defaults to `<data_dir>/storage`.
    pub storage_dir: Option<PathBuf>,
    /// TOML file replacing the built-in role and quota tables.
    pub roles_file: Option<PathBuf>,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> std::result::Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }

    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("tenantry.db")
    }

    #[must_use]
    pub fn admin_token_path(&self) -> PathBuf {
        self.data_dir.join(".admin_token")
    }

    #[must_use]
    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir
            .clone()
            .unwrap_or_else(|| self.data_dir.join("storage"))
    }

    /// Loads the role tables from `roles_file`, or the defaults when unset.
    pub fn load_role_tables(&self) -> Result<RoleTables> {
        let Some(path) = &self.roles_file else {
            return Ok(RoleTables::default());
        };

        let contents = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        RoleTables::from_toml_str(&contents)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_dir: PathBuf::from("./data"),
            storage_dir: None,
            roles_file: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_default_paths() {
        let config = ServerConfig::default();
        assert_eq!(config.db_path(), PathBuf::from("./data/tenantry.db"));
        assert_eq!(config.storage_dir(), PathBuf::from("./data/storage"));
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_load_role_tables_defaults_without_file() {
        let config = ServerConfig::default();
        assert_eq!(config.load_role_tables().unwrap(), RoleTables::default());
    }

    #[test]
    fn test_load_role_tables_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("roles.toml");
        fs::write(
            &path,
            "[global]\nadmin = 80\nuser = 10\n\n[project]\nviewer = 1\nmoderator = 5\nowner = 9\n",
        )
        .unwrap();

        let config = ServerConfig {
            roles_file: Some(path),
            ..ServerConfig::default()
        };
        let tables = config.load_role_tables().unwrap();
        assert_eq!(tables.project_rank("owner"), 9);
        assert!(tables.quotas.is_empty());
    }

    #[test]
    fn test_load_role_tables_missing_file() {
        let config = ServerConfig {
            roles_file: Some(PathBuf::from("/nonexistent/roles.toml")),
            ..ServerConfig::default()
        };
        assert!(matches!(config.load_role_tables(), Err(Error::Config(_))));
    }
}
