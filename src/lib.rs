//! # Tenantry
//!
//! A permission and quota layer for multi-tenant project hosting, usable both
//! as a standalone server and as a library.
//!
//! Users carry a global role; projects live under a namespace (`PUBLIC_` for
//! forum-style projects, `<uid>_` for private ones) and grant per-project
//! roles to their members. [`access::AccessEvaluator`] merges the two into an
//! effective level and [`projects::ProjectManager`] enforces it for every
//! lifecycle operation.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! tenantry = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use std::path::PathBuf;
//! use tenantry::server::{AppState, create_router};
//! use tenantry::storage::FsStorage;
//! use tenantry::store::{SqliteStore, Store};
//! use tenantry::types::RoleTables;
//!
//! let store = SqliteStore::new(&PathBuf::from("./data/tenantry.db")).unwrap();
//! store.initialize().unwrap();
//!
//! let state = Arc::new(AppState::new(
//!     Arc::new(store),
//!     Arc::new(FsStorage::new("./data/storage")),
//!     Arc::new(RoleTables::default()),
//! ));
//! let router = create_router(state);
//! // Serve with axum...
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Builds the `tenantry` binary. Disable with `default-features = false`.

pub mod access;
pub mod auth;
pub mod config;
pub mod error;
pub mod projects;
pub mod server;
pub mod storage;
pub mod store;
pub mod types;
