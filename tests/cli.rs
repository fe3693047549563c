//! CLI integration tests for tenantry admin commands.
//!
//! Each test uses an isolated temp directory for the database, ensuring tests
//! can run in parallel safely.

#![allow(deprecated)] // Command::cargo_bin deprecation only affects custom build dirs

use std::path::Path;

use assert_cmd::Command;
use assert_fs::TempDir;
use assert_fs::prelude::*;
use predicates::prelude::*;
use tenantry::store::{SqliteStore, Store};

struct TestContext {
    temp_dir: TempDir,
}

impl TestContext {
    fn new() -> Self {
        Self {
            temp_dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    fn data_dir_str(&self) -> String {
        self.data_dir().to_string_lossy().to_string()
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("tenantry").expect("failed to find binary");
        cmd.env("NO_COLOR", "1");
        cmd
    }

    fn init(&self) -> assert_cmd::assert::Assert {
        self.cmd()
            .args(["admin", "init", "--data-dir", &self.data_dir_str()])
            .assert()
    }

    fn add_user(&self, uid: &str, role: &str) -> assert_cmd::assert::Assert {
        self.cmd()
            .args([
                "admin",
                "user",
                "add",
                "--uid",
                uid,
                "--email",
                &format!("{uid}@example.com"),
                "--username",
                uid,
                "--role",
                role,
                "--data-dir",
                &self.data_dir_str(),
            ])
            .assert()
    }

    fn store(&self) -> SqliteStore {
        SqliteStore::new(self.data_dir().join("tenantry.db")).expect("failed to open store")
    }
}

#[test]
fn test_init_writes_admin_token() {
    let ctx = TestContext::new();

    ctx.init()
        .success()
        .stdout(predicate::str::contains("Admin token"))
        .stdout(predicate::str::contains("tny_"));

    ctx.temp_dir
        .child(".admin_token")
        .assert(predicate::str::starts_with("tny_"));
    ctx.temp_dir.child("tenantry.db").assert(predicate::path::exists());

    assert!(ctx.store().has_admin_token().unwrap());
}

#[cfg(unix)]
#[test]
fn test_init_restricts_token_file() {
    use std::os::unix::fs::PermissionsExt;

    let ctx = TestContext::new();
    ctx.init().success();

    let mode = std::fs::metadata(ctx.data_dir().join(".admin_token"))
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o777, 0o600);
}

#[test]
fn test_init_twice_fails() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.init()
        .failure()
        .stderr(predicate::str::contains("already initialized"));
}

#[test]
fn test_user_add_prints_token() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.add_user("alice", "nitro")
        .success()
        .stdout(predicate::str::contains("Created user 'alice' (nitro)"))
        .stdout(predicate::str::contains("tny_"));

    let user = ctx.store().get_user_by_uid("alice").unwrap().unwrap();
    assert_eq!(user.email, "alice@example.com");
    assert_eq!(user.global_role, "nitro");
}

#[test]
fn test_user_add_requires_init() {
    let ctx = TestContext::new();

    ctx.add_user("alice", "user")
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}

#[test]
fn test_user_add_rejects_unknown_role() {
    let ctx = TestContext::new();
    ctx.init().success();

    ctx.add_user("alice", "pirate")
        .failure()
        .stderr(predicate::str::contains("Unknown global role"));
}

#[test]
fn test_user_add_duplicate_fails() {
    let ctx = TestContext::new();
    ctx.init().success();
    ctx.add_user("alice", "user").success();

    ctx.add_user("alice", "user")
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_serve_requires_init() {
    let ctx = TestContext::new();

    ctx.cmd()
        .args(["serve", "--data-dir", &ctx.data_dir_str()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not initialized"));
}
