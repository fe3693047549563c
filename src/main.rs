use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::bail;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use tenantry::auth::issue_token;
use tenantry::config::ServerConfig;
use tenantry::server::validation::validate_new_user;
use tenantry::server::{AppState, create_router};
use tenantry::storage::FsStorage;
use tenantry::store::{SqliteStore, Store};
use tenantry::types::{USER, User};

#[cfg(unix)]
fn set_restrictive_permissions(path: &std::path::Path) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(e) = fs::set_permissions(path, fs::Permissions::from_mode(0o600)) {
        tracing::warn!("Failed to set permissions on {}: {e}", path.display());
    }
}

#[derive(Parser)]
#[command(name = "tenantry")]
#[command(about = "Permission and quota layer for multi-tenant project hosting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(long, short, default_value = "8080")]
        port: u16,

        /// Data directory for the database and admin token
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// Root directory for project storage [default: <data-dir>/storage]
        #[arg(long)]
        storage_dir: Option<PathBuf>,

        /// TOML file overriding the built-in role and quota tables
        #[arg(long)]
        roles_file: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// Initialize the server (create database and admin token)
    Init {
        /// Data directory for the database and admin token
        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,
    },

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommands,
    },
}

#[derive(Subcommand)]
enum UserCommands {
    /// Provision a user and print a token for them
    Add {
        /// External identity-provider id
        #[arg(long)]
        uid: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        username: String,

        /// Global role
        #[arg(long, default_value = USER)]
        role: String,

        #[arg(long, default_value = "./data")]
        data_dir: PathBuf,

        /// TOML file overriding the built-in role and quota tables
        #[arg(long)]
        roles_file: Option<PathBuf>,
    },
}

fn open_initialized_store(config: &ServerConfig) -> anyhow::Result<SqliteStore> {
    let not_initialized =
        "Server not initialized. Run 'tenantry admin init' first to create the database and admin token.";

    if !config.db_path().exists() {
        bail!(not_initialized);
    }

    let store = SqliteStore::new(config.db_path())?;
    if !store.has_admin_token()? {
        bail!(not_initialized);
    }
    Ok(store)
}

fn run_init(data_dir: PathBuf) -> anyhow::Result<()> {
    let config = ServerConfig {
        data_dir,
        ..ServerConfig::default()
    };
    fs::create_dir_all(&config.data_dir)?;

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;

    let token_file = config.admin_token_path();

    if store.has_admin_token()? {
        bail!(
            "Server already initialized. Admin token exists at: {}",
            token_file.display()
        );
    }

    let (_token, raw_token) = issue_token(&store, None, None)?;
    fs::write(&token_file, &raw_token)?;

    #[cfg(unix)]
    set_restrictive_permissions(&token_file);

    println!();
    println!("========================================");
    println!("Admin token (save this, it won't be shown again):");
    println!();
    println!("  {raw_token}");
    println!();
    println!("Token also written to: {}", token_file.display());
    println!("========================================");
    println!();

    Ok(())
}

fn run_user_add(
    config: &ServerConfig,
    uid: String,
    email: String,
    username: String,
    role: String,
) -> anyhow::Result<()> {
    let tables = config.load_role_tables()?;
    validate_new_user(&tables, &uid, &email, &username, &role)?;

    let store = open_initialized_store(config)?;

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4().to_string(),
        uid,
        email,
        username,
        global_role: role,
        banned: false,
        created_at: now,
        updated_at: now,
    };
    store.create_user(&user)?;

    let (_token, raw_token) = issue_token(&store, Some(user.id.clone()), None)?;

    println!();
    println!("========================================");
    println!(
        "Created user '{}' ({}) with token:",
        user.uid, user.global_role
    );
    println!();
    println!("  {raw_token}");
    println!();
    println!("========================================");
    println!();

    Ok(())
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    let tables = config.load_role_tables()?;
    let store = open_initialized_store(&config)?;
    store.initialize()?;

    info!(
        "Admin token available at {}",
        config.admin_token_path().display()
    );

    let storage_dir = config.storage_dir();
    fs::create_dir_all(&storage_dir)?;
    info!("Project storage at {}", storage_dir.display());

    let state = Arc::new(AppState::new(
        Arc::new(store),
        Arc::new(FsStorage::new(storage_dir)),
        Arc::new(tables),
    ));

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("tenantry=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init { data_dir } => run_init(data_dir)?,
            AdminCommands::User {
                command:
                    UserCommands::Add {
                        uid,
                        email,
                        username,
                        role,
                        data_dir,
                        roles_file,
                    },
            } => {
                let config = ServerConfig {
                    data_dir,
                    roles_file,
                    ..ServerConfig::default()
                };
                run_user_add(&config, uid, email, username, role)?;
            }
        },
        Commands::Serve {
            host,
            port,
            data_dir,
            storage_dir,
            roles_file,
        } => {
            run_serve(ServerConfig {
                host,
                port,
                data_dir,
                storage_dir,
                roles_file,
            })
            .await?;
        }
    }

    Ok(())
}
