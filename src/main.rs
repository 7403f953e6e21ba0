//! Caseload service entry point

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use caseload::api::auth::hash_password;
use caseload::config::{Cli, Command, ServerConfig};
use caseload::models::Role;
use caseload::{build_router, db, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    info!("Caseload v{} starting", env!("CARGO_PKG_VERSION"));

    let cli = Cli::parse();
    let config = ServerConfig::resolve(&cli);

    let pool = db::init_database(&config.database_path())
        .await
        .context("database initialization failed")?;

    if let Some(Command::CreateAdmin {
        username,
        email,
        password,
    }) = cli.command
    {
        let user = db::users::insert(&pool, &username, &email, &hash_password(&password), Role::Admin)
            .await
            .context("admin creation failed")?;
        info!("Created admin user {} (id {})", user.username, user.id);
        return Ok(());
    }

    if config.auth_disabled {
        info!("Authentication is DISABLED");
    }

    let state = AppState::new(pool, config.auth_disabled);
    let app = build_router(state);

    let addr = format!("127.0.0.1:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("server terminated")?;
    Ok(())
}
