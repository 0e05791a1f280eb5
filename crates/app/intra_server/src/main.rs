//! Intra API server binary.
//!
//! Wires the auth orchestrator with its collaborators (directory client,
//! token codec, role resolver), runs migrations, and serves the HTTP API.

use std::sync::Arc;

use clap::Parser;
use intra_core::auth::jwt::TokenCodec;
use intra_core::auth::ldap::LdapDirectory;
use intra_core::auth::roles::RoleResolver;
use intra_core::auth::service::AuthService;
use intra_core::config::{JwtConfig, LdapConfig};
use sqlx::postgres::PgPoolOptions;
use tracing::info;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "intra_server", about = "Intra API server")]
struct Args {
    /// Address to bind the HTTP listener.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0:8000")]
    bind_addr: String,

    /// PostgreSQL connection URL.
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "postgres://localhost:5432/intra"
    )]
    database_url: String,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,intra_api=debug,intra_core=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();

    info!(bind_addr = %args.bind_addr, "starting intra_server");

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(std::time::Duration::from_secs(30))
        .connect(&args.database_url)
        .await?;

    info!("running database migrations");
    intra_api::migrate(&pool).await?;

    let ldap_config = LdapConfig::from_env();
    let jwt_config = JwtConfig::from_env();

    let roles = RoleResolver::from_bindings(
        ldap_config.admin_group.as_deref(),
        ldap_config.editor_group.as_deref(),
        ldap_config.viewer_group.as_deref(),
    );
    let codec = TokenCodec::from_config(&jwt_config)?;
    let directory = Arc::new(LdapDirectory::new(ldap_config));
    let auth = Arc::new(AuthService::new(directory, codec, roles));

    let state = intra_api::AppState { pool, auth };
    let app = intra_api::router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind_addr).await?;
    info!(addr = %listener.local_addr()?, "REST API listening");

    axum::serve(listener, app).await?;

    Ok(())
}
