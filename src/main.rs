use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use remvault::account::AccountService;
use remvault::api::{create_auth_router, create_health_router, AuthAppState};
use remvault::config::VaultConfig;
use remvault::credentials::{load_key, CredentialCipher};
use remvault::store::UserStore;
use remvault::token::TokenIssuer;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "remvault=info".into()),
        )
        .init();

    let config = VaultConfig::from_env()?;
    info!(deployment = ?config.deployment, "remvault starting...");

    let key = load_key(config.encryption_key.as_deref(), &config.key_file)?;
    let cipher = CredentialCipher::new(&key)?;
    let store = UserStore::new(&config.database_path)?;
    let issuer = TokenIssuer::new(&config.resolve_signing_secret(), None);

    let accounts = Arc::new(AccountService::new(store, cipher, issuer));

    // The reminders pass-through router is composed by deployments that
    // supply a concrete RemindersProvider; the binary serves the vault core.
    let app = create_auth_router(AuthAppState { accounts }).merge(create_health_router());

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(addr = %config.bind_addr, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
