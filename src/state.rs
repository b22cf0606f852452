use std::sync::Arc;

use crate::config::Config;
use crate::db::{self, PgStore};
use crate::error::{AppError, Result};
use crate::remote::{client::RemoteConfigClient, ssh::SshRemote};
use crate::repositories::{
    peer::PeerRepository, server::ServerRepository, user::UserRepository,
};
use crate::services::provisioning::PeerProvisioner;
use crate::services::session::SessionAuthenticator;

/// The application's state.
#[derive(Clone)]
pub struct AppState {
    /// The application's configuration.
    pub config: Arc<Config>,
    /// User storage.
    pub users: Arc<dyn UserRepository>,
    /// VPN server storage.
    pub servers: Arc<dyn ServerRepository>,
    /// Bearer token issuing and verification.
    pub authenticator: SessionAuthenticator,
    /// Peer lifecycle on hosts and in storage.
    pub provisioner: Arc<PeerProvisioner>,
}

impl AppState {
    /// Creates a new `AppState` backed by PostgreSQL and OpenSSH.
    ///
    /// # Arguments
    ///
    /// * `config` - The application's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the new `AppState`.
    pub async fn new(config: &Config) -> Result<Self> {
        let pool = db::create_pool(&config.database_url)?;
        db::migrate(&pool).await?;

        let remote = SshRemote::new(&config.ssh)
            .map_err(|e| AppError::Misconfiguration(e.to_string()))?;
        remote
            .known_hosts()
            .ensure()
            .await
            .map_err(|e| AppError::Misconfiguration(format!("known hosts file: {}", e)))?;
        tracing::info!(
            "✅ Remote hosts trusted through {}",
            remote.known_hosts().path().display()
        );

        Ok(Self::from_parts(
            config.clone(),
            Arc::new(PgStore::new(pool)),
            Arc::new(remote),
        ))
    }

    /// Assembles the state from a store implementing every repository and a
    /// remote client.
    pub fn from_parts<S>(config: Config, store: Arc<S>, remote: Arc<dyn RemoteConfigClient>) -> Self
    where
        S: UserRepository + ServerRepository + PeerRepository + 'static,
    {
        let users: Arc<dyn UserRepository> = store.clone();
        let servers: Arc<dyn ServerRepository> = store.clone();
        let peers: Arc<dyn PeerRepository> = store;

        let authenticator = SessionAuthenticator::new(config.jwt_secret.clone(), users.clone());
        let provisioner = Arc::new(PeerProvisioner::new(
            servers.clone(),
            peers,
            remote,
            config.master_key.clone(),
            config.client.clone(),
        ));

        Self {
            config: Arc::new(config),
            users,
            servers,
            authenticator,
            provisioner,
        }
    }
}
