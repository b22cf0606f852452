//! Peer provisioning: connect, disconnect, status and revoke-all.
//!
//! A (user, server) pair is either connected (one live peer row plus a peer
//! on the host's interface) or disconnected. The host is changed before the
//! row is written on connect, and after the row is removed on disconnect, so
//! the record store stays the source of truth for what a user holds.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard};
use zeroize::Zeroizing;

use crate::config::ClientDefaults;
use crate::crypto::{aes, keypair};
use crate::error::{AppError, CryptoError};
use crate::models::peer::{NewPeer, PeerStatus};
use crate::remote::client::{RemoteConfigClient, RemoteError};
use crate::repositories::{peer::PeerRepository, server::ServerRepository};
use crate::wireguard::allocator::{self, AllocError};
use crate::wireguard::config::render_client_config;

#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("server not found")]
    ServerNotFound,

    #[error("server is not active")]
    ServerInactive,

    #[error("already connected to this server")]
    AlreadyConnected,

    #[error("no active connection to this server")]
    NotConnected,

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Allocation(#[from] AllocError),

    #[error(transparent)]
    Remote(#[from] RemoteError),

    /// A peer row could not be written.
    #[error("failed to persist peer: {0}")]
    Persistence(AppError),

    /// A peer row could not be deleted.
    #[error("failed to remove peer record: {0}")]
    Removal(AppError),

    /// A read from the record store failed.
    #[error(transparent)]
    Store(#[from] AppError),
}

impl From<ProvisionError> for AppError {
    fn from(e: ProvisionError) -> Self {
        match e {
            ProvisionError::ServerNotFound => AppError::NotFound(e.to_string()),
            ProvisionError::ServerInactive => AppError::Validation(e.to_string()),
            ProvisionError::AlreadyConnected => AppError::Conflict(e.to_string()),
            ProvisionError::NotConnected => AppError::NotFound(e.to_string()),
            ProvisionError::Crypto(inner) => AppError::Crypto(inner),
            ProvisionError::Allocation(inner) => AppError::Internal(inner.to_string()),
            ProvisionError::Remote(inner) => AppError::RemoteProvisioning(inner.to_string()),
            ProvisionError::Persistence(inner) => AppError::Persistence(inner.to_string()),
            ProvisionError::Removal(inner) => AppError::Internal(format!("failed to remove peer record: {}", inner)),
            ProvisionError::Store(inner) => inner,
        }
    }
}

type LockMap = Arc<StdMutex<HashMap<i64, Arc<Mutex<()>>>>>;

/// Per-server async locks serializing allocation and insert.
///
/// An entry lives only while some task holds or waits on it.
#[derive(Clone, Default)]
pub struct ServerLocks {
    inner: LockMap,
}

impl ServerLocks {
    pub async fn acquire(&self, server_id: i64) -> ServerLockGuard {
        let lock = {
            let mut locks = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            locks.entry(server_id).or_default().clone()
        };
        ServerLockGuard {
            guard: Some(lock.lock_owned().await),
            server_id,
            locks: self.inner.clone(),
        }
    }

    /// Number of servers with a held or awaited lock.
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Holds one server's lock and drops its map entry once unused.
pub struct ServerLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    server_id: i64,
    locks: LockMap,
}

impl Drop for ServerLockGuard {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
        if locks
            .get(&self.server_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.server_id);
        }
    }
}

/// Result of a successful connect.
#[derive(Serialize)]
pub struct ConnectOutcome {
    pub peer_ip: String,
    /// Ready-to-import `wg-quick` file, including the private key.
    pub config: String,
}

/// Composes key generation, allocation, the remote host and the peer store.
pub struct PeerProvisioner {
    servers: Arc<dyn ServerRepository>,
    peers: Arc<dyn PeerRepository>,
    remote: Arc<dyn RemoteConfigClient>,
    master_key: Zeroizing<Vec<u8>>,
    client: ClientDefaults,
    locks: ServerLocks,
}

impl PeerProvisioner {
    pub fn new(
        servers: Arc<dyn ServerRepository>,
        peers: Arc<dyn PeerRepository>,
        remote: Arc<dyn RemoteConfigClient>,
        master_key: Zeroizing<Vec<u8>>,
        client: ClientDefaults,
    ) -> Self {
        Self {
            servers,
            peers,
            remote,
            master_key,
            client,
            locks: ServerLocks::default(),
        }
    }

    /// Provisions a peer for `user_id` on `server_id`.
    ///
    /// # Returns
    ///
    /// The allocated address and the client configuration. The configuration
    /// is the only place the private key ever appears in clear.
    pub async fn connect(&self, user_id: i64, server_id: i64) -> Result<ConnectOutcome, ProvisionError> {
        let server = self
            .servers
            .find_by_id(server_id)
            .await?
            .ok_or(ProvisionError::ServerNotFound)?;
        if !server.is_active {
            return Err(ProvisionError::ServerInactive);
        }

        let _guard = self.locks.acquire(server.id).await;

        if self.peers.find_by_user_and_server(user_id, server.id).await?.is_some() {
            return Err(ProvisionError::AlreadyConnected);
        }

        let keys = keypair::generate()?;

        let existing = self.peers.list_by_server(server.id).await?;
        let used = allocator::used_addresses(existing.iter().map(|peer| peer.allowed_ip.as_str()));
        let allowed_ip = allocator::allocate(&server.subnet, &used)?;

        let sealed_private_key = aes::seal(&self.master_key, keys.private_key.as_bytes())?;

        tracing::debug!("🔌 Adding peer {} for user {} on {}", allowed_ip, user_id, server.ip);
        self.remote
            .add_peer(&server.ip, &keys.public_key, &allowed_ip)
            .await?;

        let inserted = self
            .peers
            .insert(NewPeer {
                user_id,
                server_id: server.id,
                public_key: keys.public_key.clone(),
                sealed_private_key,
                allowed_ip: allowed_ip.clone(),
            })
            .await;

        if let Err(e) = inserted {
            tracing::error!(
                "Failed to save peer {} for user {} on server {}: {}",
                allowed_ip,
                user_id,
                server.id,
                e
            );
            if let Err(remove_err) = self.remote.remove_peer(&server.ip, &keys.public_key).await {
                tracing::error!(
                    "❌ Rollback failed, peer {} left on {}: {}",
                    keys.public_key,
                    server.ip,
                    remove_err
                );
            }
            return Err(ProvisionError::Persistence(e));
        }

        let config = render_client_config(&keys.private_key, &allowed_ip, &server, &self.client);

        tracing::info!("✅ User {} connected to server {} as {}", user_id, server.id, allowed_ip);
        Ok(ConnectOutcome {
            peer_ip: allowed_ip,
            config,
        })
    }

    /// Removes the caller's peer from `server_id`.
    ///
    /// The row is deleted first; failing to remove the peer from the host is
    /// only logged.
    pub async fn disconnect(&self, user_id: i64, server_id: i64) -> Result<(), ProvisionError> {
        let peer = self
            .peers
            .find_by_user_and_server(user_id, server_id)
            .await?
            .ok_or(ProvisionError::NotConnected)?;

        let _guard = self.locks.acquire(peer.server_id).await;

        // A concurrent disconnect may have won the lock.
        let peer = self
            .peers
            .find_by_user_and_server(user_id, peer.server_id)
            .await?
            .ok_or(ProvisionError::NotConnected)?;
        let server = self
            .servers
            .find_by_id(peer.server_id)
            .await?
            .ok_or(ProvisionError::ServerNotFound)?;

        self.peers
            .delete(peer.id)
            .await
            .map_err(ProvisionError::Removal)?;

        if let Err(e) = self.remote.remove_peer(&server.ip, &peer.public_key).await {
            tracing::warn!(
                "⚠️ Peer {} deleted but still present on {}: {}",
                peer.public_key,
                server.ip,
                e
            );
        }

        tracing::info!("✅ User {} disconnected from server {}", user_id, server_id);
        Ok(())
    }

    /// The caller's live peers with their servers. Never touches the hosts.
    pub async fn status(&self, user_id: i64) -> Vec<PeerStatus> {
        let peers = match self.peers.list_by_user(user_id).await {
            Ok(peers) => peers,
            Err(e) => {
                tracing::warn!("Failed to list peers for user {}: {}", user_id, e);
                return Vec::new();
            }
        };

        let mut statuses = Vec::with_capacity(peers.len());
        for peer in peers {
            match self.servers.find_by_id(peer.server_id).await {
                Ok(Some(server)) => statuses.push(PeerStatus::new(peer, server)),
                Ok(None) => tracing::warn!("Peer {} references missing server {}", peer.id, peer.server_id),
                Err(e) => tracing::warn!("Failed to load server {}: {}", peer.server_id, e),
            }
        }
        statuses
    }

    /// Deletes every live peer of `user_id`, removing each from its host on a
    /// best-effort basis.
    pub async fn revoke_all(&self, user_id: i64) -> Result<(), ProvisionError> {
        let peers = self.peers.list_by_user(user_id).await?;

        for peer in peers {
            let _guard = self.locks.acquire(peer.server_id).await;

            self.peers
                .delete(peer.id)
                .await
                .map_err(ProvisionError::Removal)?;

            match self.servers.find_by_id(peer.server_id).await {
                Ok(Some(server)) => {
                    if let Err(e) = self.remote.remove_peer(&server.ip, &peer.public_key).await {
                        tracing::warn!("⚠️ Failed to remove peer {} from {}: {}", peer.public_key, server.ip, e);
                    }
                }
                Ok(None) => tracing::warn!("Peer {} references missing server {}", peer.id, peer.server_id),
                Err(e) => tracing::warn!("Failed to load server {}: {}", peer.server_id, e),
            }
        }

        tracing::info!("🧹 Revoked all peers of user {}", user_id);
        Ok(())
    }
}
