//! In-process store implementing every repository trait.
//!
//! Mirrors the uniqueness rules of the PostgreSQL partial indexes so the
//! provisioning and auth flows can be exercised without a database.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use crate::{
    error::{AppError, Result},
    models::{
        peer::{NewPeer, Peer},
        server::VpnServer,
        user::{NewUser, User},
    },
    repositories::{peer::PeerRepository, server::ServerRepository, user::UserRepository},
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    users: Vec<(User, bool)>,
    servers: Vec<VpnServer>,
    peers: Vec<(Peer, bool)>,
}

impl Inner {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn live_users(&self) -> impl Iterator<Item = &User> {
        self.users.iter().filter(|(_, deleted)| !deleted).map(|(u, _)| u)
    }

    fn live_peers(&self) -> impl Iterator<Item = &Peer> {
        self.peers.iter().filter(|(_, deleted)| !deleted).map(|(p, _)| p)
    }
}

/// A shared, clonable in-memory store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a server and returns it with its assigned id.
    pub async fn add_server(
        &self,
        name: &str,
        ip: &str,
        public_key: &str,
        subnet: &str,
        is_active: bool,
    ) -> VpnServer {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let server = VpnServer {
            id: inner.next_id(),
            name: name.to_string(),
            country: String::new(),
            ip: ip.to_string(),
            public_key: public_key.to_string(),
            private_key: String::new(),
            listen_port: 51820,
            subnet: subnet.to_string(),
            is_active,
            created_at: now,
            updated_at: now,
        };
        inner.servers.push(server.clone());
        server
    }

    /// Every peer row ever written, including soft-deleted ones.
    pub async fn peer_rows(&self) -> Vec<(Peer, bool)> {
        self.inner.read().await.peers.clone()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut inner = self.inner.write().await;
        if inner
            .live_users()
            .any(|u| u.email == user.email || u.username == user.username)
        {
            return Err(AppError::Conflict("user already exists".to_string()));
        }
        let now = Utc::now();
        let created = User {
            id: inner.next_id(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            session_secret: user.session_secret,
            created_at: now,
            updated_at: now,
        };
        inner.users.push((created.clone(), false));
        Ok(created)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<User>> {
        Ok(self.inner.read().await.live_users().find(|u| u.id == id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.inner.read().await.live_users().find(|u| u.email == email).cloned())
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>> {
        Ok(self
            .inner
            .read()
            .await
            .live_users()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn update_session_secret(&self, id: i64, session_secret: &str) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let Some((user, _)) = inner.users.iter_mut().find(|(u, deleted)| u.id == id && !deleted) {
            user.session_secret = session_secret.to_string();
            user.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        id: i64,
        username: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<Option<User>> {
        let mut inner = self.inner.write().await;
        if inner
            .live_users()
            .any(|u| u.id != id && (u.email == email || u.username == username))
        {
            return Err(AppError::Conflict("user already exists".to_string()));
        }
        let Some((user, _)) = inner.users.iter_mut().find(|(u, deleted)| u.id == id && !deleted)
        else {
            return Ok(None);
        };
        user.username = username.to_string();
        user.email = email.to_string();
        user.password_hash = password_hash.to_string();
        user.updated_at = Utc::now();
        Ok(Some(user.clone()))
    }

    async fn soft_delete(&self, id: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        for (user, deleted) in inner.users.iter_mut() {
            if user.id == id {
                *deleted = true;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ServerRepository for MemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<VpnServer>> {
        Ok(self.inner.read().await.servers.iter().find(|s| s.id == id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<VpnServer>> {
        Ok(self
            .inner
            .read()
            .await
            .servers
            .iter()
            .filter(|s| s.is_active)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl PeerRepository for MemoryStore {
    async fn find_by_user_and_server(&self, user_id: i64, server_id: i64) -> Result<Option<Peer>> {
        Ok(self
            .inner
            .read()
            .await
            .live_peers()
            .find(|p| p.user_id == user_id && p.server_id == server_id)
            .cloned())
    }

    async fn list_by_server(&self, server_id: i64) -> Result<Vec<Peer>> {
        Ok(self
            .inner
            .read()
            .await
            .live_peers()
            .filter(|p| p.server_id == server_id)
            .cloned()
            .collect())
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Peer>> {
        Ok(self
            .inner
            .read()
            .await
            .live_peers()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert(&self, peer: NewPeer) -> Result<Peer> {
        let mut inner = self.inner.write().await;
        if inner.live_peers().any(|p| {
            p.server_id == peer.server_id
                && (p.user_id == peer.user_id || p.allowed_ip == peer.allowed_ip)
        }) {
            return Err(AppError::Conflict("peer already exists".to_string()));
        }
        let created = Peer {
            id: inner.next_id(),
            user_id: peer.user_id,
            server_id: peer.server_id,
            public_key: peer.public_key,
            sealed_private_key: peer.sealed_private_key,
            allowed_ip: peer.allowed_ip,
            created_at: Utc::now(),
        };
        inner.peers.push((created.clone(), false));
        Ok(created)
    }

    async fn delete(&self, peer_id: i64) -> Result<()> {
        let mut inner = self.inner.write().await;
        for (peer, deleted) in inner.peers.iter_mut() {
            if peer.id == peer_id {
                *deleted = true;
            }
        }
        Ok(())
    }
}
