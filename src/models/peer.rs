use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_postgres::Row;

use crate::db::column;
use crate::error::{AppError, Result};
use crate::models::server::VpnServer;

/// One provisioned tunnel binding a user to a server.
#[derive(Clone, Debug)]
pub struct Peer {
    pub id: i64,
    pub user_id: i64,
    pub server_id: i64,
    pub public_key: String,
    /// AES-256-GCM sealed private key (ciphertext || 12-byte nonce).
    pub sealed_private_key: Vec<u8>,
    /// Single-host route inside the server subnet, e.g. `10.0.1.2/32`.
    pub allowed_ip: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<&Row> for Peer {
    type Error = AppError;

    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            id: column(row, "id")?,
            user_id: column(row, "user_id")?,
            server_id: column(row, "server_id")?,
            public_key: column(row, "public_key")?,
            sealed_private_key: column(row, "sealed_private_key")?,
            allowed_ip: column(row, "allowed_ip")?,
            created_at: column(row, "created_at")?,
        })
    }
}

/// The fields needed to insert a peer.
#[derive(Debug)]
pub struct NewPeer {
    pub user_id: i64,
    pub server_id: i64,
    pub public_key: String,
    pub sealed_private_key: Vec<u8>,
    pub allowed_ip: String,
}

/// A peer as reported by `/vpn/status`, without key material.
#[derive(Clone, Debug, Serialize)]
pub struct PeerStatus {
    pub id: i64,
    pub user_id: i64,
    pub server_id: i64,
    pub public_key: String,
    pub allowed_ip: String,
    pub created_at: DateTime<Utc>,
    pub server: VpnServer,
}

impl PeerStatus {
    pub fn new(peer: Peer, server: VpnServer) -> Self {
        Self {
            id: peer.id,
            user_id: peer.user_id,
            server_id: peer.server_id,
            public_key: peer.public_key,
            allowed_ip: peer.allowed_ip,
            created_at: peer.created_at,
            server,
        }
    }
}
