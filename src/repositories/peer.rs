use async_trait::async_trait;

use crate::{
    db::{map_unique_violation, PgStore},
    error::Result,
    models::peer::{NewPeer, Peer},
};

/// Storage operations on peers. Only non-deleted rows are ever returned.
#[async_trait]
pub trait PeerRepository: Send + Sync {
    async fn find_by_user_and_server(&self, user_id: i64, server_id: i64) -> Result<Option<Peer>>;

    async fn list_by_server(&self, server_id: i64) -> Result<Vec<Peer>>;

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Peer>>;

    /// Inserts a peer; a live duplicate (user, server) or (server, address) is a `Conflict`.
    async fn insert(&self, peer: NewPeer) -> Result<Peer>;

    async fn delete(&self, peer_id: i64) -> Result<()>;
}

const PEER_COLUMNS: &str =
    "id, user_id, server_id, public_key, sealed_private_key, allowed_ip, created_at";

#[async_trait]
impl PeerRepository for PgStore {
    async fn find_by_user_and_server(&self, user_id: i64, server_id: i64) -> Result<Option<Peer>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    r#"
                    SELECT {PEER_COLUMNS}
                    FROM peers
                    WHERE user_id = $1 AND server_id = $2 AND deleted_at IS NULL
                    "#
                ),
                &[&user_id, &server_id],
            )
            .await?;
        row.as_ref().map(Peer::try_from).transpose()
    }

    async fn list_by_server(&self, server_id: i64) -> Result<Vec<Peer>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                &format!(
                    r#"
                    SELECT {PEER_COLUMNS}
                    FROM peers
                    WHERE server_id = $1 AND deleted_at IS NULL
                    "#
                ),
                &[&server_id],
            )
            .await?;
        rows.iter().map(Peer::try_from).collect()
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Peer>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                &format!(
                    r#"
                    SELECT {PEER_COLUMNS}
                    FROM peers
                    WHERE user_id = $1 AND deleted_at IS NULL
                    ORDER BY created_at
                    "#
                ),
                &[&user_id],
            )
            .await?;
        rows.iter().map(Peer::try_from).collect()
    }

    async fn insert(&self, peer: NewPeer) -> Result<Peer> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                &format!(
                    r#"
                    INSERT INTO peers (user_id, server_id, public_key, sealed_private_key, allowed_ip)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING {PEER_COLUMNS}
                    "#
                ),
                &[
                    &peer.user_id,
                    &peer.server_id,
                    &peer.public_key,
                    &peer.sealed_private_key,
                    &peer.allowed_ip,
                ],
            )
            .await
            .map_err(|e| map_unique_violation(e, "peer"))?;
        Peer::try_from(&row)
    }

    async fn delete(&self, peer_id: i64) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                r#"
                UPDATE peers
                SET deleted_at = NOW()
                WHERE id = $1 AND deleted_at IS NULL
                "#,
                &[&peer_id],
            )
            .await?;
        Ok(())
    }
}
