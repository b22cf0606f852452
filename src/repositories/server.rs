use async_trait::async_trait;

use crate::{db::PgStore, error::Result, models::server::VpnServer};

/// Read access to the VPN host catalogue.
#[async_trait]
pub trait ServerRepository: Send + Sync {
    /// Finds a server whether or not it is active.
    async fn find_by_id(&self, id: i64) -> Result<Option<VpnServer>>;

    async fn list_active(&self) -> Result<Vec<VpnServer>>;
}

const SERVER_COLUMNS: &str = "id, name, country, ip, public_key, private_key, listen_port, \
                              subnet, is_active, created_at, updated_at";

#[async_trait]
impl ServerRepository for PgStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<VpnServer>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                &format!(
                    r#"
                    SELECT {SERVER_COLUMNS}
                    FROM vpn_servers
                    WHERE id = $1 AND deleted_at IS NULL
                    "#
                ),
                &[&id],
            )
            .await?;
        row.as_ref().map(VpnServer::try_from).transpose()
    }

    async fn list_active(&self) -> Result<Vec<VpnServer>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                &format!(
                    r#"
                    SELECT {SERVER_COLUMNS}
                    FROM vpn_servers
                    WHERE is_active = true AND deleted_at IS NULL
                    ORDER BY id
                    "#
                ),
                &[],
            )
            .await?;
        rows.iter().map(VpnServer::try_from).collect()
    }
}
