use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio_postgres::Row;

use crate::db::column;
use crate::error::{AppError, Result};

/// A WireGuard exit host.
#[derive(Clone, Debug, Serialize)]
pub struct VpnServer {
    pub id: i64,
    pub name: String,
    pub country: String,
    /// Address used both for the ssh control channel and the client endpoint.
    pub ip: String,
    pub public_key: String,
    #[serde(skip_serializing)]
    pub private_key: String,
    pub listen_port: i32,
    /// Peer address pool, e.g. `10.0.1.0/24`.
    pub subnet: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl VpnServer {
    /// The `host:port` clients dial. IPv6 literals are bracketed.
    pub fn endpoint(&self) -> String {
        match self.ip.parse::<IpAddr>() {
            Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, self.listen_port),
            _ => format!("{}:{}", self.ip, self.listen_port),
        }
    }
}

impl TryFrom<&Row> for VpnServer {
    type Error = AppError;

    fn try_from(row: &Row) -> Result<Self> {
        Ok(Self {
            id: column(row, "id")?,
            name: column(row, "name")?,
            country: column(row, "country")?,
            ip: column(row, "ip")?,
            public_key: column(row, "public_key")?,
            private_key: column(row, "private_key")?,
            listen_port: column(row, "listen_port")?,
            subnet: column(row, "subnet")?,
            is_active: column(row, "is_active")?,
            created_at: column(row, "created_at")?,
            updated_at: column(row, "updated_at")?,
        })
    }
}
