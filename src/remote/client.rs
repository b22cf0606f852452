use async_trait::async_trait;
use thiserror::Error;

/// Failures of a remote WireGuard command.
#[derive(Debug, Error)]
pub enum RemoteError {
    /// An argument was rejected before any command ran.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to spawn ssh: {0}")]
    Io(#[from] std::io::Error),

    /// ssh itself failed: unreachable host, auth, or host key mismatch.
    #[error("could not reach {host}: {output}")]
    Connection { host: String, output: String },

    #[error("`{command}` failed on {host} with status {status}: {output}")]
    CommandFailed {
        host: String,
        command: String,
        status: i32,
        output: String,
    },
}

/// Applies peer changes to the live WireGuard interface of a VPN host.
#[async_trait]
pub trait RemoteConfigClient: Send + Sync {
    /// Adds `peer_public_key` with `allowed_ip` and persists the interface.
    async fn add_peer(
        &self,
        host: &str,
        peer_public_key: &str,
        allowed_ip: &str,
    ) -> Result<(), RemoteError>;

    /// Removes `peer_public_key` and persists the interface.
    async fn remove_peer(&self, host: &str, peer_public_key: &str) -> Result<(), RemoteError>;
}
