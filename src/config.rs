use std::env;
use std::path::PathBuf;
use std::time::Duration;
use anyhow::{Context, Result};
use zeroize::{Zeroize, Zeroizing};

/// Remote shell settings used to reach VPN hosts.
#[derive(Clone, Debug)]
pub struct SshConfig {
    /// Private key presented to the VPN hosts.
    pub key_path: PathBuf,
    /// Trust-on-first-use host key store owned by this service.
    pub known_hosts_path: PathBuf,
    /// Remote account the commands run as.
    pub user: String,
    /// Upper bound on the connection handshake.
    pub connect_timeout: Duration,
    /// WireGuard interface managed on every host.
    pub interface: String,
}

/// Values baked into every generated client configuration.
#[derive(Clone, Debug)]
pub struct ClientDefaults {
    /// Resolvers written to the `DNS` line.
    pub dns: String,
    /// `PersistentKeepalive` interval in seconds.
    pub keepalive_secs: u16,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            dns: "1.1.1.1, 8.8.8.8".to_string(),
            keepalive_secs: 25,
        }
    }
}

/// The application's configuration.
#[derive(Clone)]
pub struct Config {
    /// The URL of the PostgreSQL database.
    pub database_url: String,
    /// The TCP port the API listens on.
    pub port: u16,
    /// Process-wide half of every token signing key.
    pub jwt_secret: Zeroizing<String>,
    /// The master key used to seal peer private keys at rest.
    pub master_key: Zeroizing<Vec<u8>>,
    /// Origins allowed by the CORS layer.
    pub cors_origins: Vec<String>,
    /// Remote shell settings.
    pub ssh: SshConfig,
    /// Client configuration defaults.
    pub client: ClientDefaults,
}

impl Config {
    /// Creates a new `Config` from environment variables.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `Config`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Creates a new `Config` from an arbitrary variable source.
    ///
    /// # Arguments
    ///
    /// * `var` - Returns the value of a variable, or `None` when unset.
    pub fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut master_key_hex = var("MASTER_KEY")
            .context("MASTER_KEY must be set (generate with: openssl rand -hex 32)")?;

        let master_key_bytes = hex::decode(&master_key_hex)
            .context("MASTER_KEY must be valid hexadecimal");

        master_key_hex.zeroize();
        let master_key_bytes = Zeroizing::new(master_key_bytes?);

        if master_key_bytes.len() != 32 {
            anyhow::bail!("MASTER_KEY must be exactly 32 bytes (64 hex characters)");
        }

        let jwt_secret = Zeroizing::new(var("JWT_SECRET").context("JWT_SECRET must be set")?);
        if jwt_secret.is_empty() {
            anyhow::bail!("JWT_SECRET must not be empty");
        }

        let home = var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let defaults = ClientDefaults::default();

        Ok(Self {
            database_url: var("DATABASE_URL")
                .context("DATABASE_URL must be set")?,
            port: var("API_PORT")
                .unwrap_or_else(|| "8080".to_string())
                .parse()
                .context("Invalid API_PORT")?,
            jwt_secret,
            master_key: master_key_bytes,
            cors_origins: var("CORS_ORIGINS")
                .unwrap_or_else(|| "http://localhost:8080".to_string())
                .split(',')
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect(),
            ssh: SshConfig {
                key_path: var("SSH_KEY_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| home.join(".ssh").join("id_rsa")),
                known_hosts_path: var("SSH_KNOWN_HOSTS_PATH")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| home.join(".ssh").join("vpn_known_hosts")),
                user: var("SSH_USER").unwrap_or_else(|| "ubuntu".to_string()),
                connect_timeout: Duration::from_secs(
                    var("SSH_CONNECT_TIMEOUT_SECS")
                        .unwrap_or_else(|| "10".to_string())
                        .parse()
                        .context("Invalid SSH_CONNECT_TIMEOUT_SECS")?,
                ),
                interface: var("WG_INTERFACE").unwrap_or_else(|| "wg0".to_string()),
            },
            client: ClientDefaults {
                dns: var("CLIENT_DNS").unwrap_or(defaults.dns),
                keepalive_secs: match var("CLIENT_KEEPALIVE_SECS") {
                    Some(raw) => raw.parse().context("Invalid CLIENT_KEEPALIVE_SECS")?,
                    None => defaults.keepalive_secs,
                },
            },
        })
    }
}
