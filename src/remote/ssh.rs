//! [`RemoteConfigClient`] backed by the system OpenSSH client.
//!
//! Every command opens a fresh connection. Host keys are trusted on first
//! use through [`KnownHosts`].

use std::net::IpAddr;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use ipnetwork::Ipv4Network;
use tokio::process::Command as AsyncCommand;

use crate::config::SshConfig;
use crate::crypto::keypair;
use crate::remote::client::{RemoteConfigClient, RemoteError};
use crate::remote::known_hosts::KnownHosts;

/// Exit status ssh reserves for its own failures.
const SSH_FAILURE_STATUS: i32 = 255;
const SSH_PORT: u16 = 22;

pub struct SshRemote {
    binary: PathBuf,
    key_path: PathBuf,
    user: String,
    connect_timeout: Duration,
    interface: String,
    known_hosts: KnownHosts,
}

impl SshRemote {
    /// Creates a new `SshRemote`.
    ///
    /// # Arguments
    ///
    /// * `config` - The ssh settings.
    ///
    /// # Returns
    ///
    /// A `Result` containing the client, or `InvalidInput` if the interface
    /// or account name could be mistaken for an option.
    pub fn new(config: &SshConfig) -> Result<Self, RemoteError> {
        validate_interface(&config.interface)?;
        if config.user.is_empty() || config.user.starts_with('-') {
            return Err(RemoteError::InvalidInput(format!("invalid ssh user {:?}", config.user)));
        }

        Ok(Self {
            binary: PathBuf::from("ssh"),
            key_path: config.key_path.clone(),
            user: config.user.clone(),
            connect_timeout: config.connect_timeout,
            interface: config.interface.clone(),
            known_hosts: KnownHosts::new(config.known_hosts_path.clone()),
        })
    }

    /// Overrides the ssh executable.
    pub fn with_binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    pub fn known_hosts(&self) -> &KnownHosts {
        &self.known_hosts
    }

    /// Arguments passed to ssh to run `remote_command` on `host`.
    pub fn ssh_args(&self, host: &str, remote_command: &str) -> Vec<String> {
        let timeout = self.connect_timeout.as_secs().max(1);
        let known_hosts = self.known_hosts.path().display();

        vec![
            "-i".to_string(),
            self.key_path.display().to_string(),
            "-p".to_string(),
            SSH_PORT.to_string(),
            "-l".to_string(),
            self.user.clone(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", timeout),
            "-o".to_string(),
            "StrictHostKeyChecking=accept-new".to_string(),
            "-o".to_string(),
            format!("UserKnownHostsFile={}", known_hosts),
            "-o".to_string(),
            "GlobalKnownHostsFile=/dev/null".to_string(),
            "-o".to_string(),
            "HashKnownHosts=no".to_string(),
            "-o".to_string(),
            "LogLevel=ERROR".to_string(),
            "--".to_string(),
            host.to_string(),
            remote_command.to_string(),
        ]
    }

    /// Remote commands that add a peer.
    pub fn add_peer_commands(&self, public_key: &str, allowed_ip: &str) -> [String; 2] {
        [
            format!(
                "sudo wg set {} peer {} allowed-ips {}",
                self.interface, public_key, allowed_ip
            ),
            format!("sudo wg-quick save {}", self.interface),
        ]
    }

    /// Remote commands that remove a peer.
    pub fn remove_peer_commands(&self, public_key: &str) -> [String; 2] {
        [
            format!("sudo wg set {} peer {} remove", self.interface, public_key),
            format!("sudo wg-quick save {}", self.interface),
        ]
    }

    /// Runs one command on `host` and returns its combined output.
    async fn run(&self, host: &str, command: &str) -> Result<String, RemoteError> {
        self.known_hosts.ensure().await?;
        let first_contact = !self.known_hosts.is_known(host).await?;
        if first_contact {
            tracing::warn!("⚠️ First contact with {}, its host key will be trusted from now on", host);
        }

        tracing::debug!("Running `{}` on {}", command, host);
        let output = AsyncCommand::new(&self.binary)
            .args(self.ssh_args(host, command))
            .stdin(Stdio::null())
            .output()
            .await?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        let combined = combined.trim().to_string();

        match output.status.code() {
            Some(0) => {
                if first_contact {
                    tracing::info!("Recorded host key for {}", host);
                }
                Ok(combined)
            }
            Some(SSH_FAILURE_STATUS) => Err(RemoteError::Connection {
                host: host.to_string(),
                output: combined,
            }),
            status => Err(RemoteError::CommandFailed {
                host: host.to_string(),
                command: command.to_string(),
                // killed by a signal
                status: status.unwrap_or(-1),
                output: combined,
            }),
        }
    }
}

#[async_trait]
impl RemoteConfigClient for SshRemote {
    async fn add_peer(
        &self,
        host: &str,
        peer_public_key: &str,
        allowed_ip: &str,
    ) -> Result<(), RemoteError> {
        validate_host(host)?;
        validate_public_key(peer_public_key)?;
        validate_allowed_ip(allowed_ip)?;

        for command in self.add_peer_commands(peer_public_key, allowed_ip) {
            self.run(host, &command).await?;
        }

        tracing::info!("✅ Added peer {} ({}) on {}", peer_public_key, allowed_ip, host);
        Ok(())
    }

    async fn remove_peer(&self, host: &str, peer_public_key: &str) -> Result<(), RemoteError> {
        validate_host(host)?;
        validate_public_key(peer_public_key)?;

        for command in self.remove_peer_commands(peer_public_key) {
            self.run(host, &command).await?;
        }

        tracing::info!("✅ Removed peer {} from {}", peer_public_key, host);
        Ok(())
    }
}

fn validate_host(host: &str) -> Result<(), RemoteError> {
    if host.parse::<IpAddr>().is_ok() {
        return Ok(());
    }

    let is_hostname = !host.is_empty()
        && host.len() <= 253
        && !host.starts_with('-')
        && host
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.');

    if is_hostname {
        Ok(())
    } else {
        Err(RemoteError::InvalidInput(format!("invalid host {:?}", host)))
    }
}

fn validate_interface(interface: &str) -> Result<(), RemoteError> {
    let valid = (1..=15).contains(&interface.len())
        && interface
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));

    if valid {
        Ok(())
    } else {
        Err(RemoteError::InvalidInput(format!("invalid interface name {:?}", interface)))
    }
}

fn validate_public_key(public_key: &str) -> Result<(), RemoteError> {
    keypair::validate_public_key(public_key).map_err(|e| RemoteError::InvalidInput(e.to_string()))
}

fn validate_allowed_ip(allowed_ip: &str) -> Result<(), RemoteError> {
    allowed_ip
        .parse::<Ipv4Network>()
        .map(|_| ())
        .map_err(|_| RemoteError::InvalidInput(format!("invalid allowed ip {:?}", allowed_ip)))
}
