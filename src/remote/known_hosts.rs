//! The OpenSSH `known_hosts` file this service trusts VPN hosts through.
//!
//! Hosts are trusted on first use: ssh records an unseen host key and
//! refuses any later key that differs.

use std::path::{Path, PathBuf};

use tokio::fs;

#[derive(Clone, Debug)]
pub struct KnownHosts {
    path: PathBuf,
}

impl KnownHosts {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Creates the file (0600) and its directory (0700) when missing.
    pub async fn ensure(&self) -> std::io::Result<()> {
        if let Some(dir) = self.path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            if fs::metadata(dir).await.is_err() {
                fs::create_dir_all(dir).await?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700)).await?;
                }
            }
        }

        if fs::metadata(&self.path).await.is_err() {
            fs::write(&self.path, b"").await?;
            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600)).await?;
            }
            tracing::info!("Created known hosts file at {}", self.path.display());
        }

        Ok(())
    }

    /// Returns the recorded `(key_type, key)` entries for `host`.
    pub async fn lookup(&self, host: &str) -> std::io::Result<Vec<(String, String)>> {
        let contents = match fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            // hashed entries and @cert-authority / @revoked markers
            .filter(|line| !line.starts_with("|1|") && !line.starts_with('@'))
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let hosts = fields.next()?;
                let key_type = fields.next()?;
                let key = fields.next()?;
                hosts
                    .split(',')
                    .any(|entry| entry == host)
                    .then(|| (key_type.to_string(), key.to_string()))
            })
            .collect())
    }

    pub async fn is_known(&self, host: &str) -> std::io::Result<bool> {
        Ok(!self.lookup(host).await?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn ensure_creates_missing_file_and_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = KnownHosts::new(dir.path().join("ssh").join("known_hosts"));

        store.ensure().await.unwrap();
        assert!(store.path().exists());
        assert!(!store.is_known("203.0.113.10").await.unwrap());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
            let dir_mode = std::fs::metadata(dir.path().join("ssh")).unwrap().permissions().mode();
            assert_eq!(dir_mode & 0o777, 0o700);
        }
    }

    #[tokio::test]
    async fn ensure_keeps_existing_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_hosts");
        std::fs::write(&path, "203.0.113.10 ssh-ed25519 AAAAC3Nza\n").unwrap();

        let store = KnownHosts::new(&path);
        store.ensure().await.unwrap();
        assert!(store.is_known("203.0.113.10").await.unwrap());
    }

    #[tokio::test]
    async fn lookup_matches_plain_host_entries_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("known_hosts");
        std::fs::write(
            &path,
            "# managed by wg-broker\n\
             203.0.113.10,vpn-de ssh-ed25519 AAAAkeyDE\n\
             |1|c2FsdA==|aGFzaA== ssh-ed25519 AAAAhashed\n\
             @revoked 198.51.100.7 ssh-rsa AAAArevoked\n\
             198.51.100.7 ecdsa-sha2-nistp256 AAAAkeyUS\n",
        )
        .unwrap();

        let store = KnownHosts::new(&path);
        assert_eq!(
            store.lookup("vpn-de").await.unwrap(),
            vec![("ssh-ed25519".to_string(), "AAAAkeyDE".to_string())]
        );
        assert_eq!(store.lookup("198.51.100.7").await.unwrap().len(), 1);
        assert!(!store.is_known("203.0.113.11").await.unwrap());
    }

    #[tokio::test]
    async fn missing_file_knows_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = KnownHosts::new(dir.path().join("absent"));
        assert!(store.lookup("203.0.113.10").await.unwrap().is_empty());
    }
}
