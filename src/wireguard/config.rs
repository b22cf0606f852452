use crate::config::ClientDefaults;
use crate::models::server::VpnServer;

/// Renders the `wg-quick` configuration handed to a newly connected client.
///
/// The result carries the peer's private key and is never stored.
pub fn render_client_config(
    private_key: &str,
    allowed_ip: &str,
    server: &VpnServer,
    defaults: &ClientDefaults,
) -> String {
    format!(
        r#"[Interface]
PrivateKey = {private_key}
Address = {address}
DNS = {dns}

[Peer]
PublicKey = {server_public_key}
Endpoint = {endpoint}
AllowedIPs = 0.0.0.0/0
PersistentKeepalive = {keepalive}
"#,
        private_key = private_key,
        address = allowed_ip,
        dns = defaults.dns,
        server_public_key = server.public_key,
        endpoint = server.endpoint(),
        keepalive = defaults.keepalive_secs,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn renders_interface_and_peer_sections() {
        let now = Utc::now();
        let server = VpnServer {
            id: 1,
            name: "Frankfurt".to_string(),
            country: "DE".to_string(),
            ip: "203.0.113.10".to_string(),
            public_key: "c2VydmVyLXB1YmxpYy1rZXk=".to_string(),
            private_key: "never-rendered".to_string(),
            listen_port: 51820,
            subnet: "10.0.1.0/24".to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };

        let config = render_client_config("cHJpdmF0ZQ==", "10.0.1.2/32", &server, &ClientDefaults::default());

        assert_eq!(
            config,
            "[Interface]\n\
             PrivateKey = cHJpdmF0ZQ==\n\
             Address = 10.0.1.2/32\n\
             DNS = 1.1.1.1, 8.8.8.8\n\
             \n\
             [Peer]\n\
             PublicKey = c2VydmVyLXB1YmxpYy1rZXk=\n\
             Endpoint = 203.0.113.10:51820\n\
             AllowedIPs = 0.0.0.0/0\n\
             PersistentKeepalive = 25\n"
        );
        assert!(!config.contains("never-rendered"));
    }
}
