//! WireGuard access broker: accounts, bearer sessions and per-user peers
//! provisioned on remote VPN hosts.

pub mod config;
pub mod db;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;

pub mod auth {
    pub mod token;
}

pub mod crypto {
    pub mod aes;
    pub mod keypair;
    pub mod session;
}

pub mod models {
    pub mod peer;
    pub mod server;
    pub mod user;
}

pub mod repositories {
    pub mod memory;
    pub mod peer;
    pub mod server;
    pub mod user;
}

pub mod remote {
    pub mod client;
    pub mod known_hosts;
    pub mod ssh;
}

pub mod wireguard {
    pub mod allocator;
    pub mod config;
}

pub mod services {
    pub mod auth;
    pub mod profile;
    pub mod provisioning;
    pub mod session;
}

pub mod handlers {
    pub mod auth;
    pub mod profile;
    pub mod vpn;
}

pub mod middleware_layer {
    pub mod auth;
}

pub mod validation {
    pub mod auth;
    pub mod json;
}
