//! Server configuration for homedash.
//!
//! Loads configuration from environment variables with sensible defaults.
//! All settings can be overridden via `HOMEDASH_*` environment variables.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;

const DEFAULT_PORT: u16 = 2022;

/// Server configuration.
#[derive(Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    ///
    /// The admin principal is read from request headers, so anything other
    /// than loopback must only be reachable through the trusted proxy that
    /// sets them.
    pub bind_addr: SocketAddr,
    /// Path of the persisted dashboard configuration document.
    pub config_path: PathBuf,
    /// Log level filter (e.g., `info`, `debug`, `warn`).
    pub log_level: String,
    /// Passphrase for sealing newly supplied secrets. Unset disables sealing.
    pub secret_key: Option<String>,
    /// How the authenticating proxy identifies the caller.
    pub principal: PrincipalHeaders,
}

/// Trusted request headers set by the authenticating reverse proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalHeaders {
    /// Header carrying the username.
    pub user_header: String,
    /// Header carrying the role.
    pub role_header: String,
    /// Role value that grants admin access.
    pub admin_role: String,
}

impl Default for PrincipalHeaders {
    fn default() -> Self {
        Self {
            user_header: "x-forwarded-user".to_owned(),
            role_header: "x-forwarded-role".to_owned(),
            admin_role: "admin".to_owned(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Environment variables:
    /// - `PORT`: port to bind on, binds to `0.0.0.0` (put a trusted proxy in front)
    /// - `HOMEDASH_BIND_ADDR`: full bind address (overrides `PORT`, default: `127.0.0.1:2022`)
    /// - `HOMEDASH_CONFIG_PATH`: config document path (default: `./config/config.json`)
    /// - `HOMEDASH_LOG_LEVEL`: log filter (default: `info`)
    /// - `HOMEDASH_SECRET_KEY`: sealing passphrase (optional)
    /// - `HOMEDASH_USER_HEADER`: username header (default: `x-forwarded-user`)
    /// - `HOMEDASH_ROLE_HEADER`: role header (default: `x-forwarded-role`)
    /// - `HOMEDASH_ADMIN_ROLE`: admin role value (default: `admin`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let fallback = SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT));
        // Priority: HOMEDASH_BIND_ADDR > PORT > default
        let bind_addr = if let Some(addr) = lookup("HOMEDASH_BIND_ADDR") {
            addr.parse().unwrap_or(fallback)
        } else if let Some(port) = lookup("PORT") {
            let port: u16 = port.parse().unwrap_or(DEFAULT_PORT);
            SocketAddr::from(([0, 0, 0, 0], port))
        } else {
            fallback
        };

        let config_path = lookup("HOMEDASH_CONFIG_PATH")
            .map_or_else(|| PathBuf::from("./config/config.json"), PathBuf::from);

        let log_level = lookup("HOMEDASH_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        let secret_key = lookup("HOMEDASH_SECRET_KEY").filter(|k| !k.is_empty());

        let defaults = PrincipalHeaders::default();
        let principal = PrincipalHeaders {
            user_header: lookup("HOMEDASH_USER_HEADER")
                .map_or(defaults.user_header, |h| h.to_lowercase()),
            role_header: lookup("HOMEDASH_ROLE_HEADER")
                .map_or(defaults.role_header, |h| h.to_lowercase()),
            admin_role: lookup("HOMEDASH_ADMIN_ROLE").unwrap_or(defaults.admin_role),
        };

        Self {
            bind_addr,
            config_path,
            log_level,
            secret_key,
            principal,
        }
    }
}

impl ServerConfig {
    /// Whether the listener accepts connections from other hosts.
    #[must_use]
    pub fn is_exposed(&self) -> bool {
        !self.bind_addr.ip().is_loopback()
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("config_path", &self.config_path)
            .field("log_level", &self.log_level)
            .field("secret_key", &self.secret_key.as_ref().map(|_| "[REDACTED]"))
            .field("principal", &self.principal)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let cfg = config(&[]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([127, 0, 0, 1], 2022)));
        assert_eq!(cfg.config_path, PathBuf::from("./config/config.json"));
        assert_eq!(cfg.log_level, "info");
        assert!(cfg.secret_key.is_none());
        assert_eq!(cfg.principal, PrincipalHeaders::default());
    }

    #[test]
    fn bind_addr_wins_over_port() {
        let cfg = config(&[("PORT", "8080"), ("HOMEDASH_BIND_ADDR", "10.0.0.5:9000")]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([10, 0, 0, 5], 9000)));

        let cfg = config(&[("PORT", "8080")]);
        assert_eq!(cfg.bind_addr, SocketAddr::from(([0, 0, 0, 0], 8080)));
    }

    #[test]
    fn only_non_loopback_binds_are_exposed() {
        assert!(!config(&[]).is_exposed());
        assert!(config(&[("PORT", "8080")]).is_exposed());
        assert!(config(&[("HOMEDASH_BIND_ADDR", "192.168.1.10:2022")]).is_exposed());
        assert!(!config(&[("HOMEDASH_BIND_ADDR", "[::1]:2022")]).is_exposed());
    }

    #[test]
    fn header_names_are_lowercased() {
        let cfg = config(&[("HOMEDASH_ROLE_HEADER", "Remote-Groups"), ("HOMEDASH_ADMIN_ROLE", "Admins")]);
        assert_eq!(cfg.principal.role_header, "remote-groups");
        assert_eq!(cfg.principal.admin_role, "Admins");
    }

    #[test]
    fn empty_secret_key_disables_sealing() {
        assert!(config(&[("HOMEDASH_SECRET_KEY", "")]).secret_key.is_none());
    }

    #[test]
    fn debug_hides_secret_key() {
        let cfg = config(&[("HOMEDASH_SECRET_KEY", "hunter2")]);
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("[REDACTED]"));
    }
}
