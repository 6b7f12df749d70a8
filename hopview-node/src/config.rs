//! Load config from file and environment.

use std::net::{AddrParseError, Ipv4Addr};
use std::path::PathBuf;

use serde::Deserialize;

/// Daemon configuration. File: ~/.config/hopview/config.toml or
/// /etc/hopview/config.toml.
/// Env overrides: HOPVIEW_GOSSIP_PORT, HOPVIEW_DISCOVERY_PORT, HOPVIEW_SUBNET.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Gossip UDP port (default 12345).
    #[serde(default = "default_gossip_port")]
    pub gossip_port: u16,
    /// Discovery UDP port, broadcast-addressed (default 12346).
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    /// /24 prefix node addresses are derived from (default "10.0.0").
    #[serde(default = "default_subnet")]
    pub subnet: String,
}

fn default_gossip_port() -> u16 {
    12345
}
fn default_discovery_port() -> u16 {
    12346
}
fn default_subnet() -> String {
    "10.0.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gossip_port: default_gossip_port(),
            discovery_port: default_discovery_port(),
            subnet: default_subnet(),
        }
    }
}

impl Config {
    /// Address of the node at `index`: `{subnet}.{index+1}`.
    pub fn node_addr(&self, index: u32) -> Result<Ipv4Addr, AddrParseError> {
        format!("{}.{}", self.subnet, index + 1).parse()
    }

    /// Subnet-local broadcast address used by the discovery channel.
    pub fn broadcast_addr(&self) -> Result<Ipv4Addr, AddrParseError> {
        format!("{}.255", self.subnet).parse()
    }
}

/// Load config: merge default, then config file (if present), then env vars.
pub fn load() -> Config {
    let mut c = load_file().unwrap_or_else(Config::default);
    if let Ok(s) = std::env::var("HOPVIEW_GOSSIP_PORT") {
        if let Ok(p) = s.parse::<u16>() {
            c.gossip_port = p;
        }
    }
    if let Ok(s) = std::env::var("HOPVIEW_DISCOVERY_PORT") {
        if let Ok(p) = s.parse::<u16>() {
            c.discovery_port = p;
        }
    }
    if let Ok(s) = std::env::var("HOPVIEW_SUBNET") {
        if !s.is_empty() {
            c.subnet = s;
        }
    }
    c
}

fn config_paths() -> Vec<PathBuf> {
    let home = std::env::var_os("HOME").map(PathBuf::from);
    let mut out = Vec::new();
    if let Some(h) = home {
        out.push(h.join(".config/hopview/config.toml"));
    }
    out.push(PathBuf::from("/etc/hopview/config.toml"));
    out
}

fn load_file() -> Option<Config> {
    for p in config_paths() {
        if p.exists() {
            if let Ok(s) = std::fs::read_to_string(&p) {
                if let Ok(c) = toml::from_str::<Config>(&s) {
                    return Some(c);
                }
            }
            break;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_addr_derived_from_index() {
        let cfg = Config::default();
        assert_eq!(cfg.node_addr(0).unwrap(), Ipv4Addr::new(10, 0, 0, 1));
        assert_eq!(cfg.node_addr(4).unwrap(), Ipv4Addr::new(10, 0, 0, 5));
        assert_eq!(cfg.broadcast_addr().unwrap(), Ipv4Addr::new(10, 0, 0, 255));
    }

    #[test]
    fn bad_subnet_is_an_error() {
        let cfg = Config {
            subnet: "not.a.prefix".to_string(),
            ..Config::default()
        };
        assert!(cfg.node_addr(0).is_err());
    }
}
