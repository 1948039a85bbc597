//! Relay configuration from the environment.

use crate::RelayError;
use std::net::SocketAddr;

pub const ADDR_VAR: &str = "SKETCHBOARD_ADDR";
pub const CHANNEL_CAPACITY_VAR: &str = "SKETCHBOARD_CHANNEL_CAPACITY";

const DEFAULT_ADDR: &str = "0.0.0.0:3030";
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayConfig {
    /// Listen address.
    pub addr: SocketAddr,
    /// Per-session broadcast buffer; slower receivers are resynced.
    pub channel_capacity: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 3030)),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl RelayConfig {
    /// Read `SKETCHBOARD_ADDR` and `SKETCHBOARD_CHANNEL_CAPACITY`.
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset variables use defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RelayError> {
        let addr_text = lookup(ADDR_VAR).unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let addr: SocketAddr = addr_text.trim().parse().map_err(|_| {
            RelayError::Config(format!("{ADDR_VAR}={addr_text:?} is not a socket address"))
        })?;

        let channel_capacity = match lookup(CHANNEL_CAPACITY_VAR) {
            Some(text) => match text.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(RelayError::Config(format!(
                        "{CHANNEL_CAPACITY_VAR}={text:?} must be a positive integer"
                    )));
                }
            },
            None => DEFAULT_CHANNEL_CAPACITY,
        };

        Ok(Self {
            addr,
            channel_capacity,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, RelayConfig::default());
        assert_eq!(config.addr.port(), 3030);
    }

    #[test]
    fn test_overrides() {
        let config = RelayConfig::from_lookup(lookup(&[
            (ADDR_VAR, "127.0.0.1:9000"),
            (CHANNEL_CAPACITY_VAR, " 16 "),
        ]))
        .unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.channel_capacity, 16);
    }

    #[test]
    fn test_invalid_values() {
        assert!(RelayConfig::from_lookup(lookup(&[(ADDR_VAR, "nowhere")])).is_err());
        assert!(RelayConfig::from_lookup(lookup(&[(CHANNEL_CAPACITY_VAR, "0")])).is_err());
        assert!(RelayConfig::from_lookup(lookup(&[(CHANNEL_CAPACITY_VAR, "lots")])).is_err());
    }
}
