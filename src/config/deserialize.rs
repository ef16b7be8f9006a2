// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles service names and listen addresses.

use serde::Deserialize;
use std::net::SocketAddr;

use crate::types::ServiceName;

pub fn deserialize_service_name<'de, D>(deserializer: D) -> Result<ServiceName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ServiceName::new(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_listen_addr<'de, D>(deserializer: D) -> Result<SocketAddr, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    parse_listen_addr(&s).map_err(serde::de::Error::custom)
}

/// Parse `host:port`; a bare `:port` listens on all interfaces.
pub fn parse_listen_addr(value: &str) -> Result<SocketAddr, String> {
    let value = value.trim();
    let full = if value.starts_with(':') {
        format!("0.0.0.0{value}")
    } else {
        value.to_string()
    };
    full.parse()
        .map_err(|e| format!("invalid listen address {value}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_port_listens_everywhere() {
        assert_eq!(
            parse_listen_addr(":8484").unwrap(),
            SocketAddr::from(([0, 0, 0, 0], 8484))
        );
    }

    #[test]
    fn explicit_host_is_kept() {
        assert_eq!(
            parse_listen_addr("127.0.0.1:9000").unwrap(),
            SocketAddr::from(([127, 0, 0, 1], 9000))
        );
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_listen_addr("not-an-address").is_err());
        assert!(parse_listen_addr(":99999").is_err());
    }
}
