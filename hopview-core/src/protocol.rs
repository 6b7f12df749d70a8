//! Message types for the two channels: tagged gossip packets (bincode, see
//! wire module) and single-line text discovery messages.

use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

use crate::view::View;

/// Gossip channel datagram. A pull carries no payload; the receiver answers
/// it with a push of its current view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum GossipPacket {
    Pull,
    Push(View),
}

/// Discovery channel datagram: `ANNOUNCE` or `MAYDAY <addr>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryMessage {
    /// Periodic presence broadcast.
    Announce,
    /// Cooperative eviction notice for an unreachable address.
    Mayday(Ipv4Addr),
}

impl DiscoveryMessage {
    pub fn encode(&self) -> String {
        match self {
            DiscoveryMessage::Announce => "ANNOUNCE".to_string(),
            DiscoveryMessage::Mayday(addr) => format!("MAYDAY {}", addr),
        }
    }

    /// Strict grammar: anything but the two known tags is an error and the
    /// datagram is dropped by the caller.
    pub fn parse(text: &str) -> Result<Self, DiscoveryParseError> {
        let text = text.trim();
        if text == "ANNOUNCE" {
            return Ok(DiscoveryMessage::Announce);
        }
        if let Some(rest) = text.strip_prefix("MAYDAY ") {
            let addr = rest
                .trim()
                .parse()
                .map_err(|_| DiscoveryParseError::BadAddress)?;
            return Ok(DiscoveryMessage::Mayday(addr));
        }
        Err(DiscoveryParseError::UnknownTag)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DiscoveryParseError {
    #[error("unknown discovery tag")]
    UnknownTag,
    #[error("malformed mayday address")]
    BadAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announce_roundtrip() {
        let encoded = DiscoveryMessage::Announce.encode();
        assert_eq!(encoded, "ANNOUNCE");
        assert_eq!(
            DiscoveryMessage::parse(&encoded).unwrap(),
            DiscoveryMessage::Announce
        );
    }

    #[test]
    fn mayday_roundtrip() {
        let addr: Ipv4Addr = "10.0.0.7".parse().unwrap();
        let encoded = DiscoveryMessage::Mayday(addr).encode();
        assert_eq!(encoded, "MAYDAY 10.0.0.7");
        assert_eq!(
            DiscoveryMessage::parse(&encoded).unwrap(),
            DiscoveryMessage::Mayday(addr)
        );
    }

    #[test]
    fn parse_tolerates_surrounding_whitespace() {
        assert_eq!(
            DiscoveryMessage::parse("  ANNOUNCE\n").unwrap(),
            DiscoveryMessage::Announce
        );
    }

    #[test]
    fn parse_rejects_unknown_tag() {
        assert!(matches!(
            DiscoveryMessage::parse("HELLO"),
            Err(DiscoveryParseError::UnknownTag)
        ));
        assert!(matches!(
            DiscoveryMessage::parse(""),
            Err(DiscoveryParseError::UnknownTag)
        ));
    }

    #[test]
    fn parse_rejects_bad_mayday_address() {
        assert!(matches!(
            DiscoveryMessage::parse("MAYDAY not-an-address"),
            Err(DiscoveryParseError::BadAddress)
        ));
        assert!(matches!(
            DiscoveryMessage::parse("MAYDAY "),
            Err(DiscoveryParseError::BadAddress)
        ));
    }
}
