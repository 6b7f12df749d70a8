//! Gossip datagram codec: one bincode-encoded packet per datagram.
//!
//! Decoding is schema-validated; a datagram that does not decode to a known
//! packet variant is an error, never evaluated or partially applied.

use crate::protocol::GossipPacket;

const MAX_DATAGRAM_LEN: usize = 60 * 1024;

/// Encode a packet into a single datagram payload.
pub fn encode_packet(packet: &GossipPacket) -> Result<Vec<u8>, PacketEncodeError> {
    let payload = bincode::serialize(packet).map_err(PacketEncodeError::Encode)?;
    if payload.len() > MAX_DATAGRAM_LEN {
        return Err(PacketEncodeError::TooLarge);
    }
    Ok(payload)
}

#[derive(Debug, thiserror::Error)]
pub enum PacketEncodeError {
    #[error("encode error: {0}")]
    Encode(#[from] bincode::Error),
    #[error("packet exceeds datagram size")]
    TooLarge,
}

/// Decode one received datagram.
pub fn decode_packet(bytes: &[u8]) -> Result<GossipPacket, PacketDecodeError> {
    if bytes.len() > MAX_DATAGRAM_LEN {
        return Err(PacketDecodeError::TooLarge);
    }
    bincode::deserialize(bytes).map_err(PacketDecodeError::Decode)
}

#[derive(Debug, thiserror::Error)]
pub enum PacketDecodeError {
    #[error("datagram too large")]
    TooLarge,
    #[error("decode error: {0}")]
    Decode(#[from] bincode::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::View;
    use std::net::Ipv4Addr;

    fn sample_view() -> View {
        [
            (Ipv4Addr::new(10, 0, 0, 1), 0u32),
            (Ipv4Addr::new(10, 0, 0, 2), 1u32),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn roundtrip_pull() {
        let bytes = encode_packet(&GossipPacket::Pull).unwrap();
        assert!(matches!(
            decode_packet(&bytes).unwrap(),
            GossipPacket::Pull
        ));
    }

    #[test]
    fn roundtrip_push() {
        let view = sample_view();
        let bytes = encode_packet(&GossipPacket::Push(view.clone())).unwrap();
        match decode_packet(&bytes).unwrap() {
            GossipPacket::Push(decoded) => assert_eq!(decoded, view),
            GossipPacket::Pull => panic!("expected Push"),
        }
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            decode_packet(&[0xff; 16]),
            Err(PacketDecodeError::Decode(_))
        ));
        assert!(decode_packet(&[]).is_err());
    }

    #[test]
    fn oversized_datagram_is_rejected() {
        let bytes = vec![0u8; MAX_DATAGRAM_LEN + 1];
        assert!(matches!(
            decode_packet(&bytes),
            Err(PacketDecodeError::TooLarge)
        ));
    }
}
