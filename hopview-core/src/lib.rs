//! HopView gossip protocol reference implementation.
//! Pure protocol logic: no I/O; the daemon crate drives sockets and tasks.

pub mod node;
pub mod protocol;
pub mod view;
pub mod wire;

pub use node::NodeState;
pub use protocol::{DiscoveryMessage, DiscoveryParseError, GossipPacket};
pub use view::View;
pub use wire::{decode_packet, encode_packet, PacketDecodeError, PacketEncodeError};
