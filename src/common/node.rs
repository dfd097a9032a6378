//! Struct and implementation of a known or candidate overlay peer.
use std::{
    fmt::{self, Debug, Display, Formatter},
    net::{AddrParseError, IpAddr, Ipv4Addr, SocketAddr},
    num::ParseIntError,
    str::FromStr,
    sync::Arc,
};

use super::{DecodeIdError, NodeId, ProximityHash};

#[derive(Clone, PartialEq, Eq, Hash)]
/// A peer's identity and endpoints.
///
/// Immutable once constructed and cheap to clone, so it can be shared with
/// any thread. Bonding status and deferred lookups are not part of it, they
/// live with the discovery loop in [crate::core::Peer].
pub struct Node(Arc<NodeInner>);

#[derive(PartialEq, Eq, Hash)]
struct NodeInner {
    id: NodeId,
    ip: IpAddr,
    udp_port: u16,
    tcp_port: u16,
    hash: ProximityHash,
}

impl Node {
    /// Creates a new Node from an id, ip address and ports.
    ///
    /// IPv4-mapped IPv6 addresses are stored as plain IPv4.
    pub fn new(id: NodeId, ip: IpAddr, udp_port: u16, tcp_port: u16) -> Node {
        Node(Arc::new(NodeInner {
            id,
            ip: normalize_ip(ip),
            udp_port,
            tcp_port,
            hash: ProximityHash::of(&id),
        }))
    }

    /// Creates a random node for testing purposes.
    pub fn random() -> Node {
        Node::new(
            NodeId::random(),
            IpAddr::V4(Ipv4Addr::LOCALHOST),
            30303,
            30303,
        )
    }

    #[cfg(test)]
    pub(crate) fn unique(i: usize) -> Node {
        let mut bytes = [0; super::NODE_ID_SIZE];
        bytes[..8].copy_from_slice(&(i as u64).to_be_bytes());

        Node::new(
            NodeId::from(bytes),
            IpAddr::V4((i as u32).into()),
            i as u16,
            i as u16,
        )
    }

    // === Getters ===

    pub fn id(&self) -> &NodeId {
        &self.0.id
    }

    pub fn ip(&self) -> IpAddr {
        self.0.ip
    }

    pub fn udp_port(&self) -> u16 {
        self.0.udp_port
    }

    pub fn tcp_port(&self) -> u16 {
        self.0.tcp_port
    }

    /// The precomputed [ProximityHash] of this node's id.
    pub fn hash(&self) -> &ProximityHash {
        &self.0.hash
    }

    /// UDP endpoint for discovery messages.
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.0.ip, self.0.udp_port)
    }

    /// TCP endpoint for the application protocol.
    pub fn tcp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.0.ip, self.0.tcp_port)
    }
}

fn normalize_ip(ip: IpAddr) -> IpAddr {
    match ip {
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => ip,
        },
        IpAddr::V4(_) => ip,
    }
}

impl Debug for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.0.id)
            .field("addr", &self.addr())
            .field("tcp_port", &self.0.tcp_port)
            .finish()
    }
}

/// Formats as `enode://<id>@<ip>:<tcp>`, with `?discport=<udp>` when the ports differ.
impl Display for Node {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "enode://{}@{}", self.0.id, self.tcp_addr())?;

        if self.0.udp_port != self.0.tcp_port {
            write!(f, "?discport={}", self.0.udp_port)?;
        }

        Ok(())
    }
}

/// Parses `[enode://]<id>@<ip>:<tcp>[?discport=<udp>]`.
///
/// The `id` accepts the same forms as [NodeId::from_hex].
impl FromStr for Node {
    type Err = NodeParseError;

    fn from_str(s: &str) -> Result<Node, NodeParseError> {
        let s = s.strip_prefix("enode://").unwrap_or(s);

        let (id, endpoint) = s.split_once('@').ok_or(NodeParseError::MissingId)?;
        let id = NodeId::from_hex(id)?;

        let (address, udp_port) = match endpoint.split_once("?discport=") {
            Some((address, port)) => (address, Some(port.parse::<u16>()?)),
            None => (endpoint, None),
        };
        let address: SocketAddr = address.parse()?;

        Ok(Node::new(
            id,
            address.ip(),
            udp_port.unwrap_or(address.port()),
            address.port(),
        ))
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
/// Errors parsing the text form of a [Node].
pub enum NodeParseError {
    #[error("missing '<id>@' before the address")]
    MissingId,

    #[error("invalid node id: {0}")]
    InvalidId(#[from] DecodeIdError),

    #[error("invalid address: {0}")]
    InvalidAddress(#[from] AddrParseError),

    #[error("invalid discovery port: {0}")]
    InvalidDiscPort(#[from] ParseIntError),
}

#[cfg(test)]
mod tests {
    use std::net::Ipv6Addr;

    use super::*;

    #[test]
    fn ipv4_mapped_is_normalized() {
        let id = NodeId::random();
        let v4 = Ipv4Addr::new(10, 3, 58, 6);

        let plain = Node::new(id, IpAddr::V4(v4), 30303, 30303);
        let mapped = Node::new(id, IpAddr::V6(v4.to_ipv6_mapped()), 30303, 30303);

        assert_eq!(mapped.ip(), IpAddr::V4(v4));
        assert_eq!(plain.addr(), mapped.addr());
        assert_eq!(plain, mapped);
    }

    #[test]
    fn ipv6_is_kept() {
        let ip = IpAddr::V6(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1));
        let node = Node::new(NodeId::random(), ip, 1, 2);

        assert_eq!(node.ip(), ip);
        assert_eq!(node.addr(), SocketAddr::new(ip, 1));
        assert_eq!(node.tcp_addr(), SocketAddr::new(ip, 2));

        let compatible = IpAddr::V6(Ipv4Addr::new(1, 2, 3, 4).to_ipv6_compatible());
        assert_eq!(Node::new(NodeId::random(), compatible, 1, 1).ip(), compatible);
    }

    #[test]
    fn hash_is_precomputed() {
        let node = Node::random();

        assert_eq!(node.hash(), &node.id().proximity_hash());
        assert_eq!(node.clone().hash(), node.hash());
    }

    #[test]
    fn parse_and_display() {
        let id = NodeId::random();

        let text = format!("enode://{id}@10.3.58.6:30303?discport=30301");
        let node: Node = text.parse().unwrap();

        assert_eq!(node.id(), &id);
        assert_eq!(node.udp_port(), 30301);
        assert_eq!(node.tcp_port(), 30303);
        assert_eq!(node.to_string(), text);

        let bare: Node = format!("0x{id}@[::ffff:10.3.58.6]:30303").parse().unwrap();
        assert_eq!(bare.ip(), IpAddr::V4(Ipv4Addr::new(10, 3, 58, 6)));
        assert_eq!(bare.udp_port(), 30303);
        assert_eq!(bare.to_string(), format!("enode://{id}@10.3.58.6:30303"));
    }

    #[test]
    fn parse_errors() {
        let id = NodeId::random();

        assert_eq!(
            "10.3.58.6:30303".parse::<Node>(),
            Err(NodeParseError::MissingId)
        );
        assert!(matches!(
            "abcd@10.3.58.6:30303".parse::<Node>(),
            Err(NodeParseError::InvalidId(DecodeIdError::InvalidLength { .. }))
        ));
        assert!(matches!(
            format!("{id}@10.3.58.6").parse::<Node>(),
            Err(NodeParseError::InvalidAddress(_))
        ));
        assert!(matches!(
            format!("{id}@10.3.58.6:30303?discport=x").parse::<Node>(),
            Err(NodeParseError::InvalidDiscPort(_))
        ));
    }
}
