use std::net::SocketAddr;

use lazarus::{NodeId, PlayerId};

#[derive(Debug, Clone)]
pub enum ServerEvent {
    PeerJoined {
        node_id: NodeId,
        addr: SocketAddr,
        player_id: Option<PlayerId>,
    },
    PeerLeft {
        node_id: NodeId,
        reason: DisconnectReason,
    },
    JoinDenied {
        addr: SocketAddr,
        reason: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectReason {
    Graceful,
    Timeout,
}

impl DisconnectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisconnectReason::Graceful => "left",
            DisconnectReason::Timeout => "timed out",
        }
    }
}
