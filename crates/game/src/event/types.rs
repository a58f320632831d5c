use glam::Vec3;
use rkyv::{Archive, Deserialize, Serialize};

use crate::player::PlayerId;

/// Transport guarantee an event is sent with.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Archive,
    Serialize,
    Deserialize,
    serde::Serialize,
    serde::Deserialize,
)]
#[rkyv(compare(PartialEq), derive(Debug))]
pub enum DeliveryMethod {
    /// Every event arrives, in send order.
    ReliableOrdered,
    /// Stale events from the same source are dropped in favour of newer ones.
    ReliableSequenced,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Authority to peers.
    Downstream,
    /// Peer to authority.
    Upstream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PositionReport,
    CriticalListRemoval,
    ReviveRequest,
    ReviveSucceeded,
    ReviveStarted,
    ReviveCanceled,
    GhostStateChange,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PositionReport => "position-report",
            Self::CriticalListRemoval => "critical-list-removal",
            Self::ReviveRequest => "revive-request",
            Self::ReviveSucceeded => "revive-succeeded",
            Self::ReviveStarted => "revive-started",
            Self::ReviveCanceled => "revive-canceled",
            Self::GhostStateChange => "ghost-state-change",
        }
    }
}

/// Player lifecycle event relayed through the authority.
///
/// Carries no sequence number; ordering comes from the transport channel.
#[derive(Debug, Clone, PartialEq, Archive, Serialize, Deserialize)]
#[rkyv(derive(Debug))]
pub enum RelayEvent {
    PositionReport {
        player_id: PlayerId,
        /// Milliseconds since the Unix epoch.
        time_of_death: u64,
        position: [f32; 3],
    },
    CriticalListRemoval {
        player_id: PlayerId,
    },
    ReviveRequest {
        reviewee_id: PlayerId,
        reviver_id: PlayerId,
    },
    ReviveSucceeded {
        reviver_id: PlayerId,
    },
    ReviveStarted {
        reviewee_id: PlayerId,
        reviver_id: PlayerId,
    },
    ReviveCanceled {
        reviewee_id: PlayerId,
        reviver_id: PlayerId,
    },
    GhostStateChange {
        player_id: PlayerId,
        is_visible: bool,
    },
}

impl RelayEvent {
    pub fn position_report(player_id: impl Into<PlayerId>, time_of_death: u64, position: Vec3) -> Self {
        Self::PositionReport {
            player_id: player_id.into(),
            time_of_death,
            position: position.to_array(),
        }
    }

    pub fn ghost(player_id: impl Into<PlayerId>, is_visible: bool) -> Self {
        Self::GhostStateChange {
            player_id: player_id.into(),
            is_visible,
        }
    }

    pub fn revive_request(reviewee_id: impl Into<PlayerId>, reviver_id: impl Into<PlayerId>) -> Self {
        Self::ReviveRequest {
            reviewee_id: reviewee_id.into(),
            reviver_id: reviver_id.into(),
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::PositionReport { .. } => EventKind::PositionReport,
            Self::CriticalListRemoval { .. } => EventKind::CriticalListRemoval,
            Self::ReviveRequest { .. } => EventKind::ReviveRequest,
            Self::ReviveSucceeded { .. } => EventKind::ReviveSucceeded,
            Self::ReviveStarted { .. } => EventKind::ReviveStarted,
            Self::ReviveCanceled { .. } => EventKind::ReviveCanceled,
            Self::GhostStateChange { .. } => EventKind::GhostStateChange,
        }
    }

    pub fn delivery_method(&self, direction: Direction) -> DeliveryMethod {
        match direction {
            Direction::Downstream => DeliveryMethod::ReliableOrdered,
            Direction::Upstream => DeliveryMethod::ReliableSequenced,
        }
    }

    /// The single player a downstream copy is addressed to. Only a
    /// successful revive is unicast; everything else is broadcast.
    pub fn recipient(&self) -> Option<&PlayerId> {
        match self {
            Self::ReviveSucceeded { reviver_id } => Some(reviver_id),
            _ => None,
        }
    }

    /// The player whose client sent this event, when the variant implies one.
    pub fn sender(&self) -> Option<&PlayerId> {
        match self {
            Self::ReviveRequest { reviver_id, .. }
            | Self::ReviveStarted { reviver_id, .. }
            | Self::ReviveCanceled { reviver_id, .. } => Some(reviver_id),
            _ => None,
        }
    }
}
