//! Core connection types.

use std::fmt;

/// Lifecycle state of a managed link.
///
/// Exactly one state is current at any time. Transitions happen only inside
/// [`ConnectionHandler::tick`](crate::connection::ConnectionHandler::tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum ConnectionState {
    /// Transport is being powered up and configured.
    #[default]
    Init = 0,
    /// Joining or registering with the network.
    Connecting = 1,
    /// Link is up; data may flow.
    Connected = 2,
    /// Link is being torn down on request.
    Disconnecting = 3,
    /// Link is down; keep-alive decides between retry and close.
    Disconnected = 4,
    /// Terminal until a new connect request.
    Closed = 5,
    /// Terminal after an unrecoverable failure, until a new connect request.
    Error = 6,
}

impl ConnectionState {
    /// All states, in discriminant order.
    pub const ALL: [ConnectionState; 7] = [
        Self::Init,
        Self::Connecting,
        Self::Connected,
        Self::Disconnecting,
        Self::Disconnected,
        Self::Closed,
        Self::Error,
    ];

    /// Create a ConnectionState from a raw byte value.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(value as usize).copied()
    }

    /// Check if the link is usable for reads and writes.
    pub fn is_connected(&self) -> bool {
        *self == Self::Connected
    }

    /// Check if a bring-up sequence is in flight.
    pub fn is_bringing_up(&self) -> bool {
        matches!(self, Self::Init | Self::Connecting)
    }

    /// Check if no autonomous transition can leave this state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }

    /// Check if a state handler may move from `self` to `next`.
    ///
    /// Covers handler outcomes only. Connect and disconnect requests apply
    /// their own transitions, and a rejected outcome faults to Error.
    pub fn can_advance_to(&self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        match self {
            Init => matches!(next, Connecting | Disconnected | Error),
            Connecting => matches!(next, Connecting | Connected | Disconnected | Error),
            Connected => matches!(next, Connected | Disconnected),
            Disconnecting => next == Disconnected,
            Disconnected => matches!(next, Init | Closed),
            Closed | Error => next == *self,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Disconnecting => "DISCONNECTING",
            Self::Disconnected => "DISCONNECTED",
            Self::Closed => "CLOSED",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Edge-triggered notification delivered to the owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Event {
    /// The link came up.
    Connected,
    /// An established link went away.
    Disconnected,
    /// Bring-up failed.
    Error,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_from_u8() {
        assert_eq!(ConnectionState::from_u8(0), Some(ConnectionState::Init));
        assert_eq!(ConnectionState::from_u8(6), Some(ConnectionState::Error));
        assert_eq!(ConnectionState::from_u8(7), None);

        for state in ConnectionState::ALL {
            assert_eq!(ConnectionState::from_u8(state as u8), Some(state));
        }
    }

    #[test]
    fn test_state_predicates() {
        assert!(ConnectionState::Connected.is_connected());
        assert!(!ConnectionState::Connecting.is_connected());
        assert!(ConnectionState::Init.is_bringing_up());
        assert!(ConnectionState::Connecting.is_bringing_up());
        assert!(!ConnectionState::Disconnected.is_bringing_up());
        assert!(ConnectionState::Closed.is_terminal());
        assert!(ConnectionState::Error.is_terminal());
        assert!(!ConnectionState::Disconnected.is_terminal());
        assert_eq!(ConnectionState::default(), ConnectionState::Init);
    }

    #[test]
    fn test_transition_graph_closed() {
        use ConnectionState::*;

        // Every state has at least one legal outcome, and terminal states
        // only map to themselves.
        for from in ConnectionState::ALL {
            let outcomes: Vec<_> = ConnectionState::ALL
                .into_iter()
                .filter(|to| from.can_advance_to(*to))
                .collect();
            assert!(!outcomes.is_empty(), "{from} has no outcome");
            if from.is_terminal() {
                assert_eq!(outcomes, vec![from]);
            }
        }

        assert!(Disconnected.can_advance_to(Init));
        assert!(Disconnected.can_advance_to(Closed));
        assert!(!Disconnected.can_advance_to(Connected));
        assert!(!Connected.can_advance_to(Connecting));
        assert!(!Init.can_advance_to(Connected));
    }

    #[test]
    fn test_display() {
        assert_eq!(ConnectionState::Disconnecting.to_string(), "DISCONNECTING");
        assert_eq!(Event::Error.to_string(), "error");
    }
}
