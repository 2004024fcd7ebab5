//! Notifications published after user and group writes.
//!
//! Subscribers (mailers, audit sinks, cache invalidation) receive every
//! event through a broadcast channel; publishing with nobody listening is
//! not an error.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

use crate::db::{Group, User};

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", content = "payload")]
pub enum AuthEvent {
    UserCreated {
        user: User,
        ip_addr: Option<String>,
    },
    GroupCreated {
        group: Group,
        ip_addr: Option<String>,
    },
    UserDeleted {
        user: User,
        ip_addr: Option<String>,
    },
    GroupDeleted {
        group: Group,
        ip_addr: Option<String>,
    },
}

impl AuthEvent {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::UserCreated { .. } => "user_created",
            Self::GroupCreated { .. } => "group_created",
            Self::UserDeleted { .. } => "user_deleted",
            Self::GroupDeleted { .. } => "group_deleted",
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AuthEvent>,
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Returns the number of subscribers that received the event.
    pub fn publish(&self, event: AuthEvent) -> usize {
        let name = event.name();
        match self.sender.send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                debug!(event = name, "No subscribers for auth event");
                0
            }
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
