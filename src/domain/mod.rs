//! Domain types for the auth store.
//!
//! Newtype ids keep user and group keys from being mixed up at call sites,
//! and `events` carries the notifications published after writes.

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! id_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(i32);

        impl $name {
            #[must_use]
            pub const fn new(id: i32) -> Self {
                debug_assert!(id >= 0, "ids should be non-negative");
                Self(id)
            }

            #[must_use]
            pub const fn value(&self) -> i32 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$name> for i32 {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl From<i32> for $name {
            fn from(id: i32) -> Self {
                Self::new(id)
            }
        }
    };
}

id_newtype!(
    /// Primary key of an `auth_users` row.
    ///
    /// ```rust
    /// use apex::domain::UserId;
    ///
    /// let id = UserId::new(7);
    /// assert_eq!(id.value(), 7);
    /// assert_eq!(id.to_string(), "7");
    /// ```
    UserId
);

id_newtype!(
    /// Primary key of an `auth_groups` row.
    GroupId
);

/// Where an authenticated identity came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Local username/password account.
    Internal,
    /// Identity asserted by a third-party provider.
    External,
}

impl Origin {
    /// `(internal_user, external_user)` column values.
    #[must_use]
    pub const fn flags(self) -> (bool, bool) {
        match self {
            Self::Internal => (true, false),
            Self::External => (false, true),
        }
    }
}
