//! Type-safe identifier wrappers.
//!
//! Games and trade offers get UUID v7 identifiers (time-ordered, so offers
//! sort by creation). Board coordinates and seats are small dense indices
//! assigned by the board layout and the engine respectively; they are kept
//! as distinct newtypes so a node can never be passed where an edge is
//! expected.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generates a newtype wrapper around [`Uuid`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub Uuid);

        impl $name {
            /// Create a new identifier using UUID v7 (time-ordered).
            pub fn new() -> Self {
                Self(Uuid::now_v7())
            }

            /// Return the inner [`Uuid`] value.
            pub const fn into_inner(self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

/// Generates a newtype wrapper around a small unsigned index.
macro_rules! define_index {
    (
        $(#[$meta:meta])*
        $name:ident($inner:ty), $label:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub $inner);

        impl $name {
            /// Return the raw index value.
            pub const fn index(self) -> $inner {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, concat!($label, "{}"), self.0)
            }
        }
    };
}

define_id! {
    /// Unique identifier for one game an agent takes part in.
    GameId
}

define_id! {
    /// Unique identifier for a trade offer.
    OfferId
}

define_index! {
    /// A seat at the table, as numbered by the engine.
    PlayerNumber(u8), "seat-"
}

define_index! {
    /// A land hex on the board.
    HexId(u8), "hex-"
}

define_index! {
    /// A node (hex corner) where settlements and cities stand.
    NodeId(u16), "node-"
}

define_index! {
    /// An edge (hex side) where roads and ships stand.
    EdgeId(u16), "edge-"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offer_ids_are_time_ordered() {
        let first = OfferId::new();
        let second = OfferId::new();
        assert!(first <= second);
        assert_ne!(first.into_inner(), Uuid::nil());
    }

    #[test]
    fn index_display_is_labelled() {
        assert_eq!(NodeId(12).to_string(), "node-12");
        assert_eq!(PlayerNumber(2).to_string(), "seat-2");
        assert_eq!(EdgeId(7).index(), 7);
    }
}
