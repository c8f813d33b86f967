//! Opaque ID newtypes for NoC topology entities.
//!
//! [`RouterId`] and [`LinkId`] are dense `u32` indices into the topology's
//! router and link arrays. They are `Copy`, `Hash`, `Ord`, and
//! `Serialize`/`Deserialize`.

use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Creates an ID from a raw `u32` index.
            pub const fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// Returns the raw `u32` index.
            pub const fn as_raw(self) -> u32 {
                self.0
            }

            /// Returns the index as a `usize`, for array-backed storage.
            pub fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

define_id!(
    /// Dense internal index of a router in a [`NocTopology`](crate::NocTopology).
    ///
    /// Distinct from the user-facing router id declared in the architecture
    /// description.
    RouterId
);

define_id!(
    /// Dense index of a directed link in a [`NocTopology`](crate::NocTopology).
    LinkId
);

define_id!(
    /// Index of a physical tile type in a [`DeviceGrid`](crate::DeviceGrid).
    TileTypeId
);
