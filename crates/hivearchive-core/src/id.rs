//! Node identifiers.
//!
//! Nodes refer to each other through their registry slot, never through
//! owning pointers, so the graph carries no reference cycles.

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! arena_id {
    ($name:ident, $prefix:literal) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Ord, PartialOrd,
        )]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Id of the `index`-th slot in the owning arena.
            pub const fn from_index(index: usize) -> Self {
                Self(index as u32)
            }

            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }
    };
}

arena_id!(NodeId, "node");
