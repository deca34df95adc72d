//! Entity identification.
//!
//! Every combatant on a board (card or slot) carries an `EntityId`. Ids are
//! allocated from a process-wide counter, so they stay unique across every
//! battle simulated in the same process and are never reused.
//!
//! ```
//! use bifronte::core::EntityId;
//!
//! let a = EntityId::allocate();
//! let b = EntityId::allocate();
//! assert!(b > a);
//! ```

use std::sync::atomic::{AtomicU32, Ordering};

use serde::{Deserialize, Serialize};

static NEXT_ENTITY: AtomicU32 = AtomicU32::new(1);

/// Unique identifier for a combatant.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

impl EntityId {
    /// Allocate the next id.
    ///
    /// Monotonic for the lifetime of the process.
    #[must_use]
    pub fn allocate() -> Self {
        Self(NEXT_ENTITY.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
