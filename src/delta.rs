//! Unit-state delta journal
//!
//! Every mutation of a unit that collaborators need to mirror is journaled
//! here in order. The engine drains the journal into outbound events after
//! each resolved action, so connected clients can patch their copy of the
//! game without receiving the whole state.

use crate::core::{Disposition, Facing, LocationKind, UnitId};
use crate::map::HexCoord;
use serde::{Deserialize, Serialize};

/// Atomic unit changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitDelta {
    Deployed {
        unit: UnitId,
        hex: HexCoord,
        facing: Facing,
    },

    Moved {
        unit: UnitId,
        from: Option<HexCoord>,
        to: HexCoord,
        facing: Facing,
        elevation: i32,
        prone: bool,
    },

    Damaged {
        unit: UnitId,
        location: LocationKind,
        armor: u32,
        rear_armor: Option<u32>,
        internal: u32,
    },

    LocationDestroyed { unit: UnitId, location: LocationKind },

    EquipmentHit {
        unit: UnitId,
        index: usize,
        destroyed: bool,
    },

    CrewHit {
        unit: UnitId,
        hits: u32,
        conscious: bool,
    },

    Heat { unit: UnitId, heat: u32 },

    Shutdown { unit: UnitId, shutdown: bool },

    Loaded { unit: UnitId, carrier: Option<UnitId> },

    Removed {
        unit: UnitId,
        disposition: Disposition,
    },
}

impl UnitDelta {
    pub fn unit(&self) -> UnitId {
        match self {
            UnitDelta::Deployed { unit, .. }
            | UnitDelta::Moved { unit, .. }
            | UnitDelta::Damaged { unit, .. }
            | UnitDelta::LocationDestroyed { unit, .. }
            | UnitDelta::EquipmentHit { unit, .. }
            | UnitDelta::CrewHit { unit, .. }
            | UnitDelta::Heat { unit, .. }
            | UnitDelta::Shutdown { unit, .. }
            | UnitDelta::Loaded { unit, .. }
            | UnitDelta::Removed { unit, .. } => *unit,
        }
    }
}

/// Ordered journal of unit deltas
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaJournal {
    /// Pending deltas (oldest first)
    entries: Vec<UnitDelta>,

    /// Is journaling enabled? (batch simulations turn it off)
    enabled: bool,
}

impl DeltaJournal {
    pub fn new() -> Self {
        DeltaJournal {
            entries: Vec::new(),
            enabled: true,
        }
    }

    /// Create a disabled journal (for batch runs and benchmarks)
    pub fn disabled() -> Self {
        DeltaJournal {
            entries: Vec::new(),
            enabled: false,
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.entries.clear();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Record a delta
    pub fn log(&mut self, delta: UnitDelta) {
        if self.enabled {
            self.entries.push(delta);
        }
    }

    /// Take every pending delta
    pub fn drain(&mut self) -> Vec<UnitDelta> {
        std::mem::take(&mut self.entries)
    }

    pub fn peek(&self) -> Option<&UnitDelta> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[UnitDelta] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DeltaJournal {
    fn default() -> Self {
        Self::new()
    }
}
