use crate::world::map::MapId;
use crate::world::position::Point3D;

/// Body id of the staff form, which walks through doors.
pub const GM_BODY: u16 = 0x03DB;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub can_swim: bool,
    pub cant_walk: bool,
    pub can_fly: bool,
    /// Tile ids a flying mover may hover over instead of treating them as blockers.
    pub fly_tiles: Vec<u16>,
    pub can_open_doors: bool,
    pub can_move_over_obstacles: bool,
    pub is_player: bool,
    pub alive: bool,
    pub dead_bonded_pet: bool,
    pub body: u16,
}

impl Capabilities {
    /// A living, walking, non-player creature with no special abilities.
    pub fn walker() -> Self {
        Self {
            alive: true,
            ..Self::default()
        }
    }

    pub fn player() -> Self {
        Self {
            is_player: true,
            alive: true,
            ..Self::default()
        }
    }

    pub fn can_fly_over(&self, tile_id: u16) -> bool {
        self.can_fly && self.fly_tiles.contains(&tile_id)
    }

    /// Doors never block ghosts, bonded pets awaiting resurrection or the staff body.
    pub fn ignores_doors(&self) -> bool {
        !self.alive || self.dead_bonded_pet || self.body == GM_BODY
    }
}

/// Read-only snapshot of a mover handed to the planning core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoverDescriptor {
    pub location: Point3D,
    pub map: MapId,
    pub caps: Capabilities,
}

impl MoverDescriptor {
    pub fn new(location: Point3D, map: MapId, caps: Capabilities) -> Self {
        Self {
            location,
            map,
            caps,
        }
    }

    pub fn at(&self, location: Point3D) -> Self {
        Self {
            location,
            ..self.clone()
        }
    }
}

/// Rule toggles the resolver applies on top of a mover's own capabilities.
///
/// Searches build these from the mover once per call instead of flipping shared flags, so
/// a finished search leaves nothing behind that could change the next answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepRules {
    pub ignore_doors: bool,
    pub ignore_movable_impassables: bool,
}

impl StepRules {
    /// Rules for planning: door openers plan through doors, obstacle movers through clutter.
    pub fn for_search(caps: &Capabilities) -> Self {
        Self {
            ignore_doors: caps.can_open_doors,
            ignore_movable_impassables: caps.can_move_over_obstacles,
        }
    }
}
