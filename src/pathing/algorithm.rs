use crate::movement::mover::MoverDescriptor;
use crate::world::map::WorldMap;
use crate::world::position::{in_range, Direction, Point3D};

/// Vertical slack when deciding whether a search node sits on the goal.
pub const GOAL_Z_TOLERANCE: i32 = 16;

/// Horizontal weight of the tile-search heuristic.
const HEURISTIC_WEIGHT: i32 = 11;

pub const SHORT_RANGE: i32 = 18;
pub const NAV_RANGE: i32 = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AlgorithmKind {
    FastAStar,
    SlowAStar,
    NavStar,
    Sector,
}

impl AlgorithmKind {
    pub const ALL: [AlgorithmKind; 4] = [
        AlgorithmKind::FastAStar,
        AlgorithmKind::SlowAStar,
        AlgorithmKind::NavStar,
        AlgorithmKind::Sector,
    ];

    /// Hard precondition; `Find` is never attempted when this is false.
    pub fn check_condition(self, start: Point3D, goal: Point3D) -> bool {
        match self {
            AlgorithmKind::FastAStar | AlgorithmKind::SlowAStar => in_range(start, goal, SHORT_RANGE),
            AlgorithmKind::NavStar => in_range(start, goal, NAV_RANGE),
            // Island and distance gating happens inside the waypoint query.
            AlgorithmKind::Sector => true,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            AlgorithmKind::FastAStar => "fast",
            AlgorithmKind::SlowAStar => "slow",
            AlgorithmKind::NavStar => "nav",
            AlgorithmKind::Sector => "sector",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        let kind = match name.trim().to_ascii_lowercase().as_str() {
            "fast" | "fastastar" => AlgorithmKind::FastAStar,
            "slow" | "slowastar" => AlgorithmKind::SlowAStar,
            "nav" | "navstar" => AlgorithmKind::NavStar,
            "sector" | "waypoint" => AlgorithmKind::Sector,
            _ => return None,
        };
        Some(kind)
    }
}

/// One tile-level search: who is moving, where from, where to, on which map.
#[derive(Clone, Copy)]
pub struct Search<'a> {
    pub map: &'a dyn WorldMap,
    pub mover: &'a MoverDescriptor,
    pub start: Point3D,
    pub goal: Point3D,
}

impl<'a> Search<'a> {
    pub fn new(map: &'a dyn WorldMap, mover: &'a MoverDescriptor, goal: Point3D) -> Self {
        Self {
            map,
            mover,
            start: mover.location,
            goal,
        }
    }

    pub fn from_point(self, start: Point3D, goal: Point3D) -> Self {
        Self { start, goal, ..self }
    }
}

/// Squared distance with the horizontal axes weighted up; deliberately inadmissible so the
/// search runs greedily towards the goal.
pub fn heuristic(x: i32, y: i32, z: i32, goal: Point3D) -> i32 {
    let dx = (x - goal.x) * HEURISTIC_WEIGHT;
    let dy = (y - goal.y) * HEURISTIC_WEIGHT;
    let dz = z - goal.z;
    dx.saturating_mul(dx)
        .saturating_add(dy.saturating_mul(dy))
        .saturating_add(dz.saturating_mul(dz))
}

pub fn reached(x: i32, y: i32, z: i32, goal: Point3D) -> bool {
    x == goal.x && y == goal.y && (z - goal.z).abs() <= GOAL_Z_TOLERANCE
}

/// Direction of a single-tile hop between neighbouring cells.
pub fn hop(from: (i32, i32), to: (i32, i32)) -> Option<Direction> {
    let dx = to.0 - from.0;
    let dy = to.1 - from.1;
    if dx.abs() > 1 || dy.abs() > 1 {
        return None;
    }
    Direction::from_delta(dx, dy)
}
