use crate::movement::mover::MoverDescriptor;
use crate::pathing::algorithm::{AlgorithmKind, Search};
use crate::pathing::context::PathContext;
use crate::pathing::sector_graph::GraphRegistry;
use crate::world::map::{MapId, WorldMap};
use crate::world::position::{Direction, Point3D};
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Default cap on sector routes, in tiles.
pub const DEFAULT_WAYPOINT_MAX_DISTANCE: i32 = 2048;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathRequest {
    pub mover: MoverDescriptor,
    pub goal: Point3D,
    /// Strategy to use instead of the default order; diagnostic callers set this.
    pub forced: Option<AlgorithmKind>,
    pub waypoint_max_distance: i32,
}

impl PathRequest {
    pub fn new(mover: MoverDescriptor, goal: Point3D) -> Self {
        Self {
            mover,
            goal,
            forced: None,
            waypoint_max_distance: DEFAULT_WAYPOINT_MAX_DISTANCE,
        }
    }

    pub fn forced(mut self, kind: AlgorithmKind) -> Self {
        self.forced = Some(kind);
        self
    }
}

/// Result of one planning call. Immutable once built; a failed path carries no directions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementPath {
    map: MapId,
    start: Point3D,
    goal: Point3D,
    directions: Option<Vec<Direction>>,
    algorithm: Option<AlgorithmKind>,
}

impl MovementPath {
    pub fn failed(map: MapId, start: Point3D, goal: Point3D) -> Self {
        Self {
            map,
            start,
            goal,
            directions: None,
            algorithm: None,
        }
    }

    pub fn succeeded(
        map: MapId,
        start: Point3D,
        goal: Point3D,
        directions: Vec<Direction>,
        algorithm: AlgorithmKind,
    ) -> Self {
        Self {
            map,
            start,
            goal,
            directions: Some(directions),
            algorithm: Some(algorithm),
        }
    }

    /// Plans a path for `request`, trying each eligible strategy in turn.
    ///
    /// Without a physical map the result is a failure; a strategy that panics is logged and
    /// treated as having found nothing.
    pub fn plan(
        ctx: &mut PathContext,
        graphs: &GraphRegistry,
        map: Option<&dyn WorldMap>,
        request: &PathRequest,
    ) -> Self {
        let start = request.mover.location;
        let map_id = map.map_or(request.mover.map, |map| map.id());
        let failed = Self::failed(map_id, start, request.goal);
        let Some(map) = map.filter(|map| !map.id().is_internal()) else {
            return failed;
        };

        let search = Search::new(map, &request.mover, request.goal);
        let graph = graphs.get(map.id());
        for kind in strategies(request.forced, start, request.goal) {
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                ctx.run(kind, &search, graph, request.waypoint_max_distance)
            }));
            match outcome {
                Ok(Some(directions)) => {
                    log::debug!(
                        target: "shardnav::pathing",
                        "{} path {} -> {} on {}: {} steps",
                        kind.name(),
                        start,
                        request.goal,
                        map.id(),
                        directions.len()
                    );
                    return Self::succeeded(map.id(), start, request.goal, directions, kind);
                }
                Ok(None) => {}
                Err(payload) => {
                    ctx.stats_mut().faults += 1;
                    log::error!(
                        target: "shardnav::pathing",
                        "{} search panicked for {} -> {} on {}: {}",
                        kind.name(),
                        start,
                        request.goal,
                        map.id(),
                        panic_message(payload.as_ref())
                    );
                }
            }
        }
        failed
    }

    pub fn success(&self) -> bool {
        self.directions.is_some()
    }

    /// Step directions; empty for a failed path.
    pub fn directions(&self) -> &[Direction] {
        self.directions.as_deref().unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.directions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.directions().is_empty()
    }

    pub fn map(&self) -> MapId {
        self.map
    }

    pub fn start(&self) -> Point3D {
        self.start
    }

    pub fn goal(&self) -> Point3D {
        self.goal
    }

    pub fn algorithm(&self) -> Option<AlgorithmKind> {
        self.algorithm
    }
}

/// Strategies to try, shortest range first. A forced strategy is the only one tried.
fn strategies(forced: Option<AlgorithmKind>, start: Point3D, goal: Point3D) -> Vec<AlgorithmKind> {
    if let Some(kind) = forced {
        return vec![kind];
    }
    let short = [AlgorithmKind::FastAStar, AlgorithmKind::SlowAStar];
    let eligible: Vec<AlgorithmKind> = short
        .into_iter()
        .filter(|kind| kind.check_condition(start, goal))
        .collect();
    if !eligible.is_empty() {
        return eligible;
    }
    if AlgorithmKind::NavStar.check_condition(start, goal) {
        return vec![AlgorithmKind::NavStar];
    }
    Vec::new()
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
