use crate::movement::mover::{MoverDescriptor, StepRules};
use crate::pathing::context::{PathContext, PlanStats};
use crate::pathing::movement_path::{MovementPath, PathRequest, DEFAULT_WAYPOINT_MAX_DISTANCE};
use crate::pathing::sector_graph::GraphRegistry;
use crate::world::map::WorldMap;
use crate::world::position::{Direction, Point3D};

/// Everything a follower asks of the planning core.
pub trait Planner {
    fn plan(&mut self, map: Option<&dyn WorldMap>, request: &PathRequest) -> MovementPath;

    /// Coarse route towards a distant goal, or `None` when the sector graph cannot help.
    fn waypoints(
        &mut self,
        map: Option<&dyn WorldMap>,
        mover: &MoverDescriptor,
        goal: Point3D,
    ) -> Option<Vec<Point3D>>;

    /// Z the mover would land on after one step, as the resolver sees it now.
    fn predict_step(
        &mut self,
        map: Option<&dyn WorldMap>,
        mover: &MoverDescriptor,
        direction: Direction,
    ) -> Option<i32>;
}

/// Production planner over one scratch context and the loaded sector graphs.
pub struct Pathfinder<'a> {
    ctx: &'a mut PathContext,
    graphs: &'a GraphRegistry,
    waypoint_max_distance: i32,
}

impl<'a> Pathfinder<'a> {
    pub fn new(ctx: &'a mut PathContext, graphs: &'a GraphRegistry) -> Self {
        Self {
            ctx,
            graphs,
            waypoint_max_distance: DEFAULT_WAYPOINT_MAX_DISTANCE,
        }
    }

    pub fn with_waypoint_max_distance(mut self, distance: i32) -> Self {
        self.waypoint_max_distance = distance;
        self
    }

    pub fn stats(&self) -> PlanStats {
        self.ctx.stats()
    }

    pub fn graphs(&self) -> &GraphRegistry {
        self.graphs
    }
}

impl Planner for Pathfinder<'_> {
    fn plan(&mut self, map: Option<&dyn WorldMap>, request: &PathRequest) -> MovementPath {
        let request = PathRequest {
            waypoint_max_distance: self.waypoint_max_distance,
            ..request.clone()
        };
        MovementPath::plan(self.ctx, self.graphs, map, &request)
    }

    fn waypoints(
        &mut self,
        map: Option<&dyn WorldMap>,
        mover: &MoverDescriptor,
        goal: Point3D,
    ) -> Option<Vec<Point3D>> {
        let map = map?;
        self.ctx.stats_mut().waypoint_queries += 1;
        let Some(graph) = self.graphs.get(map.id()) else {
            log::debug!(
                target: "shardnav::pathing",
                "no sector graph for {}; {} -> {} has no coarse route",
                map.id(),
                mover.location,
                goal
            );
            return None;
        };
        graph.find_waypoints(mover.location, goal, self.waypoint_max_distance)
    }

    fn predict_step(
        &mut self,
        map: Option<&dyn WorldMap>,
        mover: &MoverDescriptor,
        direction: Direction,
    ) -> Option<i32> {
        let rules = StepRules::for_search(&mover.caps);
        let resolver = self.ctx.resolver();
        // Items may have moved since the last call.
        resolver.reset();
        resolver.check_movement(map, mover, rules, mover.location, direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::mover::Capabilities;
    use crate::pathing::sector_graph::SectorGraph;
    use crate::testing::{add_wall, open_map, walker_at};

    #[test]
    fn waypoints_need_a_loaded_graph() {
        let map = open_map(64, 64);
        let mut ctx = PathContext::new();
        let graphs = GraphRegistry::new();
        let mut planner = Pathfinder::new(&mut ctx, &graphs);
        let mover = walker_at(Point3D::new(2, 2, 0));
        assert!(planner.waypoints(Some(&map), &mover, Point3D::new(60, 60, 0)).is_none());
        assert_eq!(planner.stats().waypoint_queries, 1);
    }

    #[test]
    fn waypoints_come_from_the_registry() {
        let map = open_map(64, 16);
        let mut ctx = PathContext::new();
        let mut graphs = GraphRegistry::new();
        graphs.insert(SectorGraph::build(&map, &mut ctx, &Capabilities::walker()));
        let mut planner = Pathfinder::new(&mut ctx, &graphs);
        let mover = walker_at(Point3D::new(2, 2, 0));
        let goal = Point3D::new(60, 5, 0);
        let route = planner.waypoints(Some(&map), &mover, goal).expect("route");
        assert_eq!(route.first(), Some(&Point3D::new(0, 0, 0)));
        assert_eq!(route.last(), Some(&goal));

        let mut capped = Pathfinder::new(&mut ctx, &graphs).with_waypoint_max_distance(10);
        assert!(capped.waypoints(Some(&map), &mover, goal).is_none());
    }

    #[test]
    fn predict_step_reports_blocked_steps() {
        let mut map = open_map(16, 16);
        add_wall(&mut map, 3, 2);
        let mut ctx = PathContext::new();
        let graphs = GraphRegistry::new();
        let mut planner = Pathfinder::new(&mut ctx, &graphs);
        let mover = walker_at(Point3D::new(2, 2, 0));
        assert_eq!(planner.predict_step(Some(&map), &mover, Direction::South), Some(0));
        assert_eq!(planner.predict_step(Some(&map), &mover, Direction::East), None);
    }
}
