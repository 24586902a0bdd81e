use crate::movement::mover::StepRules;
use crate::movement::resolver::MovementResolver;
use crate::pathing::algorithm::{AlgorithmKind, Search};
use crate::pathing::fast_astar::FastAStar;
use crate::pathing::nav_star::NavStar;
use crate::pathing::sector_graph::SectorGraph;
use crate::pathing::slow_astar::SlowAStar;
use crate::world::position::{Direction, Point3D};
use std::ops::{Deref, DerefMut};
use std::sync::{Mutex, PoisonError};

/// Invocation counters, one per strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlanStats {
    pub fast: u64,
    pub slow: u64,
    pub nav: u64,
    pub sector: u64,
    pub waypoint_queries: u64,
    pub faults: u64,
}

impl PlanStats {
    pub fn record(&mut self, kind: AlgorithmKind) {
        match kind {
            AlgorithmKind::FastAStar => self.fast += 1,
            AlgorithmKind::SlowAStar => self.slow += 1,
            AlgorithmKind::NavStar => self.nav += 1,
            AlgorithmKind::Sector => self.sector += 1,
        }
    }

    pub fn count(&self, kind: AlgorithmKind) -> u64 {
        match kind {
            AlgorithmKind::FastAStar => self.fast,
            AlgorithmKind::SlowAStar => self.slow,
            AlgorithmKind::NavStar => self.nav,
            AlgorithmKind::Sector => self.sector,
        }
    }
}

impl std::fmt::Display for PlanStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "fast={} slow={} nav={} sector={} waypoints={} faults={}",
            self.fast, self.slow, self.nav, self.sector, self.waypoint_queries, self.faults
        )
    }
}

/// All scratch state one planning call needs.
///
/// A context is used by one caller at a time; concurrent planners each take their own from a
/// [`ContextPool`].
#[derive(Default)]
pub struct PathContext {
    resolver: MovementResolver,
    fast: FastAStar,
    slow: SlowAStar,
    nav: NavStar,
    stats: PlanStats,
}

impl PathContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolver(&mut self) -> &mut MovementResolver {
        &mut self.resolver
    }

    pub fn stats(&self) -> PlanStats {
        self.stats
    }

    pub fn stats_mut(&mut self) -> &mut PlanStats {
        &mut self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = PlanStats::default();
    }

    /// Runs one strategy. `graph` is only consulted by [`AlgorithmKind::Sector`].
    pub fn run(
        &mut self,
        kind: AlgorithmKind,
        search: &Search<'_>,
        graph: Option<&SectorGraph>,
        waypoint_max_distance: i32,
    ) -> Option<Vec<Direction>> {
        self.stats.record(kind);
        self.resolver.reset();
        match kind {
            AlgorithmKind::FastAStar => self.fast.find(&mut self.resolver, search),
            AlgorithmKind::SlowAStar => self.slow.find(&mut self.resolver, search),
            AlgorithmKind::NavStar => self.nav.find(&mut self.resolver, search),
            AlgorithmKind::Sector => self.stitch(search, graph?, waypoint_max_distance),
        }
    }

    /// Fast search, falling back to the slow one; `None` when neither condition holds or
    /// both fail.
    pub fn short_range(&mut self, search: &Search<'_>) -> Option<(AlgorithmKind, Vec<Direction>)> {
        for kind in [AlgorithmKind::FastAStar, AlgorithmKind::SlowAStar] {
            if !kind.check_condition(search.start, search.goal) {
                continue;
            }
            if let Some(directions) = self.run(kind, search, None, 0) {
                return Some((kind, directions));
            }
        }
        None
    }

    /// Short-range search, then NavStar for pairs too far apart for it. Representative points
    /// of adjacent sectors can sit up to two sectors' width apart.
    pub fn link_range(&mut self, search: &Search<'_>) -> Option<(AlgorithmKind, Vec<Direction>)> {
        if let Some(found) = self.short_range(search) {
            return Some(found);
        }
        if !AlgorithmKind::NavStar.check_condition(search.start, search.goal) {
            return None;
        }
        self.run(AlgorithmKind::NavStar, search, None, 0)
            .map(|directions| (AlgorithmKind::NavStar, directions))
    }

    /// Joins short-range segments between coarse waypoints into one direction list; any
    /// segment failing fails the whole route.
    fn stitch(&mut self, search: &Search<'_>, graph: &SectorGraph, max_distance: i32) -> Option<Vec<Direction>> {
        self.stats.waypoint_queries += 1;
        let waypoints = graph.find_waypoints(search.start, search.goal, max_distance)?;
        let mut directions = Vec::new();
        let mut here = search.start;
        let mut cursor = 0;
        while cursor < waypoints.len() {
            while cursor + 1 < waypoints.len()
                && AlgorithmKind::FastAStar.check_condition(here, waypoints[cursor + 1])
            {
                cursor += 1;
            }
            let target = waypoints[cursor];
            let mover = search.mover.at(here);
            let leg = Search::new(search.map, &mover, target);
            let (_, segment) = self.link_range(&leg)?;
            here = self.replay(&leg, &segment)?;
            directions.extend(segment);
            cursor += 1;
        }
        Some(directions)
    }

    /// End point of walking `directions` from `search.start`, with resolver-predicted Z.
    fn replay(&mut self, search: &Search<'_>, directions: &[Direction]) -> Option<Point3D> {
        let rules = StepRules::for_search(&search.mover.caps);
        let mut here = search.start;
        for &direction in directions {
            let z = self
                .resolver
                .check_movement(Some(search.map), search.mover, rules, here, direction)?;
            here = here.step(direction).with_z(z);
        }
        Some(here)
    }
}

/// Shared stock of [`PathContext`]s for callers planning on several threads.
#[derive(Default)]
pub struct ContextPool {
    idle: Mutex<Vec<PathContext>>,
}

impl ContextPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire(&self) -> PooledContext<'_> {
        let context = self
            .idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_default();
        PooledContext {
            pool: self,
            context: Some(context),
        }
    }

    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

/// Borrowed context; goes back to its pool when dropped, including during unwinding.
pub struct PooledContext<'a> {
    pool: &'a ContextPool,
    context: Option<PathContext>,
}

impl Deref for PooledContext<'_> {
    type Target = PathContext;

    fn deref(&self) -> &PathContext {
        // Only `drop` takes the context out.
        match &self.context {
            Some(context) => context,
            None => unreachable!("pooled context used after release"),
        }
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut PathContext {
        match &mut self.context {
            Some(context) => context,
            None => unreachable!("pooled context used after release"),
        }
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        if let Some(context) = self.context.take() {
            self.pool
                .idle
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(context);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pathing::sector_graph::SectorGraph;
    use crate::testing::{open_map, walker_at};
    use crate::movement::mover::Capabilities;
    use crate::world::position::walk;

    #[test]
    fn stats_count_each_strategy() {
        let map = open_map(64, 64);
        let mover = walker_at(Point3D::new(10, 10, 0));
        let mut ctx = PathContext::new();
        let search = Search::new(&map, &mover, Point3D::new(14, 10, 0));
        let (kind, path) = ctx.short_range(&search).expect("path");
        assert_eq!(kind, AlgorithmKind::FastAStar);
        assert_eq!(path.len(), 4);
        assert_eq!(ctx.stats().fast, 1);
        assert_eq!(ctx.stats().slow, 0);
        ctx.run(AlgorithmKind::SlowAStar, &search, None, 0).expect("slow path");
        assert_eq!(ctx.stats().count(AlgorithmKind::SlowAStar), 1);
    }

    #[test]
    fn sector_strategy_needs_a_graph() {
        let map = open_map(64, 64);
        let mover = walker_at(Point3D::new(10, 10, 0));
        let mut ctx = PathContext::new();
        let search = Search::new(&map, &mover, Point3D::new(50, 50, 0));
        assert!(ctx.run(AlgorithmKind::Sector, &search, None, 2048).is_none());
        assert_eq!(ctx.stats().sector, 1);
    }

    #[test]
    fn sector_strategy_stitches_segments() {
        let map = open_map(96, 32);
        let mut ctx = PathContext::new();
        let graph = SectorGraph::build(&map, &mut ctx, &Capabilities::walker());
        let mover = walker_at(Point3D::new(3, 5, 0));
        let goal = Point3D::new(90, 20, 0);
        let search = Search::new(&map, &mover, goal);
        ctx.reset_stats();
        let path = ctx
            .run(AlgorithmKind::Sector, &search, Some(&graph), 2048)
            .expect("stitched path");
        assert!(walk(mover.location, &path).same_column(goal));
        assert_eq!(ctx.stats().nav, 0);
        assert_eq!(ctx.stats().waypoint_queries, 1);
    }

    #[test]
    fn pool_reuses_released_contexts() {
        let pool = ContextPool::new();
        assert_eq!(pool.idle(), 0);
        {
            let mut first = pool.acquire();
            first.stats_mut().fast = 7;
            let _second = pool.acquire();
        }
        assert_eq!(pool.idle(), 2);
        let reused = pool.acquire();
        assert_eq!(pool.idle(), 1);
        // Either context may come back first; the counter travels with it.
        assert!(reused.stats().fast == 7 || reused.stats().fast == 0);
    }

    #[test]
    fn pool_recovers_context_after_panic() {
        let pool = ContextPool::new();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ctx = pool.acquire();
            panic!("planner blew up");
        }));
        assert!(result.is_err());
        assert_eq!(pool.idle(), 1);
    }
}
