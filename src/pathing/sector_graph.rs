//! Coarse waypoint graph over 16x16 map sectors.
//!
//! Each sector contributes at most one representative standing point. Neighbouring sectors are
//! linked when a short-range search connects their points, with the path length as the edge
//! weight. Connected components ("islands") are labelled after linking so unreachable goals
//! can be rejected without searching.

use crate::movement::mover::{Capabilities, MoverDescriptor};
use crate::movement::resolver::{get_average_z, MovementResolver};
use crate::pathing::algorithm::Search;
use crate::pathing::context::PathContext;
use crate::pathing::snapshot::GraphError;
use crate::world::map::{MapId, SectorCoord, WorldMap, SECTOR_SIZE};
use crate::world::position::{in_range, manhattan, Point3D};
use crate::world::tile::TileFlags;
use std::collections::{HashMap, VecDeque};
use std::time::Instant;

pub const MAX_LINKS: usize = 8;
pub const NO_ISLAND: u32 = 0;

/// Neighbour offsets probed during linking; the other four directions are covered from the
/// opposite side.
const LINK_OFFSETS: [(i32, i32); 4] = [(1, 0), (0, 1), (1, 1), (-1, 1)];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectorLink {
    pub to: SectorCoord,
    pub distance: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectorNode {
    pub point: Option<Point3D>,
    pub island: u32,
    pub links: Vec<SectorLink>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphSummary {
    pub sectors: usize,
    pub points: usize,
    pub links: usize,
    pub islands: u32,
}

impl std::fmt::Display for GraphSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} sectors, {} points, {} links, {} islands",
            self.sectors, self.points, self.links, self.islands
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorGraph {
    map: MapId,
    width: i32,
    height: i32,
    nodes: Vec<SectorNode>,
}

impl SectorGraph {
    /// A graph with every sector empty; useful as a builder target and in tests.
    pub fn empty(map: MapId, width: i32, height: i32) -> Self {
        let count = (width.max(0) * height.max(0)) as usize;
        Self {
            map,
            width: width.max(0),
            height: height.max(0),
            nodes: vec![SectorNode::default(); count],
        }
    }

    pub(crate) fn from_parts(
        map: MapId,
        width: i32,
        height: i32,
        nodes: Vec<SectorNode>,
    ) -> Result<Self, GraphError> {
        if width < 0 || height < 0 || nodes.len() != (width * height) as usize {
            return Err(GraphError::Corrupt(format!(
                "{} sector records for a {}x{} grid",
                nodes.len(),
                width,
                height
            )));
        }
        Ok(Self {
            map,
            width,
            height,
            nodes,
        })
    }

    /// Builds the graph from scratch for `map`, linking sectors as `builder` would walk.
    pub fn build(map: &dyn WorldMap, ctx: &mut PathContext, builder: &Capabilities) -> Self {
        let started = Instant::now();
        let mut graph = Self::empty(map.id(), map.sectors_wide(), map.sectors_high());

        ctx.resolver().reset();
        for sy in 0..graph.height {
            for sx in 0..graph.width {
                let coord = SectorCoord::new(sx, sy);
                let point = find_spawn_point(ctx.resolver(), map, coord);
                if let Some(node) = graph.node_mut(coord) {
                    node.point = point;
                }
            }
        }

        for sy in 0..graph.height {
            for sx in 0..graph.width {
                let from = SectorCoord::new(sx, sy);
                let Some(start) = graph.point(from) else {
                    continue;
                };
                let mover = MoverDescriptor::new(start, map.id(), builder.clone());
                for (dx, dy) in LINK_OFFSETS {
                    let to = SectorCoord::new(sx + dx, sy + dy);
                    let Some(goal) = graph.point(to) else {
                        continue;
                    };
                    let search = Search::new(map, &mover, goal);
                    if let Some((_, directions)) = ctx.link_range(&search) {
                        graph.link(from, to, directions.len() as i32);
                    }
                }
            }
        }

        graph.label_islands();
        log::info!(
            target: "shardnav::pathing::sector_graph",
            "built sector graph for {}: {} in {} ms",
            graph.map,
            graph.summary(),
            started.elapsed().as_millis()
        );
        graph
    }

    pub fn map(&self) -> MapId {
        self.map
    }

    pub fn width(&self) -> i32 {
        self.width
    }

    pub fn height(&self) -> i32 {
        self.height
    }

    pub fn nodes(&self) -> &[SectorNode] {
        &self.nodes
    }

    fn index(&self, coord: SectorCoord) -> Option<usize> {
        if coord.x < 0 || coord.y < 0 || coord.x >= self.width || coord.y >= self.height {
            return None;
        }
        Some((coord.y * self.width + coord.x) as usize)
    }

    fn coord(&self, index: usize) -> SectorCoord {
        let index = index as i32;
        SectorCoord::new(index % self.width, index / self.width)
    }

    pub fn node(&self, coord: SectorCoord) -> Option<&SectorNode> {
        self.index(coord).map(|i| &self.nodes[i])
    }

    pub fn node_mut(&mut self, coord: SectorCoord) -> Option<&mut SectorNode> {
        let index = self.index(coord)?;
        Some(&mut self.nodes[index])
    }

    pub fn point(&self, coord: SectorCoord) -> Option<Point3D> {
        self.node(coord).and_then(|node| node.point)
    }

    /// Island id of the sector holding `location`, or `None` when that sector has no point.
    pub fn island_of(&self, location: Point3D) -> Option<u32> {
        let node = self.node(SectorCoord::from(location))?;
        (node.island != NO_ISLAND).then_some(node.island)
    }

    pub fn same_island(&self, a: Point3D, b: Point3D) -> bool {
        match (self.island_of(a), self.island_of(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Adds a bidirectional link, replacing any existing distance between the two sectors.
    pub fn link(&mut self, a: SectorCoord, b: SectorCoord, distance: i32) -> bool {
        if a == b || (a.x - b.x).abs() > 1 || (a.y - b.y).abs() > 1 {
            return false;
        }
        let (Some(ia), Some(ib)) = (self.index(a), self.index(b)) else {
            return false;
        };
        for (from, to) in [(ia, b), (ib, a)] {
            let links = &mut self.nodes[from].links;
            if let Some(link) = links.iter_mut().find(|link| link.to == to) {
                link.distance = distance;
            } else if links.len() < MAX_LINKS {
                links.push(SectorLink { to, distance });
            } else {
                return false;
            }
        }
        true
    }

    /// Breadth-first flood fill over links; islands are numbered from 1 in scan order.
    pub fn label_islands(&mut self) -> u32 {
        for node in &mut self.nodes {
            node.island = NO_ISLAND;
        }
        let mut next = NO_ISLAND;
        let mut queue = VecDeque::new();
        for seed in 0..self.nodes.len() {
            if self.nodes[seed].point.is_none() || self.nodes[seed].island != NO_ISLAND {
                continue;
            }
            next += 1;
            self.nodes[seed].island = next;
            queue.push_back(seed);
            while let Some(current) = queue.pop_front() {
                for i in 0..self.nodes[current].links.len() {
                    let to = self.nodes[current].links[i].to;
                    let Some(neighbour) = self.index(to) else {
                        continue;
                    };
                    let node = &mut self.nodes[neighbour];
                    if node.point.is_some() && node.island == NO_ISLAND {
                        node.island = next;
                        queue.push_back(neighbour);
                    }
                }
            }
        }
        next
    }

    pub fn summary(&self) -> GraphSummary {
        let mut summary = GraphSummary {
            sectors: self.nodes.len(),
            ..GraphSummary::default()
        };
        for node in &self.nodes {
            if node.point.is_some() {
                summary.points += 1;
            }
            summary.links += node.links.len();
            summary.islands = summary.islands.max(node.island);
        }
        // Every link is stored on both ends.
        summary.links /= 2;
        summary
    }

    /// Coarse route from `start` to `goal`: representative points of every sector on the
    /// cheapest sector path (the start sector included), then the goal itself.
    pub fn find_waypoints(&self, start: Point3D, goal: Point3D, max_distance: i32) -> Option<Vec<Point3D>> {
        if !in_range(start, goal, max_distance) {
            return None;
        }
        let from = self.index(SectorCoord::from(start))?;
        let to = self.index(SectorCoord::from(goal))?;
        if !self.same_island(start, goal) {
            return None;
        }
        if from == to {
            return Some(vec![goal]);
        }

        let count = self.nodes.len();
        let mut cost = vec![i32::MAX; count];
        let mut parent: Vec<Option<usize>> = vec![None; count];
        let mut closed = vec![false; count];
        let mut heap = NodeHeap::with_capacity(count);
        let estimate = |index: usize| self.nodes[index].point.map_or(0, |p| manhattan(p, goal));

        cost[from] = 0;
        heap.push_or_decrease(from, estimate(from));
        while let Some(current) = heap.pop() {
            if current == to {
                return Some(self.route(&parent, from, to, goal));
            }
            closed[current] = true;
            for link in &self.nodes[current].links {
                let Some(next) = self.index(link.to) else {
                    continue;
                };
                if closed[next] {
                    continue;
                }
                let candidate = cost[current].saturating_add(link.distance);
                if candidate < cost[next] {
                    cost[next] = candidate;
                    parent[next] = Some(current);
                    heap.push_or_decrease(next, candidate.saturating_add(estimate(next)));
                }
            }
        }
        None
    }

    fn route(&self, parent: &[Option<usize>], from: usize, to: usize, goal: Point3D) -> Vec<Point3D> {
        let mut sectors = vec![to];
        let mut cursor = to;
        while cursor != from {
            match parent[cursor] {
                Some(previous) => {
                    sectors.push(previous);
                    cursor = previous;
                }
                None => break,
            }
        }
        sectors.reverse();
        let mut points: Vec<Point3D> = sectors
            .into_iter()
            .filter_map(|index| self.point(self.coord(index)))
            .collect();
        points.push(goal);
        points
    }
}

/// First cell of a sector, scanning rows of local coordinates, where a person fits on land or
/// on top of a static surface.
pub fn find_spawn_point(resolver: &mut MovementResolver, map: &dyn WorldMap, sector: SectorCoord) -> Option<Point3D> {
    let (ox, oy) = sector.origin();
    let mut tops = Vec::new();
    for ly in 0..SECTOR_SIZE {
        for lx in 0..SECTOR_SIZE {
            let (x, y) = (ox + lx, oy + ly);
            if !map.contains(x, y) {
                continue;
            }
            let land = map.land(x, y);
            if !land.ignored && !land.is_impassable() {
                let (_, center, _) = get_average_z(map, x, y);
                if resolver.can_fit(map, x, y, center) {
                    return Some(Point3D::new(x, y, center));
                }
            }
            tops.clear();
            tops.extend(
                map.statics(x, y)
                    .iter()
                    .filter(|tile| tile.flags.contains(TileFlags::SURFACE))
                    .map(|tile| tile.z + tile.calc_height()),
            );
            for &top in &tops {
                if resolver.can_fit(map, x, y, top) {
                    return Some(Point3D::new(x, y, top));
                }
            }
        }
    }
    None
}

/// Binary min-heap over node indices with a position table for O(log n) decrease-key.
#[derive(Debug, Default)]
pub struct NodeHeap {
    heap: Vec<(i32, usize)>,
    positions: HashMap<usize, usize>,
}

impl NodeHeap {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: Vec::with_capacity(capacity.min(1024)),
            positions: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Inserts `node`, or lowers its priority when it is already queued with a higher one.
    pub fn push_or_decrease(&mut self, node: usize, priority: i32) {
        match self.positions.get(&node).copied() {
            Some(at) if self.heap[at].0 <= priority => {}
            Some(at) => {
                self.heap[at].0 = priority;
                self.sift_up(at);
            }
            None => {
                self.heap.push((priority, node));
                let at = self.heap.len() - 1;
                self.positions.insert(node, at);
                self.sift_up(at);
            }
        }
    }

    pub fn pop(&mut self) -> Option<usize> {
        if self.heap.is_empty() {
            return None;
        }
        let last = self.heap.len() - 1;
        self.swap(0, last);
        let (_, node) = self.heap.pop()?;
        self.positions.remove(&node);
        if !self.heap.is_empty() {
            self.sift_down(0);
        }
        Some(node)
    }

    fn sift_up(&mut self, mut at: usize) {
        while at > 0 {
            let parent = (at - 1) / 2;
            if self.heap[parent].0 <= self.heap[at].0 {
                break;
            }
            self.swap(parent, at);
            at = parent;
        }
    }

    fn sift_down(&mut self, mut at: usize) {
        let len = self.heap.len();
        loop {
            let left = at * 2 + 1;
            let right = left + 1;
            let mut smallest = at;
            if left < len && self.heap[left].0 < self.heap[smallest].0 {
                smallest = left;
            }
            if right < len && self.heap[right].0 < self.heap[smallest].0 {
                smallest = right;
            }
            if smallest == at {
                break;
            }
            self.swap(at, smallest);
            at = smallest;
        }
    }

    fn swap(&mut self, a: usize, b: usize) {
        self.heap.swap(a, b);
        self.positions.insert(self.heap[a].1, a);
        self.positions.insert(self.heap[b].1, b);
    }
}

/// Loaded sector graphs, one per map.
///
/// Rebuilding or replacing a graph needs `&mut`, so it cannot overlap with planning calls
/// that borrow the registry.
#[derive(Debug, Default)]
pub struct GraphRegistry {
    graphs: HashMap<MapId, SectorGraph>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, map: MapId) -> Option<&SectorGraph> {
        self.graphs.get(&map)
    }

    pub fn insert(&mut self, graph: SectorGraph) -> Option<SectorGraph> {
        self.graphs.insert(graph.map(), graph)
    }

    pub fn remove(&mut self, map: MapId) -> Option<SectorGraph> {
        self.graphs.remove(&map)
    }

    pub fn is_loaded(&self, map: MapId) -> bool {
        self.graphs.contains_key(&map)
    }

    /// False whenever no graph is loaded for `map`.
    pub fn same_island(&self, map: MapId, a: Point3D, b: Point3D) -> bool {
        self.get(map).is_some_and(|graph| graph.same_island(a, b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{add_wall, add_wall_column, open_map, TEST_MAP};

    fn corridor_graph() -> SectorGraph {
        // Three sectors in a row, all linked, plus an isolated fourth one.
        let mut graph = SectorGraph::empty(TEST_MAP, 4, 1);
        for sx in 0..4 {
            graph
                .node_mut(SectorCoord::new(sx, 0))
                .expect("sector")
                .point = Some(Point3D::new(sx * 16, 0, 0));
        }
        assert!(graph.link(SectorCoord::new(0, 0), SectorCoord::new(1, 0), 16));
        assert!(graph.link(SectorCoord::new(1, 0), SectorCoord::new(2, 0), 16));
        graph.label_islands();
        graph
    }

    #[test]
    fn islands_follow_links() {
        let graph = corridor_graph();
        assert_eq!(graph.island_of(Point3D::new(5, 5, 0)), Some(1));
        assert_eq!(graph.island_of(Point3D::new(40, 5, 0)), Some(1));
        assert_eq!(graph.island_of(Point3D::new(50, 5, 0)), Some(2));
        assert!(graph.same_island(Point3D::new(1, 1, 0), Point3D::new(47, 1, 0)));
        // Adjacent tiles across the gap still belong to different islands.
        assert!(!graph.same_island(Point3D::new(47, 1, 0), Point3D::new(48, 1, 0)));
    }

    #[test]
    fn registry_without_graph_is_never_same_island() {
        let registry = GraphRegistry::new();
        let a = Point3D::new(1, 1, 0);
        assert!(!registry.same_island(TEST_MAP, a, a));
    }

    #[test]
    fn waypoints_walk_the_linked_sectors() {
        let graph = corridor_graph();
        let goal = Point3D::new(40, 8, 0);
        let route = graph
            .find_waypoints(Point3D::new(2, 2, 0), goal, 2048)
            .expect("route");
        assert_eq!(
            route,
            vec![
                Point3D::new(0, 0, 0),
                Point3D::new(16, 0, 0),
                Point3D::new(32, 0, 0),
                goal
            ]
        );
    }

    #[test]
    fn waypoints_respect_island_and_distance_gates() {
        let graph = corridor_graph();
        assert!(graph
            .find_waypoints(Point3D::new(2, 2, 0), Point3D::new(50, 2, 0), 2048)
            .is_none());
        assert!(graph
            .find_waypoints(Point3D::new(2, 2, 0), Point3D::new(40, 2, 0), 20)
            .is_none());
        let same = Point3D::new(3, 3, 0);
        assert_eq!(graph.find_waypoints(Point3D::new(2, 2, 0), same, 2048), Some(vec![same]));
    }

    #[test]
    fn cheaper_detour_wins_over_direct_link() {
        let mut graph = SectorGraph::empty(TEST_MAP, 2, 2);
        for (sx, sy) in [(0, 0), (1, 0), (0, 1), (1, 1)] {
            graph
                .node_mut(SectorCoord::new(sx, sy))
                .expect("sector")
                .point = Some(Point3D::new(sx * 16, sy * 16, 0));
        }
        graph.link(SectorCoord::new(0, 0), SectorCoord::new(1, 1), 500);
        graph.link(SectorCoord::new(0, 0), SectorCoord::new(1, 0), 16);
        graph.link(SectorCoord::new(1, 0), SectorCoord::new(1, 1), 16);
        graph.label_islands();
        let goal = Point3D::new(20, 20, 0);
        let route = graph
            .find_waypoints(Point3D::new(1, 1, 0), goal, 2048)
            .expect("route");
        assert_eq!(route[1], Point3D::new(16, 0, 0));
        assert_eq!(route.last(), Some(&goal));
    }

    #[test]
    fn link_rejects_non_neighbours_and_caps_fanout() {
        let mut graph = SectorGraph::empty(TEST_MAP, 3, 3);
        assert!(!graph.link(SectorCoord::new(0, 0), SectorCoord::new(2, 0), 10));
        assert!(!graph.link(SectorCoord::new(1, 1), SectorCoord::new(1, 1), 10));
        for sy in 0..3 {
            for sx in 0..3 {
                if (sx, sy) != (1, 1) {
                    assert!(graph.link(SectorCoord::new(1, 1), SectorCoord::new(sx, sy), 10));
                }
            }
        }
        let centre = graph.node(SectorCoord::new(1, 1)).expect("centre");
        assert_eq!(centre.links.len(), MAX_LINKS);
    }

    #[test]
    fn heap_orders_and_decreases() {
        let mut heap = NodeHeap::with_capacity(8);
        heap.push_or_decrease(1, 50);
        heap.push_or_decrease(2, 30);
        heap.push_or_decrease(3, 40);
        heap.push_or_decrease(1, 10);
        heap.push_or_decrease(3, 45);
        assert_eq!(heap.len(), 3);
        assert_eq!(heap.pop(), Some(1));
        assert_eq!(heap.pop(), Some(2));
        assert_eq!(heap.pop(), Some(3));
        assert_eq!(heap.pop(), None);
    }

    #[test]
    fn build_links_open_ground_and_splits_at_walls() {
        let mut map = open_map(48, 16);
        // A full-height wall between the second and third sectors.
        add_wall_column(&mut map, 32, 0, 15);
        add_wall_column(&mut map, 31, 0, 15);
        let mut ctx = PathContext::new();
        let graph = SectorGraph::build(&map, &mut ctx, &Capabilities::walker());
        assert_eq!(graph.width(), 3);
        assert_eq!(graph.height(), 1);
        assert_eq!(graph.point(SectorCoord::new(0, 0)), Some(Point3D::new(0, 0, 0)));
        let summary = graph.summary();
        assert_eq!(summary.points, 3);
        assert_eq!(summary.links, 1);
        assert_eq!(summary.islands, 2);
        assert!(graph.same_island(Point3D::new(1, 1, 0), Point3D::new(20, 1, 0)));
        assert!(!graph.same_island(Point3D::new(20, 1, 0), Point3D::new(40, 1, 0)));
    }

    #[test]
    fn build_links_representatives_beyond_short_range() {
        let mut map = open_map(32, 16);
        for x in 16..20 {
            add_wall(&mut map, x, 0);
        }
        let mut ctx = PathContext::new();
        let graph = SectorGraph::build(&map, &mut ctx, &Capabilities::walker());
        assert_eq!(graph.point(SectorCoord::new(0, 0)), Some(Point3D::new(0, 0, 0)));
        assert_eq!(graph.point(SectorCoord::new(1, 0)), Some(Point3D::new(20, 0, 0)));
        let summary = graph.summary();
        assert_eq!(summary.links, 1);
        assert_eq!(summary.islands, 1);
        assert!(graph.same_island(Point3D::new(15, 5, 0), Point3D::new(16, 5, 0)));
        assert!(ctx.stats().nav >= 1);
    }
}
