use crate::movement::mover::StepRules;
use crate::movement::resolver::MovementResolver;
use crate::pathing::algorithm::{heuristic, reached, AlgorithmKind, Search};
use crate::world::position::{Direction, Point3D, ALL_DIRECTIONS};

pub const MAX_NODES: usize = 4800;
pub const MAX_DEPTH: usize = 300;

#[derive(Debug, Clone, Copy)]
struct SearchNode {
    at: Point3D,
    cost: i32,
    estimate: i32,
    parent: Point3D,
    arrived_by: Option<Direction>,
}

impl SearchNode {
    fn total(&self) -> i32 {
        self.cost.saturating_add(self.estimate)
    }
}

/// Short-range search with unbounded Z, kept as the fallback for layered terrain the plane
/// arena folds together.
///
/// Open and closed lists are plain vectors scanned linearly; both are capped and a search that
/// would grow past the cap fails outright.
#[derive(Debug, Default)]
pub struct SlowAStar {
    open: Vec<SearchNode>,
    closed: Vec<SearchNode>,
}

impl SlowAStar {
    pub fn new() -> Self {
        Self {
            open: Vec::with_capacity(MAX_NODES),
            closed: Vec::with_capacity(MAX_NODES),
        }
    }

    pub fn find(&mut self, resolver: &mut MovementResolver, search: &Search<'_>) -> Option<Vec<Direction>> {
        if !AlgorithmKind::SlowAStar.check_condition(search.start, search.goal) {
            return None;
        }
        self.open.clear();
        self.closed.clear();

        let rules = StepRules::for_search(&search.mover.caps);
        let start = search.start;
        let goal = search.goal;
        self.open.push(SearchNode {
            at: start,
            cost: 0,
            estimate: heuristic(start.x, start.y, start.z, goal),
            parent: start,
            arrived_by: None,
        });

        let mut depth = 0usize;
        while !self.open.is_empty() {
            depth += 1;
            if depth > MAX_DEPTH {
                return None;
            }

            let best = self.best_open();
            let node = self.open.swap_remove(best);
            if reached(node.at.x, node.at.y, node.at.z, goal) {
                return self.backtrack(node);
            }
            if self.closed.len() >= MAX_NODES {
                log::debug!("slow search closed list full at {}", node.at);
                return None;
            }
            self.closed.push(node);

            for direction in ALL_DIRECTIONS {
                let Some(z) = resolver.check_movement(Some(search.map), search.mover, rules, node.at, direction) else {
                    continue;
                };
                let at = node.at.step(direction).with_z(z);
                if self.closed.iter().any(|closed| closed.at == at) {
                    continue;
                }
                let successor = SearchNode {
                    at,
                    cost: node.cost + 1,
                    estimate: heuristic(at.x, at.y, at.z, goal),
                    parent: node.at,
                    arrived_by: Some(direction),
                };
                match self.open.iter().position(|open| open.at == at) {
                    Some(index) if self.open[index].cost <= successor.cost => {}
                    Some(index) => self.open[index] = successor,
                    None => {
                        if self.open.len() >= MAX_NODES {
                            log::debug!("slow search open list full at {}", node.at);
                            return None;
                        }
                        self.open.push(successor);
                    }
                }
            }
        }
        None
    }

    fn best_open(&self) -> usize {
        let mut best = 0;
        for (index, node) in self.open.iter().enumerate().skip(1) {
            if node.total() < self.open[best].total() {
                best = index;
            }
        }
        best
    }

    fn backtrack(&self, goal: SearchNode) -> Option<Vec<Direction>> {
        let mut directions = Vec::new();
        let mut cursor = goal;
        while let Some(direction) = cursor.arrived_by {
            directions.push(direction);
            if directions.len() > self.closed.len() {
                log::error!("slow search parent chain does not terminate");
                return None;
            }
            cursor = *self.closed.iter().find(|node| node.at == cursor.parent)?;
        }
        directions.reverse();
        Some(directions)
    }
}
