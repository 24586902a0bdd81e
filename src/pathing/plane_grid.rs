//! Fixed-size search arena shared by the plane-based tile searches.
//!
//! The arena covers a square window of tiles centred between start and goal, with the Z axis
//! folded into a small number of horizontal planes. Every search reuses the same node storage;
//! two bitsets track which slots were written this pass and which are on the open chain, so a
//! reset touches a few kilobytes instead of the whole arena.

use crate::movement::mover::StepRules;
use crate::movement::resolver::MovementResolver;
use crate::pathing::algorithm::{heuristic, hop, reached, Search};
use crate::world::position::{Direction, Point3D, ALL_DIRECTIONS};

const NIL: u32 = u32::MAX;

/// Dimensions of a plane arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    pub area_size: i32,
    pub plane_count: i32,
    pub plane_height: i32,
    pub plane_offset: i32,
    pub max_depth: usize,
}

impl GridShape {
    pub fn node_count(&self) -> usize {
        (self.area_size * self.area_size * self.plane_count) as usize
    }
}

#[derive(Debug, Clone, Copy)]
struct PlaneNode {
    cost: i32,
    total: i32,
    parent: u32,
    next: u32,
    prev: u32,
    z: i32,
}

impl Default for PlaneNode {
    fn default() -> Self {
        Self {
            cost: 0,
            total: 0,
            parent: NIL,
            next: NIL,
            prev: NIL,
            z: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    fn with_len(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(64)],
        }
    }

    fn get(&self, index: u32) -> bool {
        let index = index as usize;
        self.words[index / 64] & (1 << (index % 64)) != 0
    }

    fn set(&mut self, index: u32, value: bool) {
        let index = index as usize;
        let mask = 1u64 << (index % 64);
        if value {
            self.words[index / 64] |= mask;
        } else {
            self.words[index / 64] &= !mask;
        }
    }

    fn clear(&mut self) {
        self.words.fill(0);
    }
}

pub struct PlaneGrid {
    shape: GridShape,
    nodes: Vec<PlaneNode>,
    touched: BitSet,
    on_open: BitSet,
    open: u32,
    x_offset: i32,
    y_offset: i32,
    successors: Vec<(u32, i32)>,
}

impl PlaneGrid {
    pub fn new(shape: GridShape) -> Self {
        let count = shape.node_count();
        Self {
            shape,
            nodes: vec![PlaneNode::default(); count],
            touched: BitSet::with_len(count),
            on_open: BitSet::with_len(count),
            open: NIL,
            x_offset: 0,
            y_offset: 0,
            successors: Vec::with_capacity(ALL_DIRECTIONS.len()),
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    /// Direction list from `search.start` to a node on `search.goal`, or `None` when the goal
    /// is unreachable inside the window or the expansion budget runs out.
    pub fn find(&mut self, resolver: &mut MovementResolver, search: &Search<'_>) -> Option<Vec<Direction>> {
        self.begin(search);
        let rules = StepRules::for_search(&search.mover.caps);
        let start = search.start;
        let goal = search.goal;

        let origin = self.index_of(start.x, start.y, start.z)?;
        self.nodes[origin] = PlaneNode {
            cost: 0,
            total: heuristic(start.x, start.y, start.z, goal),
            z: start.z,
            ..PlaneNode::default()
        };
        self.push_open(origin as u32);

        let mut depth = 0usize;
        while self.open != NIL {
            depth += 1;
            if depth > self.shape.max_depth {
                break;
            }

            let best = self.best_open();
            self.pop_open(best);
            let (bx, by) = self.coords(best);
            let bz = self.nodes[best as usize].z;
            if reached(bx, by, bz, goal) {
                return self.backtrack(best);
            }

            self.expand(resolver, search, rules, best);
            let cost = self.nodes[best as usize].cost + 1;
            for i in 0..self.successors.len() {
                let (slot, z) = self.successors[i];
                if slot as usize == origin {
                    continue;
                }
                let (sx, sy) = self.coords(slot);
                let total = cost + heuristic(sx, sy, z, goal);
                let seen = self.touched.get(slot);
                if seen && self.nodes[slot as usize].total <= total {
                    continue;
                }
                let node = &mut self.nodes[slot as usize];
                node.cost = cost;
                node.total = total;
                node.parent = best;
                node.z = z;
                if !seen || !self.on_open.get(slot) {
                    self.push_open(slot);
                }
            }
        }
        None
    }

    fn begin(&mut self, search: &Search<'_>) {
        let area = self.shape.area_size;
        self.x_offset = (search.start.x + search.goal.x - area).div_euclid(2);
        self.y_offset = (search.start.y + search.goal.y - area).div_euclid(2);
        self.touched.clear();
        self.on_open.clear();
        self.open = NIL;
    }

    fn index_of(&self, x: i32, y: i32, z: i32) -> Option<usize> {
        let area = self.shape.area_size;
        let lx = x - self.x_offset;
        let ly = y - self.y_offset;
        if !(0..area).contains(&lx) || !(0..area).contains(&ly) {
            return None;
        }
        let lifted = z + self.shape.plane_offset;
        if lifted < 0 {
            return None;
        }
        let plane = lifted / self.shape.plane_height;
        if plane >= self.shape.plane_count {
            return None;
        }
        Some((lx + ly * area + plane * area * area) as usize)
    }

    fn coords(&self, slot: u32) -> (i32, i32) {
        let area = self.shape.area_size;
        let slot = slot as i32;
        (
            self.x_offset + slot % area,
            self.y_offset + (slot / area) % area,
        )
    }

    fn expand(&mut self, resolver: &mut MovementResolver, search: &Search<'_>, rules: StepRules, from: u32) {
        self.successors.clear();
        let (x, y) = self.coords(from);
        let here = Point3D::new(x, y, self.nodes[from as usize].z);
        for direction in ALL_DIRECTIONS {
            let Some(z) = resolver.check_movement(Some(search.map), search.mover, rules, here, direction) else {
                continue;
            };
            let next = here.step(direction);
            if let Some(slot) = self.index_of(next.x, next.y, z) {
                self.successors.push((slot as u32, z));
            }
        }
    }

    fn push_open(&mut self, slot: u32) {
        self.touched.set(slot, true);
        self.on_open.set(slot, true);
        let head = self.open;
        let node = &mut self.nodes[slot as usize];
        node.prev = NIL;
        node.next = head;
        if head != NIL {
            self.nodes[head as usize].prev = slot;
        }
        self.open = slot;
    }

    fn pop_open(&mut self, slot: u32) {
        self.on_open.set(slot, false);
        let PlaneNode { prev, next, .. } = self.nodes[slot as usize];
        if prev != NIL {
            self.nodes[prev as usize].next = next;
        } else {
            self.open = next;
        }
        if next != NIL {
            self.nodes[next as usize].prev = prev;
        }
    }

    fn best_open(&self) -> u32 {
        let mut best = self.open;
        let mut cursor = self.open;
        while cursor != NIL {
            let node = &self.nodes[cursor as usize];
            if node.total < self.nodes[best as usize].total {
                best = cursor;
            }
            cursor = node.next;
        }
        best
    }

    fn backtrack(&self, goal: u32) -> Option<Vec<Direction>> {
        let mut directions = Vec::new();
        let mut cursor = goal;
        loop {
            let parent = self.nodes[cursor as usize].parent;
            if parent == NIL {
                break;
            }
            directions.push(hop(self.coords(parent), self.coords(cursor))?);
            if directions.len() > self.shape.node_count() {
                log::error!("search arena parent chain does not terminate");
                return None;
            }
            cursor = parent;
        }
        directions.reverse();
        Some(directions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{add_wall_column, open_map, walker_at};
    use crate::world::position::walk;

    fn small_shape() -> GridShape {
        GridShape {
            area_size: 38,
            plane_count: 13,
            plane_height: 20,
            plane_offset: 128,
            max_depth: 300,
        }
    }

    #[test]
    fn straight_line_on_open_ground() {
        let map = open_map(64, 64);
        let mover = walker_at(Point3D::new(10, 10, 0));
        let mut grid = PlaneGrid::new(small_shape());
        let mut resolver = MovementResolver::new();
        let search = Search::new(&map, &mover, Point3D::new(20, 10, 0));
        let path = grid.find(&mut resolver, &search).expect("path");
        assert_eq!(path, vec![Direction::East; 10]);
    }

    #[test]
    fn goes_around_a_wall() {
        let mut map = open_map(64, 64);
        add_wall_column(&mut map, 15, 5, 15);
        let mover = walker_at(Point3D::new(10, 10, 0));
        let goal = Point3D::new(20, 10, 0);
        let mut grid = PlaneGrid::new(small_shape());
        let mut resolver = MovementResolver::new();
        let path = grid
            .find(&mut resolver, &Search::new(&map, &mover, goal))
            .expect("path");
        let end = walk(mover.location, &path);
        assert!(end.same_column(goal));
        assert!(path.len() > 10);
    }

    #[test]
    fn arena_is_reusable() {
        let mut map = open_map(64, 64);
        add_wall_column(&mut map, 15, 0, 63);
        let mover = walker_at(Point3D::new(10, 10, 0));
        let mut grid = PlaneGrid::new(small_shape());
        let mut resolver = MovementResolver::new();
        let blocked = Search::new(&map, &mover, Point3D::new(20, 10, 0));
        assert!(grid.find(&mut resolver, &blocked).is_none());
        let open = Search::new(&map, &mover, Point3D::new(12, 14, 0));
        let first = grid.find(&mut resolver, &open).expect("path");
        let second = grid.find(&mut resolver, &open).expect("path");
        assert_eq!(first, second);
    }

    #[test]
    fn depth_budget_cuts_search() {
        let map = open_map(64, 64);
        let mover = walker_at(Point3D::new(10, 10, 0));
        let mut grid = PlaneGrid::new(GridShape {
            max_depth: 3,
            ..small_shape()
        });
        let mut resolver = MovementResolver::new();
        let search = Search::new(&map, &mover, Point3D::new(20, 10, 0));
        assert!(grid.find(&mut resolver, &search).is_none());
    }
}
