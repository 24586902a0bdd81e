use crate::movement::resolver::MovementResolver;
use crate::pathing::algorithm::{AlgorithmKind, Search};
use crate::pathing::plane_grid::{GridShape, PlaneGrid};
use crate::world::position::Direction;

pub const FAST_SHAPE: GridShape = GridShape {
    area_size: 38,
    plane_count: 13,
    plane_height: 20,
    plane_offset: 128,
    max_depth: 300,
};

/// Short-range search over a 38x38 window with Z folded into planes.
pub struct FastAStar {
    grid: PlaneGrid,
}

impl FastAStar {
    pub fn new() -> Self {
        Self {
            grid: PlaneGrid::new(FAST_SHAPE),
        }
    }

    pub fn find(&mut self, resolver: &mut MovementResolver, search: &Search<'_>) -> Option<Vec<Direction>> {
        if !AlgorithmKind::FastAStar.check_condition(search.start, search.goal) {
            return None;
        }
        self.grid.find(resolver, search)
    }
}

impl Default for FastAStar {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{add_wall, open_map, walker_at};
    use crate::world::position::{walk, Point3D};

    #[test]
    fn ten_steps_east() {
        let map = open_map(128, 128);
        let mover = walker_at(Point3D::new(100, 100, 0));
        let mut fast = FastAStar::new();
        let mut resolver = MovementResolver::new();
        let path = fast
            .find(&mut resolver, &Search::new(&map, &mover, Point3D::new(110, 100, 0)))
            .expect("path");
        assert_eq!(path, vec![Direction::East; 10]);
    }

    #[test]
    fn out_of_range_goal_is_refused() {
        let map = open_map(128, 128);
        let mover = walker_at(Point3D::new(10, 10, 0));
        let mut fast = FastAStar::new();
        let mut resolver = MovementResolver::new();
        let search = Search::new(&map, &mover, Point3D::new(40, 10, 0));
        assert!(fast.find(&mut resolver, &search).is_none());
    }

    #[test]
    fn walled_in_goal_fails_without_partial_path() {
        let mut map = open_map(64, 64);
        let goal = Point3D::new(20, 20, 0);
        for dy in -1..=1 {
            for dx in -1..=1 {
                if dx != 0 || dy != 0 {
                    add_wall(&mut map, goal.x + dx, goal.y + dy);
                }
            }
        }
        let mover = walker_at(Point3D::new(14, 20, 0));
        let mut fast = FastAStar::new();
        let mut resolver = MovementResolver::new();
        assert!(fast.find(&mut resolver, &Search::new(&map, &mover, goal)).is_none());
    }

    #[test]
    fn returned_path_ends_on_goal() {
        let mut map = open_map(64, 64);
        add_wall(&mut map, 12, 12);
        add_wall(&mut map, 13, 12);
        let mover = walker_at(Point3D::new(12, 10, 0));
        let goal = Point3D::new(13, 15, 0);
        let mut fast = FastAStar::new();
        let mut resolver = MovementResolver::new();
        let path = fast
            .find(&mut resolver, &Search::new(&map, &mover, goal))
            .expect("path");
        assert!(walk(mover.location, &path).same_column(goal));
    }
}
