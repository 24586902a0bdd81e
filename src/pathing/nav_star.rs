use crate::movement::resolver::MovementResolver;
use crate::pathing::algorithm::{AlgorithmKind, Search};
use crate::pathing::plane_grid::{GridShape, PlaneGrid};
use crate::world::position::Direction;

pub const NAV_SHAPE: GridShape = GridShape {
    area_size: 104,
    plane_count: 13,
    plane_height: 20,
    plane_offset: 128,
    max_depth: 4000,
};

/// Medium-range search over a 104x104 window with a deeper expansion budget.
///
/// The arena is several megabytes, so it is only allocated the first time a caller needs it.
#[derive(Default)]
pub struct NavStar {
    grid: Option<Box<PlaneGrid>>,
}

impl NavStar {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_allocated(&self) -> bool {
        self.grid.is_some()
    }

    pub fn find(&mut self, resolver: &mut MovementResolver, search: &Search<'_>) -> Option<Vec<Direction>> {
        if !AlgorithmKind::NavStar.check_condition(search.start, search.goal) {
            return None;
        }
        let grid = self.grid.get_or_insert_with(|| Box::new(PlaneGrid::new(NAV_SHAPE)));
        grid.find(resolver, search)
    }
}
