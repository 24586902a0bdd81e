//! Map and mover fixtures shared by the unit tests.

use crate::movement::mover::{Capabilities, MoverDescriptor};
use crate::world::map::{GridMap, MapId};
use crate::world::position::Point3D;
use crate::world::tile::{LandTile, TileFlags, TileSample};

pub const TEST_MAP: MapId = MapId(1);
pub const WALL_ID: u16 = 0x0080;
pub const DOOR_ID: u16 = 0x06A5;
pub const TREE_ID: u16 = 0x0CCA;

pub fn open_map(width: i32, height: i32) -> GridMap {
    GridMap::flat(TEST_MAP, width, height)
}

pub fn add_wall(map: &mut GridMap, x: i32, y: i32) {
    map.add_static(x, y, TileSample::new(WALL_ID, 0, 20, TileFlags::IMPASSABLE));
}

/// Vertical wall on column `x` covering `y0..=y1`.
pub fn add_wall_column(map: &mut GridMap, x: i32, y0: i32, y1: i32) {
    for y in y0..=y1 {
        add_wall(map, x, y);
    }
}

pub fn add_door(map: &mut GridMap, x: i32, y: i32) {
    map.add_item(
        x,
        y,
        TileSample::new(DOOR_ID, 0, 20, TileFlags::IMPASSABLE | TileFlags::DOOR),
    );
}

pub fn water_land() -> LandTile {
    LandTile::new(0x00A8, -5, TileFlags::IMPASSABLE | TileFlags::WET)
}

pub fn walker_at(location: Point3D) -> MoverDescriptor {
    MoverDescriptor::new(location, TEST_MAP, Capabilities::walker())
}

pub fn player_at(location: Point3D) -> MoverDescriptor {
    MoverDescriptor::new(location, TEST_MAP, Capabilities::player())
}
