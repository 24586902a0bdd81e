pub mod map;
pub mod position;
pub mod sector_cache;
pub mod tile;
pub mod time;

pub use map::{GridMap, MapId, SectorCoord, WorldMap, SECTOR_SIZE};
pub use position::{Direction, Point3D};
pub use tile::{ItemSample, LandTile, TileFlags, TileSample};
