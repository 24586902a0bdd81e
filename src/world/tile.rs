use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TileFlags(u32);

impl TileFlags {
    pub const NONE: TileFlags = TileFlags(0);
    pub const IMPASSABLE: TileFlags = TileFlags(0x01);
    pub const SURFACE: TileFlags = TileFlags(0x02);
    pub const WET: TileFlags = TileFlags(0x04);
    pub const DOOR: TileFlags = TileFlags(0x08);
    pub const BRIDGE: TileFlags = TileFlags(0x10);

    pub const IMPASSABLE_SURFACE: TileFlags = TileFlags(0x01 | 0x02);

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn union(self, other: TileFlags) -> TileFlags {
        TileFlags(self.0 | other.0)
    }

    pub const fn contains(self, other: TileFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: TileFlags) -> bool {
        self.0 & other.0 != 0
    }

    pub fn parse(name: &str) -> Option<TileFlags> {
        let flag = match name.trim().to_ascii_lowercase().as_str() {
            "impassable" | "unpass" => TileFlags::IMPASSABLE,
            "surface" => TileFlags::SURFACE,
            "wet" => TileFlags::WET,
            "door" => TileFlags::DOOR,
            "bridge" => TileFlags::BRIDGE,
            _ => return None,
        };
        Some(flag)
    }
}

impl std::ops::BitOr for TileFlags {
    type Output = TileFlags;

    fn bitor(self, rhs: TileFlags) -> TileFlags {
        self.union(rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LandTile {
    pub id: u16,
    pub z: i32,
    pub flags: TileFlags,
    /// Void land that is never standable and never considered for averaging decisions.
    pub ignored: bool,
}

impl LandTile {
    pub fn new(id: u16, z: i32, flags: TileFlags) -> Self {
        Self {
            id,
            z,
            flags,
            ignored: false,
        }
    }

    pub fn void() -> Self {
        Self {
            id: 0x0002,
            z: 0,
            flags: TileFlags::NONE,
            ignored: true,
        }
    }

    pub fn is_impassable(&self) -> bool {
        self.flags.contains(TileFlags::IMPASSABLE)
    }

    pub fn is_wet(&self) -> bool {
        self.flags.contains(TileFlags::WET)
    }
}

/// A static tile or a dynamic item occupying a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileSample {
    pub id: u16,
    pub z: i32,
    pub height: i32,
    pub flags: TileFlags,
    pub movable: bool,
}

impl TileSample {
    pub fn new(id: u16, z: i32, height: i32, flags: TileFlags) -> Self {
        Self {
            id,
            z,
            height,
            flags,
            movable: false,
        }
    }

    pub fn movable(mut self) -> Self {
        self.movable = true;
        self
    }

    pub fn is_bridge(&self) -> bool {
        self.flags.contains(TileFlags::BRIDGE)
    }

    pub fn calc_height(&self) -> i32 {
        if self.is_bridge() {
            self.height / 2
        } else {
            self.height
        }
    }

    /// Top used when deciding whether a surface can be stepped onto.
    pub fn step_top(&self) -> i32 {
        if self.is_bridge() {
            self.z
        } else {
            self.z + self.height
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemSample {
    pub x: i32,
    pub y: i32,
    pub tile: TileSample,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileInfo {
    pub name: String,
    pub flags: TileFlags,
    pub height: i32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTileInfo {
    id: u16,
    #[serde(default)]
    name: String,
    #[serde(default)]
    flags: Vec<String>,
    #[serde(default)]
    height: i32,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawTileData {
    #[serde(default)]
    land: Vec<RawTileInfo>,
    #[serde(default)]
    items: Vec<RawTileInfo>,
}

/// Flag/height table for land and item graphics, keyed by graphic id.
#[derive(Debug, Default, Clone)]
pub struct TileData {
    land: HashMap<u16, TileInfo>,
    items: HashMap<u16, TileInfo>,
}

impl TileData {
    pub fn land(&self, id: u16) -> Option<&TileInfo> {
        self.land.get(&id)
    }

    pub fn item(&self, id: u16) -> Option<&TileInfo> {
        self.items.get(&id)
    }

    pub fn insert_land(&mut self, id: u16, info: TileInfo) {
        self.land.insert(id, info);
    }

    pub fn insert_item(&mut self, id: u16, info: TileInfo) {
        self.items.insert(id, info);
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read tiledata {}: {}", path.display(), err))?;
        Self::parse(&content).map_err(|err| format!("tiledata {}: {}", path.display(), err))
    }

    pub fn parse(content: &str) -> Result<Self, String> {
        let raw: RawTileData =
            serde_yaml::from_str(content).map_err(|err| format!("invalid yaml: {}", err))?;
        let mut data = TileData::default();
        for entry in raw.land {
            let info = convert_info(&entry)?;
            data.land.insert(entry.id, info);
        }
        for entry in raw.items {
            let info = convert_info(&entry)?;
            data.items.insert(entry.id, info);
        }
        Ok(data)
    }
}

fn convert_info(entry: &RawTileInfo) -> Result<TileInfo, String> {
    let mut flags = TileFlags::NONE;
    for name in &entry.flags {
        let flag = TileFlags::parse(name)
            .ok_or_else(|| format!("tile {:#06x} has unknown flag '{}'", entry.id, name))?;
        flags = flags | flag;
    }
    Ok(TileInfo {
        name: entry.name.clone(),
        flags,
        height: entry.height,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bridge_halves_calc_height() {
        let ramp = TileSample::new(0x0100, 10, 8, TileFlags::SURFACE | TileFlags::BRIDGE);
        assert_eq!(ramp.calc_height(), 4);
        assert_eq!(ramp.step_top(), 10);
        let table = TileSample::new(0x0101, 10, 6, TileFlags::SURFACE);
        assert_eq!(table.calc_height(), 6);
        assert_eq!(table.step_top(), 16);
    }

    #[test]
    fn flag_set_operations() {
        let flags = TileFlags::IMPASSABLE | TileFlags::DOOR;
        assert!(flags.contains(TileFlags::DOOR));
        assert!(flags.intersects(TileFlags::IMPASSABLE_SURFACE));
        assert!(!flags.contains(TileFlags::IMPASSABLE_SURFACE));
    }

    #[test]
    fn parse_tiledata_yaml() {
        let data = TileData::parse(
            r#"
land:
  - id: 3
    name: grass
  - id: 168
    name: water
    flags: [Impassable, Wet]
items:
  - id: 1701
    name: wooden door
    flags: [impassable, door]
    height: 20
"#,
        )
        .expect("tiledata");
        assert_eq!(data.land(168).expect("water").flags, TileFlags::IMPASSABLE | TileFlags::WET);
        let door = data.item(1701).expect("door");
        assert!(door.flags.contains(TileFlags::DOOR));
        assert_eq!(door.height, 20);
    }

    #[test]
    fn parse_tiledata_rejects_unknown_flag() {
        let err = TileData::parse("items:\n  - id: 1\n    flags: [sticky]\n").unwrap_err();
        assert!(err.contains("sticky"), "{err}");
    }
}
