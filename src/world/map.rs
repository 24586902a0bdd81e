use crate::world::position::Point3D;
use crate::world::tile::{ItemSample, LandTile, TileData, TileFlags, TileSample};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Edge length of the sectors used by the item index and the waypoint graph.
pub const SECTOR_SIZE: i32 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MapId(pub u8);

impl MapId {
    pub const INTERNAL: MapId = MapId(0x7F);

    pub fn is_internal(self) -> bool {
        self == MapId::INTERNAL
    }
}

impl std::fmt::Display for MapId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_internal() {
            write!(f, "internal")
        } else {
            write!(f, "map{}", self.0)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SectorCoord {
    pub x: i32,
    pub y: i32,
}

impl SectorCoord {
    pub fn new(x: i32, y: i32) -> Self {
        SectorCoord { x, y }
    }

    pub fn origin(self) -> (i32, i32) {
        (self.x * SECTOR_SIZE, self.y * SECTOR_SIZE)
    }
}

impl From<Point3D> for SectorCoord {
    fn from(point: Point3D) -> Self {
        SectorCoord {
            x: point.x.div_euclid(SECTOR_SIZE),
            y: point.y.div_euclid(SECTOR_SIZE),
        }
    }
}

/// Spatial query surface the movement core reads from.
pub trait WorldMap {
    fn id(&self) -> MapId;

    fn width(&self) -> i32;

    fn height(&self) -> i32;

    /// Land tile at a cell; cells outside the map are void.
    fn land(&self, x: i32, y: i32) -> LandTile;

    fn statics(&self, x: i32, y: i32) -> &[TileSample];

    /// Appends every dynamic item of one sector to `out`.
    fn sector_items(&self, sector: SectorCoord, out: &mut Vec<ItemSample>);

    fn contains(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.width() && y < self.height()
    }

    fn sectors_wide(&self) -> i32 {
        (self.width() + SECTOR_SIZE - 1) / SECTOR_SIZE
    }

    fn sectors_high(&self) -> i32 {
        (self.height() + SECTOR_SIZE - 1) / SECTOR_SIZE
    }
}

/// In-memory tile grid with a sector-keyed item index.
#[derive(Debug, Clone)]
pub struct GridMap {
    id: MapId,
    width: i32,
    height: i32,
    land: Vec<LandTile>,
    statics: Vec<Vec<TileSample>>,
    items: HashMap<SectorCoord, Vec<ItemSample>>,
}

impl GridMap {
    /// A map covered in flat passable land at z = 0.
    pub fn flat(id: MapId, width: i32, height: i32) -> Self {
        Self::filled(id, width, height, LandTile::new(0x0003, 0, TileFlags::NONE))
    }

    pub fn filled(id: MapId, width: i32, height: i32, land: LandTile) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let cells = (width * height) as usize;
        Self {
            id,
            width,
            height,
            land: vec![land; cells],
            statics: vec![Vec::new(); cells],
            items: HashMap::new(),
        }
    }

    fn cell(&self, x: i32, y: i32) -> Option<usize> {
        if x < 0 || y < 0 || x >= self.width || y >= self.height {
            return None;
        }
        Some((y * self.width + x) as usize)
    }

    pub fn set_land(&mut self, x: i32, y: i32, land: LandTile) {
        if let Some(cell) = self.cell(x, y) {
            self.land[cell] = land;
        }
    }

    pub fn add_static(&mut self, x: i32, y: i32, tile: TileSample) {
        if let Some(cell) = self.cell(x, y) {
            self.statics[cell].push(tile);
        }
    }

    pub fn add_item(&mut self, x: i32, y: i32, tile: TileSample) {
        if self.cell(x, y).is_none() {
            return;
        }
        let sector = SectorCoord::from(Point3D::new(x, y, 0));
        self.items
            .entry(sector)
            .or_default()
            .push(ItemSample { x, y, tile });
    }

    /// Removes every dynamic item at a cell and returns how many were dropped.
    pub fn remove_items_at(&mut self, x: i32, y: i32) -> usize {
        let sector = SectorCoord::from(Point3D::new(x, y, 0));
        let Some(items) = self.items.get_mut(&sector) else {
            return 0;
        };
        let before = items.len();
        items.retain(|item| item.x != x || item.y != y);
        before - items.len()
    }

    pub fn item_count(&self) -> usize {
        self.items.values().map(Vec::len).sum()
    }
}

impl WorldMap for GridMap {
    fn id(&self) -> MapId {
        self.id
    }

    fn width(&self) -> i32 {
        self.width
    }

    fn height(&self) -> i32 {
        self.height
    }

    fn land(&self, x: i32, y: i32) -> LandTile {
        match self.cell(x, y) {
            Some(cell) => self.land[cell],
            None => LandTile::void(),
        }
    }

    fn statics(&self, x: i32, y: i32) -> &[TileSample] {
        match self.cell(x, y) {
            Some(cell) => &self.statics[cell],
            None => &[],
        }
    }

    fn sector_items(&self, sector: SectorCoord, out: &mut Vec<ItemSample>) {
        if let Some(items) = self.items.get(&sector) {
            out.extend_from_slice(items);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectorFile {
    pub coord: SectorCoord,
    pub path: PathBuf,
}

/// Lists `<sx>-<sy>.sec` files in a map directory; other files are skipped.
pub fn load_sector_index(map_dir: &Path) -> Result<Vec<SectorFile>, String> {
    let mut sectors = Vec::new();
    let entries = std::fs::read_dir(map_dir)
        .map_err(|err| format!("failed to read map dir {}: {}", map_dir.display(), err))?;

    for entry in entries {
        let entry = entry.map_err(|err| format!("failed to read map dir entry: {}", err))?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("sec") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        let Some((x_raw, y_raw)) = stem.split_once('-') else {
            continue;
        };
        let (Ok(x), Ok(y)) = (x_raw.parse::<i32>(), y_raw.parse::<i32>()) else {
            continue;
        };
        if x < 0 || y < 0 {
            continue;
        }
        sectors.push(SectorFile {
            coord: SectorCoord { x, y },
            path,
        });
    }
    sectors.sort_by_key(|sector| (sector.coord.y, sector.coord.x));
    Ok(sectors)
}

/// Loads `tiledata.yml` plus every sector file under `map_dir` into a grid.
///
/// Map dimensions are the bounding box of the sector files; cells no file mentions stay void.
pub fn load_map(map_dir: &Path, id: MapId) -> Result<GridMap, String> {
    let tile_data = TileData::load(&map_dir.join("tiledata.yml"))?;
    let sectors = load_sector_index(map_dir)?;
    if sectors.is_empty() {
        return Err(format!("map dir {} has no sector files", map_dir.display()));
    }
    let width = (sectors.iter().map(|s| s.coord.x).max().unwrap_or(0) + 1) * SECTOR_SIZE;
    let height = (sectors.iter().map(|s| s.coord.y).max().unwrap_or(0) + 1) * SECTOR_SIZE;
    let mut map = GridMap::filled(id, width, height, LandTile::void());

    for sector in &sectors {
        let content = std::fs::read_to_string(&sector.path).map_err(|err| {
            format!("failed to read sector {}: {}", sector.path.display(), err)
        })?;
        parse_sector_content(&content, sector, &tile_data, &mut map)?;
    }
    Ok(map)
}

fn parse_sector_content(
    content: &str,
    sector: &SectorFile,
    tile_data: &TileData,
    map: &mut GridMap,
) -> Result<(), String> {
    let (origin_x, origin_y) = sector.coord.origin();
    for (line_no, raw_line) in content.lines().enumerate() {
        let line_no = line_no + 1;
        let line = raw_line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fail = |err: String| {
            format!(
                "sector {} line {}: {}",
                sector.path.display(),
                line_no,
                err
            )
        };
        let (coord, remainder) = line
            .split_once(':')
            .ok_or_else(|| fail("missing ':'".to_string()))?;
        let (local_x, local_y) = parse_tile_coord(coord.trim()).map_err(&fail)?;
        let x = origin_x + local_x;
        let y = origin_y + local_y;

        for token in remainder.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let (kind, value) = token
                .split_once('=')
                .ok_or_else(|| fail(format!("expected key=value, got '{}'", token)))?;
            let (tile_id, z) = parse_id_at_z(value.trim()).map_err(&fail)?;
            match kind.trim().to_ascii_lowercase().as_str() {
                "land" => {
                    let flags = tile_data
                        .land(tile_id)
                        .map(|info| info.flags)
                        .unwrap_or(TileFlags::NONE);
                    map.set_land(x, y, LandTile::new(tile_id, z, flags));
                }
                "static" => {
                    let sample = item_sample(tile_data, tile_id, z).map_err(&fail)?;
                    map.add_static(x, y, sample);
                }
                "item" => {
                    let sample = item_sample(tile_data, tile_id, z).map_err(&fail)?;
                    map.add_item(x, y, sample);
                }
                "movableitem" => {
                    let sample = item_sample(tile_data, tile_id, z).map_err(&fail)?;
                    map.add_item(x, y, sample.movable());
                }
                other => return Err(fail(format!("unknown entry kind '{}'", other))),
            }
        }
    }
    Ok(())
}

fn item_sample(tile_data: &TileData, id: u16, z: i32) -> Result<TileSample, String> {
    let info = tile_data
        .item(id)
        .ok_or_else(|| format!("item id {} missing from tiledata", id))?;
    Ok(TileSample::new(id, z, info.height, info.flags))
}

fn parse_tile_coord(coord: &str) -> Result<(i32, i32), String> {
    let (x_raw, y_raw) = coord
        .split_once('-')
        .ok_or_else(|| "coord missing '-'".to_string())?;
    let x = x_raw
        .trim()
        .parse::<i32>()
        .map_err(|_| "invalid x".to_string())?;
    let y = y_raw
        .trim()
        .parse::<i32>()
        .map_err(|_| "invalid y".to_string())?;
    if !(0..SECTOR_SIZE).contains(&x) || !(0..SECTOR_SIZE).contains(&y) {
        return Err("coord out of range".to_string());
    }
    Ok((x, y))
}

fn parse_id_at_z(value: &str) -> Result<(u16, i32), String> {
    let (id_raw, z_raw) = value
        .split_once('@')
        .ok_or_else(|| format!("expected <id>@<z>, got '{}'", value))?;
    let id_raw = id_raw.trim();
    let id = match id_raw.strip_prefix("0x") {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => id_raw.parse::<u16>(),
    }
    .map_err(|_| format!("invalid tile id '{}'", id_raw))?;
    let z = z_raw
        .trim()
        .parse::<i32>()
        .map_err(|_| format!("invalid z '{}'", z_raw))?;
    Ok((id, z))
}
