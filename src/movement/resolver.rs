use crate::movement::mover::{Capabilities, MoverDescriptor, StepRules};
use crate::world::map::WorldMap;
use crate::world::position::{Direction, Point3D};
use crate::world::sector_cache::{CacheStats, SectorItemCache};
use crate::world::tile::{ItemSample, TileFlags, TileSample};

pub const PERSON_HEIGHT: i32 = 16;
pub const STEP_HEIGHT: i32 = 2;

/// Door graphics that lack the door flag but still swing open.
const DOOR_ITEM_IDS: [u16; 5] = [0x0692, 0x0846, 0x0873, 0x06F5, 0x06F6];

#[derive(Debug, Default)]
struct CellBuffers {
    scratch: Vec<ItemSample>,
    start: Vec<TileSample>,
    forward: Vec<TileSample>,
    left: Vec<TileSample>,
    right: Vec<TileSample>,
}

/// Step legality and standing height against the tile world.
///
/// Holds only reusable buffers and the per-call item cache; the answer for a given world
/// snapshot, mover and rule set never depends on earlier calls.
#[derive(Default)]
pub struct MovementResolver {
    cache: SectorItemCache,
    buffers: CellBuffers,
}

impl MovementResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets cached sector items; call before each planning pass.
    pub fn reset(&mut self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Z the mover would stand at after stepping `direction` from `from`, or `None` when the
    /// step is illegal (the mover keeps its current Z).
    pub fn check_movement(
        &mut self,
        map: Option<&dyn WorldMap>,
        mover: &MoverDescriptor,
        rules: StepRules,
        from: Point3D,
        direction: Direction,
    ) -> Option<i32> {
        let map = map?;
        if map.id().is_internal() {
            return None;
        }
        let caps = &mover.caps;
        let forward = from.step(direction);
        if !map.contains(forward.x, forward.y) {
            return None;
        }

        let required = required_flags(caps);
        let Self { cache, buffers } = self;
        collect_items(cache, map, from.x, from.y, required, &mut buffers.scratch, &mut buffers.start);
        collect_items(
            cache,
            map,
            forward.x,
            forward.y,
            required,
            &mut buffers.scratch,
            &mut buffers.forward,
        );

        let (start_z, start_top) = start_z_from(map, caps, from, &buffers.start);
        let step = StepCheck {
            map,
            caps,
            ignore_doors: rules.ignore_doors || caps.ignores_doors(),
            ignore_movable: rules.ignore_movable_impassables,
            start_z,
            start_top,
            current_z: from.z,
        };
        let new_z = step.check(&buffers.forward, forward.x, forward.y)?;

        if direction.is_diagonal() {
            let left = from.step(direction.rotate(-1));
            let right = from.step(direction.rotate(1));
            let left_ok = map.contains(left.x, left.y) && {
                collect_items(cache, map, left.x, left.y, required, &mut buffers.scratch, &mut buffers.left);
                step.check(&buffers.left, left.x, left.y).is_some()
            };
            let right_ok = map.contains(right.x, right.y) && {
                collect_items(cache, map, right.x, right.y, required, &mut buffers.scratch, &mut buffers.right);
                step.check(&buffers.right, right.x, right.y).is_some()
            };
            // Players may not shave a corner the client would draw as blocked.
            let corner_ok = if caps.is_player {
                left_ok && right_ok
            } else {
                left_ok || right_ok
            };
            if !corner_ok {
                return None;
            }
        }
        Some(new_z)
    }

    /// Standing `(z_low, z_top)` of a mover resting at `location`.
    pub fn get_start_z(
        &mut self,
        map: &dyn WorldMap,
        caps: &Capabilities,
        location: Point3D,
    ) -> (i32, i32) {
        let Self { cache, buffers } = self;
        collect_items(
            cache,
            map,
            location.x,
            location.y,
            required_flags(caps),
            &mut buffers.scratch,
            &mut buffers.start,
        );
        start_z_from(map, caps, location, &buffers.start)
    }

    /// Whether a person-sized body can stand on a surface at exactly `z` on `(x, y)`.
    pub fn can_fit(&mut self, map: &dyn WorldMap, x: i32, y: i32, z: i32) -> bool {
        if !map.contains(x, y) {
            return false;
        }
        let Self { cache, buffers } = self;
        collect_items(
            cache,
            map,
            x,
            y,
            TileFlags::IMPASSABLE_SURFACE,
            &mut buffers.scratch,
            &mut buffers.forward,
        );

        let land = map.land(x, y);
        let (land_low, land_center, _) = get_average_z(map, x, y);
        let mut has_surface = false;
        if land.is_impassable() {
            if land_center > z && z + PERSON_HEIGHT > land_low {
                return false;
            }
        } else if z == land_center && !land.ignored {
            has_surface = true;
        }

        for tile in map.statics(x, y).iter().chain(buffers.forward.iter()) {
            let surface = tile.flags.contains(TileFlags::SURFACE);
            let impassable = tile.flags.contains(TileFlags::IMPASSABLE);
            let tile_top = tile.z + tile.calc_height();
            if (surface || impassable) && tile_top > z && z + PERSON_HEIGHT > tile.z {
                return false;
            }
            if surface && !impassable && z == tile_top {
                has_surface = true;
            }
        }
        has_surface
    }
}

/// Lowest, centre and highest land height of a cell, sampled from its four corners.
///
/// Corners that fall off the map reuse the cell's own height.
pub fn get_average_z(map: &dyn WorldMap, x: i32, y: i32) -> (i32, i32, i32) {
    let own = map.land(x, y).z;
    let corner = |cx: i32, cy: i32| {
        if map.contains(cx, cy) {
            map.land(cx, cy).z
        } else {
            own
        }
    };
    let z_top = own;
    let z_left = corner(x, y + 1);
    let z_right = corner(x + 1, y);
    let z_bottom = corner(x + 1, y + 1);

    let low = z_top.min(z_left).min(z_right).min(z_bottom);
    let top = z_top.max(z_left).max(z_right).max(z_bottom);
    let center = if (z_top - z_bottom).abs() > (z_left - z_right).abs() {
        floor_average(z_left, z_right)
    } else {
        floor_average(z_top, z_bottom)
    };
    (low, center, top)
}

fn floor_average(a: i32, b: i32) -> i32 {
    (a + b).div_euclid(2)
}

fn required_flags(caps: &Capabilities) -> TileFlags {
    if caps.can_swim {
        TileFlags::IMPASSABLE_SURFACE | TileFlags::WET
    } else {
        TileFlags::IMPASSABLE_SURFACE
    }
}

fn collect_items(
    cache: &mut SectorItemCache,
    map: &dyn WorldMap,
    x: i32,
    y: i32,
    required: TileFlags,
    scratch: &mut Vec<ItemSample>,
    out: &mut Vec<TileSample>,
) {
    scratch.clear();
    out.clear();
    cache.items_at(map, x, y, scratch);
    out.extend(
        scratch
            .iter()
            .filter(|item| item.tile.flags.intersects(required))
            .map(|item| item.tile),
    );
}

fn land_blocks(caps: &Capabilities, impassable: bool, wet: bool) -> bool {
    if impassable && caps.can_swim && wet {
        false
    } else if caps.cant_walk && !wet {
        true
    } else {
        impassable
    }
}

fn start_z_from(
    map: &dyn WorldMap,
    caps: &Capabilities,
    location: Point3D,
    items: &[TileSample],
) -> (i32, i32) {
    let land = map.land(location.x, location.y);
    let (land_low, land_center, land_top) = get_average_z(map, location.x, location.y);
    let blocked = land_blocks(caps, land.is_impassable(), land.is_wet());

    let mut z_low = 0;
    let mut z_center = 0;
    let mut z_top = 0;
    let mut is_set = false;

    if !land.ignored && !blocked && location.z >= land_center {
        z_low = land_low;
        z_center = land_center;
        z_top = land_top;
        is_set = true;
    }

    for tile in map.statics(location.x, location.y).iter().chain(items.iter()) {
        let wet = tile.flags.contains(TileFlags::WET);
        let surface = tile.flags.contains(TileFlags::SURFACE)
            || (caps.can_swim && wet)
            || caps.can_fly_over(tile.id);
        let calc_top = tile.z + tile.calc_height();
        if (!is_set || calc_top >= z_center) && surface && location.z >= calc_top {
            if caps.cant_walk && !wet {
                continue;
            }
            z_low = tile.z;
            z_center = calc_top;
            let top = tile.z + tile.height;
            if !is_set || top > z_top {
                z_top = top;
            }
            is_set = true;
        }
    }

    if !is_set {
        (location.z, location.z)
    } else {
        (z_low, z_top.max(location.z))
    }
}

struct StepCheck<'a> {
    map: &'a dyn WorldMap,
    caps: &'a Capabilities,
    ignore_doors: bool,
    ignore_movable: bool,
    start_z: i32,
    start_top: i32,
    current_z: i32,
}

impl StepCheck<'_> {
    /// Best standing Z on `(x, y)`: closest to the current height, ties going to the lower.
    fn check(&self, items: &[TileSample], x: i32, y: i32) -> Option<i32> {
        let caps = self.caps;
        let statics = self.map.statics(x, y);
        let land = self.map.land(x, y);
        let blocked = land_blocks(caps, land.is_impassable(), land.is_wet());
        let (land_z, land_center, _) = get_average_z(self.map, x, y);
        let consider_land = !land.ignored;

        let step_top = self.start_top + STEP_HEIGHT;
        let check_top = self.start_z + PERSON_HEIGHT;
        let mut best: Option<i32> = None;

        for tile in statics.iter().chain(items.iter()) {
            let flyable = caps.can_fly_over(tile.id);
            if !flyable && !is_standable(caps, tile) {
                continue;
            }
            let our_z = tile.z + tile.calc_height();
            if let Some(current) = best {
                if !self.prefers(our_z, current) {
                    continue;
                }
            }
            let test_top = check_top.max(our_z + PERSON_HEIGHT);
            if !flyable && step_top < tile.step_top() {
                continue;
            }
            let land_check = tile.z + tile.height.min(STEP_HEIGHT);
            if consider_land && land_check < land_center && land_center > our_z && test_top > land_z {
                continue;
            }
            if self.is_ok(our_z, test_top, statics, items) {
                best = Some(our_z);
            }
        }

        if consider_land && !blocked && step_top >= land_z {
            let our_z = land_center;
            let test_top = check_top.max(our_z + PERSON_HEIGHT);
            let should_check = best.map_or(true, |current| self.prefers(our_z, current));
            if should_check && self.is_ok(our_z, test_top, statics, items) {
                best = Some(our_z);
            }
        }
        best
    }

    fn prefers(&self, candidate: i32, current: i32) -> bool {
        let cmp = (candidate - self.current_z).abs() - (current - self.current_z).abs();
        !(cmp > 0 || (cmp == 0 && candidate > current))
    }

    /// No blocker on the cell overlaps the body band `our_z..our_top`.
    fn is_ok(&self, our_z: i32, our_top: i32, statics: &[TileSample], items: &[TileSample]) -> bool {
        let overlaps = |tile: &TileSample| {
            let check_top = tile.z + tile.calc_height();
            check_top > our_z && our_top > tile.z
        };
        for tile in statics {
            if !tile.flags.intersects(TileFlags::IMPASSABLE_SURFACE) {
                continue;
            }
            if overlaps(tile) {
                return false;
            }
        }
        for item in items {
            if !item.flags.intersects(TileFlags::IMPASSABLE_SURFACE) {
                continue;
            }
            if self.ignore_doors && is_door(item) {
                continue;
            }
            if self.ignore_movable && item.movable {
                continue;
            }
            if overlaps(item) {
                return false;
            }
        }
        true
    }
}

fn is_standable(caps: &Capabilities, tile: &TileSample) -> bool {
    let wet = tile.flags.contains(TileFlags::WET);
    let surface = tile.flags.bits() & TileFlags::IMPASSABLE_SURFACE.bits() == TileFlags::SURFACE.bits();
    (surface || (caps.can_swim && wet)) && !(caps.cant_walk && !wet)
}

fn is_door(tile: &TileSample) -> bool {
    tile.flags.contains(TileFlags::DOOR) || DOOR_ITEM_IDS.contains(&tile.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::movement::mover::GM_BODY;
    use crate::testing::{
        add_door, add_wall, open_map, player_at, walker_at, water_land, TREE_ID,
    };
    use crate::world::map::{GridMap, MapId};
    use crate::world::tile::LandTile;

    fn step(
        map: &GridMap,
        mover: &MoverDescriptor,
        rules: StepRules,
        direction: Direction,
    ) -> Option<i32> {
        MovementResolver::new().check_movement(Some(map), mover, rules, mover.location, direction)
    }

    #[test]
    fn flat_step_keeps_height() {
        let map = open_map(32, 32);
        let mover = walker_at(Point3D::new(10, 10, 0));
        assert_eq!(step(&map, &mover, StepRules::default(), Direction::East), Some(0));
    }

    #[test]
    fn repeated_checks_are_deterministic() {
        let mut map = open_map(32, 32);
        add_door(&mut map, 11, 10);
        add_wall(&mut map, 10, 11);
        let mover = walker_at(Point3D::new(10, 10, 0));
        let mut resolver = MovementResolver::new();
        for direction in crate::world::position::ALL_DIRECTIONS {
            let first = resolver.check_movement(
                Some(&map),
                &mover,
                StepRules { ignore_doors: true, ignore_movable_impassables: false },
                mover.location,
                direction,
            );
            let plain = resolver.check_movement(Some(&map), &mover, StepRules::default(), mover.location, direction);
            let again = resolver.check_movement(Some(&map), &mover, StepRules::default(), mover.location, direction);
            assert_eq!(plain, again, "{direction:?}");
            if direction == Direction::East {
                assert_eq!(first, Some(0));
                assert_eq!(plain, None);
            }
        }
    }

    #[test]
    fn missing_or_internal_map_rejects_without_queries() {
        let map = GridMap::flat(MapId::INTERNAL, 32, 32);
        let mover = walker_at(Point3D::new(10, 10, 0));
        let mut resolver = MovementResolver::new();
        assert_eq!(
            resolver.check_movement(None, &mover, StepRules::default(), mover.location, Direction::East),
            None
        );
        assert_eq!(
            resolver.check_movement(Some(&map), &mover, StepRules::default(), mover.location, Direction::East),
            None
        );
        assert_eq!(resolver.cache_stats().misses, 0);
    }

    #[test]
    fn map_edge_blocks() {
        let map = open_map(16, 16);
        let mover = walker_at(Point3D::new(15, 0, 0));
        assert_eq!(step(&map, &mover, StepRules::default(), Direction::East), None);
        assert_eq!(step(&map, &mover, StepRules::default(), Direction::North), None);
        assert_eq!(step(&map, &mover, StepRules::default(), Direction::West), Some(0));
    }

    #[test]
    fn wall_blocks_walker() {
        let mut map = open_map(32, 32);
        add_wall(&mut map, 11, 10);
        let mover = walker_at(Point3D::new(10, 10, 0));
        assert_eq!(step(&map, &mover, StepRules::default(), Direction::East), None);
    }

    #[test]
    fn door_ignoring_passes_door() {
        let mut map = open_map(32, 32);
        add_door(&mut map, 11, 10);
        let mover = walker_at(Point3D::new(10, 10, 0));
        assert_eq!(step(&map, &mover, StepRules::default(), Direction::East), None);
        let rules = StepRules { ignore_doors: true, ignore_movable_impassables: false };
        assert_eq!(step(&map, &mover, rules, Direction::East), Some(0));

        let mut ghost = mover.clone();
        ghost.caps.alive = false;
        assert_eq!(step(&map, &ghost, StepRules::default(), Direction::East), Some(0));
        let mut staff = mover.clone();
        staff.caps.body = GM_BODY;
        assert_eq!(step(&map, &staff, StepRules::default(), Direction::East), Some(0));
    }

    #[test]
    fn hardcoded_door_graphic_is_a_door() {
        let mut map = open_map(32, 32);
        map.add_item(11, 10, TileSample::new(0x0846, 0, 20, TileFlags::IMPASSABLE));
        let mover = walker_at(Point3D::new(10, 10, 0));
        let rules = StepRules { ignore_doors: true, ignore_movable_impassables: false };
        assert_eq!(step(&map, &mover, StepRules::default(), Direction::East), None);
        assert_eq!(step(&map, &mover, rules, Direction::East), Some(0));
    }

    #[test]
    fn static_doors_never_ignored() {
        let mut map = open_map(32, 32);
        map.add_static(11, 10, TileSample::new(0x0846, 0, 20, TileFlags::IMPASSABLE | TileFlags::DOOR));
        let mover = walker_at(Point3D::new(10, 10, 0));
        let rules = StepRules { ignore_doors: true, ignore_movable_impassables: false };
        assert_eq!(step(&map, &mover, rules, Direction::East), None);
    }

    #[test]
    fn diagonal_corner_rule() {
        let origin = Point3D::new(10, 10, 0);
        // Down (south-east) is flanked by east (11,10) and south (10,11).
        let mut both = open_map(32, 32);
        add_wall(&mut both, 11, 10);
        add_wall(&mut both, 10, 11);
        let mut one = open_map(32, 32);
        add_wall(&mut one, 11, 10);
        let none = open_map(32, 32);

        let player = player_at(origin);
        let npc = walker_at(origin);
        let rules = StepRules::default();

        assert_eq!(step(&both, &player, rules, Direction::Down), None);
        assert_eq!(step(&both, &npc, rules, Direction::Down), None);
        assert_eq!(step(&one, &player, rules, Direction::Down), None);
        assert_eq!(step(&one, &npc, rules, Direction::Down), Some(0));
        assert_eq!(step(&none, &player, rules, Direction::Down), Some(0));
        assert_eq!(step(&none, &npc, rules, Direction::Down), Some(0));
    }

    #[test]
    fn step_height_caps_surfaces() {
        let rock = LandTile::new(0x0200, 0, TileFlags::IMPASSABLE);
        let mover = walker_at(Point3D::new(10, 10, 0));

        let mut low = open_map(32, 32);
        low.set_land(11, 10, rock);
        low.add_static(11, 10, TileSample::new(0x0300, 0, 2, TileFlags::SURFACE));
        assert_eq!(step(&low, &mover, StepRules::default(), Direction::East), Some(2));

        let mut tall = open_map(32, 32);
        tall.set_land(11, 10, rock);
        tall.add_static(11, 10, TileSample::new(0x0300, 0, 3, TileFlags::SURFACE));
        assert_eq!(step(&tall, &mover, StepRules::default(), Direction::East), None);
    }

    #[test]
    fn bridge_ramp_is_climbable() {
        let mut map = open_map(32, 32);
        map.set_land(11, 10, LandTile::new(0x0200, 0, TileFlags::IMPASSABLE));
        map.add_static(11, 10, TileSample::new(0x0301, 0, 10, TileFlags::SURFACE | TileFlags::BRIDGE));
        let mover = walker_at(Point3D::new(10, 10, 0));
        assert_eq!(step(&map, &mover, StepRules::default(), Direction::East), Some(5));
    }

    #[test]
    fn closest_surface_wins() {
        let mut map = open_map(32, 32);
        // An upper floor well above the mover's head leaves the ground reachable.
        map.add_static(11, 10, TileSample::new(0x0302, 20, 1, TileFlags::SURFACE));
        let mover = walker_at(Point3D::new(10, 10, 0));
        assert_eq!(step(&map, &mover, StepRules::default(), Direction::East), Some(0));
    }

    #[test]
    fn low_ceiling_blocks_head() {
        let mut map = open_map(32, 32);
        map.add_static(11, 10, TileSample::new(0x0303, 10, 5, TileFlags::IMPASSABLE));
        let mover = walker_at(Point3D::new(10, 10, 0));
        assert_eq!(step(&map, &mover, StepRules::default(), Direction::East), None);

        let mut high = open_map(32, 32);
        high.add_static(11, 10, TileSample::new(0x0303, 20, 5, TileFlags::IMPASSABLE));
        assert_eq!(step(&high, &mover, StepRules::default(), Direction::East), Some(0));
    }

    #[test]
    fn water_needs_swimming() {
        let mut map = open_map(32, 32);
        map.set_land(11, 10, water_land());
        let walker = walker_at(Point3D::new(10, 10, 0));
        assert_eq!(step(&map, &walker, StepRules::default(), Direction::East), None);

        let mut swimmer = walker.clone();
        swimmer.caps.can_swim = true;
        assert!(step(&map, &swimmer, StepRules::default(), Direction::East).is_some());

        let mut fish = swimmer.clone();
        fish.caps.cant_walk = true;
        fish.location = Point3D::new(11, 10, 0);
        assert_eq!(step(&map, &fish, StepRules::default(), Direction::West), None);
    }

    #[test]
    fn movable_obstacles_ignored_on_request() {
        let mut map = open_map(32, 32);
        map.add_item(11, 10, TileSample::new(0x0E3D, 0, 10, TileFlags::IMPASSABLE).movable());
        let mover = walker_at(Point3D::new(10, 10, 0));
        assert_eq!(step(&map, &mover, StepRules::default(), Direction::East), None);
        let rules = StepRules { ignore_doors: false, ignore_movable_impassables: true };
        assert_eq!(step(&map, &mover, rules, Direction::East), Some(0));
    }

    #[test]
    fn flyer_hovers_over_fly_set() {
        let mut map = open_map(32, 32);
        map.add_static(11, 10, TileSample::new(TREE_ID, 0, 20, TileFlags::IMPASSABLE));
        let walker = walker_at(Point3D::new(10, 10, 0));
        assert_eq!(step(&map, &walker, StepRules::default(), Direction::East), None);

        let mut flyer = walker.clone();
        flyer.caps.can_fly = true;
        flyer.caps.fly_tiles = vec![TREE_ID];
        assert_eq!(step(&map, &flyer, StepRules::default(), Direction::East), Some(20));
    }

    #[test]
    fn start_z_on_table() {
        let mut map = open_map(32, 32);
        map.add_static(5, 5, TileSample::new(0x0304, 0, 6, TileFlags::SURFACE));
        let caps = Capabilities::walker();
        let mut resolver = MovementResolver::new();
        assert_eq!(resolver.get_start_z(&map, &caps, Point3D::new(5, 5, 6)), (0, 6));
        assert_eq!(resolver.get_start_z(&map, &caps, Point3D::new(5, 5, 0)), (0, 0));
    }

    #[test]
    fn average_z_uses_flatter_diagonal() {
        let mut map = open_map(8, 8);
        map.set_land(2, 2, LandTile::new(3, 0, TileFlags::NONE));
        map.set_land(3, 2, LandTile::new(3, 10, TileFlags::NONE));
        map.set_land(2, 3, LandTile::new(3, 10, TileFlags::NONE));
        map.set_land(3, 3, LandTile::new(3, 1, TileFlags::NONE));
        assert_eq!(get_average_z(&map, 2, 2), (0, 10, 10));
        assert_eq!(floor_average(-3, 0), -2);
    }

    #[test]
    fn can_fit_needs_surface_and_clearance() {
        let mut map = open_map(32, 32);
        add_wall(&mut map, 4, 4);
        map.set_land(6, 6, water_land());
        let mut resolver = MovementResolver::new();
        assert!(resolver.can_fit(&map, 3, 3, 0));
        assert!(!resolver.can_fit(&map, 3, 3, 5));
        assert!(!resolver.can_fit(&map, 4, 4, 0));
        assert!(!resolver.can_fit(&map, 6, 6, -5));
        assert!(!resolver.can_fit(&map, -1, 3, 0));
    }
}
