#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point3D {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

/// Eight-way facing using the client numbering; odd values are diagonals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    North = 0,
    Right = 1,
    East = 2,
    Down = 3,
    South = 4,
    Left = 5,
    West = 6,
    Up = 7,
}

pub const ALL_DIRECTIONS: [Direction; 8] = [
    Direction::North,
    Direction::Right,
    Direction::East,
    Direction::Down,
    Direction::South,
    Direction::Left,
    Direction::West,
    Direction::Up,
];

impl Point3D {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        Self {
            x: self.x + dx,
            y: self.y + dy,
            z: self.z,
        }
    }

    pub fn with_z(self, z: i32) -> Self {
        Self { z, ..self }
    }

    pub fn same_column(self, other: Point3D) -> bool {
        self.x == other.x && self.y == other.y
    }

    pub fn direction_to(self, target: Point3D) -> Option<Direction> {
        Direction::from_delta(target.x - self.x, target.y - self.y)
    }
}

impl std::fmt::Display for Point3D {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

impl Direction {
    pub fn from_index(index: u8) -> Self {
        ALL_DIRECTIONS[usize::from(index & 0x7)]
    }

    pub fn index(self) -> u8 {
        self as u8
    }

    pub fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, -1),
            Direction::Right => (1, -1),
            Direction::East => (1, 0),
            Direction::Down => (1, 1),
            Direction::South => (0, 1),
            Direction::Left => (-1, 1),
            Direction::West => (-1, 0),
            Direction::Up => (-1, -1),
        }
    }

    pub fn is_diagonal(self) -> bool {
        self.index() & 0x1 == 0x1
    }

    /// Rotates clockwise by `steps` eighths of a turn; negative values turn counter-clockwise.
    pub fn rotate(self, steps: i32) -> Self {
        let index = (i32::from(self.index()) + steps).rem_euclid(8);
        Self::from_index(index as u8)
    }

    pub fn opposite(self) -> Self {
        self.rotate(4)
    }

    /// Facing that points from the origin towards `(dx, dy)`, snapping to the nearest octant.
    pub fn from_delta(dx: i32, dy: i32) -> Option<Self> {
        if dx == 0 && dy == 0 {
            return None;
        }
        let adx = dx.abs();
        let ady = dy.abs();
        // Diagonal when neither axis dominates by more than roughly 2.4:1.
        let diagonal = adx * 5 > ady * 2 && ady * 5 > adx * 2;
        let direction = if diagonal {
            match (dx > 0, dy > 0) {
                (true, false) => Direction::Right,
                (true, true) => Direction::Down,
                (false, true) => Direction::Left,
                (false, false) => Direction::Up,
            }
        } else if adx > ady {
            if dx > 0 {
                Direction::East
            } else {
                Direction::West
            }
        } else if dy > 0 {
            Direction::South
        } else {
            Direction::North
        };
        Some(direction)
    }

    pub fn short_name(self) -> &'static str {
        match self {
            Direction::North => "N",
            Direction::Right => "NE",
            Direction::East => "E",
            Direction::Down => "SE",
            Direction::South => "S",
            Direction::Left => "SW",
            Direction::West => "W",
            Direction::Up => "NW",
        }
    }
}

/// Chebyshev range check on the x/y plane.
pub fn in_range(a: Point3D, b: Point3D, range: i32) -> bool {
    (a.x - b.x).abs() <= range && (a.y - b.y).abs() <= range
}

pub fn distance_sq(a: Point3D, b: Point3D) -> i64 {
    let dx = i64::from(a.x - b.x);
    let dy = i64::from(a.y - b.y);
    dx * dx + dy * dy
}

pub fn manhattan(a: Point3D, b: Point3D) -> i32 {
    (a.x - b.x).abs() + (a.y - b.y).abs()
}

/// Replays `directions` from `start` and returns the final x/y (z untouched).
pub fn walk(start: Point3D, directions: &[Direction]) -> Point3D {
    directions
        .iter()
        .fold(start, |point, direction| point.step(*direction))
}
