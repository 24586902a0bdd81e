use crate::movement::mover::Capabilities;
use crate::world::time::GameClock;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const USAGE: &str = "usage: shardnav <data-root> <command> [args...]\n\
commands: rebuild | export [file] | load [file] | info | path x y z x y z [fast|slow|nav|sector] | follow x y z x y z [ticks] | island x y z x y z";

#[derive(Debug)]
pub struct AppConfig {
    pub root: PathBuf,
    pub map_dir: PathBuf,
    pub graph_dir: PathBuf,
    pub command: Vec<String>,
    pub pathing: PathingConfig,
}

impl AppConfig {
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        if args.len() < 3 {
            return Err(USAGE.to_string());
        }

        let root = Path::new(&args[1]).to_path_buf();
        let graph_dir = std::env::var("SHARDNAV_GRAPH_DIR")
            .ok()
            .and_then(|value| {
                let trimmed = value.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(PathBuf::from(trimmed))
                }
            })
            .unwrap_or_else(|| root.join("graph"));
        let pathing = PathingConfig::load(&root.join("pathing.yml"))?;
        Ok(Self {
            map_dir: root.join("map"),
            graph_dir,
            root,
            command: args[2..].to_vec(),
            pathing,
        })
    }

    /// Snapshot path for a map, from the configured name pattern.
    pub fn snapshot_path(&self, map_name: &str) -> PathBuf {
        self.graph_dir
            .join(self.pathing.snapshot_name.replace("{map}", map_name))
    }
}

/// Tuning knobs read from `pathing.yml`; a missing file means all defaults.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PathingConfig {
    pub repath_delay_ms: u64,
    pub tick_ms: u64,
    pub waypoint_max_distance: i32,
    pub builder: BuilderConfig,
    pub snapshot_name: String,
}

impl Default for PathingConfig {
    fn default() -> Self {
        Self {
            repath_delay_ms: 2000,
            tick_ms: 50,
            waypoint_max_distance: 2048,
            builder: BuilderConfig::default(),
            snapshot_name: "{map}.graph".to_string(),
        }
    }
}

impl PathingConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let data = std::fs::read_to_string(path)
            .map_err(|err| format!("failed to read {}: {}", path.display(), err))?;
        Self::parse(&data).map_err(|err| format!("{}: {}", path.display(), err))
    }

    pub fn parse(data: &str) -> Result<Self, String> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(data).map_err(|err| err.to_string())?;
        if config.waypoint_max_distance <= 0 {
            return Err(format!(
                "waypoint_max_distance must be positive, got {}",
                config.waypoint_max_distance
            ));
        }
        if !config.snapshot_name.contains("{map}") {
            return Err(format!(
                "snapshot_name '{}' lacks the {{map}} placeholder",
                config.snapshot_name
            ));
        }
        Ok(config)
    }

    pub fn repath_delay(&self) -> Duration {
        Duration::from_millis(self.repath_delay_ms)
    }

    pub fn tick_length(&self) -> Duration {
        Duration::from_millis(self.tick_ms.max(1))
    }

    /// A fresh clock ticking at `tick_ms`; the follower's cooldown is counted on it.
    pub fn clock(&self) -> GameClock {
        GameClock::new(self.tick_length())
    }
}

/// Abilities of the reference mover used to link sectors.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuilderConfig {
    pub can_open_doors: bool,
    pub can_swim: bool,
    pub can_move_over_obstacles: bool,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            can_open_doors: true,
            can_swim: false,
            can_move_over_obstacles: false,
        }
    }
}

impl BuilderConfig {
    pub fn capabilities(&self) -> Capabilities {
        Capabilities {
            can_open_doors: self.can_open_doors,
            can_swim: self.can_swim,
            can_move_over_obstacles: self.can_move_over_obstacles,
            ..Capabilities::walker()
        }
    }
}
