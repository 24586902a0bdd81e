pub mod commands;

use crate::config::PathingConfig;
use crate::movement::mover::{MoverDescriptor, StepRules};
use crate::movement::resolver::MovementResolver;
use crate::pathing::context::PathContext;
use crate::pathing::follower::{PathFollower, Walker};
use crate::pathing::movement_path::{MovementPath, PathRequest};
use crate::pathing::planner::Pathfinder;
use crate::pathing::sector_graph::{GraphRegistry, SectorGraph};
use crate::pathing::snapshot::{self, GraphError};
use crate::world::map::WorldMap;
use crate::world::position::{Direction, Point3D};
use commands::AdminCommand;
use std::path::{Path, PathBuf};

/// Everything an operator command may read or replace.
pub struct AdminContext<'a> {
    pub map: &'a dyn WorldMap,
    pub graphs: &'a mut GraphRegistry,
    pub ctx: &'a mut PathContext,
    pub config: &'a PathingConfig,
    pub graph_dir: &'a Path,
}

impl AdminContext<'_> {
    fn snapshot_path(&self, file: Option<&str>) -> PathBuf {
        match file {
            Some(file) => self.graph_dir.join(file),
            None => self
                .graph_dir
                .join(self.config.snapshot_name.replace("{map}", &self.map.id().to_string())),
        }
    }
}

/// Runs one command and returns the operator-facing report.
pub fn execute(command: &AdminCommand, admin: &mut AdminContext<'_>) -> Result<String, String> {
    match command {
        AdminCommand::RebuildGraph => {
            let builder = admin.config.builder.capabilities();
            let graph = SectorGraph::build(admin.map, admin.ctx, &builder);
            let summary = graph.summary();
            admin.graphs.insert(graph);
            Ok(format!("rebuilt sector graph for {}: {}", admin.map.id(), summary))
        }
        AdminCommand::ExportGraph { file } => {
            let path = admin.snapshot_path(file.as_deref());
            let graph = admin
                .graphs
                .get(admin.map.id())
                .ok_or(GraphError::NotLoaded(admin.map.id()))
                .map_err(|err| err.to_string())?;
            snapshot::save(graph, &path).map_err(|err| err.to_string())?;
            Ok(format!("exported sector graph to {}", path.display()))
        }
        AdminCommand::LoadGraph { file } => {
            let path = admin.snapshot_path(file.as_deref());
            match snapshot::load(&path, admin.map) {
                Ok(graph) => {
                    let summary = graph.summary();
                    admin.graphs.insert(graph);
                    Ok(format!("loaded {}: {}", path.display(), summary))
                }
                Err(err) => {
                    log::warn!(
                        target: "shardnav::admin",
                        "sector graph for {} not loaded: {}",
                        admin.map.id(),
                        err
                    );
                    Err(err.to_string())
                }
            }
        }
        AdminCommand::Path {
            from,
            to,
            algorithm,
        } => {
            let mover = MoverDescriptor::new(*from, admin.map.id(), admin.config.builder.capabilities());
            let mut request = PathRequest::new(mover, *to);
            request.forced = *algorithm;
            request.waypoint_max_distance = admin.config.waypoint_max_distance;
            let path = MovementPath::plan(admin.ctx, admin.graphs, Some(admin.map), &request);
            Ok(describe_path(&path))
        }
        AdminCommand::Follow { from, to, ticks } => Ok(simulate_follow(admin, *from, *to, *ticks)),
        AdminCommand::Island { a, b } => {
            let Some(graph) = admin.graphs.get(admin.map.id()) else {
                return Ok(format!("no sector graph loaded for {}", admin.map.id()));
            };
            let label = |island: Option<u32>| island.map_or("none".to_string(), |id| id.to_string());
            Ok(format!(
                "{} island {} / {} island {}: {}",
                a,
                label(graph.island_of(*a)),
                b,
                label(graph.island_of(*b)),
                if graph.same_island(*a, *b) {
                    "same island"
                } else {
                    "not connected"
                }
            ))
        }
        AdminCommand::GraphInfo => {
            let graph = match admin.graphs.get(admin.map.id()) {
                Some(graph) => format!(
                    "{}x{} sectors: {}",
                    graph.width(),
                    graph.height(),
                    graph.summary()
                ),
                None => "no sector graph loaded".to_string(),
            };
            Ok(format!("{}: {}; planner {}", admin.map.id(), graph, admin.ctx.stats()))
        }
        AdminCommand::Unknown(name) => Err(format!("unknown admin command '{name}'")),
    }
}

/// Mover driven only by the resolver, for dry runs of the follower.
struct SimulatedWalker<'m> {
    map: &'m dyn WorldMap,
    mover: MoverDescriptor,
    resolver: MovementResolver,
}

impl Walker for SimulatedWalker<'_> {
    fn descriptor(&self) -> MoverDescriptor {
        self.mover.clone()
    }

    fn face(&mut self, _direction: Direction) {}

    fn step(&mut self, direction: Direction, _run: bool) -> bool {
        let rules = StepRules::for_search(&self.mover.caps);
        let from = self.mover.location;
        self.resolver.reset();
        match self
            .resolver
            .check_movement(Some(self.map), &self.mover, rules, from, direction)
        {
            Some(z) => {
                self.mover.location = from.step(direction).with_z(z);
                true
            }
            None => false,
        }
    }
}

fn simulate_follow(admin: &mut AdminContext<'_>, from: Point3D, to: Point3D, ticks: u32) -> String {
    let config = admin.config;
    let map = admin.map;
    let mut walker = SimulatedWalker {
        map,
        mover: MoverDescriptor::new(from, map.id(), config.builder.capabilities()),
        resolver: MovementResolver::new(),
    };
    let mut clock = config.clock();
    let mut follower = PathFollower::new(to).with_repath_delay(config.repath_delay());
    let mut planner = Pathfinder::new(&mut *admin.ctx, &*admin.graphs)
        .with_waypoint_max_distance(config.waypoint_max_distance);

    let mut elapsed = 0;
    let mut arrived = false;
    while elapsed < ticks && !arrived {
        clock.advance(1);
        elapsed += 1;
        arrived = follower.follow(&mut walker, &mut planner, Some(map), &clock, false, 0);
    }
    let outcome = if arrived { "arrived" } else { "stopped" };
    format!(
        "follow {} -> {}: {} after {} ticks at {} ({:?}); planner {}",
        from,
        to,
        outcome,
        elapsed,
        walker.mover.location,
        follower.state(),
        planner.stats()
    )
}

fn describe_path(path: &MovementPath) -> String {
    match path.algorithm() {
        Some(kind) if path.success() => {
            let steps: Vec<&str> = path.directions().iter().map(|d| d.short_name()).collect();
            format!(
                "{} path {} -> {}: {} steps [{}]",
                kind.name(),
                path.start(),
                path.goal(),
                steps.len(),
                steps.join(" ")
            )
        }
        _ => format!("no path {} -> {}", path.start(), path.goal()),
    }
}
