pub mod admin;
pub mod config;
pub mod movement;
pub mod pathing;
pub mod telemetry;
pub mod world;

#[cfg(test)]
mod testing;

pub use movement::{Capabilities, MovementResolver, MoverDescriptor};
pub use pathing::{
    AlgorithmKind, ContextPool, FollowGoal, FollowState, GraphError, GraphRegistry, MovementPath,
    PathContext, PathFollower, PathRequest, Pathfinder, Planner, SectorGraph, Walker,
};
pub use world::{Direction, GridMap, MapId, Point3D, WorldMap};

/// Map served by the operator binary.
const OPERATOR_MAP: MapId = MapId(1);

pub fn run(args: &[String]) -> Result<(), String> {
    let config = config::AppConfig::from_args(args)?;
    telemetry::logging::init(&config.root)?;

    let map = world::map::load_map(&config.map_dir, OPERATOR_MAP)?;
    let mut graphs = GraphRegistry::new();
    let snapshot_path = config.snapshot_path(&map.id().to_string());
    match pathing::snapshot::load(&snapshot_path, &map) {
        Ok(graph) => {
            log::info!(
                target: "shardnav::pathing::snapshot",
                "loaded {}: {}",
                snapshot_path.display(),
                graph.summary()
            );
            graphs.insert(graph);
        }
        Err(err) => log::warn!(
            target: "shardnav::pathing::snapshot",
            "no sector graph for {}: {}",
            map.id(),
            err
        ),
    }

    let line = format!("!{}", config.command.join(" "));
    let command = admin::commands::parse_admin_command(&line)?
        .ok_or_else(|| config::USAGE.to_string())?;
    let mut ctx = PathContext::new();
    let mut admin = admin::AdminContext {
        map: &map,
        graphs: &mut graphs,
        ctx: &mut ctx,
        config: &config.pathing,
        graph_dir: &config.graph_dir,
    };
    let report = admin::execute(&command, &mut admin)?;
    println!("shardnav: {}", report);

    if command == admin::commands::AdminCommand::RebuildGraph {
        if let Some(graph) = graphs.get(map.id()) {
            pathing::snapshot::save(graph, &snapshot_path).map_err(|err| err.to_string())?;
            println!("shardnav: saved {}", snapshot_path.display());
        }
    }
    Ok(())
}
