pub mod algorithm;
pub mod context;
pub mod fast_astar;
pub mod follower;
pub mod movement_path;
pub mod nav_star;
pub mod plane_grid;
pub mod planner;
pub mod sector_graph;
pub mod slow_astar;
pub mod snapshot;

pub use algorithm::AlgorithmKind;
pub use context::{ContextPool, PathContext, PlanStats};
pub use follower::{FollowGoal, FollowState, PathFollower, Walker};
pub use movement_path::{MovementPath, PathRequest};
pub use planner::{Pathfinder, Planner};
pub use sector_graph::{GraphRegistry, SectorGraph};
pub use snapshot::GraphError;
