//! Per-mover controller that turns planned paths into one step per tick.
//!
//! The follower keeps the last plan and a cursor into it, replans when the goal moves, the
//! plan failed or the mover drifted off it (subject to a cooldown), and routes distant goals
//! through coarse sector waypoints so every plan stays short-range.

use crate::movement::mover::MoverDescriptor;
use crate::pathing::algorithm::{AlgorithmKind, GOAL_Z_TOLERANCE};
use crate::pathing::movement_path::{MovementPath, PathRequest};
use crate::pathing::planner::Planner;
use crate::world::map::WorldMap;
use crate::world::position::{in_range, Direction, Point3D};
use crate::world::time::{GameClock, GameTick};
use std::time::Duration;

pub const DEFAULT_REPATH_DELAY: Duration = Duration::from_millis(2000);

/// The moving entity as the follower sees it.
pub trait Walker {
    fn descriptor(&self) -> MoverDescriptor;
    fn face(&mut self, direction: Direction);
    /// Attempts one step; false when the world refused it.
    fn step(&mut self, direction: Direction, run: bool) -> bool;
}

pub enum FollowGoal {
    Fixed(Point3D),
    /// Re-read every tick; `None` means the target is gone.
    Tracked(Box<dyn Fn() -> Option<Point3D> + Send>),
}

impl FollowGoal {
    pub fn location(&self) -> Option<Point3D> {
        match self {
            FollowGoal::Fixed(point) => Some(*point),
            FollowGoal::Tracked(locate) => locate(),
        }
    }
}

impl From<Point3D> for FollowGoal {
    fn from(point: Point3D) -> Self {
        FollowGoal::Fixed(point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowState {
    Idle,
    Following,
    Blocked,
    /// No usable plan this tick; the mover stepped straight at the goal instead.
    Repathing,
    Arrived,
    Abandoned,
}

pub struct PathFollower {
    goal: FollowGoal,
    state: FollowState,
    repath_delay: Duration,
    path: Option<MovementPath>,
    index: usize,
    next: Point3D,
    last_goal: Option<Point3D>,
    last_repath: Option<GameTick>,
    waypoints: Vec<Point3D>,
    cursor: usize,
    route_goal: Option<Point3D>,
    route_derived: Option<GameTick>,
    target_advanced: bool,
}

impl PathFollower {
    pub fn new(goal: impl Into<FollowGoal>) -> Self {
        Self {
            goal: goal.into(),
            state: FollowState::Idle,
            repath_delay: DEFAULT_REPATH_DELAY,
            path: None,
            index: 0,
            next: Point3D::default(),
            last_goal: None,
            last_repath: None,
            waypoints: Vec::new(),
            cursor: 0,
            route_goal: None,
            route_derived: None,
            target_advanced: false,
        }
    }

    pub fn with_repath_delay(mut self, delay: Duration) -> Self {
        self.repath_delay = delay;
        self
    }

    pub fn state(&self) -> FollowState {
        self.state
    }

    pub fn path(&self) -> Option<&MovementPath> {
        self.path.as_ref()
    }

    pub fn waypoints(&self) -> &[Point3D] {
        &self.waypoints
    }

    pub fn set_goal(&mut self, goal: impl Into<FollowGoal>) {
        self.goal = goal.into();
        if self.state == FollowState::Abandoned {
            self.state = FollowState::Idle;
        }
    }

    /// Drops the current plan so the next tick replans regardless of the cooldown.
    pub fn force_repath(&mut self) {
        self.path = None;
        self.route_goal = None;
    }

    pub fn abandon(&mut self) {
        self.state = FollowState::Abandoned;
        self.path = None;
        self.clear_route();
    }

    /// Advances the mover at most one step towards the goal. Returns true once the mover is
    /// within `range` of it.
    pub fn follow<W: Walker, P: Planner>(
        &mut self,
        walker: &mut W,
        planner: &mut P,
        map: Option<&dyn WorldMap>,
        clock: &GameClock,
        run: bool,
        range: i32,
    ) -> bool {
        if self.state == FollowState::Abandoned {
            return false;
        }
        let Some(goal) = self.goal.location() else {
            self.abandon();
            return false;
        };
        let mover = walker.descriptor();
        if within(mover.location, goal, range) {
            self.state = FollowState::Arrived;
            return true;
        }

        let now = clock.now();
        let cooldown = clock.ticks_for(self.repath_delay);
        let target = self.target(planner, map, &mover, goal, now, cooldown);
        let repathed = self.check_path(planner, map, &mover, target, now, cooldown);

        let Some(direction) = self.next_direction(&mover) else {
            return self.step_directly(walker, goal, run, range);
        };
        walker.face(direction);
        if !walker.step(direction, run) {
            if repathed {
                self.state = FollowState::Blocked;
                return false;
            }
            // Something moved into the way; one fresh plan before giving up on this tick.
            self.path = None;
            self.check_path(planner, map, &mover, target, now, cooldown);
            let Some(direction) = self.next_direction(&mover) else {
                self.state = FollowState::Blocked;
                return false;
            };
            walker.face(direction);
            if !walker.step(direction, run) {
                self.state = FollowState::Blocked;
                return false;
            }
        }

        let moved = walker.descriptor();
        if moved.location.same_column(self.next) {
            if moved.location.z == self.next.z {
                self.index += 1;
                self.advance(planner, map, &moved);
            } else {
                self.path = None;
            }
        }
        self.state = FollowState::Following;
        if within(moved.location, goal, range) {
            self.state = FollowState::Arrived;
            return true;
        }
        false
    }

    /// Point the next plan should aim for: the goal itself when it is close, otherwise the
    /// current coarse waypoint.
    fn target<P: Planner>(
        &mut self,
        planner: &mut P,
        map: Option<&dyn WorldMap>,
        mover: &MoverDescriptor,
        goal: Point3D,
        now: GameTick,
        cooldown: u64,
    ) -> Point3D {
        self.target_advanced = false;
        let here = mover.location;
        if AlgorithmKind::FastAStar.check_condition(here, goal) {
            self.clear_route();
            return goal;
        }

        let plan_failed = self.path.as_ref().is_some_and(|path| !path.success());
        let stale = match self.route_goal {
            None => true,
            Some(route_goal) => (route_goal != goal || plan_failed) && elapsed(self.route_derived, now, cooldown),
        };
        if stale {
            self.waypoints = planner.waypoints(map, mover, goal).unwrap_or_default();
            self.cursor = 0;
            self.route_goal = Some(goal);
            self.route_derived = Some(now);
            self.target_advanced = true;
            log::debug!(
                target: "shardnav::pathing",
                "coarse route {} -> {}: {} waypoints",
                here,
                goal,
                self.waypoints.len()
            );
        }
        if self.waypoints.is_empty() {
            return goal;
        }

        let before = self.cursor;
        while self.cursor < self.waypoints.len() {
            let reached = here.same_column(self.waypoints[self.cursor]);
            let skip = self
                .waypoints
                .get(self.cursor + 1)
                .is_some_and(|&after| AlgorithmKind::FastAStar.check_condition(here, after));
            if !reached && !skip {
                break;
            }
            self.cursor += 1;
        }
        if self.cursor != before {
            self.target_advanced = true;
        }
        match self.waypoints.get(self.cursor) {
            Some(&waypoint) => waypoint,
            None => {
                self.waypoints.clear();
                goal
            }
        }
    }

    /// Replans when there is no plan, when the target moved or the plan failed and the
    /// cooldown has run out, or when a finished plan left the mover on its old target.
    fn check_path<P: Planner>(
        &mut self,
        planner: &mut P,
        map: Option<&dyn WorldMap>,
        mover: &MoverDescriptor,
        target: Point3D,
        now: GameTick,
        cooldown: u64,
    ) -> bool {
        let repath = match &self.path {
            None => true,
            Some(path) => {
                let target_moved = self.last_goal != Some(target);
                let cooled = elapsed(self.last_repath, now, cooldown);
                let at_last_goal = self
                    .last_goal
                    .is_some_and(|last| mover.location.same_column(last));
                self.target_advanced
                    || ((!path.success() || target_moved) && cooled)
                    || (path.success() && at_last_goal)
            }
        };
        if !repath {
            return false;
        }

        self.state = FollowState::Repathing;
        let path = planner.plan(map, &PathRequest::new(mover.clone(), target));
        log::debug!(
            target: "shardnav::pathing",
            "repath {} -> {}: {}",
            mover.location,
            target,
            if path.success() {
                format!("{} steps", path.len())
            } else {
                "no path".to_string()
            }
        );
        self.path = Some(path);
        self.index = 0;
        self.last_goal = Some(target);
        self.last_repath = Some(now);
        self.target_advanced = false;
        self.advance(planner, map, mover);
        true
    }

    /// Sets the next intermediate point from the step under the cursor.
    fn advance<P: Planner>(&mut self, planner: &mut P, map: Option<&dyn WorldMap>, mover: &MoverDescriptor) {
        let here = mover.location;
        let Some(&direction) = self.path.as_ref().and_then(|path| path.directions().get(self.index)) else {
            self.next = here;
            return;
        };
        let z = planner.predict_step(map, mover, direction).unwrap_or(here.z);
        self.next = here.step(direction).with_z(z);
    }

    fn next_direction(&self, mover: &MoverDescriptor) -> Option<Direction> {
        let path = self.path.as_ref()?;
        if !path.success() || self.index >= path.len() {
            return None;
        }
        mover.location.direction_to(self.next)
    }

    fn step_directly<W: Walker>(&mut self, walker: &mut W, goal: Point3D, run: bool, range: i32) -> bool {
        let here = walker.descriptor().location;
        let Some(direction) = here.direction_to(goal) else {
            self.state = FollowState::Blocked;
            return within(here, goal, range);
        };
        walker.face(direction);
        if !walker.step(direction, run) {
            self.state = FollowState::Blocked;
            return false;
        }
        self.state = FollowState::Repathing;
        let moved = walker.descriptor().location;
        if within(moved, goal, range) {
            self.state = FollowState::Arrived;
            return true;
        }
        false
    }

    fn clear_route(&mut self) {
        self.waypoints.clear();
        self.cursor = 0;
        self.route_goal = None;
        self.route_derived = None;
    }
}

/// Goal check: Chebyshev `range`, plus a Z band when standing next to or on the goal.
pub fn within(location: Point3D, goal: Point3D, range: i32) -> bool {
    in_range(location, goal, range) && (range > 1 || (location.z - goal.z).abs() <= GOAL_Z_TOLERANCE)
}

fn elapsed(since: Option<GameTick>, now: GameTick, cooldown: u64) -> bool {
    since.map_or(true, |at| now >= at.saturating_add(cooldown))
}
