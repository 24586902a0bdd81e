use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct GameTick(pub u64);

impl GameTick {
    pub fn saturating_add(self, ticks: u64) -> GameTick {
        GameTick(self.0.saturating_add(ticks))
    }
}

/// Deterministic tick counter driven by the server loop.
#[derive(Debug, Clone)]
pub struct GameClock {
    tick_length: Duration,
    tick: GameTick,
}

impl GameClock {
    pub fn new(tick_length: Duration) -> Self {
        let tick_length = if tick_length.is_zero() {
            Duration::from_millis(1)
        } else {
            tick_length
        };
        Self {
            tick_length,
            tick: GameTick(0),
        }
    }

    pub fn tick_length(&self) -> Duration {
        self.tick_length
    }

    pub fn now(&self) -> GameTick {
        self.tick
    }

    pub fn advance(&mut self, ticks: u64) -> GameTick {
        self.tick = self.tick.saturating_add(ticks);
        self.tick
    }

    pub fn advance_duration(&mut self, duration: Duration) -> GameTick {
        let ticks = self.ticks_for(duration);
        self.advance(ticks)
    }

    /// Whole ticks covering `duration`, rounded up.
    pub fn ticks_for(&self, duration: Duration) -> u64 {
        if duration.is_zero() {
            return 0;
        }
        let tick_nanos = self.tick_length.as_nanos().max(1);
        let ticks = duration.as_nanos().div_ceil(tick_nanos);
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }
}
