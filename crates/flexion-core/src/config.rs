//! Loop configuration.

/// Default bound on actions drained in a single tick.
pub const DEFAULT_MAX_ACTIONS_PER_TICK: usize = 100_000;

/// Default bound on ticks run by a single [`Loop::flush`](crate::Loop::flush).
pub const DEFAULT_MAX_TICKS_PER_FLUSH: usize = 100;

/// Safety bounds for the event loop.
///
/// Actions that keep invoking actions, or reactions that keep requesting
/// changes, would otherwise spin forever. When a bound trips the loop
/// discards its queue and reports [`Error::Recursion`](crate::Error::Recursion).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    /// Maximum number of actions drained in one tick.
    pub max_actions_per_tick: usize,
    /// Maximum number of ticks a flush may run before giving up.
    pub max_ticks_per_flush: usize,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_actions_per_tick: DEFAULT_MAX_ACTIONS_PER_TICK,
            max_ticks_per_flush: DEFAULT_MAX_TICKS_PER_FLUSH,
        }
    }
}

impl LoopConfig {
    /// Set the per-tick action bound.
    pub fn with_max_actions_per_tick(mut self, limit: usize) -> Self {
        self.max_actions_per_tick = limit.max(1);
        self
    }

    /// Set the per-flush tick bound.
    pub fn with_max_ticks_per_flush(mut self, limit: usize) -> Self {
        self.max_ticks_per_flush = limit.max(1);
        self
    }
}
