//! Rate limiting for inbound WebSocket frames

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Max `player_input` frames per second per connection. Clients may send
/// input twice per 60 Hz render frame.
pub const INPUT_RATE_LIMIT: u32 = 120;

/// Max join/fire/respawn frames per second per connection
pub const ACTION_RATE_LIMIT: u32 = 20;

/// Per-connection rate limiter state. Input and state-transition intents use
/// separate buckets so a flood of one never starves the other.
#[derive(Clone)]
pub struct ConnectionRateLimiter {
    input_limiter: Arc<Limiter>,
    action_limiter: Arc<Limiter>,
}

impl ConnectionRateLimiter {
    pub fn new() -> Self {
        Self::with_rates(INPUT_RATE_LIMIT, ACTION_RATE_LIMIT)
    }

    pub fn with_rates(input_per_second: u32, action_per_second: u32) -> Self {
        Self {
            input_limiter: create_limiter(input_per_second),
            action_limiter: create_limiter(action_per_second),
        }
    }

    /// Check if an input frame is allowed (returns true if allowed)
    pub fn check_input(&self) -> bool {
        self.input_limiter.check().is_ok()
    }

    /// Check if a join/fire/respawn frame is allowed
    pub fn check_action(&self) -> bool {
        self.action_limiter.check().is_ok()
    }
}

impl Default for ConnectionRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
