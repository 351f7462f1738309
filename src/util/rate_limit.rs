//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Per-connection limiter for inbound `update` messages
pub struct UpdateRateLimiter {
    limiter: Option<Limiter>,
}

impl UpdateRateLimiter {
    /// `None` disables limiting
    pub fn new(updates_per_second: Option<u32>) -> Self {
        let limiter = updates_per_second
            .and_then(NonZeroU32::new)
            .map(|rate| RateLimiter::direct(Quota::per_second(rate)));
        Self { limiter }
    }

    /// Check if an update is allowed (returns true if allowed)
    pub fn check(&self) -> bool {
        self.limiter
            .as_ref()
            .map_or(true, |limiter| limiter.check().is_ok())
    }
}
