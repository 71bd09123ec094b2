//! Configuration constants for the tvgame clients
//!
//! This module contains the default phase timings and the bounds that
//! client configuration is validated against.

/// Answer collection phase timing
pub mod answers {
    /// Default time in seconds the Controller waits for answers
    pub const DEFAULT_DURATION: u64 = 30;
    /// Minimum configurable answer collection time in seconds
    pub const MIN_DURATION: u64 = 5;
    /// Maximum configurable answer collection time in seconds
    pub const MAX_DURATION: u64 = 240;
}

/// Vote collection phase timing
pub mod votes {
    /// Default time in seconds the Controller waits for votes
    pub const DEFAULT_DURATION: u64 = 30;
    /// Minimum configurable vote collection time in seconds
    pub const MIN_DURATION: u64 = 5;
    /// Maximum configurable vote collection time in seconds
    pub const MAX_DURATION: u64 = 240;
}

/// Results display timing
pub mod results {
    /// Default time in seconds results stay on screen before `next` is sent
    pub const DEFAULT_DURATION: u64 = 5;
    /// Minimum configurable results display time in seconds
    pub const MIN_DURATION: u64 = 1;
    /// Maximum configurable results display time in seconds
    pub const MAX_DURATION: u64 = 60;
}

/// Session tick configuration
pub mod tick {
    /// Default number of inbound messages applied per tick
    pub const DEFAULT_MAX_MESSAGES: usize = 64;
    /// Maximum configurable number of inbound messages applied per tick
    pub const MAX_MESSAGES: usize = 1024;
}

/// Server connection defaults
pub mod connection {
    /// Websocket endpoint used when none is configured
    pub const DEFAULT_URL: &str = "ws://localhost:8080/ws";
}
