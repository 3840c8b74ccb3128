//! Outbound ports (messaging + moderation) and the incoming update model.

pub mod port;
pub mod throttled;
pub mod types;
