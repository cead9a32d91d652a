pub mod config;
pub mod rate_limit;
pub mod rpc;
pub mod server;
pub mod trigger;

pub use crate::config::{ConfigError, ServiceConfig};
pub use crate::rate_limit::{RateLimitConfig, RateLimitDecision, TriggerRateLimiter};
pub use crate::rpc::RpcConnection;
pub use crate::trigger::{ChargeTrigger, TriggerBody, TriggerResponse};
