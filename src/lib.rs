// Shared components
pub mod config;
pub mod error;
pub mod metrics;
pub mod telemetry;

// Domain layer
pub mod channel;
pub mod dispatch;
pub mod quota;

// Application layer
pub mod api;
pub mod server;
pub mod triggers;
