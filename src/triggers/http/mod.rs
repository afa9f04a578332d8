//! HTTP notification trigger
//!
//! `POST /api/v1/notifications/dispatch` parses one multi-recipient message
//! and hands it to the dispatcher.

mod handlers;
mod models;

pub use handlers::dispatch_notification;
pub use models::DispatchResponse;
