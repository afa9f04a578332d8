mod http;

pub use http::{dispatch_notification, DispatchResponse};
