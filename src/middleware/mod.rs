pub mod auth;
pub mod rbac;
pub mod request_log;
pub mod token;
