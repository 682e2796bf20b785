//! Middleware for the MCPForge auth API
//!
//! Request tracing and session authentication.

pub mod auth;
mod logging;

pub use auth::{session_cookie, AuthenticatedUser, AUTH_COOKIE};
pub use logging::request_tracing;
