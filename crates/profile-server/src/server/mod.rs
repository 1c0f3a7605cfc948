//! Axum HTTP server, routing, and middleware.
//!
//! # Responsibilities
//! - Define the Axum router with all routes and shared middleware.
//! - Authenticate callers and map failures to JSON error bodies.
//! - Inject shared application state (`AppState`) into handlers.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod shutdown;
pub mod state;
