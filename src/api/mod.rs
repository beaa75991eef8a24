// API module
//
// This module exposes the node over HTTP

pub mod handlers;
pub mod routes;

// Re-export main components for easier access
pub use routes::configure_routes;
