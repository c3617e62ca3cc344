//! HTTP surface.

pub mod routes;

pub use routes::{AppState, board_routes};
