//! HTTP and WebSocket handlers for lsc-server

pub mod health;
pub mod predict;
pub mod stream;

pub use health::health_routes;
pub use predict::predict_routes;
pub use stream::stream_routes;
