//! HTTP API handlers for precobase-in

pub mod benchmark;
pub mod health;
pub mod pipeline;
pub mod review;
pub mod settings;

pub use benchmark::benchmark_routes;
pub use health::health_routes;
pub use pipeline::pipeline_routes;
pub use review::review_routes;
pub use settings::settings_routes;
