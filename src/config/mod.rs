//! Server configuration: schema and YAML loader.

pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::AppConfig;
