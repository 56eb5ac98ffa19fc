// Library root, exposed for integration tests and embedders.
// The console binary entry point is src/main.rs.

pub mod chat;
pub mod config;
pub mod engine;
pub mod error;
pub mod llm;
pub mod logger;
pub mod model;
pub mod quiz;
pub mod store;

pub use engine::TutorEngine;
pub use error::EngineError;
