// HTTP Server modules
pub mod handlers;
pub mod models;
pub mod routes;
pub mod sse;

// Generation pipeline
pub mod app;
pub mod artifact;
pub mod events;
pub mod partition;
pub mod pipeline;
pub mod progress;

// Artifact persistence
pub mod store;

// LLM abstraction layer
pub mod llm;

// Configuration and logging
pub mod config;
pub mod logging;
