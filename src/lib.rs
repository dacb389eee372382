// Library exports for embedding the probe responder and for testing
pub mod config;
pub mod handlers;
pub mod health;
pub mod metrics;
pub mod models;
