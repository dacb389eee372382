pub mod config;

pub use config::{
    AppConfig, DependencyConfig, DependencyTarget, ProbeConfig, ServerConfig, SystemConfig,
};
