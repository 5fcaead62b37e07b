pub mod applications;
pub mod assistant;
pub mod commands;
pub mod config;
pub mod config_env;
pub mod desktop;
pub mod dispatch;
pub mod fallback;
pub mod llm;
pub mod memory;
pub mod models;
pub mod personal;
pub mod router;
pub mod speech;
pub mod system;
pub mod telemetry;
pub mod timezone;
pub mod weather;
pub mod web_search;
