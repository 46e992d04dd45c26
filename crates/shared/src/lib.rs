pub mod assistant;
pub mod aws;
pub mod config;
mod config_env;
pub mod knowledge_base;
pub mod llm;
pub mod models;
pub mod weather;
