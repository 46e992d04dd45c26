pub mod cli;
pub mod commands;
pub mod gateway;
pub mod render;
pub mod reveal;
pub mod session;
