pub mod api_connection;
pub mod app;
pub mod cli;
pub mod config;
pub mod history;
pub mod identity;
pub mod preferences;
pub mod prompt_composer;
pub mod ranking;
pub mod render;
pub mod storage;
pub mod substitution;
