pub mod activity;
pub mod auth_cmd;
pub mod common;
pub mod completions;
pub mod config;
pub mod dashboard;
pub mod media;
pub mod node;
pub mod project;
pub mod workspace;
