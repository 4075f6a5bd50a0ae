//! trellis-core - Core library for Trellis
//!
//! This crate contains the shared models, the Supabase auth and data clients,
//! the login guard, and the entity stores used by the Trellis interfaces.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod models;
pub mod rest;
pub mod stores;
pub mod util;

pub use error::{Error, Result};
pub use models::{Activity, MediaItem, Node, NodeKind, Project, RowId, Workspace};
