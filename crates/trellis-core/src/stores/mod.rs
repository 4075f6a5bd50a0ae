//! Entity stores: local state for workspaces, projects, nodes and media,
//! kept in step with the hosted tables through a [`DataService`].
//!
//! [`DataService`]: crate::rest::DataService

mod media;
mod node;
mod project;
mod workspace;

pub use media::MediaStore;
pub use node::{Assignment, NodeStore};
pub use project::ProjectStore;
pub use workspace::WorkspaceStore;

use crate::error::Result;

/// Record the outcome of a remote operation in a store's `error` slot.
fn settle<T>(error_slot: &mut Option<String>, operation: &'static str, result: Result<T>) -> Result<T> {
    match &result {
        Ok(_) => *error_slot = None,
        Err(error) => {
            tracing::warn!(operation, %error, "Store operation failed");
            *error_slot = Some(error.to_string());
        }
    }
    result
}
