//! Media item model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::RowId;

/// An image or file reference on the media shelf. Local only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaItem {
    pub id: RowId,
    pub name: String,
    pub url: String,
    pub date: NaiveDate,
}
